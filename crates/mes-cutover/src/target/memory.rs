//! In-memory target store for tests and rehearsal runs.

use super::{Entity, EntityStore};
use crate::error::{CutoverError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use uuid::Uuid;

/// A target store holding every collection as serde documents.
///
/// Upsert semantics match the real store: save is a full replace keyed
/// by id, so a second identical run leaves the maps unchanged.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    collections: Mutex<HashMap<&'static str, BTreeMap<Uuid, serde_json::Value>>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all collections, for test assertions.
    pub fn total_records(&self) -> usize {
        let collections = self.collections.lock().unwrap();
        collections.values().map(BTreeMap::len).sum()
    }
}

#[async_trait]
impl<E: Entity> EntityStore<E> for MemoryTarget {
    async fn find(&self, id: Uuid) -> Result<Option<E>> {
        let collections = self.collections.lock().unwrap();
        let Some(map) = collections.get(E::COLLECTION) else {
            return Ok(None);
        };
        map.get(&id)
            .map(|doc| {
                serde_json::from_value(doc.clone())
                    .map_err(|e| CutoverError::encoding(E::COLLECTION, e.to_string()))
            })
            .transpose()
    }

    async fn save_all(&self, entities: &[E]) -> Result<()> {
        let mut docs = Vec::with_capacity(entities.len());
        for entity in entities {
            let doc = serde_json::to_value(entity)
                .map_err(|e| CutoverError::encoding(E::COLLECTION, e.to_string()))?;
            docs.push((entity.id(), doc));
        }

        let mut collections = self.collections.lock().unwrap();
        let map = collections.entry(E::COLLECTION).or_default();
        for (id, doc) in docs {
            map.insert(id, doc);
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(E::COLLECTION)
            .map(|m| m.len() as i64)
            .unwrap_or(0))
    }

    async fn list(&self) -> Result<Vec<E>> {
        let collections = self.collections.lock().unwrap();
        let Some(map) = collections.get(E::COLLECTION) else {
            return Ok(Vec::new());
        };
        map.values()
            .map(|doc| {
                serde_json::from_value(doc.clone())
                    .map_err(|e| CutoverError::encoding(E::COLLECTION, e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Plant;

    fn plant(name: &str) -> Plant {
        Plant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            code: name.to_uppercase(),
            current_gear_id: None,
        }
    }

    #[tokio::test]
    async fn test_save_find_roundtrip() {
        let store = MemoryTarget::new();
        let p = plant("augsburg");
        store.save_all(std::slice::from_ref(&p)).await.unwrap();

        let found: Option<Plant> = store.find(p.id).await.unwrap();
        assert_eq!(found.unwrap().name, "augsburg");
    }

    #[tokio::test]
    async fn test_save_is_full_replace() {
        let store = MemoryTarget::new();
        let mut p = plant("augsburg");
        store.save_all(std::slice::from_ref(&p)).await.unwrap();

        p.name = "munich".to_string();
        p.current_gear_id = Some(Uuid::new_v4());
        store.save_all(std::slice::from_ref(&p)).await.unwrap();

        let count: i64 = EntityStore::<Plant>::count(&store).await.unwrap();
        assert_eq!(count, 1);
        let found: Plant = store.find(p.id).await.unwrap().unwrap();
        assert_eq!(found.name, "munich");
        assert_eq!(found.current_gear_id, p.current_gear_id);
    }

    #[tokio::test]
    async fn test_idempotent_save() {
        let store = MemoryTarget::new();
        let p = plant("a");
        store.save_all(std::slice::from_ref(&p)).await.unwrap();
        store.save_all(std::slice::from_ref(&p)).await.unwrap();
        assert_eq!(store.total_records(), 1);
    }
}
