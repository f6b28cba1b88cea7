//! Defer-and-resolve for cross-references that cannot be set at
//! insert time.
//!
//! Pass 1 of a two-pass routine records (entity id, referenced id)
//! pairs here while inserting entities with the reference nulled.
//! Pass 2 calls [`PendingRefs::resolve`] once every prerequisite row
//! exists. Because no ordering assumption is made, forward references
//! and reference cycles both resolve correctly.

use super::batch::Batcher;
use super::log::TableRun;
use crate::error::Result;
use crate::target::{Entity, EntityStore};
use uuid::Uuid;

/// Deferred (entity id, referenced id) pairs awaiting a resolve pass.
#[derive(Debug, Default)]
pub struct PendingRefs {
    pairs: Vec<(Uuid, Uuid)>,
}

impl PendingRefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entity_id: Uuid, referenced_id: Uuid) {
        self.pairs.push((entity_id, referenced_id));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Apply every recorded pair: re-read the entity, set the
    /// reference through `apply`, and write the updates back in
    /// batches. Returns the number of pairs actually applied.
    ///
    /// `T` is the collection the referenced id points into (the same
    /// as `E` for self-references). A pair is skipped with a warning
    /// when either side is missing from the target — its row was
    /// skipped in pass 1 — so a resolve pass never plants a reference
    /// to a row that does not exist.
    ///
    /// Consumes self: pairs are one-shot by design.
    pub async fn resolve<S, E, T, F>(
        self,
        store: &S,
        batch_size: usize,
        run: &mut TableRun,
        apply: F,
    ) -> Result<i64>
    where
        S: EntityStore<E> + EntityStore<T> + ?Sized,
        E: Entity,
        T: Entity,
        F: Fn(&mut E, Uuid),
    {
        let mut batcher = Batcher::new(batch_size);
        let mut applied = 0i64;

        for (entity_id, referenced_id) in self.pairs {
            if EntityStore::<T>::find(store, referenced_id).await?.is_none() {
                run.warn(format!(
                    "deferred reference {} -> {}: referenced row not in target",
                    entity_id, referenced_id
                ));
                continue;
            }
            match EntityStore::<E>::find(store, entity_id).await? {
                Some(mut entity) => {
                    apply(&mut entity, referenced_id);
                    applied += 1;
                    if let Some(chunk) = batcher.push(entity) {
                        EntityStore::<E>::save_all(store, &chunk).await?;
                    }
                }
                None => run.warn(format!(
                    "deferred reference {} -> {}: entity not in target",
                    entity_id, referenced_id
                )),
            }
        }

        if let Some(chunk) = batcher.finish() {
            EntityStore::<E>::save_all(store, &chunk).await?;
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SerialUnit;
    use crate::target::MemoryTarget;

    fn unit(serial: &str) -> SerialUnit {
        SerialUnit {
            id: Uuid::new_v4(),
            serial: serial.to_string(),
            product_id: None,
            replaced_by: None,
        }
    }

    #[tokio::test]
    async fn test_resolves_reference_cycle() {
        let store = MemoryTarget::new();
        let a = unit("A");
        let b = unit("B");
        store.save_all(&[a.clone(), b.clone()]).await.unwrap();

        // A replaced by B, B replaced by A.
        let mut pending = PendingRefs::new();
        pending.record(a.id, b.id);
        pending.record(b.id, a.id);

        let mut run = TableRun::begin("SerialNumbers");
        let applied = pending
            .resolve::<_, _, SerialUnit, _>(&store, 100, &mut run, |u: &mut SerialUnit, target| {
                u.replaced_by = Some(target)
            })
            .await
            .unwrap();

        assert_eq!(applied, 2);
        let a2: SerialUnit = store.find(a.id).await.unwrap().unwrap();
        let b2: SerialUnit = store.find(b.id).await.unwrap().unwrap();
        assert_eq!(a2.replaced_by, Some(b.id));
        assert_eq!(b2.replaced_by, Some(a.id));
    }

    #[tokio::test]
    async fn test_missing_rows_warn_and_do_not_apply() {
        let store = MemoryTarget::new();
        let a = unit("A");
        store.save_all(std::slice::from_ref(&a)).await.unwrap();

        let mut pending = PendingRefs::new();
        let ghost = Uuid::new_v4();
        // Entity missing, then referenced row missing.
        pending.record(ghost, a.id);
        pending.record(a.id, ghost);

        let mut run = TableRun::begin("SerialNumbers");
        let applied = pending
            .resolve::<_, _, SerialUnit, _>(&store, 100, &mut run, |u: &mut SerialUnit, target| {
                u.replaced_by = Some(target)
            })
            .await
            .unwrap();

        // Both pairs warned; neither applied, so no dangling reference.
        assert_eq!(applied, 0);
        let result = run.finish();
        assert_eq!(result.warnings.len(), 2);
        let a2: SerialUnit = store.find(a.id).await.unwrap().unwrap();
        assert_eq!(a2.replaced_by, None);
    }
}
