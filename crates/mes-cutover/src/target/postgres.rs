//! PostgreSQL staging target store.
//!
//! Entities land in one jsonb document table per collection
//! (`id uuid PRIMARY KEY, doc jsonb NOT NULL`). The redesigned
//! application owns its typed schema; this tool stages records with
//! full upsert-by-id semantics so interrupted runs re-converge.

use super::{Entity, EntityStore};
use crate::config::TargetConfig;
use crate::error::{CutoverError, Result};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::{Config as PgConfig, NoTls};
use tracing::{debug, info};
use uuid::Uuid;

/// PostgreSQL target store.
pub struct PgTarget {
    pool: Pool,
    schema: String,
}

impl PgTarget {
    /// Connect to the target database and verify the connection.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(2)
            .build()
            .map_err(|e| CutoverError::pool(e.to_string(), "creating PostgreSQL pool"))?;

        let client = pool
            .get()
            .await
            .map_err(|e| CutoverError::pool(e.to_string(), "connecting to target store"))?;
        client.simple_query("SELECT 1").await?;

        info!(
            "Connected to target store: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            schema: config.schema.clone(),
        })
    }

    /// Create the target schema and one staging table per collection.
    pub async fn ensure_collections(&self, collections: &[&'static str]) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| CutoverError::pool(e.to_string(), "preparing target collections"))?;

        let schema_ddl = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&self.schema));
        client.execute(schema_ddl.as_str(), &[]).await?;

        for collection in collections {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {} (id uuid PRIMARY KEY, doc jsonb NOT NULL)",
                self.qualify(collection)
            );
            client.execute(ddl.as_str(), &[]).await?;
            debug!("Prepared collection {}", collection);
        }

        Ok(())
    }

    fn qualify(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| CutoverError::pool(e.to_string(), "getting target connection"))
    }
}

/// Quote a PostgreSQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[async_trait]
impl<E: Entity> EntityStore<E> for PgTarget {
    async fn find(&self, id: Uuid) -> Result<Option<E>> {
        let client = self.client().await?;
        let sql = format!("SELECT doc FROM {} WHERE id = $1", self.qualify(E::COLLECTION));
        let row = client.query_opt(sql.as_str(), &[&id]).await?;

        row.map(|r| {
            let doc: serde_json::Value = r.get(0);
            serde_json::from_value(doc)
                .map_err(|e| CutoverError::encoding(E::COLLECTION, e.to_string()))
        })
        .transpose()
    }

    async fn save_all(&self, entities: &[E]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let sql = format!(
            "INSERT INTO {} (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
            self.qualify(E::COLLECTION)
        );
        let stmt = tx.prepare(&sql).await?;

        for entity in entities {
            let doc = serde_json::to_value(entity)
                .map_err(|e| CutoverError::encoding(E::COLLECTION, e.to_string()))?;
            tx.execute(&stmt, &[&entity.id(), &doc]).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let client = self.client().await?;
        let sql = format!("SELECT COUNT(*) FROM {}", self.qualify(E::COLLECTION));
        let row = client.query_one(sql.as_str(), &[]).await?;
        Ok(row.get(0))
    }

    async fn list(&self) -> Result<Vec<E>> {
        let client = self.client().await?;
        let sql = format!("SELECT doc FROM {}", self.qualify(E::COLLECTION));
        let rows = client.query(sql.as_str(), &[]).await?;

        rows.into_iter()
            .map(|r| {
                let doc: serde_json::Value = r.get(0);
                serde_json::from_value(doc)
                    .map_err(|e| CutoverError::encoding(E::COLLECTION, e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("plants"), "\"plants\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
