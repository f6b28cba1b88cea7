//! Generic single-table migration loop.

use super::batch::Batcher;
use super::log::{TableRun, TableResult};
use crate::config::MigrationConfig;
use crate::error::Result;
use crate::mappers::MapResult;
use crate::source::{LegacyReader, LegacyRow, RowFilter};
use crate::target::{Entity, EntityStore};
use tracing::{debug, info};

/// Build the effective row filter for a table read: the is-test
/// exclusion (when enabled and the table carries the marker column)
/// combined with any caller-supplied filter.
pub async fn effective_filter<R: LegacyReader + ?Sized>(
    reader: &R,
    cfg: &MigrationConfig,
    table: &str,
    extra: Option<RowFilter>,
) -> Result<Option<RowFilter>> {
    let mut filter = extra;

    if cfg.skip_test_rows && reader.has_column(table, &cfg.test_marker_column).await? {
        let test_filter = RowFilter::IsFalseOrNull(cfg.test_marker_column.clone());
        filter = Some(match filter {
            Some(f) => test_filter.and(f),
            None => test_filter,
        });
    }

    Ok(filter)
}

/// Migrate one legacy table through a mapping function.
///
/// Counts matching rows first, streams them through `mapper` with
/// per-row fault isolation, and flushes mapped entities in fixed-size
/// batches. One bad row never aborts the table.
pub async fn migrate_table<R, S, E, F>(
    reader: &R,
    store: &S,
    cfg: &MigrationConfig,
    table: &str,
    extra_filter: Option<RowFilter>,
    mapper: F,
) -> Result<TableResult>
where
    R: LegacyReader + ?Sized,
    S: EntityStore<E> + ?Sized,
    E: Entity,
    F: Fn(&LegacyRow) -> MapResult<E>,
{
    let mut run = TableRun::begin(table);
    let filter = effective_filter(reader, cfg, table, extra_filter).await?;

    let source_count = reader.count(table, filter.as_ref()).await?;
    run.set_source_count(source_count);
    info!(table, source_count, "migrating table");

    if source_count == 0 {
        debug!(table, "no matching rows, skipping read");
        return Ok(run.finish());
    }

    let rows = reader.read_table(table, filter.as_ref()).await?;
    map_rows(&rows, store, cfg.batch_size, &mut run, mapper).await?;

    Ok(run.finish())
}

/// Map pre-read rows into the store with per-row fault isolation.
///
/// Shared by the generic migrator and the custom routines that obtain
/// their rows differently (joined queries, fan-out synthesis). A batch
/// write failure is downgraded to a warning covering that batch; the
/// remaining rows still get their chance.
pub async fn map_rows<S, E, F>(
    rows: &[LegacyRow],
    store: &S,
    batch_size: usize,
    run: &mut TableRun,
    mapper: F,
) -> Result<()>
where
    S: EntityStore<E> + ?Sized,
    E: Entity,
    F: Fn(&LegacyRow) -> MapResult<E>,
{
    let mut batcher = Batcher::new(batch_size);

    for row in rows {
        match mapper(row) {
            Ok(Some(entity)) => {
                if let Some(chunk) = batcher.push(entity) {
                    flush_batch(store, chunk, run).await;
                }
            }
            Ok(None) => run.add_skipped(1),
            Err(e) => {
                run.warn(format!("row {}: {}", row.legacy_id(), e));
                run.add_skipped(1);
            }
        }
    }

    if let Some(chunk) = batcher.finish() {
        flush_batch(store, chunk, run).await;
    }

    Ok(())
}

/// Write one chunk and record the outcome on the run.
///
/// A failed batch write is downgraded to a warning covering that
/// chunk, the same policy for every routine that batches. Shared with
/// the custom phase routines.
pub(crate) async fn flush_batch<S, E>(store: &S, chunk: Vec<E>, run: &mut TableRun)
where
    S: EntityStore<E> + ?Sized,
    E: Entity,
{
    let n = chunk.len() as i64;
    match store.save_all(&chunk).await {
        Ok(()) => run.add_migrated(n),
        Err(e) => {
            run.warn(format!("batch write of {} rows failed: {}", n, e));
            run.add_skipped(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappers::{map_vendor, RowError};
    use crate::model::Vendor;
    use crate::source::MemoryLegacy;
    use crate::target::MemoryTarget;
    use uuid::Uuid;

    fn vendor_row(name: &str) -> LegacyRow {
        LegacyRow::new().with("Id", Uuid::new_v4()).with("Name", name)
    }

    fn test_config() -> MigrationConfig {
        MigrationConfig {
            batch_size: 2,
            ..MigrationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_migrates_all_rows() {
        let reader = MemoryLegacy::new()
            .with_table("Vendors", (0..5).map(|i| vendor_row(&format!("v{}", i))).collect());
        let store = MemoryTarget::new();

        let result =
            migrate_table(&reader, &store, &test_config(), "Vendors", None, map_vendor)
                .await
                .unwrap();

        assert_eq!(result.source_count, 5);
        assert_eq!(result.migrated_count, 5);
        assert_eq!(result.skipped_count, 0);
        assert!(result.warnings.is_empty());
        let count: i64 = EntityStore::<Vendor>::count(&store).await.unwrap();
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_one_bad_row_in_ten() {
        let mut rows: Vec<LegacyRow> =
            (0..9).map(|i| vendor_row(&format!("v{}", i))).collect();
        // No Id, so the mapper errors on this one.
        rows.push(LegacyRow::new().with("Name", "broken"));

        let reader = MemoryLegacy::new().with_table("Vendors", rows);
        let store = MemoryTarget::new();

        let result =
            migrate_table(&reader, &store, &test_config(), "Vendors", None, map_vendor)
                .await
                .unwrap();

        assert_eq!(result.source_count, 10);
        assert_eq!(result.migrated_count, 9);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("<no id>"));
    }

    #[tokio::test]
    async fn test_mapper_skip_is_not_a_warning() {
        let reader = MemoryLegacy::new()
            .with_table("Vendors", vec![vendor_row("keep"), vendor_row("drop")]);
        let store = MemoryTarget::new();

        let mapper = |row: &LegacyRow| -> crate::mappers::MapResult<Vendor> {
            if row.get_str("Name") == Some("drop") {
                return Ok(None);
            }
            map_vendor(row)
        };

        let result =
            migrate_table(&reader, &store, &test_config(), "Vendors", None, mapper)
                .await
                .unwrap();

        assert_eq!(result.migrated_count, 1);
        assert_eq!(result.skipped_count, 1);
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_is_test_rows_excluded() {
        let rows = vec![
            vendor_row("real"),
            vendor_row("sandbox").with("IsTest", true),
        ];
        let reader = MemoryLegacy::new().with_table("Vendors", rows);
        let store = MemoryTarget::new();

        let result =
            migrate_table(&reader, &store, &test_config(), "Vendors", None, map_vendor)
                .await
                .unwrap();

        // The filtered count never sees the test row.
        assert_eq!(result.source_count, 1);
        assert_eq!(result.migrated_count, 1);
    }

    #[tokio::test]
    async fn test_empty_table_early_exit() {
        let reader = MemoryLegacy::new().with_table("Vendors", vec![]);
        let store = MemoryTarget::new();

        let result =
            migrate_table(&reader, &store, &test_config(), "Vendors", None, map_vendor)
                .await
                .unwrap();
        assert_eq!(result.source_count, 0);
        assert_eq!(result.migrated_count, 0);
    }

    /// A store whose writes always fail, for exercising the batch
    /// failure policy.
    struct DownTarget;

    #[async_trait::async_trait]
    impl<E: Entity> EntityStore<E> for DownTarget {
        async fn find(&self, _id: Uuid) -> crate::error::Result<Option<E>> {
            Ok(None)
        }

        async fn save_all(&self, _entities: &[E]) -> crate::error::Result<()> {
            Err(crate::error::CutoverError::pool(
                "connection reset",
                "writing batch",
            ))
        }

        async fn count(&self) -> crate::error::Result<i64> {
            Ok(0)
        }

        async fn list(&self) -> crate::error::Result<Vec<E>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_failed_batch_write_warns_and_continues() {
        let rows: Vec<LegacyRow> =
            (0..3).map(|i| vendor_row(&format!("v{}", i))).collect();
        let mut run = TableRun::begin("Vendors");

        map_rows(&rows, &DownTarget, 2, &mut run, map_vendor)
            .await
            .unwrap();

        // Two chunks (2 + 1), each downgraded to a warning.
        let result = run.finish();
        assert_eq!(result.migrated_count, 0);
        assert_eq!(result.skipped_count, 3);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("batch write"));
    }

    #[tokio::test]
    async fn test_every_row_failing_still_completes() {
        let reader = MemoryLegacy::new()
            .with_table("Vendors", (0..3).map(|i| vendor_row(&format!("v{}", i))).collect());
        let store = MemoryTarget::new();

        let mapper = |_: &LegacyRow| -> crate::mappers::MapResult<Vendor> {
            Err(RowError::new("always fails"))
        };

        let result =
            migrate_table(&reader, &store, &test_config(), "Vendors", None, mapper)
                .await
                .unwrap();

        assert_eq!(result.migrated_count, 0);
        assert_eq!(result.skipped_count, 3);
        assert_eq!(result.warnings.len(), 3);
    }
}
