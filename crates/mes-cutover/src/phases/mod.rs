//! Phase orchestration.
//!
//! A fixed, explicit phase list: reference data first, transactional
//! data second, each table strictly after everything it depends on.
//! Phases run sequentially by design; later mappers read target data
//! written by earlier phases, so reordering or parallelizing them is
//! unsafe.

pub mod reference;
pub mod transactional;

use crate::config::MigrationConfig;
use crate::engine::MigrationLog;
use crate::error::Result;
use crate::source::LegacyReader;
use crate::target::TargetStore;
use tracing::info;

/// One full cutover run over a legacy reader and a target store.
pub struct Cutover<'a, R: ?Sized, T: ?Sized> {
    reader: &'a R,
    store: &'a T,
    config: &'a MigrationConfig,
}

impl<'a, R, T> Cutover<'a, R, T>
where
    R: LegacyReader + ?Sized,
    T: TargetStore + ?Sized,
{
    pub fn new(reader: &'a R, store: &'a T, config: &'a MigrationConfig) -> Self {
        Self {
            reader,
            store,
            config,
        }
    }

    /// Run every phase and return the accumulated per-table results.
    ///
    /// Row-level faults surface as warnings on the table results; an
    /// error return here means a run-level failure (store unreachable
    /// mid-run).
    pub async fn run(&self) -> Result<MigrationLog> {
        let mut log = MigrationLog::new();

        info!("starting reference data phases");
        reference::run(self.reader, self.store, self.config, &mut log).await?;

        info!("starting transactional data phases");
        transactional::run(self.reader, self.store, self.config, &mut log).await?;

        info!(
            tables = log.results().len(),
            warnings = log.total_warnings(),
            "cutover complete"
        );
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryLegacy;
    use crate::target::MemoryTarget;

    #[tokio::test]
    async fn test_empty_legacy_store_runs_clean() {
        let mut reader = MemoryLegacy::new();
        for table in [
            "Plants",
            "GlobalGears",
            "ProductionLines",
            "WorkCenters",
            "Assets",
            "ProductTypes",
            "Products",
            "Users",
            "Vendors",
            "AnnotationTypes",
            "Characteristics",
            "CharacteristicWorkCenters",
            "ControlPlans",
            "DefectCodes",
            "DefectLocations",
            "DefectWorkCenters",
            "Badges",
            "SerialNumbers",
            "WorkOrders",
            "WeldLogs",
            "TraceabilityLogs",
            "DefectLogs",
            "Annotations",
            "MaterialQueue",
            "ChangeLogs",
            "Counters",
            "Schedules",
        ] {
            reader.table_mut(table);
        }
        let cfg = MigrationConfig::default();
        // The empty serial table has no marker column, so the join is
        // built without the test-row predicate.
        let reader = reader.with_query(
            &transactional::inspection_join_sql(false, &cfg.test_marker_column),
            vec![],
        );
        let store = MemoryTarget::new();

        let log = Cutover::new(&reader, &store, &cfg).run().await.unwrap();
        assert!(log.results().len() >= 27);
        assert_eq!(log.total_warnings(), 0);
        assert_eq!(store.total_records(), 0);
    }
}
