//! Transactional data phases.
//!
//! Runs after every reference table exists, because these mappers
//! resolve operators, work centers and products against already
//! migrated data. Serial units come first (two-pass, self-referencing)
//! since every other table here hangs off them.

use super::reference::users_by_employee_number;
use crate::config::MigrationConfig;
use crate::engine::{
    effective_filter, map_rows, migrate_table, MigrationLog, PendingRefs, TableResult, TableRun,
};
use crate::error::Result;
use crate::mappers::{self, required_uuid, MapResult};
use crate::model::{InspectionLog, SerialUnit, WeldLog};
use crate::source::{LegacyReader, LegacyRow};
use crate::target::TargetStore;
use std::collections::HashMap;
use uuid::Uuid;

/// Run every transactional phase in dependency order.
pub async fn run<R, T>(
    reader: &R,
    store: &T,
    cfg: &MigrationConfig,
    log: &mut MigrationLog,
) -> Result<()>
where
    R: LegacyReader + ?Sized,
    T: TargetStore + ?Sized,
{
    log.record(migrate_serial_units(reader, store, cfg).await?);
    log.record(
        migrate_table(reader, store, cfg, "WorkOrders", None, mappers::map_work_order).await?,
    );

    let users = users_by_employee_number(store).await?;

    log.record(migrate_weld_logs(reader, store, cfg, &users).await?);
    log.record(
        migrate_table(
            reader,
            store,
            cfg,
            "TraceabilityLogs",
            None,
            mappers::map_trace_log,
        )
        .await?,
    );
    log.record(migrate_inspection_logs(reader, store, cfg, &users).await?);
    log.record(
        migrate_table(reader, store, cfg, "DefectLogs", None, mappers::map_defect_log).await?,
    );
    log.record(
        migrate_table(reader, store, cfg, "Annotations", None, mappers::map_annotation).await?,
    );
    log.record(
        migrate_table(
            reader,
            store,
            cfg,
            "MaterialQueue",
            None,
            mappers::map_material_queue_item,
        )
        .await?,
    );
    log.record(
        migrate_table(reader, store, cfg, "ChangeLogs", None, mappers::map_change_log).await?,
    );
    log.record(migrate_table(reader, store, cfg, "Counters", None, mappers::map_counter).await?);
    log.record(migrate_table(reader, store, cfg, "Schedules", None, mappers::map_schedule).await?);

    Ok(())
}

/// Serial units with self-referencing replacement chains.
///
/// Pass 1 inserts every unit with the replacement reference nulled and
/// records which rows declared one. Pass 2 applies the recorded pairs
/// once all rows exist, which handles forward references and cycles
/// without any ordering assumption.
async fn migrate_serial_units<R, T>(
    reader: &R,
    store: &T,
    cfg: &MigrationConfig,
) -> Result<TableResult>
where
    R: LegacyReader + ?Sized,
    T: TargetStore + ?Sized,
{
    let mut run = TableRun::begin("SerialNumbers");
    let filter = effective_filter(reader, cfg, "SerialNumbers", None).await?;

    let source_count = reader.count("SerialNumbers", filter.as_ref()).await?;
    run.set_source_count(source_count);
    if source_count == 0 {
        return Ok(run.finish());
    }

    let rows = reader.read_table("SerialNumbers", filter.as_ref()).await?;

    let mut pending = PendingRefs::new();
    for row in &rows {
        if let (Some(id), Some(successor)) = (row.get_uuid("Id"), row.get_uuid("ReplacedById")) {
            pending.record(id, successor);
        }
    }

    let mapper = |row: &LegacyRow| -> MapResult<SerialUnit> {
        Ok(Some(SerialUnit {
            id: required_uuid(row, "Id")?,
            serial: mappers::required_str(row, "Serial")?,
            product_id: row.get_uuid("ProductId"),
            replaced_by: None,
        }))
    };
    map_rows(&rows, store, cfg.batch_size, &mut run, mapper).await?;

    // Units are counted as migrated in pass 1; the resolve pass only
    // patches references, warning on pairs whose successor was skipped.
    pending
        .resolve::<_, _, SerialUnit, _>(
            store,
            cfg.batch_size,
            &mut run,
            |u: &mut SerialUnit, successor| u.replaced_by = Some(successor),
        )
        .await?;

    Ok(run.finish())
}

/// Weld logs resolve their operator by legacy employee number.
async fn migrate_weld_logs<R, T>(
    reader: &R,
    store: &T,
    cfg: &MigrationConfig,
    users: &HashMap<String, Uuid>,
) -> Result<TableResult>
where
    R: LegacyReader + ?Sized,
    T: TargetStore + ?Sized,
{
    let mapper = |row: &LegacyRow| -> MapResult<WeldLog> {
        let operator_id = row
            .get_str("OperatorEmployeeNumber")
            .and_then(|e| users.get(e).copied());
        Ok(Some(WeldLog {
            id: required_uuid(row, "Id")?,
            serial_unit_id: row.get_uuid("SerialNumberId"),
            work_center_id: row.get_uuid("WorkCenterId"),
            operator_id,
            logged_at: row.get_datetime("LoggedAt"),
        }))
    };

    migrate_table(reader, store, cfg, "WeldLogs", None, mapper).await
}

/// The joined read for inspection logs: the legacy table lacks plant
/// and operator, which live on the parent serial row.
pub fn inspection_join_sql(skip_test_rows: bool, test_marker_column: &str) -> String {
    let mut sql = String::from(
        "SELECT i.Id, i.SerialNumberId, i.Passed, i.LoggedAt, \
         s.PlantId, s.OperatorEmployeeNumber \
         FROM InspectionLogs i \
         JOIN SerialNumbers s ON i.SerialNumberId = s.Id",
    );
    if skip_test_rows {
        sql.push_str(&format!(
            " WHERE (s.[{0}] = 0 OR s.[{0}] IS NULL)",
            test_marker_column
        ));
    }
    sql
}

/// Inspection logs from the joined query; same per-row fault isolation
/// and batching as a plain table read.
async fn migrate_inspection_logs<R, T>(
    reader: &R,
    store: &T,
    cfg: &MigrationConfig,
    users: &HashMap<String, Uuid>,
) -> Result<TableResult>
where
    R: LegacyReader + ?Sized,
    T: TargetStore + ?Sized,
{
    let mut run = TableRun::begin("InspectionLogs");

    // The join filters on the serial row's marker column, so only add
    // the predicate when that column actually exists.
    let filter_tests = cfg.skip_test_rows
        && reader
            .has_column("SerialNumbers", &cfg.test_marker_column)
            .await?;
    let sql = inspection_join_sql(filter_tests, &cfg.test_marker_column);
    let rows = reader.raw_query(&sql).await?;
    run.set_source_count(rows.len() as i64);

    let mapper = |row: &LegacyRow| -> MapResult<InspectionLog> {
        let operator_id = row
            .get_str("OperatorEmployeeNumber")
            .and_then(|e| users.get(e).copied());
        Ok(Some(InspectionLog {
            id: required_uuid(row, "Id")?,
            serial_unit_id: row.get_uuid("SerialNumberId"),
            plant_id: row.get_uuid("PlantId"),
            operator_id,
            passed: row.get_bool("Passed").unwrap_or(false),
            logged_at: row.get_datetime("LoggedAt"),
        }))
    };
    map_rows(&rows, store, cfg.batch_size, &mut run, mapper).await?;

    Ok(run.finish())
}
