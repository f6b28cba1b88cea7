//! Reference/configuration data phases.
//!
//! Runs before any transactional table. Three of these routines exist
//! because of structural schema differences the generic migrator
//! cannot express: the plant/gear circular reference (two passes over
//! plants around the gear fan-out), the global-to-scoped gear
//! duplication, and the line assignments derived from work-center
//! rows.

use crate::config::MigrationConfig;
use crate::engine::table::flush_batch;
use crate::engine::{
    derive_scoped_id, effective_filter, map_rows, migrate_table, Batcher, MigrationLog,
    PendingRefs, TableResult, TableRun,
};
use crate::error::Result;
use crate::mappers::{self, required_str, required_uuid, MapResult, RowError};
use crate::model::{Badge, Gear, LineAssignment, Plant, User};
use crate::source::{LegacyReader, LegacyRow};
use crate::target::{EntityStore, TargetStore};
use std::collections::{HashMap, HashSet};
use tracing::info;
use uuid::Uuid;

/// Run every reference-data phase in dependency order.
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
    // Plants pass 1 inserts with the current-gear reference nulled;
    // the back-reference pass after the gear fan-out fills it in.
    log.record(migrate_table(reader, store, cfg, "Plants", None, mappers::map_plant).await?);
    log.record(migrate_scoped_gears(reader, store, cfg).await?);
    log.record(backfill_plant_gear_refs(reader, store, cfg).await?);

    log.record(
        migrate_table(
            reader,
            store,
            cfg,
            "ProductionLines",
            None,
            mappers::map_production_line,
        )
        .await?,
    );

    let (work_centers, assignments) = migrate_work_centers(reader, store, cfg).await?;
    log.record(work_centers);
    log.record(assignments);

    log.record(migrate_table(reader, store, cfg, "Assets", None, mappers::map_asset).await?);
    log.record(
        migrate_table(reader, store, cfg, "ProductTypes", None, mappers::map_product_type).await?,
    );
    log.record(migrate_table(reader, store, cfg, "Products", None, mappers::map_product).await?);
    log.record(migrate_table(reader, store, cfg, "Users", None, mappers::map_user).await?);
    log.record(migrate_table(reader, store, cfg, "Vendors", None, mappers::map_vendor).await?);
    log.record(
        migrate_table(
            reader,
            store,
            cfg,
            "AnnotationTypes",
            None,
            mappers::map_annotation_type,
        )
        .await?,
    );
    log.record(
        migrate_table(
            reader,
            store,
            cfg,
            "Characteristics",
            None,
            mappers::map_characteristic,
        )
        .await?,
    );
    log.record(
        migrate_table(
            reader,
            store,
            cfg,
            "CharacteristicWorkCenters",
            None,
            mappers::map_characteristic_link,
        )
        .await?,
    );
    log.record(
        migrate_table(reader, store, cfg, "ControlPlans", None, mappers::map_control_plan).await?,
    );
    log.record(
        migrate_table(reader, store, cfg, "DefectCodes", None, mappers::map_defect_code).await?,
    );
    log.record(
        migrate_table(
            reader,
            store,
            cfg,
            "DefectLocations",
            None,
            mappers::map_defect_location,
        )
        .await?,
    );
    log.record(
        migrate_table(
            reader,
            store,
            cfg,
            "DefectWorkCenters",
            None,
            mappers::map_defect_link,
        )
        .await?,
    );
    log.record(migrate_badges(reader, store, cfg).await?);

    Ok(())
}

/// Global-to-scoped gear duplication.
///
/// Legacy gears are global; the target schema wants one per plant. For
/// every (gear row x plant) pair a duplicate is written under a
/// deterministic identifier, so re-runs overwrite the same records
/// instead of multiplying them.
async fn migrate_scoped_gears<R, T>(
    reader: &R,
    store: &T,
    cfg: &MigrationConfig,
) -> Result<TableResult>
where
    R: LegacyReader + ?Sized,
    T: TargetStore + ?Sized,
{
    let mut run = TableRun::begin("GlobalGears");
    let filter = effective_filter(reader, cfg, "GlobalGears", None).await?;

    let source_count = reader.count("GlobalGears", filter.as_ref()).await?;
    run.set_source_count(source_count);
    if source_count == 0 {
        return Ok(run.finish());
    }

    let plants: Vec<Plant> = EntityStore::<Plant>::list(store).await?;
    info!(
        gears = source_count,
        plants = plants.len(),
        "fanning out global gears per plant"
    );

    let rows = reader.read_table("GlobalGears", filter.as_ref()).await?;
    let mut batcher = Batcher::new(cfg.batch_size);

    for row in &rows {
        let parsed = (|| -> std::result::Result<(Uuid, String, i32), RowError> {
            Ok((
                required_uuid(row, "Id")?,
                required_str(row, "Name")?,
                row.get_i32("Level").unwrap_or(0),
            ))
        })();

        let (global_id, name, level) = match parsed {
            Ok(v) => v,
            Err(e) => {
                run.warn(format!("row {}: {}", row.legacy_id(), e));
                run.add_skipped(1);
                continue;
            }
        };

        for plant in &plants {
            let gear = Gear {
                id: derive_scoped_id(global_id, plant.id),
                plant_id: plant.id,
                global_id,
                name: name.clone(),
                level,
            };
            if let Some(chunk) = batcher.push(gear) {
                flush_batch::<_, Gear>(store, chunk, &mut run).await;
            }
        }
    }

    if let Some(chunk) = batcher.finish() {
        flush_batch::<_, Gear>(store, chunk, &mut run).await;
    }

    Ok(run.finish())
}

/// Plants pass 2: set each plant's current-gear reference now that the
/// scoped duplicates exist.
///
/// The legacy reference points at a global gear; the same derivation
/// rule used by the fan-out locates the plant's own duplicate.
async fn backfill_plant_gear_refs<R, T>(
    reader: &R,
    store: &T,
    cfg: &MigrationConfig,
) -> Result<TableResult>
where
    R: LegacyReader + ?Sized,
    T: TargetStore + ?Sized,
{
    let mut run = TableRun::begin("Plants.CurrentGear");
    let filter = effective_filter(reader, cfg, "Plants", None).await?;
    let rows = reader.read_table("Plants", filter.as_ref()).await?;

    let mut pending = PendingRefs::new();
    for row in &rows {
        let (Some(plant_id), Some(global_gear_id)) =
            (row.get_uuid("Id"), row.get_uuid("CurrentGearId"))
        else {
            continue;
        };

        let scoped = derive_scoped_id(global_gear_id, plant_id);
        if EntityStore::<Gear>::find(store, scoped).await?.is_none() {
            run.warn(format!(
                "plant {}: current gear {} has no scoped duplicate",
                plant_id, global_gear_id
            ));
            continue;
        }
        pending.record(plant_id, scoped);
    }

    run.set_source_count(pending.len() as i64);
    let applied = pending
        .resolve::<_, _, Gear, _>(store, cfg.batch_size, &mut run, |p: &mut Plant, gear| {
            p.current_gear_id = Some(gear)
        })
        .await?;
    run.add_migrated(applied);

    Ok(run.finish())
}

/// Work centers plus their derived production-line memberships.
///
/// No legacy table holds the membership; it is implied by the line
/// column on each work-center row. Derived assignments are
/// deduplicated against the target before insert and reported under
/// their own table name.
async fn migrate_work_centers<R, T>(
    reader: &R,
    store: &T,
    cfg: &MigrationConfig,
) -> Result<(TableResult, TableResult)>
where
    R: LegacyReader + ?Sized,
    T: TargetStore + ?Sized,
{
    let mut run = TableRun::begin("WorkCenters");
    let filter = effective_filter(reader, cfg, "WorkCenters", None).await?;

    let source_count = reader.count("WorkCenters", filter.as_ref()).await?;
    run.set_source_count(source_count);

    let rows = if source_count == 0 {
        Vec::new()
    } else {
        reader.read_table("WorkCenters", filter.as_ref()).await?
    };

    map_rows(&rows, store, cfg.batch_size, &mut run, mappers::map_work_center).await?;
    let work_centers = run.finish();

    // Derived relationships, second result.
    let mut derived_run = TableRun::begin("LineAssignments");

    let mut implied: Vec<(Uuid, Uuid)> = Vec::new();
    for row in &rows {
        if let (Some(wc), Some(line)) = (row.get_uuid("Id"), row.get_uuid("ProductionLineId")) {
            implied.push((wc, line));
        }
    }
    implied.sort();
    implied.dedup();
    derived_run.set_source_count(implied.len() as i64);

    let existing: HashSet<(Uuid, Uuid)> = EntityStore::<LineAssignment>::list(store)
        .await?
        .into_iter()
        .map(|a| (a.work_center_id, a.line_id))
        .collect();

    let mut batcher = Batcher::new(cfg.batch_size);
    for (work_center_id, line_id) in implied {
        if existing.contains(&(work_center_id, line_id)) {
            derived_run.add_skipped(1);
            continue;
        }
        let assignment = LineAssignment {
            id: derive_scoped_id(work_center_id, line_id),
            work_center_id,
            line_id,
        };
        if let Some(chunk) = batcher.push(assignment) {
            flush_batch::<_, LineAssignment>(store, chunk, &mut derived_run).await;
        }
    }
    if let Some(chunk) = batcher.finish() {
        flush_batch::<_, LineAssignment>(store, chunk, &mut derived_run).await;
    }

    Ok((work_centers, derived_run.finish()))
}

/// Badges resolve their owner by legacy employee number against the
/// already-migrated users.
async fn migrate_badges<R, T>(
    reader: &R,
    store: &T,
    cfg: &MigrationConfig,
) -> Result<TableResult>
where
    R: LegacyReader + ?Sized,
    T: TargetStore + ?Sized,
{
    let users_by_employee = users_by_employee_number(store).await?;

    let mapper = move |row: &LegacyRow| -> MapResult<Badge> {
        let employee = required_str(row, "EmployeeNumber")?;
        let Some(user_id) = users_by_employee.get(&employee).copied() else {
            return Err(RowError::new(format!(
                "no migrated user with employee number {}",
                employee
            )));
        };
        Ok(Some(Badge {
            id: required_uuid(row, "Id")?,
            card_number: required_str(row, "CardNumber")?,
            user_id: Some(user_id),
        }))
    };

    migrate_table(reader, store, cfg, "Badges", None, mapper).await
}

/// Lookup from legacy employee number to migrated user id, shared with
/// the transactional phases.
pub(crate) async fn users_by_employee_number<T>(store: &T) -> Result<HashMap<String, Uuid>>
where
    T: TargetStore + ?Sized,
{
    Ok(EntityStore::<User>::list(store)
        .await?
        .into_iter()
        .map(|u| (u.employee_number, u.id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryLegacy;
    use crate::target::MemoryTarget;

    fn plant_row(id: Uuid, name: &str, current_gear: Option<Uuid>) -> LegacyRow {
        let row = LegacyRow::new()
            .with("Id", id)
            .with("Name", name)
            .with("Code", name.to_uppercase());
        match current_gear {
            Some(g) => row.with("CurrentGearId", g),
            None => row,
        }
    }

    fn gear_row(id: Uuid, name: &str, level: i32) -> LegacyRow {
        LegacyRow::new()
            .with("Id", id)
            .with("Name", name)
            .with("Level", level)
    }

    #[tokio::test]
    async fn test_gear_fan_out_two_by_three() {
        let plant_a = Uuid::new_v4();
        let plant_b = Uuid::new_v4();
        let gear_1 = Uuid::new_v4();

        let reader = MemoryLegacy::new()
            .with_table(
                "Plants",
                vec![
                    plant_row(plant_a, "A", Some(gear_1)),
                    plant_row(plant_b, "B", None),
                ],
            )
            .with_table(
                "GlobalGears",
                vec![
                    gear_row(gear_1, "G1", 1),
                    gear_row(Uuid::new_v4(), "G2", 2),
                    gear_row(Uuid::new_v4(), "G3", 3),
                ],
            );
        let store = MemoryTarget::new();
        let cfg = MigrationConfig::default();
        let mut log = MigrationLog::new();

        migrate_table(&reader, &store, &cfg, "Plants", None, mappers::map_plant)
            .await
            .unwrap();
        log.record(migrate_scoped_gears(&reader, &store, &cfg).await.unwrap());
        log.record(
            backfill_plant_gear_refs(&reader, &store, &cfg)
                .await
                .unwrap(),
        );

        // 2 plants x 3 gears.
        let gears: Vec<Gear> = EntityStore::<Gear>::list(&store).await.unwrap();
        assert_eq!(gears.len(), 6);
        let mut ids: Vec<Uuid> = gears.iter().map(|g| g.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);

        // Plant A points at its own scoped duplicate of gear 1.
        let a: Plant = EntityStore::<Plant>::find(&store, plant_a)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.current_gear_id, Some(derive_scoped_id(gear_1, plant_a)));

        let b: Plant = EntityStore::<Plant>::find(&store, plant_b)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(b.current_gear_id, None);
    }

    #[tokio::test]
    async fn test_dangling_current_gear_warns() {
        let plant_a = Uuid::new_v4();
        let reader = MemoryLegacy::new()
            .with_table("Plants", vec![plant_row(plant_a, "A", Some(Uuid::new_v4()))])
            .with_table("GlobalGears", vec![]);
        let store = MemoryTarget::new();
        let cfg = MigrationConfig::default();

        migrate_table(&reader, &store, &cfg, "Plants", None, mappers::map_plant)
            .await
            .unwrap();
        migrate_scoped_gears(&reader, &store, &cfg).await.unwrap();
        let result = backfill_plant_gear_refs(&reader, &store, &cfg)
            .await
            .unwrap();

        assert_eq!(result.warnings.len(), 1);
        let a: Plant = EntityStore::<Plant>::find(&store, plant_a)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.current_gear_id, None);
    }

    #[tokio::test]
    async fn test_line_assignments_derived_and_deduped() {
        let line = Uuid::new_v4();
        let wc1 = Uuid::new_v4();
        let wc2 = Uuid::new_v4();

        let wc_row = |id: Uuid, name: &str| {
            LegacyRow::new()
                .with("Id", id)
                .with("Name", name)
                .with("Code", name.to_uppercase())
                .with("ProductionLineId", line)
        };

        let reader = MemoryLegacy::new()
            .with_table("WorkCenters", vec![wc_row(wc1, "weld"), wc_row(wc2, "paint")]);
        let store = MemoryTarget::new();
        let cfg = MigrationConfig::default();

        let (wc, assignments) = migrate_work_centers(&reader, &store, &cfg).await.unwrap();
        assert_eq!(wc.migrated_count, 2);
        assert_eq!(assignments.migrated_count, 2);

        // Second run: memberships already exist, nothing new created.
        let (_, assignments2) = migrate_work_centers(&reader, &store, &cfg).await.unwrap();
        assert_eq!(assignments2.migrated_count, 0);
        assert_eq!(assignments2.skipped_count, 2);

        let stored: Vec<LineAssignment> =
            EntityStore::<LineAssignment>::list(&store).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_badge_with_unknown_employee_warns() {
        let user_id = Uuid::new_v4();
        let store = MemoryTarget::new();
        store
            .save_all(&[User {
                id: user_id,
                employee_number: "E100".into(),
                name: "Known".into(),
                badge_code: None,
            }])
            .await
            .unwrap();

        let reader = MemoryLegacy::new().with_table(
            "Badges",
            vec![
                LegacyRow::new()
                    .with("Id", Uuid::new_v4())
                    .with("CardNumber", "C1")
                    .with("EmployeeNumber", "E100"),
                LegacyRow::new()
                    .with("Id", Uuid::new_v4())
                    .with("CardNumber", "C2")
                    .with("EmployeeNumber", "E999"),
            ],
        );
        let cfg = MigrationConfig::default();

        let result = migrate_badges(&reader, &store, &cfg).await.unwrap();
        assert_eq!(result.migrated_count, 1);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("E999"));
    }
}
