//! End-to-end cutover runs against in-memory stores.

use mes_cutover::config::MigrationConfig;
use mes_cutover::model::{Gear, InspectionLog, Plant, SerialUnit, User};
use mes_cutover::phases::{transactional, Cutover};
use mes_cutover::source::{LegacyRow, MemoryLegacy};
use mes_cutover::target::{EntityStore, MemoryTarget};
use mes_cutover::validate;
use mes_cutover::engine::derive_scoped_id;
use uuid::Uuid;

struct Fixture {
    plant_a: Uuid,
    plant_b: Uuid,
    gear_1: Uuid,
    serial_x: Uuid,
    serial_y: Uuid,
    reader: MemoryLegacy,
    cfg: MigrationConfig,
}

/// Two plants, three global gears, a serial replacement cycle, one
/// joined inspection row, and a sprinkling of lookup data.
fn fixture() -> Fixture {
    let plant_a = Uuid::new_v4();
    let plant_b = Uuid::new_v4();
    let gear_1 = Uuid::new_v4();
    let gear_2 = Uuid::new_v4();
    let gear_3 = Uuid::new_v4();
    let serial_x = Uuid::new_v4();
    let serial_y = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let product = Uuid::new_v4();
    let cfg = MigrationConfig::default();

    let mut reader = MemoryLegacy::new()
        .with_table(
            "Plants",
            vec![
                LegacyRow::new()
                    .with("Id", plant_a)
                    .with("Name", "Augsburg")
                    .with("Code", "AUG")
                    .with("CurrentGearId", gear_1),
                LegacyRow::new()
                    .with("Id", plant_b)
                    .with("Name", "Bremen")
                    .with("Code", "BRE"),
            ],
        )
        .with_table(
            "GlobalGears",
            vec![
                LegacyRow::new().with("Id", gear_1).with("Name", "G1").with("Level", 1),
                LegacyRow::new().with("Id", gear_2).with("Name", "G2").with("Level", 2),
                LegacyRow::new().with("Id", gear_3).with("Name", "G3").with("Level", 3),
            ],
        )
        .with_table(
            "Users",
            vec![LegacyRow::new()
                .with("Id", user_id)
                .with("EmployeeNumber", "E7")
                .with("Name", "Inspector")],
        )
        .with_table(
            "Products",
            vec![LegacyRow::new()
                .with("Id", product)
                .with("ProductNumber", "P-100")
                .with("Name", "Frame")],
        )
        .with_table(
            "SerialNumbers",
            vec![
                // X replaced by Y, Y replaced by X: a cycle.
                LegacyRow::new()
                    .with("Id", serial_x)
                    .with("Serial", "SN-X")
                    .with("ProductId", product)
                    .with("ReplacedById", serial_y),
                LegacyRow::new()
                    .with("Id", serial_y)
                    .with("Serial", "SN-Y")
                    .with("ProductId", product)
                    .with("ReplacedById", serial_x),
            ],
        )
        // The serial rows carry no test-marker column, so the joined
        // read is built without the test-row predicate.
        .with_query(
            &transactional::inspection_join_sql(false, &cfg.test_marker_column),
            vec![LegacyRow::new()
                .with("Id", Uuid::new_v4())
                .with("SerialNumberId", serial_x)
                .with("Passed", true)
                .with("PlantId", plant_a)
                .with("OperatorEmployeeNumber", "E7")],
        );

    for table in [
        "ProductionLines",
        "WorkCenters",
        "Assets",
        "ProductTypes",
        "Vendors",
        "AnnotationTypes",
        "Characteristics",
        "CharacteristicWorkCenters",
        "ControlPlans",
        "DefectCodes",
        "DefectLocations",
        "DefectWorkCenters",
        "Badges",
        "WorkOrders",
        "WeldLogs",
        "TraceabilityLogs",
        "InspectionLogs",
        "DefectLogs",
        "Annotations",
        "MaterialQueue",
        "ChangeLogs",
        "Counters",
        "Schedules",
    ] {
        reader.table_mut(table);
    }

    Fixture {
        plant_a,
        plant_b,
        gear_1,
        serial_x,
        serial_y,
        reader,
        cfg,
    }
}

#[tokio::test]
async fn test_full_run_resolves_structural_differences() {
    let f = fixture();
    let store = MemoryTarget::new();

    let log = Cutover::new(&f.reader, &store, &f.cfg).run().await.unwrap();
    assert_eq!(log.total_warnings(), 0);

    // 2 plants x 3 global gears.
    let gears: Vec<Gear> = EntityStore::<Gear>::list(&store).await.unwrap();
    assert_eq!(gears.len(), 6);
    assert!(gears.iter().all(|g| g.plant_id == f.plant_a || g.plant_id == f.plant_b));

    // Plant A's current gear points at its own scoped duplicate.
    let a: Plant = store.find(f.plant_a).await.unwrap().unwrap();
    assert_eq!(a.current_gear_id, Some(derive_scoped_id(f.gear_1, f.plant_a)));
    let b: Plant = store.find(f.plant_b).await.unwrap().unwrap();
    assert_eq!(b.current_gear_id, None);

    // The replacement cycle resolved in both directions.
    let x: SerialUnit = store.find(f.serial_x).await.unwrap().unwrap();
    let y: SerialUnit = store.find(f.serial_y).await.unwrap().unwrap();
    assert_eq!(x.replaced_by, Some(f.serial_y));
    assert_eq!(y.replaced_by, Some(f.serial_x));

    // The joined inspection row picked up plant and operator.
    let users: Vec<User> = EntityStore::<User>::list(&store).await.unwrap();
    let logs: Vec<InspectionLog> = EntityStore::<InspectionLog>::list(&store).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].plant_id, Some(f.plant_a));
    assert_eq!(logs[0].operator_id, Some(users[0].id));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let f = fixture();
    let store = MemoryTarget::new();

    let first = Cutover::new(&f.reader, &store, &f.cfg).run().await.unwrap();
    let records_after_first = store.total_records();

    let second = Cutover::new(&f.reader, &store, &f.cfg).run().await.unwrap();

    assert_eq!(store.total_records(), records_after_first);
    for (r1, r2) in first.results().iter().zip(second.results()) {
        assert_eq!(r1.table_name, r2.table_name);
        assert_eq!(r1.migrated_count, r2.migrated_count, "{}", r1.table_name);
        assert_eq!(r1.skipped_count, r2.skipped_count, "{}", r1.table_name);
    }
}

#[tokio::test]
async fn test_validation_clean_after_full_run() {
    let f = fixture();
    let store = MemoryTarget::new();

    Cutover::new(&f.reader, &store, &f.cfg).run().await.unwrap();
    let report = validate::validate(&f.reader, &store, &f.cfg).await.unwrap();

    assert!(report.is_clean());
    // The fixture has 2 serial units; both end up spot checked.
    assert_eq!(report.spot_checks.len(), 2);
    let x_check = report
        .spot_checks
        .iter()
        .find(|s| s.serial == "SN-X")
        .unwrap();
    assert_eq!(x_check.inspection_logs, 1);
}

#[tokio::test]
async fn test_report_written_and_parseable() {
    let f = fixture();
    let store = MemoryTarget::new();

    let log = Cutover::new(&f.reader, &store, &f.cfg).run().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cutover-report.json");
    log.save_report(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let results: Vec<mes_cutover::TableResult> = serde_json::from_str(&text).unwrap();
    assert_eq!(results.len(), log.results().len());
    assert!(results.iter().any(|r| r.table_name == "GlobalGears"));
}
