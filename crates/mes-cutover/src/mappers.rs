//! Per-table mapping functions from legacy rows to target entities.
//!
//! Each mapper is a pure transform over one row: `Ok(Some(_))` maps,
//! `Ok(None)` skips the row (expected, e.g. soft-deleted or blank
//! data), `Err(_)` marks it malformed. Row errors are caught by the
//! table migrator and recorded as warnings; they never abort a table.
//!
//! Mappers that need lookups into already-migrated data (operator by
//! employee number, plant-scoped gears) are built as closures in the
//! phase routines instead; this module holds only the stateless ones
//! plus the shared column helpers those closures use.

use crate::model::*;
use crate::source::LegacyRow;
use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

/// A row-level mapping fault. Recorded as a table warning tagged with
/// the row's legacy identifier, never escalated to a run failure.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RowError(pub String);

impl RowError {
    pub fn new(message: impl Into<String>) -> Self {
        RowError(message.into())
    }
}

pub type MapResult<E> = std::result::Result<Option<E>, RowError>;

/// Read a column that must hold a uuid.
pub fn required_uuid(row: &LegacyRow, column: &str) -> Result<Uuid, RowError> {
    row.get_uuid(column)
        .ok_or_else(|| RowError::new(format!("missing or non-uuid column {}", column)))
}

/// Read a column that must hold non-blank text.
pub fn required_str(row: &LegacyRow, column: &str) -> Result<String, RowError> {
    match row.get_str(column) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(RowError::new(format!("missing or blank column {}", column))),
    }
}

fn opt_str(row: &LegacyRow, column: &str) -> Option<String> {
    row.get_str(column)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn opt_datetime(row: &LegacyRow, column: &str) -> Option<NaiveDateTime> {
    row.get_datetime(column)
}

/// Plants, pass 1: the current-gear reference is forced to null here
/// and filled in by the back-reference pass once scoped gears exist.
pub fn map_plant(row: &LegacyRow) -> MapResult<Plant> {
    Ok(Some(Plant {
        id: required_uuid(row, "Id")?,
        name: required_str(row, "Name")?,
        code: required_str(row, "Code")?,
        current_gear_id: None,
    }))
}

pub fn map_production_line(row: &LegacyRow) -> MapResult<ProductionLine> {
    Ok(Some(ProductionLine {
        id: required_uuid(row, "Id")?,
        plant_id: row.get_uuid("PlantId"),
        name: required_str(row, "Name")?,
    }))
}

pub fn map_work_center(row: &LegacyRow) -> MapResult<WorkCenter> {
    Ok(Some(WorkCenter {
        id: required_uuid(row, "Id")?,
        name: required_str(row, "Name")?,
        code: required_str(row, "Code")?,
    }))
}

pub fn map_asset(row: &LegacyRow) -> MapResult<Asset> {
    Ok(Some(Asset {
        id: required_uuid(row, "Id")?,
        plant_id: row.get_uuid("PlantId"),
        name: required_str(row, "Name")?,
        serial: opt_str(row, "SerialNumber"),
    }))
}

pub fn map_product_type(row: &LegacyRow) -> MapResult<ProductType> {
    Ok(Some(ProductType {
        id: required_uuid(row, "Id")?,
        name: required_str(row, "Name")?,
    }))
}

/// Products without a number are placeholders in the legacy store and
/// are skipped, not flagged.
pub fn map_product(row: &LegacyRow) -> MapResult<Product> {
    let Some(number) = opt_str(row, "ProductNumber") else {
        return Ok(None);
    };
    Ok(Some(Product {
        id: required_uuid(row, "Id")?,
        product_type_id: row.get_uuid("ProductTypeId"),
        number,
        name: required_str(row, "Name")?,
    }))
}

/// Users without an employee number cannot be resolved by any later
/// phase, so they are skipped.
pub fn map_user(row: &LegacyRow) -> MapResult<User> {
    let Some(employee_number) = opt_str(row, "EmployeeNumber") else {
        return Ok(None);
    };
    Ok(Some(User {
        id: required_uuid(row, "Id")?,
        employee_number,
        name: required_str(row, "Name")?,
        badge_code: opt_str(row, "BadgeCode"),
    }))
}

pub fn map_vendor(row: &LegacyRow) -> MapResult<Vendor> {
    Ok(Some(Vendor {
        id: required_uuid(row, "Id")?,
        name: required_str(row, "Name")?,
    }))
}

pub fn map_annotation_type(row: &LegacyRow) -> MapResult<AnnotationType> {
    Ok(Some(AnnotationType {
        id: required_uuid(row, "Id")?,
        name: required_str(row, "Name")?,
    }))
}

pub fn map_characteristic(row: &LegacyRow) -> MapResult<Characteristic> {
    Ok(Some(Characteristic {
        id: required_uuid(row, "Id")?,
        name: required_str(row, "Name")?,
        nominal: row.get_decimal("Nominal"),
    }))
}

pub fn map_characteristic_link(row: &LegacyRow) -> MapResult<CharacteristicLink> {
    Ok(Some(CharacteristicLink {
        id: required_uuid(row, "Id")?,
        characteristic_id: required_uuid(row, "CharacteristicId")?,
        work_center_id: required_uuid(row, "WorkCenterId")?,
    }))
}

pub fn map_control_plan(row: &LegacyRow) -> MapResult<ControlPlan> {
    Ok(Some(ControlPlan {
        id: required_uuid(row, "Id")?,
        product_id: row.get_uuid("ProductId"),
        name: required_str(row, "Name")?,
    }))
}

pub fn map_defect_code(row: &LegacyRow) -> MapResult<DefectCode> {
    Ok(Some(DefectCode {
        id: required_uuid(row, "Id")?,
        code: required_str(row, "Code")?,
        description: opt_str(row, "Description").unwrap_or_default(),
    }))
}

pub fn map_defect_location(row: &LegacyRow) -> MapResult<DefectLocation> {
    Ok(Some(DefectLocation {
        id: required_uuid(row, "Id")?,
        name: required_str(row, "Name")?,
    }))
}

pub fn map_defect_link(row: &LegacyRow) -> MapResult<DefectLink> {
    Ok(Some(DefectLink {
        id: required_uuid(row, "Id")?,
        defect_code_id: required_uuid(row, "DefectCodeId")?,
        work_center_id: required_uuid(row, "WorkCenterId")?,
    }))
}

pub fn map_work_order(row: &LegacyRow) -> MapResult<WorkOrder> {
    Ok(Some(WorkOrder {
        id: required_uuid(row, "Id")?,
        plant_id: row.get_uuid("PlantId"),
        number: required_str(row, "OrderNumber")?,
        product_id: row.get_uuid("ProductId"),
    }))
}

pub fn map_trace_log(row: &LegacyRow) -> MapResult<TraceLog> {
    Ok(Some(TraceLog {
        id: required_uuid(row, "Id")?,
        serial_unit_id: row.get_uuid("SerialNumberId"),
        material_lot: required_str(row, "MaterialLot")?,
        logged_at: opt_datetime(row, "LoggedAt"),
    }))
}

pub fn map_defect_log(row: &LegacyRow) -> MapResult<DefectLog> {
    Ok(Some(DefectLog {
        id: required_uuid(row, "Id")?,
        serial_unit_id: row.get_uuid("SerialNumberId"),
        defect_code_id: row.get_uuid("DefectCodeId"),
        location_id: row.get_uuid("DefectLocationId"),
        logged_at: opt_datetime(row, "LoggedAt"),
    }))
}

/// Annotations with empty text carry no information; skipped.
pub fn map_annotation(row: &LegacyRow) -> MapResult<Annotation> {
    let Some(text) = opt_str(row, "Text") else {
        return Ok(None);
    };
    Ok(Some(Annotation {
        id: required_uuid(row, "Id")?,
        annotation_type_id: row.get_uuid("AnnotationTypeId"),
        serial_unit_id: row.get_uuid("SerialNumberId"),
        text,
        created_at: opt_datetime(row, "CreatedAt"),
    }))
}

pub fn map_material_queue_item(row: &LegacyRow) -> MapResult<MaterialQueueItem> {
    Ok(Some(MaterialQueueItem {
        id: required_uuid(row, "Id")?,
        work_center_id: row.get_uuid("WorkCenterId"),
        material_lot: required_str(row, "MaterialLot")?,
        position: row.get_i32("Position").unwrap_or(0),
    }))
}

pub fn map_change_log(row: &LegacyRow) -> MapResult<ChangeLog> {
    Ok(Some(ChangeLog {
        id: required_uuid(row, "Id")?,
        entity_name: required_str(row, "EntityName")?,
        entity_id: row.get_uuid("EntityId"),
        change: opt_str(row, "Change").unwrap_or_default(),
        changed_at: opt_datetime(row, "ChangedAt"),
    }))
}

pub fn map_counter(row: &LegacyRow) -> MapResult<Counter> {
    Ok(Some(Counter {
        id: required_uuid(row, "Id")?,
        work_center_id: row.get_uuid("WorkCenterId"),
        name: required_str(row, "Name")?,
        value: row.get_i64("Value").unwrap_or(0),
    }))
}

pub fn map_schedule(row: &LegacyRow) -> MapResult<Schedule> {
    Ok(Some(Schedule {
        id: required_uuid(row, "Id")?,
        line_id: row.get_uuid("ProductionLineId"),
        work_order_id: row.get_uuid("WorkOrderId"),
        starts_at: opt_datetime(row, "StartsAt"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SqlValue;

    #[test]
    fn test_map_plant_nulls_current_gear() {
        let row = LegacyRow::new()
            .with("Id", Uuid::new_v4())
            .with("Name", "Augsburg")
            .with("Code", "AUG")
            .with("CurrentGearId", Uuid::new_v4());

        let plant = map_plant(&row).unwrap().unwrap();
        assert_eq!(plant.name, "Augsburg");
        assert_eq!(plant.current_gear_id, None);
    }

    #[test]
    fn test_missing_required_column_is_row_error() {
        let row = LegacyRow::new().with("Name", "no id");
        let err = map_vendor(&row).unwrap_err();
        assert!(err.to_string().contains("Id"));
    }

    #[test]
    fn test_blank_employee_number_skips_user() {
        let row = LegacyRow::new()
            .with("Id", Uuid::new_v4())
            .with("EmployeeNumber", "  ")
            .with("Name", "Nobody");
        assert!(map_user(&row).unwrap().is_none());
    }

    #[test]
    fn test_placeholder_product_skips() {
        let row = LegacyRow::new()
            .with("Id", Uuid::new_v4())
            .with("ProductNumber", SqlValue::Null)
            .with("Name", "draft");
        assert!(map_product(&row).unwrap().is_none());
    }

    #[test]
    fn test_counter_defaults_value() {
        let row = LegacyRow::new()
            .with("Id", Uuid::new_v4())
            .with("Name", "welds");
        assert_eq!(map_counter(&row).unwrap().unwrap().value, 0);
    }
}
