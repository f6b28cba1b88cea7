//! Target-schema entities.
//!
//! Field mapping from legacy rows into these structs lives in
//! [`crate::mappers`]; the engine only relies on [`Entity::id`] and the
//! collection names.

use crate::target::Entity;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity {
    ($ty:ty, $collection:literal) => {
        impl Entity for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> Uuid {
                self.id
            }
        }
    };
}

/// Every collection the cutover writes, in phase order. Used to
/// prepare the target store before the run.
pub const COLLECTIONS: &[&str] = &[
    "plants",
    "gears",
    "production_lines",
    "work_centers",
    "line_assignments",
    "assets",
    "product_types",
    "products",
    "users",
    "vendors",
    "annotation_types",
    "characteristics",
    "characteristic_links",
    "control_plans",
    "defect_codes",
    "defect_locations",
    "defect_links",
    "badges",
    "serial_units",
    "work_orders",
    "weld_logs",
    "trace_logs",
    "inspection_logs",
    "defect_logs",
    "annotations",
    "material_queue",
    "change_logs",
    "counters",
    "schedules",
];

// ===== Reference / configuration data =====

/// A manufacturing site. Top-level scope for everything below it.
///
/// `current_gear_id` points at a plant-scoped [`Gear`]; the legacy
/// schema stores a global gear reference here, which is resolved in the
/// plant back-reference pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub current_gear_id: Option<Uuid>,
}
entity!(Plant, "plants");

/// A plant-scoped gear configuration.
///
/// Legacy gears are global; the target schema requires one per plant,
/// so `id` is derived from (legacy gear id, plant id) and `global_id`
/// keeps the lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gear {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub global_id: Uuid,
    pub name: String,
    pub level: i32,
}
entity!(Gear, "gears");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionLine {
    pub id: Uuid,
    pub plant_id: Option<Uuid>,
    pub name: String,
}
entity!(ProductionLine, "production_lines");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCenter {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}
entity!(WorkCenter, "work_centers");

/// Work-center membership in a production line.
///
/// Not explicit in any legacy row; synthesized from the line column on
/// legacy work-center rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAssignment {
    pub id: Uuid,
    pub work_center_id: Uuid,
    pub line_id: Uuid,
}
entity!(LineAssignment, "line_assignments");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub plant_id: Option<Uuid>,
    pub name: String,
    pub serial: Option<String>,
}
entity!(Asset, "assets");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: Uuid,
    pub name: String,
}
entity!(ProductType, "product_types");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub product_type_id: Option<Uuid>,
    pub number: String,
    pub name: String,
}
entity!(Product, "products");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub employee_number: String,
    pub name: String,
    pub badge_code: Option<String>,
}
entity!(User, "users");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
}
entity!(Vendor, "vendors");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationType {
    pub id: Uuid,
    pub name: String,
}
entity!(AnnotationType, "annotation_types");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Characteristic {
    pub id: Uuid,
    pub name: String,
    pub nominal: Option<Decimal>,
}
entity!(Characteristic, "characteristics");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicLink {
    pub id: Uuid,
    pub characteristic_id: Uuid,
    pub work_center_id: Uuid,
}
entity!(CharacteristicLink, "characteristic_links");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPlan {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
}
entity!(ControlPlan, "control_plans");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectCode {
    pub id: Uuid,
    pub code: String,
    pub description: String,
}
entity!(DefectCode, "defect_codes");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectLocation {
    pub id: Uuid,
    pub name: String,
}
entity!(DefectLocation, "defect_locations");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectLink {
    pub id: Uuid,
    pub defect_code_id: Uuid,
    pub work_center_id: Uuid,
}
entity!(DefectLink, "defect_links");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: Uuid,
    pub card_number: String,
    pub user_id: Option<Uuid>,
}
entity!(Badge, "badges");

// ===== Transactional data =====

/// A serialized unit moving through production.
///
/// `replaced_by` is a self-reference resolved in a second pass, since
/// the successor may appear later in legacy insertion order (or form a
/// cycle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialUnit {
    pub id: Uuid,
    pub serial: String,
    pub product_id: Option<Uuid>,
    pub replaced_by: Option<Uuid>,
}
entity!(SerialUnit, "serial_units");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: Uuid,
    pub plant_id: Option<Uuid>,
    pub number: String,
    pub product_id: Option<Uuid>,
}
entity!(WorkOrder, "work_orders");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeldLog {
    pub id: Uuid,
    pub serial_unit_id: Option<Uuid>,
    pub work_center_id: Option<Uuid>,
    pub operator_id: Option<Uuid>,
    pub logged_at: Option<NaiveDateTime>,
}
entity!(WeldLog, "weld_logs");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceLog {
    pub id: Uuid,
    pub serial_unit_id: Option<Uuid>,
    pub material_lot: String,
    pub logged_at: Option<NaiveDateTime>,
}
entity!(TraceLog, "trace_logs");

/// An inspection record. Built from a joined legacy read: the legacy
/// table lacks plant and operator, which come from the parent serial
/// row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionLog {
    pub id: Uuid,
    pub serial_unit_id: Option<Uuid>,
    pub plant_id: Option<Uuid>,
    pub operator_id: Option<Uuid>,
    pub passed: bool,
    pub logged_at: Option<NaiveDateTime>,
}
entity!(InspectionLog, "inspection_logs");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectLog {
    pub id: Uuid,
    pub serial_unit_id: Option<Uuid>,
    pub defect_code_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub logged_at: Option<NaiveDateTime>,
}
entity!(DefectLog, "defect_logs");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    pub annotation_type_id: Option<Uuid>,
    pub serial_unit_id: Option<Uuid>,
    pub text: String,
    pub created_at: Option<NaiveDateTime>,
}
entity!(Annotation, "annotations");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialQueueItem {
    pub id: Uuid,
    pub work_center_id: Option<Uuid>,
    pub material_lot: String,
    pub position: i32,
}
entity!(MaterialQueueItem, "material_queue");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLog {
    pub id: Uuid,
    pub entity_name: String,
    pub entity_id: Option<Uuid>,
    pub change: String,
    pub changed_at: Option<NaiveDateTime>,
}
entity!(ChangeLog, "change_logs");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub id: Uuid,
    pub work_center_id: Option<Uuid>,
    pub name: String,
    pub value: i64,
}
entity!(Counter, "counters");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub line_id: Option<Uuid>,
    pub work_order_id: Option<Uuid>,
    pub starts_at: Option<NaiveDateTime>,
}
entity!(Schedule, "schedules");
