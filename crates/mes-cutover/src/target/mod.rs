//! Target store access: entity trait and typed collection stores.

pub mod memory;
pub mod postgres;

pub use memory::MemoryTarget;
pub use postgres::PgTarget;

use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// A typed target-store record.
///
/// Every target entity names its collection and exposes the value that
/// is its primary identifier. Identifiers are either carried over from
/// the legacy row or derived deterministically, never generated fresh,
/// which is what makes re-runs converge.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Target collection (table) name.
    const COLLECTION: &'static str;

    /// Primary identifier.
    fn id(&self) -> Uuid;
}

/// Typed operations over one target collection.
///
/// `save_all` is the upsert primitive: every entity is placed by
/// primary identifier, fully overwriting any existing record (not a
/// partial merge), and one call persists together. Calling it twice
/// with identical input produces no net change the second time.
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    /// Find a record by primary identifier.
    async fn find(&self, id: Uuid) -> Result<Option<E>>;

    /// Insert-or-fully-overwrite each entity, keyed by `Entity::id`.
    async fn save_all(&self, entities: &[E]) -> Result<()>;

    /// Count records in the collection.
    async fn count(&self) -> Result<i64>;

    /// Read the whole collection (lookup prebuilds, validation scans).
    async fn list(&self) -> Result<Vec<E>>;
}

/// Blanket bound over every collection the cutover writes.
///
/// The orchestrator, phases and validator are generic over this so any
/// store that can hold all collections (in-memory, jsonb staging, a
/// typed writer) plugs in unchanged.
pub trait TargetStore:
    EntityStore<crate::model::Plant>
    + EntityStore<crate::model::Gear>
    + EntityStore<crate::model::ProductionLine>
    + EntityStore<crate::model::WorkCenter>
    + EntityStore<crate::model::LineAssignment>
    + EntityStore<crate::model::Asset>
    + EntityStore<crate::model::ProductType>
    + EntityStore<crate::model::Product>
    + EntityStore<crate::model::User>
    + EntityStore<crate::model::Vendor>
    + EntityStore<crate::model::AnnotationType>
    + EntityStore<crate::model::Characteristic>
    + EntityStore<crate::model::CharacteristicLink>
    + EntityStore<crate::model::ControlPlan>
    + EntityStore<crate::model::DefectCode>
    + EntityStore<crate::model::DefectLocation>
    + EntityStore<crate::model::DefectLink>
    + EntityStore<crate::model::Badge>
    + EntityStore<crate::model::SerialUnit>
    + EntityStore<crate::model::WorkOrder>
    + EntityStore<crate::model::WeldLog>
    + EntityStore<crate::model::TraceLog>
    + EntityStore<crate::model::InspectionLog>
    + EntityStore<crate::model::DefectLog>
    + EntityStore<crate::model::Annotation>
    + EntityStore<crate::model::MaterialQueueItem>
    + EntityStore<crate::model::ChangeLog>
    + EntityStore<crate::model::Counter>
    + EntityStore<crate::model::Schedule>
    + Send
    + Sync
{
}

impl<T> TargetStore for T where
    T: EntityStore<crate::model::Plant>
        + EntityStore<crate::model::Gear>
        + EntityStore<crate::model::ProductionLine>
        + EntityStore<crate::model::WorkCenter>
        + EntityStore<crate::model::LineAssignment>
        + EntityStore<crate::model::Asset>
        + EntityStore<crate::model::ProductType>
        + EntityStore<crate::model::Product>
        + EntityStore<crate::model::User>
        + EntityStore<crate::model::Vendor>
        + EntityStore<crate::model::AnnotationType>
        + EntityStore<crate::model::Characteristic>
        + EntityStore<crate::model::CharacteristicLink>
        + EntityStore<crate::model::ControlPlan>
        + EntityStore<crate::model::DefectCode>
        + EntityStore<crate::model::DefectLocation>
        + EntityStore<crate::model::DefectLink>
        + EntityStore<crate::model::Badge>
        + EntityStore<crate::model::SerialUnit>
        + EntityStore<crate::model::WorkOrder>
        + EntityStore<crate::model::WeldLog>
        + EntityStore<crate::model::TraceLog>
        + EntityStore<crate::model::InspectionLog>
        + EntityStore<crate::model::DefectLog>
        + EntityStore<crate::model::Annotation>
        + EntityStore<crate::model::MaterialQueueItem>
        + EntityStore<crate::model::ChangeLog>
        + EntityStore<crate::model::Counter>
        + EntityStore<crate::model::Schedule>
        + Send
        + Sync
{
}
