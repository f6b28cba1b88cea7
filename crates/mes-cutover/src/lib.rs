//! Legacy-to-target schema cutover engine for the manufacturing
//! execution system.
//!
//! A one-time, operator-driven batch migration: every table of the
//! legacy MSSQL schema is read, mapped, and upserted into the
//! redesigned target schema, resolving the structural differences the
//! two schemas disagree on (the plant/gear circular reference, global
//! gears that become per-plant, self-referencing serial replacement
//! chains, and derived line memberships). All writes are idempotent
//! upserts keyed by stable or deterministically derived identifiers,
//! so a killed run can simply be restarted.
//!
//! ```no_run
//! use mes_cutover::config::Config;
//! use mes_cutover::phases::Cutover;
//! use mes_cutover::source::MssqlLegacy;
//! use mes_cutover::target::PgTarget;
//!
//! # async fn run() -> mes_cutover::error::Result<()> {
//! let config = Config::load(std::path::Path::new("cutover.yaml"))?;
//! let reader = MssqlLegacy::connect(&config.source).await?;
//! let store = PgTarget::connect(&config.target).await?;
//! store.ensure_collections(mes_cutover::model::COLLECTIONS).await?;
//!
//! let log = Cutover::new(&reader, &store, &config.migration).run().await?;
//! log.print_summary();
//! log.save_report(&config.migration.report_path)?;
//!
//! let report = mes_cutover::validate::validate(&reader, &store, &config.migration).await?;
//! report.print();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod mappers;
pub mod model;
pub mod phases;
pub mod source;
pub mod target;
pub mod validate;

pub use config::Config;
pub use engine::{MigrationLog, TableResult};
pub use error::{CutoverError, Result};
pub use phases::Cutover;
pub use validate::ValidationReport;
