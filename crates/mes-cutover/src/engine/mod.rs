//! Migration engine primitives: batching, per-table runs, the generic
//! table migrator, deferred cross-reference resolution, and
//! deterministic identifier derivation. The phase routines compose
//! these; nothing here knows about specific tables.

pub mod batch;
pub mod deferred;
pub mod ident;
pub mod log;
pub mod table;

pub use batch::Batcher;
pub use deferred::PendingRefs;
pub use ident::derive_scoped_id;
pub use log::{MigrationLog, TableResult, TableRun};
pub use table::{effective_filter, map_rows, migrate_table};
