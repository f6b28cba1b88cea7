//! Legacy store access: dynamic rows, filters, and the reader trait.

pub mod memory;
pub mod mssql;
mod row;
mod value;

pub use memory::MemoryLegacy;
pub use mssql::MssqlLegacy;
pub use row::{LegacyRow, RowFilter};
pub use value::SqlValue;

use crate::error::Result;
use async_trait::async_trait;

/// Read-only access to the legacy store.
///
/// The engine consumes the legacy database entirely through this trait:
/// plain table reads with optional filters, raw joined queries for the
/// transactional tables that need them, and just enough introspection
/// to detect the is-test marker column.
#[async_trait]
pub trait LegacyReader: Send + Sync {
    /// Count rows in a table matching an optional filter.
    async fn count(&self, table: &str, filter: Option<&RowFilter>) -> Result<i64>;

    /// Read all rows of a table matching an optional filter.
    async fn read_table(&self, table: &str, filter: Option<&RowFilter>) -> Result<Vec<LegacyRow>>;

    /// Execute a raw query (joined reads) and return dynamic rows.
    async fn raw_query(&self, sql: &str) -> Result<Vec<LegacyRow>>;

    /// Execute a query returning a single integer scalar.
    ///
    /// Used for schema introspection; `None` when the query returns no
    /// rows or a NULL.
    async fn scalar_i64(&self, sql: &str) -> Result<Option<i64>>;

    /// Whether a table carries the named column.
    async fn has_column(&self, table: &str, column: &str) -> Result<bool>;
}
