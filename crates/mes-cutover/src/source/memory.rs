//! In-memory legacy reader for tests and dry rehearsals.

use super::{LegacyReader, LegacyRow, RowFilter};
use crate::error::{CutoverError, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// A legacy store backed by fixture rows.
///
/// Plain table reads evaluate `RowFilter` in-process. Raw queries
/// (joins) cannot be interpreted, so tests register canned results
/// keyed by the exact SQL text.
#[derive(Debug, Default)]
pub struct MemoryLegacy {
    tables: HashMap<String, Vec<LegacyRow>>,
    canned_queries: HashMap<String, Vec<LegacyRow>>,
}

impl MemoryLegacy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fixture table.
    pub fn with_table(mut self, name: &str, rows: Vec<LegacyRow>) -> Self {
        self.tables.insert(name.to_string(), rows);
        self
    }

    /// Register a canned result for a raw query.
    pub fn with_query(mut self, sql: &str, rows: Vec<LegacyRow>) -> Self {
        self.canned_queries.insert(sql.to_string(), rows);
        self
    }

    /// Mutable access for tests that evolve fixtures between runs.
    pub fn table_mut(&mut self, name: &str) -> &mut Vec<LegacyRow> {
        self.tables.entry(name.to_string()).or_default()
    }

    fn rows(&self, table: &str) -> Result<&[LegacyRow]> {
        self.tables
            .get(table)
            .map(Vec::as_slice)
            .ok_or_else(|| CutoverError::Config(format!("unknown legacy table: {}", table)))
    }
}

#[async_trait]
impl LegacyReader for MemoryLegacy {
    async fn count(&self, table: &str, filter: Option<&RowFilter>) -> Result<i64> {
        let rows = self.rows(table)?;
        let n = match filter {
            Some(f) => rows.iter().filter(|r| f.matches(r)).count(),
            None => rows.len(),
        };
        Ok(n as i64)
    }

    async fn read_table(&self, table: &str, filter: Option<&RowFilter>) -> Result<Vec<LegacyRow>> {
        let rows = self.rows(table)?;
        Ok(match filter {
            Some(f) => rows.iter().filter(|r| f.matches(r)).cloned().collect(),
            None => rows.to_vec(),
        })
    }

    async fn raw_query(&self, sql: &str) -> Result<Vec<LegacyRow>> {
        self.canned_queries.get(sql).cloned().ok_or_else(|| {
            CutoverError::Config(format!("no canned result registered for query: {}", sql))
        })
    }

    async fn scalar_i64(&self, sql: &str) -> Result<Option<i64>> {
        Err(CutoverError::Config(format!(
            "in-memory reader cannot evaluate scalar SQL: {}",
            sql
        )))
    }

    async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let rows = self.rows(table)?;
        Ok(rows.iter().any(|r| r.has_column(column)))
    }
}
