//! Per-table run accumulators and the run-level migration log.
//!
//! A [`TableRun`] is owned by exactly one table phase while it runs,
//! then sealed into an immutable [`TableResult`]. The [`MigrationLog`]
//! only ever holds sealed results, so there is no "active table" state
//! to get out of sync.

use crate::error::{CutoverError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::warn;

/// Mutable accumulator for one table phase.
#[derive(Debug)]
pub struct TableRun {
    table_name: String,
    source_count: i64,
    migrated_count: i64,
    skipped_count: i64,
    warnings: Vec<String>,
    started: Instant,
}

impl TableRun {
    pub fn begin(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            source_count: 0,
            migrated_count: 0,
            skipped_count: 0,
            warnings: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn set_source_count(&mut self, count: i64) {
        self.source_count = count;
    }

    pub fn add_migrated(&mut self, count: i64) {
        self.migrated_count += count;
    }

    pub fn add_skipped(&mut self, count: i64) {
        self.skipped_count += count;
    }

    pub fn migrated_count(&self) -> i64 {
        self.migrated_count
    }

    /// Record a row-level warning and keep going.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(table = %self.table_name, "{}", message);
        self.warnings.push(message);
    }

    /// Seal into an immutable result.
    pub fn finish(self) -> TableResult {
        TableResult {
            table_name: self.table_name,
            source_count: self.source_count,
            migrated_count: self.migrated_count,
            skipped_count: self.skipped_count,
            warnings: self.warnings,
            duration_seconds: self.started.elapsed().as_secs_f64(),
        }
    }
}

/// The sealed outcome of one table phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResult {
    pub table_name: String,
    pub source_count: i64,
    pub migrated_count: i64,
    pub skipped_count: i64,
    pub warnings: Vec<String>,
    pub duration_seconds: f64,
}

/// Run-level collection of sealed table results.
#[derive(Debug, Default)]
pub struct MigrationLog {
    results: Vec<TableResult>,
}

impl MigrationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: TableResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[TableResult] {
        &self.results
    }

    pub fn total_warnings(&self) -> usize {
        self.results.iter().map(|r| r.warnings.len()).sum()
    }

    /// Render the console summary: one row per table plus totals.
    pub fn print_summary(&self) {
        println!("\n{}", self.format_summary());
    }

    pub fn format_summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<28} {:>10} {:>10} {:>9} {:>9} {:>9}\n",
            "Table", "Source", "Migrated", "Skipped", "Warnings", "Secs"
        ));
        out.push_str(&"-".repeat(80));
        out.push('\n');

        let mut totals = (0i64, 0i64, 0i64, 0usize);
        for r in &self.results {
            out.push_str(&format!(
                "{:<28} {:>10} {:>10} {:>9} {:>9} {:>9.2}\n",
                r.table_name,
                r.source_count,
                r.migrated_count,
                r.skipped_count,
                r.warnings.len(),
                r.duration_seconds
            ));
            totals.0 += r.source_count;
            totals.1 += r.migrated_count;
            totals.2 += r.skipped_count;
            totals.3 += r.warnings.len();
        }

        out.push_str(&"-".repeat(80));
        out.push('\n');
        out.push_str(&format!(
            "{:<28} {:>10} {:>10} {:>9} {:>9}\n",
            "TOTAL", totals.0, totals.1, totals.2, totals.3
        ));
        out
    }

    /// Write the full result list (warnings included) as JSON.
    ///
    /// Written to a sibling temp file and renamed, so a crash mid-write
    /// never leaves a truncated report behind.
    pub fn save_report(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.results)?;

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path).map_err(|e| {
            CutoverError::Report(format!("renaming {} into place: {}", tmp.display(), e))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(name: &str, migrated: i64) -> TableResult {
        let mut run = TableRun::begin(name);
        run.set_source_count(migrated + 1);
        run.add_migrated(migrated);
        run.add_skipped(1);
        run.warn("row 42: bad data");
        run.finish()
    }

    #[test]
    fn test_run_seals_into_result() {
        let result = sample_result("Plants", 9);
        assert_eq!(result.table_name, "Plants");
        assert_eq!(result.source_count, 10);
        assert_eq!(result.migrated_count, 9);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_summary_includes_totals() {
        let mut log = MigrationLog::new();
        log.record(sample_result("Plants", 2));
        log.record(sample_result("Users", 3));

        let summary = log.format_summary();
        assert!(summary.contains("Plants"));
        assert!(summary.contains("TOTAL"));
        // 2 + 3 migrated
        assert!(summary.lines().last().is_some());
        assert_eq!(log.total_warnings(), 2);
    }

    #[test]
    fn test_report_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut log = MigrationLog::new();
        log.record(sample_result("Plants", 2));
        log.save_report(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: Vec<TableResult> = serde_json::from_str(&text).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].table_name, "Plants");
        assert!(text.contains("\"tableName\""));
        assert!(text.contains("\"sourceCount\""));
    }
}
