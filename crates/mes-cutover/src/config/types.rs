//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Legacy store configuration (MSSQL).
    pub source: SourceConfig,

    /// Target store configuration (PostgreSQL).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Legacy store (MSSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 1433).
    #[serde(default = "default_mssql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Legacy schema (default: "dbo").
    #[serde(default = "default_dbo_schema")]
    pub schema: String,

    /// Encrypt connection (default: true).
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Trust server certificate (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .finish()
    }
}

/// Target store (PostgreSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Target schema (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Exclude legacy rows flagged with an is-test marker column (default: true).
    #[serde(default = "default_true")]
    pub skip_test_rows: bool,

    /// Entities per upsert batch (default: 2000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Path for the JSON run report (default: "cutover-report.json").
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,

    /// Validator count-reconciliation tolerance as a fraction of the
    /// source count (default: 0.9). A target count at or above
    /// `tolerance * source` is OK, below is a mismatch.
    #[serde(default = "default_count_tolerance")]
    pub count_tolerance: f64,

    /// Number of serial units sampled by the validator spot check
    /// (default: 5).
    #[serde(default = "default_spot_check_samples")]
    pub spot_check_samples: usize,

    /// Name of the legacy is-test marker column (default: "IsTest").
    #[serde(default = "default_test_marker")]
    pub test_marker_column: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            skip_test_rows: true,
            batch_size: default_batch_size(),
            report_path: default_report_path(),
            count_tolerance: default_count_tolerance(),
            spot_check_samples: default_spot_check_samples(),
            test_marker_column: default_test_marker(),
        }
    }
}

// Default value functions for serde

fn default_mssql_port() -> u16 {
    1433
}

fn default_pg_port() -> u16 {
    5432
}

fn default_dbo_schema() -> String {
    "dbo".to_string()
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    2000
}

fn default_report_path() -> PathBuf {
    PathBuf::from("cutover-report.json")
}

fn default_count_tolerance() -> f64 {
    0.9
}

fn default_spot_check_samples() -> usize {
    5
}

fn default_test_marker() -> String {
    "IsTest".to_string()
}
