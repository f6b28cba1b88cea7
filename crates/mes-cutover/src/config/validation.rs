//! Configuration validation.

use super::Config;
use crate::error::{CutoverError, Result};

/// Validate the configuration.
///
/// Failures here are fatal: the run aborts before any table is touched.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.host.is_empty() {
        return Err(CutoverError::Config("source.host is required".into()));
    }
    if config.source.database.is_empty() {
        return Err(CutoverError::Config("source.database is required".into()));
    }
    if config.source.user.is_empty() {
        return Err(CutoverError::Config("source.user is required".into()));
    }

    // Target validation
    if config.target.host.is_empty() {
        return Err(CutoverError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(CutoverError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(CutoverError::Config("target.user is required".into()));
    }

    // Cannot migrate into the legacy database
    if config.source.host == config.target.host
        && config.source.port == config.target.port
        && config.source.database == config.target.database
    {
        return Err(CutoverError::Config(
            "source and target cannot be the same database".into(),
        ));
    }

    if config.migration.batch_size == 0 {
        return Err(CutoverError::Config(
            "migration.batch_size must be at least 1".into(),
        ));
    }

    let tol = config.migration.count_tolerance;
    if !(tol > 0.0 && tol <= 1.0) {
        return Err(CutoverError::Config(format!(
            "migration.count_tolerance must be in (0, 1], got {}",
            tol
        )));
    }

    Ok(())
}
