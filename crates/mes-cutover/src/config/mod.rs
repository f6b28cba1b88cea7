//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl TargetConfig {
    /// Build a connection string for tokio-postgres.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.database, self.user, self.password
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_with_defaults() {
        let yaml = r#"
source:
  host: legacy-db
  database: mes
  user: reader
  password: secret
target:
  host: new-db
  database: mes_staging
  user: writer
  password: secret
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.source.port, 1433);
        assert_eq!(config.source.schema, "dbo");
        assert_eq!(config.target.port, 5432);
        assert!(config.migration.skip_test_rows);
        assert_eq!(config.migration.batch_size, 2000);
        assert_eq!(config.migration.count_tolerance, 0.9);
        assert_eq!(config.migration.test_marker_column, "IsTest");
    }

    #[test]
    fn test_from_yaml_missing_required() {
        let yaml = r#"
source:
  host: legacy-db
  database: mes
  user: ""
  password: secret
target:
  host: new-db
  database: mes_staging
  user: writer
  password: secret
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }
}
