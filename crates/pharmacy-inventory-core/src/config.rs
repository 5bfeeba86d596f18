//! Configuration for the pharmacy inventory engine.
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. An optional `config/inventory.toml` (or an explicit file)
//! 3. Environment variable overrides with PHARMACY_ prefix
//!    (e.g. `PHARMACY__INVENTORY__NEAR_EXPIRY_DAYS=45`)

use std::path::Path;

use config::{ConfigError, Environment, File, Map};
use serde::Deserialize;

/// Main configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InventoryConfig {
    /// Storage configuration
    pub database: DatabaseConfig,

    /// Engine behaviour
    pub inventory: InventorySettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InventorySettings {
    /// Days before expiry at which a batch is flagged near expiry
    pub near_expiry_days: i64,

    /// Recorded as `performed_by` when the caller names no operator
    pub default_operator: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when RUST_LOG is unset
    pub filter: String,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            near_expiry_days: crate::status::NEAR_EXPIRY_WINDOW_DAYS,
            default_operator: "system".to_string(),
        }
    }
}

impl InventoryConfig {
    /// Load configuration from `config/inventory` and environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(None, None)
    }

    /// Load configuration from an explicit file, then environment variables.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::build(Some(path), None)
    }

    /// `env` replaces the process environment when given.
    fn build(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let defaults = InventorySettings::default();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("config/inventory").required(false),
        };

        let config = config::Config::builder()
            // Start with default values
            .set_default("database.path", "pharmacy_inventory.db")?
            .set_default("inventory.near_expiry_days", defaults.near_expiry_days)?
            .set_default("inventory.default_operator", defaults.default_operator)?
            .set_default("logging.filter", "info")?
            .add_source(file)
            // Override with environment variables (PHARMACY prefix)
            .add_source(
                Environment::with_prefix("PHARMACY")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.inventory.near_expiry_days < 0 {
            return Err(ConfigError::Message(
                "inventory.near_expiry_days must not be negative".into(),
            ));
        }
        if self.inventory.default_operator.trim().is_empty() {
            return Err(ConfigError::Message(
                "inventory.default_operator must not be empty".into(),
            ));
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::Message("database.path must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_fill_missing_keys() {
        let file = write_config("[database]\npath = \"/tmp/pharmacy.db\"\n");
        let config = InventoryConfig::load_from(file.path()).unwrap();

        assert_eq!(config.database.path, "/tmp/pharmacy.db");
        assert_eq!(config.inventory, InventorySettings::default());
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"
            [inventory]
            near_expiry_days = 45
            default_operator = "Pharmacist on duty"

            [logging]
            filter = "pharmacy_inventory_core=debug"
            "#,
        );
        let config = InventoryConfig::load_from(file.path()).unwrap();

        assert_eq!(config.inventory.near_expiry_days, 45);
        assert_eq!(config.inventory.default_operator, "Pharmacist on duty");
        assert_eq!(config.logging.filter, "pharmacy_inventory_core=debug");
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config("[inventory]\nnear_expiry_days = 45\n");
        let env = Map::from([
            ("PHARMACY__INVENTORY__NEAR_EXPIRY_DAYS".to_string(), "60".to_string()),
            ("PHARMACY__DATABASE__PATH".to_string(), "/var/lib/pharmacy.db".to_string()),
            ("OTHER__INVENTORY__NEAR_EXPIRY_DAYS".to_string(), "7".to_string()),
        ]);
        let config = InventoryConfig::build(Some(file.path()), Some(env)).unwrap();

        assert_eq!(config.inventory.near_expiry_days, 60);
        assert_eq!(config.database.path, "/var/lib/pharmacy.db");
        assert_eq!(config.inventory.default_operator, "system");
    }

    #[test]
    fn test_invalid_environment_value_rejected() {
        let env = Map::from([(
            "PHARMACY__INVENTORY__NEAR_EXPIRY_DAYS".to_string(),
            "-5".to_string(),
        )]);
        assert!(InventoryConfig::build(None, Some(env)).is_err());
    }

    #[test]
    fn test_negative_window_rejected() {
        let file = write_config("[inventory]\nnear_expiry_days = -1\n");
        assert!(InventoryConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(InventoryConfig::load_from(&dir.path().join("absent.toml")).is_err());
    }
}
