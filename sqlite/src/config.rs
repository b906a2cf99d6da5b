//! Driver configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! data_dir: /var/lib/myapp
//! downgrade_policy: refuse
//! foreign_keys: true
//! busy_timeout_ms: 5000
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What to do when the database is newer than the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DowngradePolicy {
    /// Treat the database as needing setup. Bootstrapping destroys its data.
    #[default]
    Reset,
    /// Fail construction with [`DatabaseNewer`](crate::DriverError::DatabaseNewer).
    Refuse,
}

/// Settings applied when opening a database.
///
/// # Examples
///
/// ```
/// use schema_driver_sqlite::{DowngradePolicy, DriverConfig};
///
/// let config = DriverConfig::default();
/// assert_eq!(config.downgrade_policy, DowngradePolicy::Reset);
/// assert!(config.foreign_keys);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Directory for databases opened by bare name. Defaults to the
    /// platform data directory.
    pub data_dir: Option<PathBuf>,
    /// Handling of databases newer than the expected version.
    pub downgrade_policy: DowngradePolicy,
    /// Enables `PRAGMA foreign_keys` on open.
    pub foreign_keys: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            downgrade_policy: DowngradePolicy::Reset,
            foreign_keys: true,
            busy_timeout_ms: None,
        }
    }
}

impl DriverConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DriverError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::DriverError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Sets [`data_dir`](Self::data_dir).
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Sets [`downgrade_policy`](Self::downgrade_policy).
    pub fn with_downgrade_policy(mut self, policy: DowngradePolicy) -> Self {
        self.downgrade_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: DriverConfig = serde_yaml::from_str("downgrade_policy: refuse\n").unwrap();
        assert_eq!(config.downgrade_policy, DowngradePolicy::Refuse);
        assert!(config.foreign_keys);
        assert_eq!(config.data_dir, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driver.yaml");
        let config = DriverConfig::default()
            .with_data_dir("/tmp/dbs")
            .with_downgrade_policy(DowngradePolicy::Refuse);
        config.save(&path).unwrap();

        assert_eq!(DriverConfig::load(&path).unwrap(), config);
    }
}
