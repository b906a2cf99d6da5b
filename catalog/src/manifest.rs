//! Catalog manifest: which SQL files make up a schema and its migrations.
//!
//! A manifest is a small YAML document that lives next to the SQL files it
//! names. Paths are relative to the manifest's directory.
//!
//! ```yaml
//! version: 3
//! schema: schema.sql
//! schema_checksum: 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//! migrations:
//!   - from: 1
//!     to: 2
//!     file: migrations/0001_add_done.sql
//!   - from: 2
//!     to: 3
//!     file: migrations/0002_add_tags.sql
//! ```
//!
//! Checksums are optional. When present they are SHA-256 hex digests of the
//! file contents and are verified when the catalog is loaded, so an edited
//! migration that was already shipped is caught before it runs.
//!
//! # Examples
//!
//! ```no_run
//! use schema_driver_catalog::{CatalogManifest, MigrationEntry};
//!
//! let mut manifest = CatalogManifest::new(2, "schema.sql");
//! manifest.migrations.push(MigrationEntry::new(1, 2, "migrations/0001.sql"));
//!
//! // Pin the current file contents, then save.
//! manifest.record_checksums("db/").unwrap();
//! manifest.save("db/catalog.yaml").unwrap();
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use schema_driver_core::SchemaVersion;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CatalogError, Result};

/// File name [`SchemaCatalog::from_dir`](crate::SchemaCatalog::from_dir)
/// looks for.
pub const MANIFEST_FILE: &str = "catalog.yaml";

/// One migration step in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationEntry {
    /// Version the step starts from.
    pub from: SchemaVersion,
    /// Version the step produces.
    pub to: SchemaVersion,
    /// SQL file relative to the manifest directory.
    pub file: String,
    /// SHA-256 hex digest of `file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl MigrationEntry {
    /// Creates an entry for the step `from -> to` stored in `file`, with no
    /// recorded checksum.
    pub fn new(from: SchemaVersion, to: SchemaVersion, file: impl Into<String>) -> Self {
        Self {
            from,
            to,
            file: file.into(),
            checksum: None,
        }
    }
}

/// Top-level catalog manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogManifest {
    /// Version of the full schema.
    pub version: SchemaVersion,
    /// SQL file creating the full schema, relative to the manifest
    /// directory.
    pub schema: String,
    /// SHA-256 hex digest of `schema`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_checksum: Option<String>,
    /// Migration steps, in any order.
    #[serde(default)]
    pub migrations: Vec<MigrationEntry>,
}

impl CatalogManifest {
    /// Creates a manifest with no migrations and no checksums.
    pub fn new(version: SchemaVersion, schema: impl Into<String>) -> Self {
        Self {
            version,
            schema: schema.into(),
            schema_checksum: None,
            migrations: Vec::new(),
        }
    }

    /// Loads a manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](CatalogError::IoError) if the file cannot be
    /// read, or [`YamlError`](CatalogError::YamlError) if it is not a valid
    /// manifest.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let manifest = serde_yaml::from_reader(reader)?;
        Ok(manifest)
    }

    /// Saves the manifest as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Computes the SHA-256 hex digest of a file.
    pub fn calculate_checksum(path: impl AsRef<Path>) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(checksum_of(&bytes))
    }

    /// Fills in every checksum from the current contents of the files under
    /// `base_dir`, replacing any recorded values.
    pub fn record_checksums(&mut self, base_dir: impl AsRef<Path>) -> Result<()> {
        let base_dir = base_dir.as_ref();
        self.schema_checksum = Some(Self::calculate_checksum(base_dir.join(&self.schema))?);
        for entry in &mut self.migrations {
            entry.checksum = Some(Self::calculate_checksum(base_dir.join(&entry.file))?);
        }
        Ok(())
    }
}

pub(crate) fn checksum_of(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Reads a SQL file named by the manifest, verifying its checksum if one is
/// recorded.
pub(crate) fn read_sql(base_dir: &Path, file: &str, checksum: Option<&str>) -> Result<String> {
    let bytes = std::fs::read(base_dir.join(file))?;

    if let Some(expected) = checksum {
        let actual = checksum_of(&bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(CatalogError::InvalidChecksum {
                file: file.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
    }

    String::from_utf8(bytes).map_err(|_| {
        CatalogError::InvalidManifest(format!("{file} is not valid UTF-8"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_of_known_input() {
        assert_eq!(
            checksum_of(b"test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_yaml_defaults() {
        let manifest: CatalogManifest = serde_yaml::from_str("version: 1\nschema: schema.sql\n").unwrap();
        assert_eq!(manifest, CatalogManifest::new(1, "schema.sql"));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);

        let mut manifest = CatalogManifest::new(3, "schema.sql");
        manifest.migrations.push(MigrationEntry::new(2, 3, "m/0002.sql"));
        manifest.migrations.push(MigrationEntry::new(1, 2, "m/0001.sql"));
        manifest.save(&path).unwrap();

        assert_eq!(CatalogManifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn test_record_checksums() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("schema.sql"), "test").unwrap();
        std::fs::write(dir.path().join("m1.sql"), "").unwrap();

        let mut manifest = CatalogManifest::new(2, "schema.sql");
        manifest.migrations.push(MigrationEntry::new(1, 2, "m1.sql"));
        manifest.record_checksums(dir.path()).unwrap();

        assert_eq!(
            manifest.schema_checksum.as_deref(),
            Some("9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")
        );
        assert_eq!(
            manifest.migrations[0].checksum.as_deref(),
            Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn test_read_sql_rejects_modified_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.sql"), "test").unwrap();

        let sql = read_sql(dir.path(), "a.sql", Some(&checksum_of(b"test"))).unwrap();
        assert_eq!(sql, "test");

        let err = read_sql(dir.path(), "a.sql", Some(&checksum_of(b"other"))).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidChecksum { ref file, .. } if file == "a.sql"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_sql(dir.path(), "missing.sql", None).unwrap_err();
        assert!(matches!(err, CatalogError::IoError(_)));
    }
}
