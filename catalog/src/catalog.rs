//! In-memory schema catalog and migration planning.
//!
//! A [`SchemaCatalog`] holds everything an application knows about its
//! database layout: the full schema at the current version and the
//! migration steps that lead there from older versions. Given the version a
//! driver reports when it needs a migration, the catalog plans the chain of
//! steps to apply, or reports that no chain exists so the caller can fall
//! back to a fresh setup.
//!
//! # Loading patterns
//!
//! ```no_run
//! use schema_driver_catalog::SchemaCatalog;
//!
//! // A directory containing catalog.yaml and the SQL files it names
//! let catalog = SchemaCatalog::from_dir("db/").unwrap();
//!
//! // Steps from version 1 to the current version, in order
//! for step in catalog.migrations_from(1).unwrap() {
//!     println!("{} -> {}", step.from, step.to);
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use schema_driver_core::{MigrationSet, Schema, SchemaVersion, validate_migration_set, validate_schema};
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::manifest::{CatalogManifest, MANIFEST_FILE, read_sql};

/// A schema together with its migration history.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    schema: Schema,
    /// Steps keyed by their `from` version.
    migrations: BTreeMap<SchemaVersion, MigrationSet>,
    source: Option<PathBuf>,
}

impl SchemaCatalog {
    /// Builds a catalog from definitions already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidDefinition`] if the schema or a step
    /// fails validation, and [`CatalogError::InvalidManifest`] if two steps
    /// start at the same version or a step goes past the schema version.
    pub fn new(schema: Schema, migrations: impl IntoIterator<Item = MigrationSet>) -> Result<Self> {
        if let Some(err) = validate_schema(&schema).into_iter().next() {
            return Err(err.into());
        }

        let mut steps = BTreeMap::new();
        for set in migrations {
            if let Some(err) = validate_migration_set(&set).into_iter().next() {
                return Err(err.into());
            }
            if set.to > schema.version {
                return Err(CatalogError::InvalidManifest(format!(
                    "migration {} -> {} goes past schema version {}",
                    set.from, set.to, schema.version
                )));
            }
            if steps.contains_key(&set.from) {
                return Err(CatalogError::InvalidManifest(format!(
                    "more than one migration starts at version {}",
                    set.from
                )));
            }
            steps.insert(set.from, set);
        }

        Ok(Self {
            schema,
            migrations: steps,
            source: None,
        })
    }

    /// Loads a catalog from a manifest file, reading the SQL files it names
    /// relative to the manifest's directory.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::IoError`] or [`CatalogError::YamlError`] if
    /// a file cannot be read or parsed, [`CatalogError::InvalidChecksum`]
    /// if a SQL file was modified after its checksum was recorded, and the
    /// errors of [`SchemaCatalog::new`].
    pub fn from_manifest(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let manifest = CatalogManifest::load(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let schema_sql = read_sql(base_dir, &manifest.schema, manifest.schema_checksum.as_deref())?;
        let migrations = manifest
            .migrations
            .iter()
            .map(|entry| {
                let sql = read_sql(base_dir, &entry.file, entry.checksum.as_deref())?;
                Ok(MigrationSet::new(entry.from, entry.to, sql))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut catalog = Self::new(Schema::new(manifest.version, schema_sql), migrations)?;
        catalog.source = Some(path.to_path_buf());

        debug!(
            path = %path.display(),
            version = catalog.version(),
            migrations = catalog.migrations.len(),
            "Loaded schema catalog"
        );
        Ok(catalog)
    }

    /// Loads `catalog.yaml` from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_manifest(dir.as_ref().join(MANIFEST_FILE))
    }

    /// Current schema version.
    pub fn version(&self) -> SchemaVersion {
        self.schema.version
    }

    /// Full schema at the current version.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// All migration steps, ordered by `from`.
    pub fn migrations(&self) -> impl Iterator<Item = &MigrationSet> {
        self.migrations.values()
    }

    /// Manifest the catalog was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Plans the steps from `from` to the current version.
    ///
    /// Returns an empty chain when `from` already is the current version.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingMigration`] if `from` is newer than
    /// the catalog or no unbroken chain of steps reaches the current
    /// version.
    pub fn migrations_from(&self, from: SchemaVersion) -> Result<Vec<&MigrationSet>> {
        let target = self.version();
        let missing = || CatalogError::MissingMigration { from, to: target };

        if from > target {
            return Err(missing());
        }

        let mut chain = Vec::new();
        let mut current = from;
        while current < target {
            let step = self.migrations.get(&current).ok_or_else(missing)?;
            chain.push(step);
            current = step.to;
        }
        Ok(chain)
    }

    /// Plans the steps from `from` and joins them into one migration set,
    /// so the whole chain applies in a single transaction.
    ///
    /// Returns `None` when `from` already is the current version.
    pub fn combined_migration(&self, from: SchemaVersion) -> Result<Option<MigrationSet>> {
        let chain = self.migrations_from(from)?;
        let Some(last) = chain.last() else {
            return Ok(None);
        };

        let sql = chain
            .iter()
            .map(|step| step.sql.trim_end())
            .filter(|sql| !sql.is_empty())
            .map(|sql| if sql.ends_with(';') { sql.to_string() } else { format!("{sql};") })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Some(MigrationSet::new(from, last.to, sql)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_driver_core::ValidationError;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::new(
            Schema::new(4, "CREATE TABLE t (id TEXT, a INTEGER, b INTEGER);"),
            vec![
                MigrationSet::new(3, 4, "ALTER TABLE t ADD COLUMN b INTEGER"),
                MigrationSet::new(1, 2, "ALTER TABLE t ADD COLUMN a INTEGER;"),
                MigrationSet::new(2, 3, ""),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_chain_is_ordered() {
        let catalog = catalog();
        let chain: Vec<_> = catalog
            .migrations_from(1)
            .unwrap()
            .into_iter()
            .map(|s| (s.from, s.to))
            .collect();
        assert_eq!(chain, vec![(1, 2), (2, 3), (3, 4)]);

        assert_eq!(catalog.migrations_from(3).unwrap().len(), 1);
        assert!(catalog.migrations_from(4).unwrap().is_empty());
    }

    #[test]
    fn test_chain_with_gap_is_missing() {
        let catalog = SchemaCatalog::new(
            Schema::new(4, "CREATE TABLE t (id TEXT);"),
            vec![MigrationSet::new(1, 2, ""), MigrationSet::new(3, 4, "")],
        )
        .unwrap();
        let err = catalog.migrations_from(1).unwrap_err();
        assert!(matches!(err, CatalogError::MissingMigration { from: 1, to: 4 }));
    }

    #[test]
    fn test_newer_than_catalog_is_missing() {
        assert!(matches!(
            catalog().migrations_from(7),
            Err(CatalogError::MissingMigration { from: 7, to: 4 })
        ));
    }

    #[test]
    fn test_step_can_skip_versions() {
        let catalog = SchemaCatalog::new(
            Schema::new(5, "CREATE TABLE t (id TEXT);"),
            vec![MigrationSet::new(1, 4, "SELECT 1;"), MigrationSet::new(4, 5, "SELECT 2;")],
        )
        .unwrap();
        assert_eq!(catalog.migrations_from(1).unwrap().len(), 2);
        assert!(catalog.migrations_from(2).is_err());
    }

    #[test]
    fn test_combined_migration() {
        let combined = catalog().combined_migration(1).unwrap().unwrap();
        assert_eq!(combined.from, 1);
        assert_eq!(combined.to, 4);
        assert_eq!(
            combined.sql,
            "ALTER TABLE t ADD COLUMN a INTEGER;\nALTER TABLE t ADD COLUMN b INTEGER;"
        );

        assert!(catalog().combined_migration(4).unwrap().is_none());
    }

    #[test]
    fn test_rejects_duplicate_steps() {
        let err = SchemaCatalog::new(
            Schema::new(3, "CREATE TABLE t (id TEXT);"),
            vec![MigrationSet::new(1, 2, ""), MigrationSet::new(1, 3, "")],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidManifest(_)));
    }

    #[test]
    fn test_rejects_step_past_schema() {
        let err = SchemaCatalog::new(
            Schema::new(2, "CREATE TABLE t (id TEXT);"),
            vec![MigrationSet::new(1, 3, "")],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidManifest(_)));
    }

    #[test]
    fn test_rejects_invalid_definitions() {
        assert!(matches!(
            SchemaCatalog::new(Schema::new(0, "CREATE TABLE t (id TEXT);"), vec![]),
            Err(CatalogError::InvalidDefinition(_))
        ));
        assert!(matches!(
            SchemaCatalog::new(
                Schema::new(2, "CREATE TABLE t (id TEXT);"),
                vec![MigrationSet::new(2, 1, "")]
            ),
            Err(CatalogError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_rejects_version_past_user_version_range() {
        let err = SchemaCatalog::new(Schema::new(2_147_483_648, "CREATE TABLE t (id TEXT);"), vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidDefinition(ValidationError::SchemaVersionOutOfRange(2_147_483_648))
        ));
    }
}
