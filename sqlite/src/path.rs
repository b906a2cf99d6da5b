//! Database name → path resolution.

use std::path::{MAIN_SEPARATOR, Path};

use crate::error::{DriverError, Result};

/// Subdirectory of the platform data directory used for bare names.
pub const DEFAULT_APP_DIR: &str = "schema-driver";

/// Resolves a database name to the path or URI handed to SQLite.
///
/// Empty names, `:memory:`, `file:` URIs, absolute paths and anything
/// containing a path separator are used verbatim. Any other name becomes
/// `<data_dir>/<name>.db`; when `data_dir` is `None` the platform data
/// directory is used. The directory is created if missing.
///
/// # Examples
///
/// ```
/// use schema_driver_sqlite::resolve_database_path;
///
/// assert_eq!(resolve_database_path(":memory:", None).unwrap(), ":memory:");
/// assert_eq!(resolve_database_path("/tmp/app.sqlite", None).unwrap(), "/tmp/app.sqlite");
///
/// let dir = std::env::temp_dir();
/// let path = resolve_database_path("app", Some(dir.as_path())).unwrap();
/// assert!(path.ends_with("app.db"));
/// ```
pub fn resolve_database_path(name: &str, data_dir: Option<&Path>) -> Result<String> {
    if is_path_like(name) {
        return Ok(name.to_string());
    }

    let dir = match data_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_dir()
            .map(|d| d.join(DEFAULT_APP_DIR))
            .ok_or_else(|| DriverError::NoDataDirectory(name.to_string()))?,
    };
    std::fs::create_dir_all(&dir)?;

    Ok(dir
        .join(format!("{name}.db"))
        .to_string_lossy()
        .into_owned())
}

fn is_path_like(name: &str) -> bool {
    name.is_empty()
        || name == ":memory:"
        || name.starts_with("file:")
        || name.contains('/')
        || name.contains(MAIN_SEPARATOR)
        || Path::new(name).is_absolute()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_like_names_are_verbatim() {
        for name in ["", ":memory:", "file:test.db?mode=memory", "data/app.db"] {
            assert_eq!(resolve_database_path(name, None).unwrap(), name);
        }
    }

    #[test]
    fn test_bare_name_resolves_into_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let path = resolve_database_path("tasks", Some(nested.as_path())).unwrap();
        assert_eq!(path, nested.join("tasks.db").to_string_lossy());
        assert!(nested.is_dir());
    }
}
