use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use schema_driver_catalog::{CatalogError, SchemaCatalog};
use schema_driver_core::{MigrationSet, SchemaVersion, UNINITIALIZED_VERSION, Value};
use schema_driver_sqlite::{
    BatchReport, Database, DatabaseDriver, DowngradePolicy, DriverConfig, DriverError, OpenMode,
    SchemaCompatibility, SetupReason, classify, resolve_database_path,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Exit status when the database has no usable schema.
const EXIT_NEEDS_SETUP: i32 = 2;
/// Exit status when the database needs a migration.
const EXIT_NEEDS_MIGRATION: i32 = 3;

#[derive(Debug, Parser)]
#[command(name = "schema-driver")]
#[command(about = "Inspect, set up and query schema-versioned SQLite databases")]
struct Cli {
    /// Log driver activity (debug level) to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report whether a database matches the expected schema version.
    Status(StatusArgs),
    /// Bring a database to the catalog version, bootstrapping or migrating as needed.
    Setup(SetupArgs),
    /// Destroy a database's contents and recreate the catalog schema.
    Reset(ResetArgs),
    /// Look up one row by id.
    Find(FindArgs),
    /// Run a query and print the rows as JSON.
    Query(QueryArgs),
    /// Run a query and print the `id` column of each row.
    Ids(SqlArgs),
    /// Run a counting query and print the number.
    Count(SqlArgs),
    /// Execute a JSON batch file in one transaction.
    Batch(BatchArgs),
    /// Print a value from the local_storage table.
    GetLocal(GetLocalArgs),
}

/// Which database to open and at which version.
#[derive(Debug, Args)]
struct Target {
    /// Database name or path. Bare names resolve into the data directory.
    #[arg(long)]
    db: String,
    /// Driver configuration YAML.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Catalog directory containing catalog.yaml.
    #[arg(long, conflicts_with = "schema_version")]
    catalog: Option<PathBuf>,
    /// Expected schema version, when no catalog is given.
    #[arg(long)]
    schema_version: Option<SchemaVersion>,
}

#[derive(Debug, Args)]
struct StatusArgs {
    #[command(flatten)]
    target: Target,
}

#[derive(Debug, Args)]
struct CatalogTarget {
    /// Database name or path. Bare names resolve into the data directory.
    #[arg(long)]
    db: String,
    /// Driver configuration YAML.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Catalog directory containing catalog.yaml.
    #[arg(long)]
    catalog: PathBuf,
}

#[derive(Debug, Args)]
struct SetupArgs {
    #[command(flatten)]
    target: CatalogTarget,
    /// Apply the migration chain as one combined step.
    #[arg(long)]
    combined: bool,
    /// Fail instead of recreating the schema when no migration path exists.
    #[arg(long)]
    no_reset: bool,
}

#[derive(Debug, Args)]
struct ResetArgs {
    #[command(flatten)]
    target: CatalogTarget,
}

#[derive(Debug, Args)]
struct FindArgs {
    #[command(flatten)]
    target: Target,
    /// Table to look in.
    table: String,
    /// Row id.
    id: String,
}

#[derive(Debug, Args)]
struct SqlArgs {
    #[command(flatten)]
    target: Target,
    /// SQL statement with `?` placeholders.
    sql: String,
    /// Placeholder values as a JSON array (e.g. '["abc", 1, null]').
    #[arg(long)]
    args: Option<String>,
}

#[derive(Debug, Args)]
struct QueryArgs {
    #[command(flatten)]
    sql: SqlArgs,
    /// Table the rows belong to, for logging.
    #[arg(long)]
    table: Option<String>,
    /// Print column names once followed by value rows.
    #[arg(long)]
    array: bool,
}

#[derive(Debug, Args)]
struct BatchArgs {
    #[command(flatten)]
    target: Target,
    /// JSON batch file, or `-` for stdin.
    input: PathBuf,
}

#[derive(Debug, Args)]
struct GetLocalArgs {
    #[command(flatten)]
    target: Target,
    /// Key to read.
    key: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Status(args) => run_status(args),
        Command::Setup(args) => run_setup(args).map(|()| 0),
        Command::Reset(args) => run_reset(args).map(|()| 0),
        Command::Find(args) => run_find(args).map(|()| 0),
        Command::Query(args) => run_query(args).map(|()| 0),
        Command::Ids(args) => run_ids(args).map(|()| 0),
        Command::Count(args) => run_count(args).map(|()| 0),
        Command::Batch(args) => run_batch(args).map(|()| 0),
        Command::GetLocal(args) => run_get_local(args).map(|()| 0),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_status(args: StatusArgs) -> Result<i32, String> {
    let target = &args.target;
    let config = load_config(target.config.as_ref())?;
    let expected = expected_version(target)?;

    let path = resolve_database_path(&target.db, config.data_dir.as_deref())
        .map_err(|e| e.to_string())?;
    let database_version = if !path.starts_with("file:") && !Path::new(&path).exists() {
        UNINITIALIZED_VERSION
    } else {
        Database::open_read_only(&path, &config)
            .and_then(|db| db.user_version())
            .map_err(|e| format!("Failed to read database version: {e}"))?
    };

    let (status, code) = match classify(database_version, expected) {
        SchemaCompatibility::Compatible => ("compatible", 0),
        SchemaCompatibility::NeedsMigration { .. } => ("needs_migration", EXIT_NEEDS_MIGRATION),
        SchemaCompatibility::NeedsSetup(SetupReason::NewerDatabase { database_version })
            if config.downgrade_policy == DowngradePolicy::Refuse =>
        {
            return Err(DriverError::DatabaseNewer {
                database_version,
                app_version: expected,
            }
            .to_string());
        }
        SchemaCompatibility::NeedsSetup(_) => ("needs_setup", EXIT_NEEDS_SETUP),
    };

    print_json(&serde_json::json!({
        "path": path,
        "database_version": database_version,
        "expected_version": expected,
        "status": status,
    }))?;
    Ok(code)
}

fn run_setup(args: SetupArgs) -> Result<(), String> {
    let target = &args.target;
    let config = load_config(target.config.as_ref())?;
    let catalog = load_catalog(&target.catalog)?;
    let version = catalog.version();

    let from = match DatabaseDriver::open_with_config(&target.db, OpenMode::Check(version), &config) {
        Ok(driver) => {
            return print_json(&serde_json::json!({
                "path": driver.path(),
                "action": "none",
                "version": version,
            }));
        }
        Err(DriverError::SchemaNeeded) => None,
        Err(DriverError::MigrationNeeded { from }) => Some(from),
        Err(err) => return Err(format!("Failed to open database: {err}")),
    };

    if let Some(from) = from {
        match apply_migrations(target, &config, &catalog, from, args.combined) {
            Ok(driver) => {
                return print_json(&serde_json::json!({
                    "path": driver.path(),
                    "action": "migrate",
                    "from": from,
                    "version": version,
                }));
            }
            Err(SetupFailure::NoPath(err)) if !args.no_reset => {
                warn!(from, to = version, "No migration path available, will reset database: {err}");
            }
            Err(SetupFailure::NoPath(err)) => return Err(err.to_string()),
            Err(SetupFailure::Driver(err)) => return Err(format!("Migration failed: {err}")),
        }
    }

    let driver = DatabaseDriver::open_with_config(
        &target.db,
        OpenMode::Bootstrap(catalog.schema().clone()),
        &config,
    )
    .map_err(|e| format!("Failed to open database: {e}"))?;

    print_json(&serde_json::json!({
        "path": driver.path(),
        "action": "bootstrap",
        "version": version,
    }))
}

enum SetupFailure {
    NoPath(CatalogError),
    Driver(DriverError),
}

fn apply_migrations(
    target: &CatalogTarget,
    config: &DriverConfig,
    catalog: &SchemaCatalog,
    from: SchemaVersion,
    combined: bool,
) -> Result<DatabaseDriver, SetupFailure> {
    let steps: Vec<MigrationSet> = if combined {
        catalog
            .combined_migration(from)
            .map_err(SetupFailure::NoPath)?
            .into_iter()
            .collect()
    } else {
        catalog
            .migrations_from(from)
            .map_err(SetupFailure::NoPath)?
            .into_iter()
            .cloned()
            .collect()
    };

    let mut steps = steps.into_iter();
    let Some(first) = steps.next() else {
        return Err(SetupFailure::NoPath(CatalogError::MissingMigration {
            from,
            to: catalog.version(),
        }));
    };

    let mut driver = DatabaseDriver::open_with_config(&target.db, OpenMode::Migrate(first), config)
        .map_err(SetupFailure::Driver)?;
    for step in steps {
        driver.migrate(&step).map_err(SetupFailure::Driver)?;
    }
    Ok(driver)
}

fn run_reset(args: ResetArgs) -> Result<(), String> {
    let target = &args.target;
    let config = load_config(target.config.as_ref())?;
    let catalog = load_catalog(&target.catalog)?;

    let driver = DatabaseDriver::open_with_config(
        &target.db,
        OpenMode::Bootstrap(catalog.schema().clone()),
        &config,
    )
    .map_err(|e| format!("Failed to open database: {e}"))?;

    print_json(&serde_json::json!({
        "path": driver.path(),
        "action": "bootstrap",
        "version": catalog.version(),
    }))
}

fn run_find(args: FindArgs) -> Result<(), String> {
    let driver = open_ready(&args.target)?;
    let record = driver
        .find(&args.table, &args.id)
        .map_err(|e| e.to_string())?;
    print_json(&record)
}

fn run_query(args: QueryArgs) -> Result<(), String> {
    let driver = open_ready(&args.sql.target)?;
    let values = parse_args(args.sql.args.as_deref())?;

    if args.array {
        let table = driver
            .query_as_array(&args.sql.sql, &values)
            .map_err(|e| e.to_string())?;
        return print_json(&table);
    }

    let records = match &args.table {
        Some(table) => driver.cached_query(table, &args.sql.sql, &values),
        None => driver.unsafe_query_raw(&args.sql.sql, &values),
    }
    .map_err(|e| e.to_string())?;
    print_json(&records)
}

fn run_ids(args: SqlArgs) -> Result<(), String> {
    let driver = open_ready(&args.target)?;
    let values = parse_args(args.args.as_deref())?;
    let ids = driver
        .query_ids(&args.sql, &values)
        .map_err(|e| e.to_string())?;
    print_json(&ids)
}

fn run_count(args: SqlArgs) -> Result<(), String> {
    let driver = open_ready(&args.target)?;
    let values = parse_args(args.args.as_deref())?;
    let count = driver
        .count(&args.sql, &values)
        .map_err(|e| e.to_string())?;
    println!("{count}");
    Ok(())
}

fn run_batch(args: BatchArgs) -> Result<(), String> {
    let json = if args.input.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .map_err(|err| format!("Failed to read stdin: {err}"))?;
        raw
    } else {
        fs::read_to_string(&args.input)
            .map_err(|err| format!("Failed to read '{}': {err}", args.input.display()))?
    };

    let mut driver = open_ready(&args.target)?;
    let BatchReport {
        operations,
        statements_executed,
        rows_changed,
    } = driver.batch_json(&json).map_err(|e| e.to_string())?;

    print_json(&serde_json::json!({
        "operations": operations,
        "statements_executed": statements_executed,
        "rows_changed": rows_changed,
    }))
}

fn run_get_local(args: GetLocalArgs) -> Result<(), String> {
    let driver = open_ready(&args.target)?;
    let value = driver.get_local(&args.key).map_err(|e| e.to_string())?;
    print_json(&value)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&PathBuf>) -> Result<DriverConfig, String> {
    match path {
        Some(path) => DriverConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display())),
        None => Ok(DriverConfig::default()),
    }
}

fn load_catalog(dir: &Path) -> Result<SchemaCatalog, String> {
    SchemaCatalog::from_dir(dir)
        .map_err(|err| format!("Failed to load catalog '{}': {err}", dir.display()))
}

fn expected_version(target: &Target) -> Result<SchemaVersion, String> {
    match (&target.catalog, target.schema_version) {
        (Some(dir), _) => Ok(load_catalog(dir)?.version()),
        (None, Some(version)) => Ok(version),
        (None, None) => Err("Specify the expected version with --catalog or --schema-version".to_string()),
    }
}

/// Opens a database that must already be at the expected version.
fn open_ready(target: &Target) -> Result<DatabaseDriver, String> {
    let config = load_config(target.config.as_ref())?;
    let expected = expected_version(target)?;

    DatabaseDriver::open_with_config(&target.db, OpenMode::Check(expected), &config).map_err(|err| {
        if err.is_classification() {
            format!("{err}; run `schema-driver setup` first")
        } else {
            format!("Failed to open database: {err}")
        }
    })
}

fn parse_args(raw: Option<&str>) -> Result<Vec<Value>, String> {
    match raw {
        Some(raw) => serde_json::from_str(raw).map_err(|err| format!("Invalid --args JSON: {err}")),
        None => Ok(Vec::new()),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(value)
        .map_err(|err| format!("JSON serialization failed: {err}"))?;
    println!("{raw}");
    Ok(())
}
