use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use ormlet_core::{ModelInfo, ModelSchema};
use ormlet_db::OrmConfig;
use ormlet_sqlite::Database;
use rayon::prelude::*;

/// Output format for `describe`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "ormlet")]
#[command(about = "Model schemas, DDL and SQLite migrations from a YAML manifest")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the CREATE TABLE statements for every declared model.
    Sql(SqlArgs),
    /// Print field metadata for the declared models.
    Describe(DescribeArgs),
    /// Create, drop or inspect model tables in the configured databases.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Path to the ormlet YAML configuration.
    #[arg(long, default_value = "ormlet.yml")]
    config: PathBuf,
}

#[derive(Debug, Args)]
struct SqlArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Print DROP TABLE statements instead, in drop order.
    #[arg(long)]
    drop: bool,
}

#[derive(Debug, Args)]
struct DescribeArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Only describe this table.
    #[arg(long)]
    table: Option<String>,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create missing model tables.
    Up(MigrateTargetArgs),
    /// Drop existing model tables, dependents first.
    Down(MigrateTargetArgs),
    /// Drop and recreate every model table.
    Refresh(MigrateTargetArgs),
    /// Show which model tables exist and how many rows they hold.
    Status(MigrateTargetArgs),
}

#[derive(Debug, Args)]
struct MigrateTargetArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Database file path; repeat to target several. Overrides the
    /// configured databases.
    #[arg(long = "db")]
    databases: Vec<PathBuf>,
    /// Number of databases migrated in parallel (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Sql(args) => run_sql(args),
        Command::Describe(args) => run_describe(args),
        Command::Migrate(args) => run_migrate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// sql / describe commands
// ---------------------------------------------------------------------------

fn run_sql(args: SqlArgs) -> Result<(), String> {
    let (_, schemas) = load_schemas(&args.config.config)?;

    if args.drop {
        for schema in schemas.iter().rev() {
            for statement in schema.drop_table_sql() {
                println!("{statement};");
            }
        }
        return Ok(());
    }

    for schema in &schemas {
        let statements = schema
            .create_table_sql()
            .map_err(|e| format!("Failed to render '{}': {e}", schema.table_name()))?;
        for statement in statements {
            println!("{statement};");
        }
    }
    Ok(())
}

fn run_describe(args: DescribeArgs) -> Result<(), String> {
    let (_, schemas) = load_schemas(&args.config.config)?;

    let models: Vec<ModelInfo> = schemas
        .iter()
        .filter(|s| args.table.as_deref().is_none_or(|t| s.table_name() == t))
        .map(|s| s.metadata())
        .collect();
    match &args.table {
        Some(table) if models.is_empty() => {
            return Err(format!("No model declares table '{table}'"));
        }
        _ => {}
    }

    let output = match args.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&models)
            .map_err(|e| format!("Failed to serialize metadata: {e}"))?,
        CliOutputFormat::Yaml => serde_yaml::to_string(&models)
            .map_err(|e| format!("Failed to serialize metadata: {e}"))?,
    };
    println!("{}", output.trim_end());
    Ok(())
}

// ---------------------------------------------------------------------------
// migrate command
// ---------------------------------------------------------------------------

/// What happened to one table during a migration step.
#[derive(Debug)]
enum TableOutcome {
    Created,
    Dropped,
    Skipped,
    Present(usize),
    Missing,
}

impl TableOutcome {
    fn describe(&self) -> String {
        match self {
            TableOutcome::Created => "created".to_string(),
            TableOutcome::Dropped => "dropped".to_string(),
            TableOutcome::Skipped => "skipped".to_string(),
            TableOutcome::Present(rows) => format!("present ({rows} rows)"),
            TableOutcome::Missing => "missing".to_string(),
        }
    }
}

type TableReport = Vec<(String, TableOutcome)>;

/// One migration step applied to a single database.
type MigrateStep = fn(&Database, &[Arc<ModelSchema>]) -> Result<TableReport, String>;

struct DatabaseReport {
    path: PathBuf,
    tables: TableReport,
}

fn run_migrate(args: MigrateArgs) -> Result<(), String> {
    let (operation, target): (MigrateStep, MigrateTargetArgs) = match args.operation {
        MigrateOperation::Up(a) => (migrate_up, a),
        MigrateOperation::Down(a) => (migrate_down, a),
        MigrateOperation::Refresh(a) => (migrate_refresh, a),
        MigrateOperation::Status(a) => (migrate_status, a),
    };

    let (config, schemas) = load_schemas(&target.config.config)?;
    let databases = if target.databases.is_empty() {
        config.database_paths(config_dir(&target.config.config))
    } else {
        target.databases.clone()
    };
    if databases.is_empty() {
        return Err("No databases configured; add `databases` to the config or pass --db".into());
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = target.jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder
        .build()
        .map_err(|e| format!("Failed to create thread pool: {e}"))?;

    let results: Vec<Result<DatabaseReport, String>> = pool.install(|| {
        databases
            .par_iter()
            .map(|path| -> Result<DatabaseReport, String> {
                let db = Database::open(path)
                    .map_err(|e| format!("{}: failed to open database: {e}", path.display()))?;
                let tables =
                    operation(&db, &schemas).map_err(|e| format!("{}: {e}", path.display()))?;
                Ok(DatabaseReport {
                    path: path.clone(),
                    tables,
                })
            })
            .collect()
    });

    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(report) => {
                println!("{}:", report.path.display());
                for (table, outcome) in &report.tables {
                    println!("  {table}: {}", outcome.describe());
                }
            }
            Err(err) => failures.push(err),
        }
    }

    if !failures.is_empty() {
        eprintln!("\nFailures:");
        for err in &failures {
            eprintln!("  {err}");
        }
        return Err(format!("{} database(s) failed", failures.len()));
    }
    Ok(())
}

fn migrate_up(
    db: &Database,
    schemas: &[Arc<ModelSchema>],
) -> Result<TableReport, String> {
    let mut tables = Vec::with_capacity(schemas.len());
    for schema in schemas {
        let table = schema.table_name().to_string();
        if table_exists(db, &table)? {
            tables.push((table, TableOutcome::Skipped));
            continue;
        }
        db.create_table(schema)
            .map_err(|e| format!("failed to create '{table}': {e}"))?;
        tables.push((table, TableOutcome::Created));
    }
    Ok(tables)
}

fn migrate_down(
    db: &Database,
    schemas: &[Arc<ModelSchema>],
) -> Result<TableReport, String> {
    let mut tables = Vec::with_capacity(schemas.len());
    for schema in schemas.iter().rev() {
        let table = schema.table_name().to_string();
        if !table_exists(db, &table)? {
            tables.push((table, TableOutcome::Skipped));
            continue;
        }
        db.drop_table(schema)
            .map_err(|e| format!("failed to drop '{table}': {e}"))?;
        tables.push((table, TableOutcome::Dropped));
    }
    Ok(tables)
}

fn migrate_refresh(
    db: &Database,
    schemas: &[Arc<ModelSchema>],
) -> Result<TableReport, String> {
    migrate_down(db, schemas)?;
    migrate_up(db, schemas)
}

fn migrate_status(
    db: &Database,
    schemas: &[Arc<ModelSchema>],
) -> Result<TableReport, String> {
    let mut tables = Vec::with_capacity(schemas.len());
    for schema in schemas {
        let table = schema.table_name().to_string();
        if !table_exists(db, &table)? {
            tables.push((table, TableOutcome::Missing));
            continue;
        }
        let rows = db
            .select(Arc::clone(schema))
            .count()
            .map_err(|e| format!("failed to count rows of '{table}': {e}"))?;
        tables.push((table, TableOutcome::Present(rows)));
    }
    Ok(tables)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_schemas(path: &Path) -> Result<(OrmConfig, Vec<Arc<ModelSchema>>), String> {
    let config = OrmConfig::load(path)
        .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?;
    let schemas = config
        .schemas()
        .map_err(|e| format!("Invalid models in '{}': {e}", path.display()))?;
    Ok((config, schemas))
}

fn config_dir(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new("."))
}

fn table_exists(db: &Database, table: &str) -> Result<bool, String> {
    db.table_exists(table)
        .map_err(|e| format!("failed to inspect '{table}': {e}"))
}
