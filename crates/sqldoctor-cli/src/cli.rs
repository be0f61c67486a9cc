//! `sqldoctor`: SQL Server diagnostics from the command line
//!
//! `plan` and `antipatterns` work offline on saved plans and query text.
//! Every other subcommand connects to a server using the settings file,
//! `SQLDOCTOR_*` environment variables and connection flags, in that order.

mod input;
mod logging;
mod offline;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::{OutputFormat, print_response};
use sqldoctor_core::TracingSink;
use sqldoctor_driver_mssql::MssqlConnection;
use sqldoctor_monitor::{DoctorSettings, DoctorTools, ToolResponse};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sqldoctor")]
#[command(about = "SQL Server performance diagnostics", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Settings file (TOML)
    #[arg(short, long, global = true, env = "SQLDOCTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level for SQL Doctor crates; RUST_LOG overrides it
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ConnectionArgs {
    /// Server host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Database to connect to
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// SQL login; the password comes from the settings file or SQLDOCTOR_PASSWORD
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Upper bound on each server round trip, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a saved plan (.sqlplan or ShowPlan XML) without a server
    Plan {
        /// Plan file
        file: PathBuf,

        /// Query text or file, for antipattern detection against the plan
        #[arg(short, long)]
        query: Option<String>,

        /// Observed duration, used when the plan has no runtime counters
        #[arg(long, default_value_t = 0)]
        wall_ms: u64,
    },

    /// Scan query text for antipatterns without a server
    Antipatterns {
        /// Query text or file
        query: String,
    },

    #[command(flatten)]
    Live(LiveCommand),
}

#[derive(Subcommand)]
enum LiveCommand {
    /// Server version and instance name
    Version,

    /// List databases
    Databases,

    /// Executing requests and blocking
    Sessions,

    /// CPU and I/O pressure across schedulers
    Schedulers,

    /// Memory and parallelism configuration review
    Config,

    /// Page life expectancy and memory grants
    Memory,

    /// Run a query with actual-plan capture and classify its bottleneck
    Analyze {
        /// Query text or file
        query: String,

        /// Switch to this database before running the query
        #[arg(long)]
        use_database: Option<String>,
    },

    /// Scan a query for antipatterns using its estimated plan
    Detect {
        /// Query text or file
        query: String,
    },

    /// Missing-index recommendations and unused-index review
    Indexes {
        /// Also derive recommendations from this query's estimated plan
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Statistics freshness
    Statistics {
        /// Tables to check (schema.table); repeat or comma-separate
        #[arg(short, long, value_delimiter = ',')]
        table: Vec<String>,

        /// Derive the tables from this query's estimated plan
        #[arg(short, long)]
        query: Option<String>,
    },
}

fn load_settings(cli: &Cli) -> Result<DoctorSettings> {
    let settings = match &cli.config {
        Some(path) => DoctorSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => DoctorSettings::default(),
    };
    let mut settings = settings
        .with_env_overrides()
        .context("Invalid SQLDOCTOR_* environment variable")?;

    let args = &cli.connection;
    if let Some(host) = &args.host {
        settings.connection.host = host.clone();
    }
    if let Some(port) = args.port {
        settings.connection.port = port;
    }
    if let Some(database) = &args.database {
        settings.connection.database = Some(database.clone());
    }
    if let Some(user) = &args.user {
        settings.connection.username = Some(user.clone());
    }
    if let Some(secs) = args.timeout_secs {
        settings.query_timeout_secs = secs;
    }
    Ok(settings)
}

async fn connect(settings: &DoctorSettings) -> Result<DoctorTools> {
    let conn = MssqlConnection::from_config(&settings.connection)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to {}:{}",
                settings.connection.host,
                settings.connection.get_port()
            )
        })?;
    Ok(DoctorTools::from_settings(Arc::new(conn), settings))
}

/// Prints the envelope and maps its outcome to the exit code
fn finish<T: serde::Serialize>(response: ToolResponse<T>, format: OutputFormat) -> Result<ExitCode> {
    print_response(&response, format)?;
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = load_settings(&cli)?;
    let format = cli.output;

    match cli.command {
        Commands::Plan {
            file,
            query,
            wall_ms,
        } => {
            let xml = input::read_text(&file)?;
            let query = query.as_deref().map(input::query_text).transpose()?;
            let report = offline::analyze_plan(
                &xml,
                query.as_deref(),
                wall_ms,
                &settings.analyzer,
                &TracingSink,
            );
            finish(ToolResponse::success(report), format)
        }
        Commands::Antipatterns { query } => {
            let query = input::query_text(&query)?;
            let analysis = offline::analyze_query_text(&query, &settings.analyzer);
            finish(ToolResponse::success(analysis), format)
        }
        Commands::Live(command) => {
            let tools = connect(&settings).await?;
            let code = run_live(&tools, command, format).await;
            if let Err(e) = tools.connection().close().await {
                tracing::warn!(error = %e, "failed to close connection");
            }
            code
        }
    }
}

async fn run_live(
    tools: &DoctorTools,
    command: LiveCommand,
    format: OutputFormat,
) -> Result<ExitCode> {
    match command {
        LiveCommand::Version => finish(tools.get_server_version().await, format),
        LiveCommand::Databases => finish(tools.list_databases().await, format),
        LiveCommand::Sessions => finish(tools.get_active_sessions().await, format),
        LiveCommand::Schedulers => finish(tools.get_scheduler_stats().await, format),
        LiveCommand::Config => finish(tools.get_server_configurations().await, format),
        LiveCommand::Memory => finish(tools.get_memory_stats().await, format),
        LiveCommand::Analyze {
            query,
            use_database,
        } => {
            let query = input::query_text(&query)?;
            finish(
                tools
                    .analyze_query_performance(&query, use_database.as_deref())
                    .await,
                format,
            )
        }
        LiveCommand::Detect { query } => {
            let query = input::query_text(&query)?;
            finish(tools.detect_query_antipatterns(&query, true).await, format)
        }
        LiveCommand::Indexes { query } => {
            let query = query.as_deref().map(input::query_text).transpose()?;
            finish(tools.recommend_missing_indexes(query.as_deref()).await, format)
        }
        LiveCommand::Statistics { table, query } => {
            let query = query.as_deref().map(input::query_text).transpose()?;
            let tables = (!table.is_empty()).then_some(table);
            finish(tools.check_statistics_health(tables, query.as_deref()).await, format)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    logging::init(logging::LoggingConfig::for_level(&cli.log_level).with_json(cli.log_json))?;

    run(cli).await
}
