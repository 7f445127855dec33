mod migrate;

use std::process;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use singpath_migrate::{MigrateOptions, Migrator, Registry};
use singpath_store::{QueryLog, RestClient, WriteEvent};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// SingPath schema migration tool.
#[derive(Parser)]
#[command(
    name = "singpath-migrate",
    version,
    about = "Apply or revert SingPath schema migrations"
)]
struct Cli {
    /// Root URL of the store, e.g. https://singpath.firebaseio.com
    #[arg(long, global = true, env = "SINGPATH_ROOT")]
    root: Option<String>,

    /// Store secret or admin token
    #[arg(long, global = true, env = "SINGPATH_AUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Log every single-path write issued by a routine (debug level)
    #[arg(long, global = true)]
    log_writes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current schema version
    Version,

    /// List registered migrations and whether they are applied
    List,

    /// Apply the next pending migration
    Next,

    /// Revert the last applied migration
    Revert,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let migrator = connect(&cli);
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("failed to create tokio runtime: {}", e),
                cli.output,
                cli.quiet,
            );
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Version => migrate::cmd_version(&rt, &migrator, cli.output, cli.quiet),
        Commands::List => migrate::cmd_list(&rt, &migrator, cli.output, cli.quiet),
        Commands::Next => migrate::cmd_next(&rt, &migrator, cli.output, cli.quiet),
        Commands::Revert => migrate::cmd_revert(&rt, &migrator, cli.output, cli.quiet),
    }
}

/// Build a migrator over the REST store, exiting when the root or token
/// is missing.
fn connect(cli: &Cli) -> Migrator<RestClient> {
    let Some(root) = cli.root.as_deref().filter(|r| !r.is_empty()) else {
        report_error(
            "missing store root: pass --root or set SINGPATH_ROOT",
            cli.output,
            cli.quiet,
        );
        process::exit(1);
    };
    let Some(token) = cli.token.as_deref().filter(|t| !t.is_empty()) else {
        report_error(
            "missing auth token: pass --token or set SINGPATH_AUTH_TOKEN",
            cli.output,
            cli.quiet,
        );
        process::exit(1);
    };

    let mut options = MigrateOptions::new();
    if cli.log_writes {
        options = options.with_query_log(write_logger());
    }
    Migrator::new(RestClient::new(root, token), Registry::standard(), options)
}

fn write_logger() -> QueryLog {
    Arc::new(|event: &WriteEvent| {
        tracing::debug!(success = event.success, "write {}", event);
    })
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Report an error message in the appropriate format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
