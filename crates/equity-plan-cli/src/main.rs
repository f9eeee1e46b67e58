mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::charts::{ChartAllArgs, ChartArgs};
use commands::dates::{AddMonthsArgs, MonthsBetweenArgs};
use commands::endpoints::EndpointsArgs;
use commands::forms::{BucketsArgs, CliffArgs, GrantFormArgs};
use config::CliConfig;

/// Equity grant form checks and vesting chart series
#[derive(Parser)]
#[command(
    name = "eqp",
    version,
    about = "Equity grant form checks and vesting chart series",
    long_about = "A CLI over the equity-plan client logic: cliff/start-date \
                  reconciliation, share-bucket validation, full grant-form \
                  evaluation and cumulative vesting chart series built from \
                  backend schedule payloads."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// YAML config file (client settings, issue date)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Debug logging on stderr (EQP_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile cliff months and vesting start date
    Cliff(CliffArgs),
    /// Validate share buckets and price requirements
    Buckets(BucketsArgs),
    /// Evaluate a full grant form and build its submission
    GrantForm(GrantFormArgs),
    /// Add calendar months, clamping to month end
    AddMonths(AddMonthsArgs),
    /// Whole months elapsed between two dates
    MonthsBetween(MonthsBetweenArgs),
    /// Cumulative vesting series for one grant
    Chart(ChartArgs),
    /// Company-wide cumulative vesting series
    ChartAll(ChartAllArgs),
    /// Resolve backend endpoint URLs for a grant
    Endpoints(EndpointsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("EQP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Cliff(args) => commands::forms::run_cliff(args, &config),
        Commands::Buckets(args) => commands::forms::run_buckets(args),
        Commands::GrantForm(args) => commands::forms::run_grant_form(args, &config),
        Commands::AddMonths(args) => commands::dates::run_add_months(args),
        Commands::MonthsBetween(args) => commands::dates::run_months_between(args),
        Commands::Chart(args) => commands::charts::run_chart(args),
        Commands::ChartAll(args) => commands::charts::run_chart_all(args),
        Commands::Endpoints(args) => commands::endpoints::run_endpoints(args, &config),
        Commands::Version => {
            println!("eqp {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
