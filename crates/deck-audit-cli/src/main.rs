mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::expected::ExpectedArgs;
use commands::parse::ParseArgs;
use commands::validate::ValidateArgs;
use commands::CommandOutput;

/// Reconcile generated report decks against their source data
#[derive(Parser)]
#[command(
    name = "deck-audit",
    version,
    about = "Reconcile generated report decks against their source data",
    long_about = "Recomputes every figure a generated report deck displays from the \
                  source dataset with exact decimal arithmetic, compares each displayed \
                  cell within configurable tolerances and emits a pass/fail verdict \
                  with one entry per discrepancy."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log to stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit an extracted deck grid against source records
    Validate(ValidateArgs),
    /// Print the expected value of every field the deck can display
    Expected(ExpectedArgs),
    /// Show how display strings are parsed
    Parse(ParseArgs),
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

/// Exit code for usage errors and unreadable inputs, same as a fatal verdict.
const EXIT_FATAL: i32 = 2;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<CommandOutput, Box<dyn std::error::Error>> = match cli.command {
        Commands::Validate(args) => commands::validate::run_validate(args),
        Commands::Expected(args) => commands::expected::run_expected(args),
        Commands::Parse(args) => commands::parse::run_parse(args),
        Commands::Version => {
            println!("deck-audit {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(out) => {
            output::format_output(&cli.output, &out.value);
            process::exit(out.exit_code);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(EXIT_FATAL);
        }
    }
}
