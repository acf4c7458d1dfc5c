// stockback CLI - dead-stock pickup request reports

mod exit_codes;
mod logging;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use logging::{init_logging, LogConfig};
use run::RunArgs;

#[derive(Parser)]
#[command(name = "stockback")]
#[command(about = "Match dead stock to organizations that buy it and write pickup request sheets")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the pickup request workbook from the three exports
    #[command(after_help = "\
Examples:
  stockback run --inventory dead_stock.csv --purchase-history history.xlsx --code-map stock_value.csv
  stockback run --inventory dead_stock.csv --purchase-history history.xlsx --code-map stock_value.csv \\
      --config stockback.toml --report requests.xlsx --result-csv merged.csv
  stockback run ... --json > summary.json")]
    Run(RunArgs),

    /// Validate a config file without running
    #[command(after_help = "\
Examples:
  stockback check-config stockback.toml")]
    CheckConfig {
        /// Path to the TOML config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_flags(cli.verbose, cli.quiet));

    let result = match cli.command {
        None => Err(CliError {
            code: EXIT_USAGE,
            message: "no command given".into(),
            hint: Some("stockback --help for more information".into()),
        }),
        Some(Commands::Run(args)) => run::cmd_run(args),
        Some(Commands::CheckConfig { config }) => run::cmd_check_config(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
