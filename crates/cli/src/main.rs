// reqcost CLI - allocate invoiced raw-material cost to requisitioned products

mod costing;
mod exit_codes;
mod export;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "reqcost")]
#[command(about = "Per-product unit cost from a requisition and a raw-material invoice")]
#[command(version)]
struct Cli {
    /// Debug logging to stderr (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate invoice cost to requisition lines from a TOML config file
    #[command(after_help = "\
Examples:
  reqcost run nf-4471.costing.toml
  reqcost run nf-4471.costing.toml --json
  reqcost run nf-4471.costing.toml --csv custos.csv --products produtos.csv
  reqcost run nf-4471.costing.toml --output result.json --strict")]
    Run {
        /// Path to the .costing.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of only the human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write one CSV row per requisition line
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the per-product rollup as CSV
        #[arg(long)]
        products: Option<PathBuf>,

        /// Exit non-zero on quantity divergences, unit conflicts, missing materials
        #[arg(long)]
        strict: bool,
    },

    /// Validate a costing config without running
    #[command(after_help = "\
Examples:
  reqcost validate nf-4471.costing.toml")]
    Validate {
        /// Path to the .costing.toml config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        None => {
            eprintln!("Usage: reqcost <command> [options]");
            eprintln!("       reqcost --help for more information");
            Err(CliError { code: EXIT_USAGE, message: String::new(), hint: None })
        }
        Some(Commands::Run { config, json, output, csv, products, strict }) => {
            costing::cmd_run(costing::RunOptions { config, json, output, csv, products, strict })
        }
        Some(Commands::Validate { config }) => costing::cmd_validate(config),
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
