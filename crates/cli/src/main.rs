// sheetrecon - reconcile two record sheets on normalized key columns

mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{io_exit_code, recon_exit_code, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use sheetrecon_io::IoError;
use sheetrecon_recon::ReconError;

#[derive(Parser)]
#[command(name = "sheetrecon")]
#[command(about = "Reconcile two record sheets (CDL vs GITHUB) on one or two key columns")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the left and right sheets and write the report
    #[command(after_help = "\
Examples:
  sheetrecon run
  sheetrecon run compare.xlsx matched_records.xlsx
  sheetrecon run cust_compare.xlsx --mode merged --exclusive
  sheetrecon run compare.xlsx --config demos/compare.recon.toml --json
  sheetrecon run compare.xlsx --rule 'Table Field Name=cdm_column' --in-place
  sheetrecon run --left-input cdl.csv --right-input github.csv report.xlsx")]
    Run(recon::RunArgs),

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  sheetrecon validate demos/vend_merge.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// List the sheets of a workbook with their sizes
    #[command(after_help = "\
Examples:
  sheetrecon sheets compare.xlsx
  sheetrecon sheets compare.xlsx --json")]
    Sheets {
        /// Workbook (xlsx, xls, xlsb, ods) or CSV file
        input: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  sheetrecon-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            "\nengine:  sheetrecon-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
        )
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run(args) => recon::cmd_run(args),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Sheets { input, json } => recon::cmd_sheets(input, json),
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
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("check the rule columns (--rule LEFT=RIGHT or [[rules]] in the config)".to_string())
            }
            ReconError::RuleCount { .. } => Some("configure one or two match rules".to_string()),
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let hint = match &err {
            IoError::SheetNotFound { .. } => {
                Some("pick the sheet with --left-sheet/--right-sheet or [sheets] in the config".to_string())
            }
            IoError::Unsupported(_) => Some("write reports as .xlsx or .csv".to_string()),
            _ => None,
        };
        Self { code: io_exit_code(&err), message: err.to_string(), hint }
    }
}
