//! `sheetrecon run|validate|sheets`: config loading, flag overrides, output.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use serde::Serialize;
use sheetrecon_recon::model::ReconMeta;
use sheetrecon_recon::{
    ClaimPolicy, MatchRule, OutputMode, ReconConfig, ReconInput, ReconOutput, ReconResult,
    ReconSummary,
};

use crate::exit_codes::EXIT_UNMATCHED;
use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// Workbook holding the left and right sheets
    #[arg(default_value = "compare.xlsx")]
    pub input: PathBuf,

    /// Report path (.xlsx, or .csv for one file per sheet).
    /// Defaults to matched_records.xlsx, or merged_output.xlsx in merged mode
    pub output: Option<PathBuf>,

    /// Path to a .recon.toml config file
    #[arg(long, short = 'c', env = "SHEETRECON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output shape (overrides the config)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Name of the left (CDL) sheet
    #[arg(long)]
    pub left_sheet: Option<String>,

    /// Name of the right (GITHUB) sheet
    #[arg(long)]
    pub right_sheet: Option<String>,

    /// Match rule as LEFT=RIGHT column names; repeat for a second rule.
    /// Replaces the configured rules
    #[arg(long = "rule", value_name = "LEFT=RIGHT")]
    pub rules: Vec<String>,

    /// Prefix for right columns in the merged table
    #[arg(long)]
    pub prefix: Option<String>,

    /// Leave out the classification column
    #[arg(long)]
    pub no_classification: bool,

    /// Merged mode: render each right row against at most one left row
    #[arg(long)]
    pub exclusive: bool,

    /// Read the left sheet from this file instead of INPUT
    #[arg(long)]
    pub left_input: Option<PathBuf>,

    /// Read the right sheet from this file instead of INPUT
    #[arg(long)]
    pub right_input: Option<PathBuf>,

    /// Write the report sheets back into INPUT (xlsx only)
    #[arg(long, conflicts_with = "output")]
    pub in_place: bool,

    /// Output JSON summary to stdout
    #[arg(long)]
    pub json: bool,

    /// Write JSON summary to file
    #[arg(long)]
    pub summary_out: Option<PathBuf>,

    /// Exit 6 when the report shows any row without a counterpart.
    /// In merged mode this counts left rows rendered as no match and every
    /// right row appended after the left rows
    #[arg(long)]
    pub fail_on_unmatched: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Partitioned,
    Merged,
}

impl From<ModeArg> for OutputMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Partitioned => OutputMode::Partitioned,
            ModeArg::Merged => OutputMode::Merged,
        }
    }
}

/// JSON document for `--json` / `--summary-out`.
#[derive(Serialize)]
struct RunReport<'a> {
    meta: &'a ReconMeta,
    summary: &'a ReconSummary,
    outputs: Vec<String>,
}

// ============================================================================
// Config
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    Ok(ReconConfig::from_toml(&text)?)
}

fn parse_rule(spec: &str) -> Result<MatchRule, CliError> {
    let invalid = || {
        CliError::args(format!("invalid --rule '{spec}'"))
            .with_hint("expected LEFT=RIGHT, e.g. --rule 'Biz Name=pdm_column'")
    };
    let (left, right) = spec.split_once('=').ok_or_else(invalid)?;
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() || right.is_empty() {
        return Err(invalid());
    }
    Ok(MatchRule::new(left, right))
}

fn apply_overrides(mut config: ReconConfig, args: &RunArgs) -> Result<ReconConfig, CliError> {
    if let Some(mode) = args.mode {
        config = config.with_mode(mode.into());
    }
    if let Some(sheet) = &args.left_sheet {
        config.sheets.left = sheet.clone();
    }
    if let Some(sheet) = &args.right_sheet {
        config.sheets.right = sheet.clone();
    }
    if !args.rules.is_empty() {
        config.rules = args
            .rules
            .iter()
            .map(|r| parse_rule(r))
            .collect::<Result<Vec<_>, _>>()?;
    }
    if let Some(prefix) = &args.prefix {
        config = config.with_right_prefix(prefix.clone());
    }
    if args.no_classification {
        config = config.with_classification(false);
    }
    if args.exclusive {
        config = config.with_claim(ClaimPolicy::Exclusive);
    }
    config.validate()?;
    Ok(config)
}

fn default_output(mode: OutputMode) -> PathBuf {
    match mode {
        OutputMode::Partitioned => PathBuf::from("matched_records.xlsx"),
        OutputMode::Merged => PathBuf::from("merged_output.xlsx"),
    }
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = apply_overrides(load_config(args.config.as_deref())?, &args)?;

    let left_path = args.left_input.as_deref().unwrap_or(args.input.as_path());
    let right_path = args.right_input.as_deref().unwrap_or(args.input.as_path());

    // Writing a fresh file over a source would drop the source sheets
    let output = args.output.clone().unwrap_or_else(|| default_output(config.mode));
    let in_place = args.in_place || same_file(&output, &args.input);
    if !in_place {
        for source in [left_path, right_path] {
            if same_file(&output, source) {
                return Err(CliError::args(format!(
                    "output {} would overwrite input {}",
                    output.display(),
                    source.display()
                ))
                .with_hint("write the report to a different path"));
            }
        }
    }

    let input = ReconInput {
        left: sheetrecon_io::load_table(left_path, &config.sheets.left)?,
        right: sheetrecon_io::load_table(right_path, &config.sheets.right)?,
    };

    let result = sheetrecon_recon::run(&config, &input)?;

    let tables = result.output.tables();
    let written = if in_place {
        sheetrecon_io::save_in_place(&args.input, &tables)?;
        vec![args.input.clone()]
    } else {
        sheetrecon_io::save_tables(&output, &tables)?
    };

    if args.json || args.summary_out.is_some() {
        let report = RunReport {
            meta: &result.meta,
            summary: &result.summary,
            outputs: written.iter().map(|p| p.display().to_string()).collect(),
        };
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = args.summary_out {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json_str}");
        }
    }

    print_summary(&config, &result, &written);

    let (left_rows, right_rows) = reported_unmatched(&result);
    if args.fail_on_unmatched && left_rows + right_rows > 0 {
        return Err(CliError::new(
            EXIT_UNMATCHED,
            format!(
                "{left_rows} {} and {right_rows} {} row(s) unmatched",
                config.sheets.left, config.sheets.right
            ),
        ));
    }
    Ok(())
}

/// Both paths exist and resolve to the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Left and right rows the written report shows without a counterpart.
fn reported_unmatched(result: &ReconResult) -> (usize, usize) {
    match &result.output {
        ReconOutput::Partitioned(_) => (result.summary.unmatched_left, result.summary.unmatched_right),
        ReconOutput::Merged(report) => (
            report.rendered.iter().filter(|r| r.is_none()).count(),
            report.trailing_right.len(),
        ),
    }
}

/// Human summary to stderr.
fn print_summary(config: &ReconConfig, result: &ReconResult, written: &[PathBuf]) {
    let s = &result.summary;
    let (left, right) = (&config.sheets.left, &config.sheets.right);

    eprintln!(
        "{} recon '{}': {} {left} rows, {} {right} rows",
        result.meta.mode, result.meta.config_name, s.left_rows, s.right_rows,
    );
    eprintln!(
        "  matched:   {} pair(s) covering {} {left} and {} {right} rows",
        s.matched_pairs, s.matched_left, s.matched_right,
    );
    eprintln!("  unmatched: {} {left}, {} {right}", s.unmatched_left, s.unmatched_right);
    for (label, count) in &s.classification_counts {
        eprintln!("  {label}: {count}");
    }
    for path in written {
        eprintln!("wrote {}", path.display());
    }
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;

    eprintln!(
        "valid: {} recon '{}' with {} rule(s)",
        config.mode,
        config.name,
        config.rules.len(),
    );
    for (i, rule) in config.rules.iter().enumerate() {
        eprintln!(
            "  rule {}: {}.'{}' = {}.'{}' -> {}",
            i + 1,
            config.sheets.left,
            rule.left,
            config.sheets.right,
            rule.right,
            rule.label(),
        );
    }
    eprintln!("  output sheets: {}", config.output_sheets().join(", "));
    if config.mode == OutputMode::Merged {
        eprintln!(
            "  right prefix: '{}', claim: {}",
            config.merge.right_prefix, config.merge.claim
        );
    }
    Ok(())
}

// ============================================================================
// sheets
// ============================================================================

pub fn cmd_sheets(input: PathBuf, json: bool) -> Result<(), CliError> {
    let sheets = sheetrecon_io::list_sheets(&input)?;

    if json {
        let value: Vec<serde_json::Value> = sheets
            .iter()
            .map(|s| serde_json::json!({ "name": s.name, "rows": s.rows, "cols": s.cols }))
            .collect();
        let json_str = serde_json::to_string_pretty(&value)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    for sheet in &sheets {
        println!("{}\t{} rows\t{} cols", sheet.name, sheet.rows, sheet.cols);
    }
    Ok(())
}
