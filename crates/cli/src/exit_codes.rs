//! CLI Exit Code Registry
//!
//! Single source of truth for `sheetrecon` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Success                                                    |
//! | 1    | General error (unspecified)                                |
//! | 2    | Usage error (bad arguments, unsupported output type)       |
//! | 3    | Invalid config (parse error, rule count, clashing names)   |
//! | 4    | Input schema error (missing sheet or rule column)          |
//! | 5    | I/O error (cannot open, read or write a file)              |
//! | 6    | Unmatched rows present and `--fail-on-unmatched` was given |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant and document what triggers it
//! 2. Update the table above
//! 3. Wire it into `recon_exit_code` / `io_exit_code` or the command itself

use sheetrecon_io::IoError;
use sheetrecon_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unsupported file type.
pub const EXIT_USAGE: u8 = 2;

/// Config could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// An input sheet or rule column does not exist.
pub const EXIT_INPUT_SCHEMA: u8 = 4;

/// File could not be opened, read or written.
pub const EXIT_IO: u8 = 5;

/// Reconciliation ran but left unmatched rows (with `--fail-on-unmatched`).
pub const EXIT_UNMATCHED: u8 = 6;

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) | ReconError::RuleCount { .. } => {
            EXIT_INVALID_CONFIG
        }
        ReconError::MissingColumn { .. } => EXIT_INPUT_SCHEMA,
    }
}

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::SheetNotFound { .. } => EXIT_INPUT_SCHEMA,
        IoError::Open { .. } | IoError::Read { .. } | IoError::Write { .. } => EXIT_IO,
        IoError::Unsupported(_) => EXIT_USAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INVALID_CONFIG,
            EXIT_INPUT_SCHEMA,
            EXIT_IO,
            EXIT_UNMATCHED,
        ];
        let unique: std::collections::HashSet<u8> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn schema_errors_share_a_code() {
        let missing_col = ReconError::MissingColumn {
            table: "CDL".into(),
            column: "Biz Name".into(),
        };
        let missing_sheet = IoError::SheetNotFound {
            path: "compare.xlsx".into(),
            sheet: "GITHUB".into(),
            available: vec![],
        };
        assert_eq!(recon_exit_code(&missing_col), EXIT_INPUT_SCHEMA);
        assert_eq!(io_exit_code(&missing_sheet), EXIT_INPUT_SCHEMA);
        assert_eq!(recon_exit_code(&ReconError::RuleCount { found: 3 }), EXIT_INVALID_CONFIG);
    }
}
