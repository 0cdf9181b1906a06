use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (blank column, duplicate label, sheet names, etc.).
    ConfigValidation(String),
    /// A run needs one or two match rules.
    RuleCount { found: usize },
    /// A rule references a column the table does not have.
    MissingColumn { table: String, column: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::RuleCount { found } => {
                write!(f, "expected 1 or 2 match rules, found {found}")
            }
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
        }
    }
}

impl std::error::Error for ReconError {}
