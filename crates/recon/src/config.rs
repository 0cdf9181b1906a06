use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub mode: OutputMode,
    pub rules: Vec<MatchRule>,
    #[serde(default)]
    pub sheets: SheetNames,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub report: ReportConfig,
    /// Append the classification column to matched/merged output.
    #[serde(default = "default_true")]
    pub include_classification: bool,
}

fn default_name() -> String {
    "CDL vs GITHUB".into()
}

fn default_true() -> bool {
    true
}

/// Rules used when no config is given: field name and business name.
pub fn default_rules() -> Vec<MatchRule> {
    vec![
        MatchRule::new("Table Field Name", "cdm_column"),
        MatchRule::new("Biz Name", "pdm_column"),
    ]
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Matched table plus unmatched-left and unmatched-right tables.
    #[default]
    Partitioned,
    /// One wide table: left rows with the first right match appended.
    Merged,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partitioned => write!(f, "partitioned"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatchRule {
    #[serde(default)]
    pub label: Option<String>,
    /// Column name in the LEFT table.
    pub left: String,
    /// Column name in the RIGHT table.
    pub right: String,
}

impl MatchRule {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            label: None,
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn labeled(label: impl Into<String>, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            left: left.into(),
            right: right.into(),
        }
    }

    /// Configured label, or `<left>_matches_<right>` with whitespace as `_`.
    pub fn label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("{}_matches_{}", underscore(&self.left), underscore(&self.right)),
        }
    }
}

fn underscore(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

// ---------------------------------------------------------------------------
// Sheets + labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub left: String,
    pub right: String,
    pub matched: String,
    pub unmatched_left: String,
    pub unmatched_right: String,
    pub merged: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            left: "CDL".into(),
            right: "GITHUB".into(),
            matched: "Matched_Records".into(),
            unmatched_left: "Unmatched_CDL".into(),
            unmatched_right: "Unmatched_GITHUB".into(),
            merged: "Merged".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Labels {
    /// Header of the classification column.
    pub column: String,
    /// Classification when two or more rules fire.
    pub both: String,
    /// Merged mode: left row without a right match.
    pub no_match: String,
    /// Merged mode: trailing right row without a rendered left row.
    pub right_only: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            column: "Match_Type".into(),
            both: "Both_Matches".into(),
            no_match: "No matching record in GITHUB".into(),
            right_only: "No matching record in CDL".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Mode-specific settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Prepended to every right column name in the merged table.
    pub right_prefix: String,
    pub claim: ClaimPolicy,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            right_prefix: "GITHUB_".into(),
            claim: ClaimPolicy::Shared,
        }
    }
}

/// How right rows are handed out to left rows in merged mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimPolicy {
    /// Every left row takes its lowest-index match, even if another left row took it too.
    #[default]
    Shared,
    /// A right row is rendered against at most one left row (first come, first served).
    Exclusive,
}

impl fmt::Display for ClaimPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// Column prefixes for the matched table in partitioned mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub left_prefix: String,
    pub right_prefix: String,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn new(rules: Vec<MatchRule>) -> Self {
        Self {
            name: default_name(),
            mode: OutputMode::default(),
            rules,
            sheets: SheetNames::default(),
            labels: Labels::default(),
            merge: MergeConfig::default(),
            report: ReportConfig::default(),
            include_classification: true,
        }
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_right_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.merge.right_prefix = prefix.into();
        self
    }

    pub fn with_claim(mut self, claim: ClaimPolicy) -> Self {
        self.merge.claim = claim;
        self
    }

    pub fn with_classification(mut self, include: bool) -> Self {
        self.include_classification = include;
        self
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_sheets(mut self, sheets: SheetNames) -> Self {
        self.sheets = sheets;
        self
    }

    /// Sheet names the current mode writes, in output order.
    pub fn output_sheets(&self) -> Vec<&str> {
        match self.mode {
            OutputMode::Partitioned => vec![
                self.sheets.matched.as_str(),
                self.sheets.unmatched_left.as_str(),
                self.sheets.unmatched_right.as_str(),
            ],
            OutputMode::Merged => vec![self.sheets.merged.as_str()],
        }
    }

    /// Effective rule labels, in rule order.
    pub fn rule_labels(&self) -> Vec<String> {
        self.rules.iter().map(MatchRule::label).collect()
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.rules.is_empty() || self.rules.len() > 2 {
            return Err(ReconError::RuleCount {
                found: self.rules.len(),
            });
        }

        for (i, rule) in self.rules.iter().enumerate() {
            if rule.left.trim().is_empty() || rule.right.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "rule {}: left and right column names must not be blank",
                    i + 1
                )));
            }
        }

        let labels = self.rule_labels();
        let mut seen = HashSet::new();
        for label in &labels {
            if label.trim().is_empty() {
                return Err(ReconError::ConfigValidation("rule label must not be blank".into()));
            }
            if label == &self.labels.both {
                return Err(ReconError::ConfigValidation(format!(
                    "rule label '{label}' collides with the both-rules label"
                )));
            }
            if !seen.insert(label.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate rule label '{label}'"
                )));
            }
        }

        if self.sheets.left.trim().is_empty() || self.sheets.right.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "input sheet names must not be blank".into(),
            ));
        }

        match self.mode {
            OutputMode::Partitioned => {
                let outputs = [
                    &self.sheets.matched,
                    &self.sheets.unmatched_left,
                    &self.sheets.unmatched_right,
                ];
                if outputs.iter().any(|s| s.trim().is_empty()) {
                    return Err(ReconError::ConfigValidation(
                        "output sheet names must not be blank".into(),
                    ));
                }
                let distinct: HashSet<&str> = outputs.iter().map(|s| s.as_str()).collect();
                if distinct.len() != outputs.len() {
                    return Err(ReconError::ConfigValidation(
                        "matched, unmatched_left and unmatched_right sheets must be distinct".into(),
                    ));
                }
            }
            OutputMode::Merged => {
                if self.sheets.merged.trim().is_empty() {
                    return Err(ReconError::ConfigValidation(
                        "merged sheet name must not be blank".into(),
                    ));
                }
            }
        }

        // In-place output would overwrite the inputs
        for output in self.output_sheets() {
            if output == self.sheets.left || output == self.sheets.right {
                return Err(ReconError::ConfigValidation(format!(
                    "output sheet '{output}' reuses an input sheet name"
                )));
            }
        }

        if self.include_classification && self.labels.column.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "classification column name must not be blank".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
