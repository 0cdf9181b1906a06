use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::config::OutputMode;
use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Cells + tables
// ---------------------------------------------------------------------------

/// A single scalar read from (or written to) a sheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Text cells are kept verbatim; empty strings collapse to `Empty`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }

    /// True for missing values: empty cells, whitespace-only text, NaN.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
            Self::Bool(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => f.write_str(s),
            // Integers without decimals
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// One row of a table, positionally aligned with `Table::columns`.
pub type Record = Vec<CellValue>;

/// A named sheet: header row plus records. Used for both the LEFT/RIGHT
/// record sets and every output table.
///
/// Column names may repeat in output tables; lookups by name return the
/// first occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from rows, padding short rows and truncating long ones.
    pub fn with_rows(name: impl Into<String>, columns: Vec<String>, rows: Vec<Record>) -> Self {
        let mut table = Self::new(name, columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, mut row: Record) {
        row.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Resolve a column by name or fail with `MissingColumn`.
    pub fn require_column(&self, name: &str) -> Result<usize, ReconError> {
        self.column_index(name).ok_or_else(|| ReconError::MissingColumn {
            table: self.name.clone(),
            column: name.into(),
        })
    }

    /// Cell at (row, col). Out-of-range positions read as `Empty`.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Row `row` as an owned record of exactly `width()` cells.
    pub fn record(&self, row: usize) -> Record {
        (0..self.width()).map(|c| self.cell(row, c).clone()).collect()
    }
}

/// Pre-loaded LEFT ("CDL") and RIGHT ("GITHUB") record sets.
#[derive(Debug, Clone)]
pub struct ReconInput {
    pub left: Table,
    pub right: Table,
}

// ---------------------------------------------------------------------------
// Match relation
// ---------------------------------------------------------------------------

/// Which rule(s) produced a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Two or more rules fired.
    Both,
    /// Exactly one rule fired; holds its index into the configured rules.
    Single(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedPair {
    pub left: usize,
    pub right: usize,
    /// Indices of the rules that fired, ascending.
    pub fired: Vec<usize>,
    pub classification: Classification,
}

/// Complete (left, right, fired-rules) relation plus both unmatched sides.
///
/// `pairs` is sorted by left index, then right index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchRelation {
    pub left_len: usize,
    pub right_len: usize,
    pub pairs: Vec<MatchedPair>,
    pub unmatched_left: Vec<usize>,
    pub unmatched_right: Vec<usize>,
}

impl MatchRelation {
    /// All pairs for one left index, in right-index order.
    pub fn matches_for_left(&self, left: usize) -> &[MatchedPair] {
        let start = self.pairs.partition_point(|p| p.left < left);
        let end = self.pairs.partition_point(|p| p.left <= left);
        &self.pairs[start..end]
    }

    /// Lowest-right-index pair for a left index.
    pub fn first_match(&self, left: usize) -> Option<&MatchedPair> {
        self.matches_for_left(left).first()
    }

    pub fn is_right_matched(&self, right: usize) -> bool {
        right < self.right_len && self.unmatched_right.binary_search(&right).is_err()
    }

    /// Number of distinct left indices with at least one pair.
    pub fn matched_left_count(&self) -> usize {
        self.left_len - self.unmatched_left.len()
    }

    pub fn matched_right_count(&self) -> usize {
        self.right_len - self.unmatched_right.len()
    }
}

// ---------------------------------------------------------------------------
// Assembled output
// ---------------------------------------------------------------------------

/// Partitioned report: matched pairs plus both unmatched sides.
#[derive(Debug, Clone)]
pub struct PartitionedReport {
    pub matched: Table,
    pub unmatched_left: Table,
    pub unmatched_right: Table,
}

/// Merged table: one row per left record, then the leftover right records.
#[derive(Debug, Clone)]
pub struct MergedReport {
    pub merged: Table,
    /// Right index rendered against each left row (`None` = no match).
    pub rendered: Vec<Option<usize>>,
    /// Right indices appended after the left rows, ascending.
    pub trailing_right: Vec<usize>,
}

#[derive(Debug, Clone)]
pub enum ReconOutput {
    Partitioned(PartitionedReport),
    Merged(MergedReport),
}

impl ReconOutput {
    /// Output tables in sheet order.
    pub fn tables(&self) -> Vec<&Table> {
        match self {
            Self::Partitioned(r) => vec![&r.matched, &r.unmatched_left, &r.unmatched_right],
            Self::Merged(r) => vec![&r.merged],
        }
    }

    pub fn into_tables(self) -> Vec<Table> {
        match self {
            Self::Partitioned(r) => vec![r.matched, r.unmatched_left, r.unmatched_right],
            Self::Merged(r) => vec![r.merged],
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub left_rows: usize,
    pub right_rows: usize,
    pub matched_pairs: usize,
    pub matched_left: usize,
    pub matched_right: usize,
    pub unmatched_left: usize,
    pub unmatched_right: usize,
    /// Rows written per output sheet.
    pub output_rows: BTreeMap<String, usize>,
    /// Output rows per classification label.
    pub classification_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub mode: OutputMode,
    pub rules: Vec<String>,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub relation: MatchRelation,
    pub output: ReconOutput,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn number_display_drops_integral_fraction() {
        assert_eq!(CellValue::Number(42.0).to_string(), "42");
        assert_eq!(CellValue::Number(-3.5).to_string(), "-3.5");
        assert_eq!(CellValue::Bool(true).to_string(), "TRUE");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("   ".into()).is_blank());
        assert!(CellValue::Number(f64::NAN).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
        assert!(!CellValue::Bool(false).is_blank());
        assert_eq!(CellValue::from(""), CellValue::Empty);
    }

    #[test]
    fn push_row_pads_and_truncates() {
        let mut t = Table::new("CDL", cols(&["a", "b"]));
        t.push_row(vec!["x".into()]);
        t.push_row(vec!["1".into(), "2".into(), "3".into()]);
        assert_eq!(t.rows[0], vec![CellValue::from("x"), CellValue::Empty]);
        assert_eq!(t.rows[1].len(), 2);
    }

    #[test]
    fn column_lookup_and_missing_column() {
        let t = Table::with_rows("GITHUB", cols(&["cdm_column"]), vec![vec!["age".into()]]);
        assert_eq!(t.column_index("cdm_column"), Some(0));
        assert_eq!(t.cell(0, 0), &CellValue::from("age"));
        let err = t.require_column("pdm_column").unwrap_err();
        assert_eq!(err.to_string(), "table 'GITHUB': missing column 'pdm_column'");
    }

    #[test]
    fn cell_out_of_range_is_empty() {
        let t = Table {
            name: "raw".into(),
            columns: cols(&["a", "b"]),
            rows: vec![vec!["only".into()]],
        };
        assert_eq!(t.cell(0, 1), &CellValue::Empty);
        assert_eq!(t.cell(5, 0), &CellValue::Empty);
        assert_eq!(t.record(0), vec![CellValue::from("only"), CellValue::Empty]);
    }

    #[test]
    fn relation_lookups() {
        let pair = |left, right| MatchedPair {
            left,
            right,
            fired: vec![0],
            classification: Classification::Single(0),
        };
        let rel = MatchRelation {
            left_len: 3,
            right_len: 3,
            pairs: vec![pair(0, 1), pair(0, 2), pair(2, 2)],
            unmatched_left: vec![1],
            unmatched_right: vec![0],
        };
        assert_eq!(rel.matches_for_left(0).len(), 2);
        assert!(rel.matches_for_left(1).is_empty());
        assert_eq!(rel.first_match(2).map(|p| p.right), Some(2));
        assert!(rel.is_right_matched(1));
        assert!(!rel.is_right_matched(0));
        assert!(!rel.is_right_matched(7));
        assert_eq!(rel.matched_left_count(), 2);
        assert_eq!(rel.matched_right_count(), 2);
    }

    #[test]
    fn cell_serializes_untagged() {
        let row = vec![
            CellValue::Empty,
            CellValue::from("x"),
            CellValue::Number(1.5),
            CellValue::Bool(false),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,"x",1.5,false]"#);
    }
}
