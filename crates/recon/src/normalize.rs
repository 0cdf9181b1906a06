//! Cell value → comparable match key.

use crate::model::CellValue;

/// Normalized form of a cell used for rule comparison.
///
/// `Blank` never equals anything, including another `Blank`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchKey {
    Blank,
    Value(String),
}

impl MatchKey {
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Blank => None,
            Self::Value(s) => Some(s),
        }
    }

    /// Rule equality: both keys present and identical.
    pub fn matches(&self, other: &MatchKey) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            _ => false,
        }
    }
}

/// Trim surrounding whitespace and fold case. Missing values map to `Blank`.
pub fn normalize(value: &CellValue) -> MatchKey {
    match value {
        CellValue::Empty => MatchKey::Blank,
        CellValue::Number(n) if n.is_nan() => MatchKey::Blank,
        CellValue::Text(s) => normalize_str(s),
        other => normalize_str(&other.to_string()),
    }
}

pub fn normalize_str(raw: &str) -> MatchKey {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        MatchKey::Blank
    } else {
        MatchKey::Value(trimmed.to_lowercase())
    }
}
