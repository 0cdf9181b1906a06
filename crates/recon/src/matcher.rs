use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::classify::classify;
use crate::config::MatchRule;
use crate::error::ReconError;
use crate::model::{MatchRelation, MatchedPair, Table};
use crate::normalize::{normalize, MatchKey};

/// A rule with both columns resolved to positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRule {
    pub label: String,
    pub left_col: usize,
    pub right_col: usize,
}

/// Resolve every rule column by name. Fails on the first missing column.
pub fn resolve_rules(
    rules: &[MatchRule],
    left: &Table,
    right: &Table,
) -> Result<Vec<ResolvedRule>, ReconError> {
    rules
        .iter()
        .map(|rule| {
            Ok(ResolvedRule {
                label: rule.label(),
                left_col: left.require_column(&rule.left)?,
                right_col: right.require_column(&rule.right)?,
            })
        })
        .collect()
}

/// Index the non-blank keys of one column: key → row indices (ascending).
fn index_keys(table: &Table, col: usize) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..table.len() {
        if let MatchKey::Value(key) = normalize(table.cell(row, col)) {
            index.entry(key).or_default().push(row);
        }
    }
    index
}

/// Build the complete match relation between `left` and `right`.
///
/// Every (left, right) pair on which at least one rule fires is kept, so
/// one-to-many and many-to-many matches survive intact. Blank keys never
/// match.
pub fn reconcile(
    left: &Table,
    right: &Table,
    rules: &[MatchRule],
) -> Result<MatchRelation, ReconError> {
    if rules.is_empty() {
        return Err(ReconError::RuleCount { found: 0 });
    }
    let resolved = resolve_rules(rules, left, right)?;

    // (left, right) → fired rule indices. Rules are visited in order, so each
    // list comes out ascending.
    let mut fired: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();

    for (rule_idx, rule) in resolved.iter().enumerate() {
        let right_index = index_keys(right, rule.right_col);
        debug!(
            rule = %rule.label,
            distinct_right_keys = right_index.len(),
            "indexed right keys"
        );

        let mut hits = 0usize;
        for i in 0..left.len() {
            let MatchKey::Value(key) = normalize(left.cell(i, rule.left_col)) else {
                continue;
            };
            if let Some(rows) = right_index.get(&key) {
                for &j in rows {
                    fired.entry((i, j)).or_default().push(rule_idx);
                    hits += 1;
                }
            }
        }
        debug!(rule = %rule.label, pairs = hits, "rule evaluated");
    }

    let mut left_matched = vec![false; left.len()];
    let mut right_matched = vec![false; right.len()];
    let mut pairs = Vec::with_capacity(fired.len());

    for ((i, j), rules_fired) in fired {
        left_matched[i] = true;
        right_matched[j] = true;
        pairs.push(MatchedPair {
            left: i,
            right: j,
            classification: classify(&rules_fired),
            fired: rules_fired,
        });
    }

    let unmatched = |flags: &[bool]| -> Vec<usize> {
        flags
            .iter()
            .enumerate()
            .filter(|(_, matched)| !**matched)
            .map(|(idx, _)| idx)
            .collect()
    };

    Ok(MatchRelation {
        left_len: left.len(),
        right_len: right.len(),
        unmatched_left: unmatched(&left_matched),
        unmatched_right: unmatched(&right_matched),
        pairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, Classification};

    fn table(name: &str, cols: &[&str], rows: &[&[&str]]) -> Table {
        Table::with_rows(
            name,
            cols.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| CellValue::from(*v)).collect())
                .collect(),
        )
    }

    fn two_rules() -> Vec<MatchRule> {
        vec![
            MatchRule::labeled("rule 1", "Table Field Name", "cdm_column"),
            MatchRule::labeled("rule 2", "Biz Name", "pdm_column"),
        ]
    }

    #[test]
    fn both_rules_fire() {
        let left = table("CDL", &["Table Field Name", "Biz Name"], &[&["Age", "cust_age"]]);
        let right = table("GITHUB", &["cdm_column", "pdm_column"], &[&["age", "CUST_AGE"]]);
        let rel = reconcile(&left, &right, &two_rules()).unwrap();
        assert_eq!(rel.pairs.len(), 1);
        assert_eq!(rel.pairs[0].fired, vec![0, 1]);
        assert_eq!(rel.pairs[0].classification, Classification::Both);
        assert!(rel.unmatched_left.is_empty());
        assert!(rel.unmatched_right.is_empty());
    }

    #[test]
    fn second_rule_alone() {
        let left = table("CDL", &["Table Field Name", "Biz Name"], &[&["Age", "cust_age"]]);
        let right = table("GITHUB", &["cdm_column", "pdm_column"], &[&["years", " Cust_Age"]]);
        let rel = reconcile(&left, &right, &two_rules()).unwrap();
        assert_eq!(rel.pairs.len(), 1);
        assert_eq!(rel.pairs[0].classification, Classification::Single(1));
    }

    #[test]
    fn one_to_many_is_fully_enumerated() {
        let left = table("CDL", &["k"], &[&["a"], &["b"]]);
        let right = table("GITHUB", &["k"], &[&["x"], &["A"], &["a "], &["b"]]);
        let rel = reconcile(&left, &right, &[MatchRule::new("k", "k")]).unwrap();
        let got: Vec<(usize, usize)> = rel.pairs.iter().map(|p| (p.left, p.right)).collect();
        assert_eq!(got, vec![(0, 1), (0, 2), (1, 3)]);
        assert_eq!(rel.unmatched_right, vec![0]);
    }

    #[test]
    fn many_to_many_on_duplicate_keys() {
        let left = table("CDL", &["k"], &[&["dup"], &["DUP"]]);
        let right = table("GITHUB", &["k"], &[&["dup"], &["Dup"]]);
        let rel = reconcile(&left, &right, &[MatchRule::new("k", "k")]).unwrap();
        assert_eq!(rel.pairs.len(), 4);
    }

    #[test]
    fn blank_keys_never_pair() {
        let left = table("CDL", &["Table Field Name", "Biz Name"], &[&["", ""]]);
        let right = table("GITHUB", &["cdm_column", "pdm_column"], &[&["", "  "]]);
        let rel = reconcile(&left, &right, &two_rules()).unwrap();
        assert!(rel.pairs.is_empty());
        assert_eq!(rel.unmatched_left, vec![0]);
        assert_eq!(rel.unmatched_right, vec![0]);
    }

    #[test]
    fn missing_column_fails_before_matching() {
        let left = table("CDL", &["Table Field Name"], &[&["x"]]);
        let right = table("GITHUB", &["cdm_column", "pdm_column"], &[&["x", "y"]]);
        let err = reconcile(&left, &right, &two_rules()).unwrap_err();
        match err {
            ReconError::MissingColumn { table, column } => {
                assert_eq!(table, "CDL");
                assert_eq!(column, "Biz Name");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_sides_are_fine() {
        let left = table("CDL", &["k"], &[]);
        let right = table("GITHUB", &["k"], &[&["a"], &["b"]]);
        let rel = reconcile(&left, &right, &[MatchRule::new("k", "k")]).unwrap();
        assert!(rel.pairs.is_empty());
        assert!(rel.unmatched_left.is_empty());
        assert_eq!(rel.unmatched_right, vec![0, 1]);
    }

    #[test]
    fn no_rules_is_an_error() {
        let t = table("CDL", &["k"], &[]);
        assert!(matches!(
            reconcile(&t, &t, &[]),
            Err(ReconError::RuleCount { found: 0 })
        ));
    }
}
