//! Match relation → output tables.
//!
//! Partitioned mode expands every matched pair into its own row. Merged mode
//! keeps exactly one row per left record and renders only its first match;
//! right rows that end up rendered against no left row are appended at the end.

use crate::classify::classification_label;
use crate::config::{ClaimPolicy, ReconConfig};
use crate::model::{
    CellValue, MatchRelation, MatchedPair, MergedReport, PartitionedReport, Record, Table,
};

fn prefixed(prefix: &str, columns: &[String]) -> Vec<String> {
    columns.iter().map(|c| format!("{prefix}{c}")).collect()
}

fn subset(name: &str, source: &Table, indices: &[usize]) -> Table {
    let mut table = Table::new(name, source.columns.clone());
    for &idx in indices {
        table.push_row(source.record(idx));
    }
    table
}

// ---------------------------------------------------------------------------
// Partitioned
// ---------------------------------------------------------------------------

/// Matched table (one row per pair) plus the two unmatched tables.
pub fn build_partitioned(
    left: &Table,
    right: &Table,
    relation: &MatchRelation,
    config: &ReconConfig,
) -> PartitionedReport {
    let rule_labels = config.rule_labels();

    let mut columns = prefixed(&config.report.left_prefix, &left.columns);
    columns.extend(prefixed(&config.report.right_prefix, &right.columns));
    if config.include_classification {
        columns.push(config.labels.column.clone());
    }

    let mut matched = Table::new(config.sheets.matched.as_str(), columns);
    for pair in &relation.pairs {
        let mut row = left.record(pair.left);
        row.extend(right.record(pair.right));
        if config.include_classification {
            let label = classification_label(pair.classification, &rule_labels, &config.labels);
            row.push(CellValue::text(label));
        }
        matched.push_row(row);
    }

    PartitionedReport {
        matched,
        unmatched_left: subset(&config.sheets.unmatched_left, left, &relation.unmatched_left),
        unmatched_right: subset(&config.sheets.unmatched_right, right, &relation.unmatched_right),
    }
}

// ---------------------------------------------------------------------------
// Merged
// ---------------------------------------------------------------------------

/// Pick the pair rendered against each left row under `claim`.
fn choose_matches<'a>(relation: &'a MatchRelation, claim: ClaimPolicy) -> Vec<Option<&'a MatchedPair>> {
    match claim {
        ClaimPolicy::Shared => (0..relation.left_len)
            .map(|i| relation.first_match(i))
            .collect(),
        ClaimPolicy::Exclusive => {
            let mut claimed = vec![false; relation.right_len];
            (0..relation.left_len)
                .map(|i| {
                    let pick = relation
                        .matches_for_left(i)
                        .iter()
                        .find(|p| !claimed[p.right])?;
                    claimed[pick.right] = true;
                    Some(pick)
                })
                .collect()
        }
    }
}

/// One row per left record, first match appended under the right prefix,
/// then every right record no left row rendered.
pub fn build_merged(
    left: &Table,
    right: &Table,
    relation: &MatchRelation,
    config: &ReconConfig,
) -> MergedReport {
    let rule_labels = config.rule_labels();
    let labels = &config.labels;

    let mut columns = left.columns.clone();
    columns.extend(prefixed(&config.merge.right_prefix, &right.columns));
    if config.include_classification {
        columns.push(labels.column.clone());
    }
    let mut merged = Table::new(config.sheets.merged.as_str(), columns);

    let chosen = choose_matches(relation, config.merge.claim);
    let mut rendered_right = vec![false; right.len()];
    let empty_right: Record = vec![CellValue::Empty; right.width()];

    for (i, pick) in chosen.iter().enumerate() {
        let mut row = left.record(i);
        match pick {
            Some(pair) => {
                rendered_right[pair.right] = true;
                row.extend(right.record(pair.right));
                if config.include_classification {
                    let label = classification_label(pair.classification, &rule_labels, labels);
                    row.push(CellValue::text(label));
                }
            }
            None => {
                row.extend(empty_right.iter().cloned());
                if config.include_classification {
                    row.push(CellValue::text(labels.no_match.as_str()));
                }
            }
        }
        merged.push_row(row);
    }

    let trailing_right: Vec<usize> = (0..right.len()).filter(|j| !rendered_right[*j]).collect();
    for &j in &trailing_right {
        let mut row: Record = vec![CellValue::Empty; left.width()];
        row.extend(right.record(j));
        if config.include_classification {
            row.push(CellValue::text(labels.right_only.as_str()));
        }
        merged.push_row(row);
    }

    MergedReport {
        merged,
        rendered: chosen.iter().map(|p| p.map(|pair| pair.right)).collect(),
        trailing_right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MatchRule, OutputMode};
    use crate::matcher::reconcile;

    fn table(name: &str, cols: &[&str], rows: &[&[&str]]) -> Table {
        Table::with_rows(
            name,
            cols.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| CellValue::from(*v)).collect())
                .collect(),
        )
    }

    fn fixture() -> (Table, Table) {
        let left = table(
            "CDL",
            &["id", "name"],
            &[&["1", "alpha"], &["2", "beta"], &["3", "gamma"]],
        );
        let right = table(
            "GITHUB",
            &["name", "owner"],
            &[&["ALPHA", "ann"], &["delta", "dan"], &["alpha ", "al"], &["Beta", "bo"]],
        );
        (left, right)
    }

    fn config() -> ReconConfig {
        ReconConfig::new(vec![MatchRule::labeled("by_name", "name", "name")])
    }

    #[test]
    fn partitioned_expands_pairs() {
        let (left, right) = fixture();
        let cfg = config();
        let rel = reconcile(&left, &right, &cfg.rules).unwrap();
        let report = build_partitioned(&left, &right, &rel, &cfg);

        assert_eq!(
            report.matched.columns,
            vec!["id", "name", "name", "owner", "Match_Type"]
        );
        assert_eq!(report.matched.len(), 3);
        // left 0 → right 0 and right 2, then left 1 → right 3
        let owners: Vec<String> = report.matched.rows.iter().map(|r| r[3].to_string()).collect();
        assert_eq!(owners, vec!["ann", "al", "bo"]);
        assert_eq!(report.matched.rows[0][4], CellValue::from("by_name"));

        assert_eq!(report.unmatched_left.name, "Unmatched_CDL");
        assert_eq!(report.unmatched_left.rows, vec![left.record(2)]);
        assert_eq!(report.unmatched_right.rows, vec![right.record(1)]);
    }

    #[test]
    fn partitioned_prefixes_and_no_classification() {
        let (left, right) = fixture();
        let mut cfg = config().with_classification(false);
        cfg.report.left_prefix = "CDL_".into();
        cfg.report.right_prefix = "GITHUB_".into();
        let rel = reconcile(&left, &right, &cfg.rules).unwrap();
        let report = build_partitioned(&left, &right, &rel, &cfg);
        assert_eq!(
            report.matched.columns,
            vec!["CDL_id", "CDL_name", "GITHUB_name", "GITHUB_owner"]
        );
        // Unmatched tables keep source names
        assert_eq!(report.unmatched_right.columns, vec!["name", "owner"]);
    }

    #[test]
    fn merged_takes_first_match_and_appends_leftovers() {
        let (left, right) = fixture();
        let cfg = config().with_mode(OutputMode::Merged);
        let rel = reconcile(&left, &right, &cfg.rules).unwrap();
        let report = build_merged(&left, &right, &rel, &cfg);

        assert_eq!(
            report.merged.columns,
            vec!["id", "name", "GITHUB_name", "GITHUB_owner", "Match_Type"]
        );
        assert_eq!(report.rendered, vec![Some(0), Some(3), None]);
        // right 2 matched left 0 but was not rendered; right 1 never matched
        assert_eq!(report.trailing_right, vec![1, 2]);
        assert_eq!(report.merged.len(), 5);

        let gamma = &report.merged.rows[2];
        assert_eq!(gamma[2], CellValue::Empty);
        assert_eq!(gamma[4], CellValue::from("No matching record in GITHUB"));

        let tail = &report.merged.rows[3];
        assert_eq!(tail[0], CellValue::Empty);
        assert_eq!(tail[2], CellValue::from("delta"));
        assert_eq!(tail[4], CellValue::from("No matching record in CDL"));
    }

    #[test]
    fn exclusive_claim_skips_taken_rows() {
        let left = table("CDL", &["k"], &[&["a"], &["a"], &["a"]]);
        let right = table("GITHUB", &["k"], &[&["a"], &["A"]]);
        let cfg = ReconConfig::new(vec![MatchRule::new("k", "k")])
            .with_mode(OutputMode::Merged)
            .with_claim(ClaimPolicy::Exclusive);
        let rel = reconcile(&left, &right, &cfg.rules).unwrap();
        let report = build_merged(&left, &right, &rel, &cfg);
        assert_eq!(report.rendered, vec![Some(0), Some(1), None]);
        assert!(report.trailing_right.is_empty());
        assert_eq!(report.merged.len(), 3);

        // Shared: all three take right 0, right 1 trails
        let shared = cfg.with_claim(ClaimPolicy::Shared);
        let report = build_merged(&left, &right, &rel, &shared);
        assert_eq!(report.rendered, vec![Some(0), Some(0), Some(0)]);
        assert_eq!(report.trailing_right, vec![1]);
    }

    #[test]
    fn merged_without_classification_column() {
        let (left, right) = fixture();
        let cfg = config().with_mode(OutputMode::Merged).with_classification(false);
        let rel = reconcile(&left, &right, &cfg.rules).unwrap();
        let report = build_merged(&left, &right, &rel, &cfg);
        assert_eq!(report.merged.width(), 4);
        assert!(report.merged.rows.iter().all(|r| r.len() == 4));
    }
}
