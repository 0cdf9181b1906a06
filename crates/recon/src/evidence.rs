use std::collections::BTreeMap;

use crate::classify::{classification_label, count_by_label};
use crate::config::ReconConfig;
use crate::model::{MatchRelation, ReconOutput, ReconSummary};

/// Compute summary statistics for a finished run.
///
/// Classification counts follow the output rows: every pair in partitioned
/// mode, the rendered pair plus the no-match / right-only rows in merged mode.
pub fn compute_summary(
    relation: &MatchRelation,
    output: &ReconOutput,
    config: &ReconConfig,
) -> ReconSummary {
    let rule_labels = config.rule_labels();
    let labels = &config.labels;

    let output_rows: BTreeMap<String, usize> = output
        .tables()
        .iter()
        .map(|t| (t.name.clone(), t.len()))
        .collect();

    let classification_counts = match output {
        ReconOutput::Partitioned(_) => count_by_label(relation, &rule_labels, labels),
        ReconOutput::Merged(report) => {
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for (i, rendered) in report.rendered.iter().enumerate() {
                let label = match rendered {
                    Some(j) => relation
                        .matches_for_left(i)
                        .iter()
                        .find(|p| p.right == *j)
                        .map(|p| {
                            classification_label(p.classification, &rule_labels, labels)
                        })
                        .unwrap_or_default(),
                    None => labels.no_match.as_str(),
                };
                *counts.entry(label.to_string()).or_insert(0) += 1;
            }
            if !report.trailing_right.is_empty() {
                *counts.entry(labels.right_only.clone()).or_insert(0) += report.trailing_right.len();
            }
            counts
        }
    };

    ReconSummary {
        left_rows: relation.left_len,
        right_rows: relation.right_len,
        matched_pairs: relation.pairs.len(),
        matched_left: relation.matched_left_count(),
        matched_right: relation.matched_right_count(),
        unmatched_left: relation.unmatched_left.len(),
        unmatched_right: relation.unmatched_right.len(),
        output_rows,
        classification_counts,
    }
}
