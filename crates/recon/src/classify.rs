use std::collections::BTreeMap;

use crate::config::Labels;
use crate::model::{Classification, MatchRelation};

/// Classify a pair by the rules that fired for it.
///
/// `fired` must be non-empty; two or more rules → `Both`.
pub fn classify(fired: &[usize]) -> Classification {
    match fired {
        [only] => Classification::Single(*only),
        _ => Classification::Both,
    }
}

/// Text written to the classification column for a matched pair.
pub fn classification_label<'a>(
    classification: Classification,
    rule_labels: &'a [String],
    labels: &'a Labels,
) -> &'a str {
    match classification {
        Classification::Both => &labels.both,
        Classification::Single(idx) => rule_labels.get(idx).map(String::as_str).unwrap_or(""),
    }
}

/// Pair counts per classification label over the whole relation.
pub fn count_by_label(
    relation: &MatchRelation,
    rule_labels: &[String],
    labels: &Labels,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for pair in &relation.pairs {
        let label = classification_label(pair.classification, rule_labels, labels);
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    counts
}
