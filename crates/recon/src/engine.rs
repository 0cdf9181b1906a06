use tracing::info;

use crate::assemble::{build_merged, build_partitioned};
use crate::config::{OutputMode, ReconConfig};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::matcher::reconcile;
use crate::model::{ReconInput, ReconMeta, ReconOutput, ReconResult};

/// Run reconciliation per config: validate, match, assemble, summarize.
///
/// Config errors and missing columns surface before any matching happens.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    config.validate()?;

    let relation = reconcile(&input.left, &input.right, &config.rules)?;

    let output = match config.mode {
        OutputMode::Partitioned => ReconOutput::Partitioned(build_partitioned(
            &input.left,
            &input.right,
            &relation,
            config,
        )),
        OutputMode::Merged => {
            ReconOutput::Merged(build_merged(&input.left, &input.right, &relation, config))
        }
    };

    let summary = compute_summary(&relation, &output, config);

    info!(
        config = %config.name,
        mode = %config.mode,
        left_rows = summary.left_rows,
        right_rows = summary.right_rows,
        matched_pairs = summary.matched_pairs,
        unmatched_left = summary.unmatched_left,
        unmatched_right = summary.unmatched_right,
        "reconciliation complete"
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            mode: config.mode,
            rules: config.rule_labels(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        relation,
        output,
    })
}
