//! Batch accuracy scoring.
//!
//! Articles are classified by their ground truth: positive when the target
//! gene list is non-empty, negative when it is empty. A prediction is
//! correct only when it parsed and its gene set equals the target set
//! exactly — order- and duplicate-independent, but case-sensitive string
//! comparison with no normalization. Every record is written to an audit
//! log so misses can be inspected by hand.

use std::collections::HashSet;
use std::io::Write;

use genesig_batch::response::{BatchResponse, Prediction};
use genesig_common::TargetSet;

use crate::MetricsError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccuracyTally {
    pub correct: u64,
    pub total: u64,
}

impl AccuracyTally {
    /// `None` when no article of this class was scored; a ratio over zero
    /// articles is undefined and callers must not interpret it.
    pub fn ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchAccuracy {
    pub positive: AccuracyTally,
    pub negative: AccuracyTally,
}

/// Score a batch of responses against its target set, writing the
/// per-record audit log to `log`. A response whose PMCID has no target
/// entry aborts the whole run.
pub fn score<W: Write>(
    responses: &[BatchResponse],
    targets: &TargetSet,
    log: &mut W,
) -> Result<BatchAccuracy, MetricsError> {
    let mut accuracy = BatchAccuracy::default();

    for response in responses {
        let pmcid = response.custom_id.as_str();
        let target = targets
            .get(pmcid)
            .ok_or_else(|| MetricsError::MissingTarget(pmcid.to_string()))?;

        writeln!(log, "PMCID: {pmcid}")?;
        match &response.prediction {
            Prediction::Genes(genes) => {
                writeln!(log, "Content: {}", response.raw_content)?;
                writeln!(log, "Target: {target:?}")?;
                writeln!(log, "Prediction: {genes:?}")?;
            }
            Prediction::Malformed { error } => {
                writeln!(log, "Content: {error}")?;
                writeln!(log, "Target: {target:?}")?;
                writeln!(log, "Prediction: None")?;
            }
        }

        let tally = if target.is_empty() {
            &mut accuracy.negative
        } else {
            &mut accuracy.positive
        };
        tally.total += 1;

        let correct = response
            .prediction
            .genes()
            .is_some_and(|genes| gene_set(genes) == gene_set(target));
        if correct {
            tally.correct += 1;
            writeln!(log, "Correct")?;
        } else {
            writeln!(log, "Incorrect")?;
        }
        writeln!(log, "{}", "-".repeat(120))?;
    }

    writeln!(
        log,
        "Correct Positive Examples: {} out of {}",
        accuracy.positive.correct, accuracy.positive.total
    )?;
    writeln!(
        log,
        "Correct Negative Examples: {} out of {}",
        accuracy.negative.correct, accuracy.negative.total
    )?;

    tracing::info!(
        positive_correct = accuracy.positive.correct,
        positive_total = accuracy.positive.total,
        negative_correct = accuracy.negative.correct,
        negative_total = accuracy.negative.total,
        "batch scored"
    );
    Ok(accuracy)
}

fn gene_set(genes: &[String]) -> HashSet<&str> {
    genes.iter().map(String::as_str).collect()
}
