//! genesig-metrics — Accuracy scoring against hand-labeled targets, token
//! and cost accounting, and the persisted per-run metrics table.

pub mod accuracy;
pub mod cost;
pub mod store;

use thiserror::Error;

pub use accuracy::{score, AccuracyTally, BatchAccuracy};
pub use cost::{
    actual_costs, batch_input_cost, batch_output_cost, count_request_tokens, estimate_costs,
    CostEstimate, CostTotal,
};
pub use store::{MetricsRow, MetricsStore};

#[derive(Debug, Error)]
pub enum MetricsError {
    /// The batch and the target file are structurally mismatched; scoring
    /// the rest of the batch would be meaningless.
    #[error("no target entry for article {0}: batch and target set do not match")]
    MissingTarget(String),

    #[error("model {0} is missing from the cost rate table")]
    UnknownModel(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
