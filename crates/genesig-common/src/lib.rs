//! genesig-common — Shared errors, configuration, and dataset types used
//! across all genesig crates.

pub mod config;
pub mod error;
pub mod partition;
pub mod targets;

pub use config::Config;
pub use error::{GenesigError, Result};
pub use partition::Partition;
pub use targets::TargetSet;
