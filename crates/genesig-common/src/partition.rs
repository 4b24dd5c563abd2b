//! Dataset partitions and batch identifiers.
//!
//! Evaluation runs operate on hand-labeled validation and test partitions;
//! production runs cover the full corpus. A batch is identified by its
//! partition and prompt number, e.g. `val_07`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// The entire downloaded corpus.
    Full,
    Val,
    Test,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Full => "data",
            Partition::Val  => "val",
            Partition::Test => "test",
        }
    }

    /// Resolve from the mutually exclusive CLI flags.
    pub fn from_flags(val_set: bool, test_set: bool) -> Self {
        match (val_set, test_set) {
            (true, false) => Partition::Val,
            (false, true) => Partition::Test,
            _ => Partition::Full,
        }
    }

    pub fn batch_id(&self, prompt_number: u32) -> BatchId {
        BatchId(format!("{}_{:02}", self.as_str(), prompt_number))
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier tying a batch file to its partition and prompt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchId(String);

impl BatchId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_ids_are_zero_padded() {
        assert_eq!(Partition::Val.batch_id(7).as_str(), "val_07");
        assert_eq!(Partition::Test.batch_id(12).as_str(), "test_12");
        assert_eq!(Partition::Full.batch_id(0).as_str(), "data_00");
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(Partition::from_flags(true, false), Partition::Val);
        assert_eq!(Partition::from_flags(false, true), Partition::Test);
        assert_eq!(Partition::from_flags(false, false), Partition::Full);
    }
}
