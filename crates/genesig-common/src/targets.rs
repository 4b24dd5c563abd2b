//! Hand-labeled target sets.
//!
//! A target set maps each article PMCID in a dataset partition to the gene
//! signature expected from it. An empty list marks a confirmed negative
//! article. Partitions are curated manually and must stay pairwise disjoint.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetSet(BTreeMap<String, Vec<String>>);

impl TargetSet {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read target set {}", path.display()))?;
        let map: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw)?;
        Ok(Self(map))
    }

    pub fn get(&self, pmcid: &str) -> Option<&[String]> {
        self.0.get(pmcid).map(Vec::as_slice)
    }

    pub fn pmcids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// PMCIDs appearing in both sets. Curated partitions must not overlap,
    /// so a non-empty result indicates a labeling mistake.
    pub fn overlap<'a>(&'a self, other: &TargetSet) -> Vec<&'a str> {
        self.0
            .keys()
            .filter(|pmcid| other.0.contains_key(*pmcid))
            .map(String::as_str)
            .collect()
    }
}

impl FromIterator<(String, Vec<String>)> for TargetSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
