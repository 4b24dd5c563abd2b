//! Persisted metrics table.
//!
//! One CSV row per (set, prompt_number) evaluation run. Upserts replace a
//! matching row in place, otherwise append; the table is re-sorted by key
//! and rewritten whole on every update. The read-modify-write cycle is not
//! transactional — runs are driven one at a time from the CLI, and a
//! concurrent writer would simply win last.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::MetricsError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub set: String,
    pub prompt_number: u32,
    pub positive_accuracy: f64,
    pub negative_accuracy: f64,
    pub cost_input: f64,
    pub cost_output: f64,
}

pub struct MetricsStore {
    path: PathBuf,
}

impl MetricsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All rows currently persisted. A store that does not exist yet is an
    /// initialization case, not an error.
    pub fn load(&self) -> Result<Vec<MetricsRow>, MetricsError> {
        match std::fs::File::open(&self.path) {
            Ok(file) => {
                let mut reader = csv::Reader::from_reader(file);
                Ok(reader.deserialize().collect::<Result<Vec<_>, _>>()?)
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "metrics table not found, starting empty");
                Ok(Vec::new())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Replace the row keyed (set, prompt_number) or append it, then persist
    /// the table sorted by that key.
    pub fn upsert(&self, row: MetricsRow) -> Result<(), MetricsError> {
        let mut rows = self.load()?;
        match rows
            .iter_mut()
            .find(|existing| existing.set == row.set && existing.prompt_number == row.prompt_number)
        {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
        rows.sort_by(|a, b| {
            a.set
                .cmp(&b.set)
                .then_with(|| a.prompt_number.cmp(&b.prompt_number))
        });

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
