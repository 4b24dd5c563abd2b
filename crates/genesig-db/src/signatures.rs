//! Gene-signature insertion.
//!
//! Predicted gene names are resolved to Ensembl IDs before storage:
//! an exact canonical-name match first, then a synonym match, otherwise
//! the name is dropped. Records whose content failed to parse are skipped
//! entirely; their articles get no signature rows.

use std::collections::BTreeSet;

use rusqlite::OptionalExtension;

use genesig_batch::response::{BatchResponse, Prediction};

use crate::{Database, Result};

impl Database {
    /// Resolve a gene name to its Ensembl ID: canonical name first,
    /// synonym fallback, else `None`.
    pub fn resolve_ensembl_id(&self, gene: &str) -> Result<Option<String>> {
        let by_name: Option<String> = self
            .conn()
            .query_row("SELECT ensembl_id FROM Gene WHERE name = ?1", [gene], |row| row.get(0))
            .optional()?;
        if by_name.is_some() {
            return Ok(by_name);
        }
        Ok(self
            .conn()
            .query_row(
                "SELECT gene_ensembl_id FROM GeneSynonym WHERE name = ?1",
                [gene],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Insert all resolvable gene signatures from a batch output. Returns
    /// the number of (article, gene) rows written.
    pub fn insert_signatures(&mut self, responses: &[BatchResponse]) -> Result<usize> {
        // Resolve before opening the write transaction
        let mut rows: BTreeSet<(String, String)> = BTreeSet::new();
        for response in responses {
            let genes = match &response.prediction {
                Prediction::Genes(genes) => genes,
                Prediction::Malformed { error } => {
                    tracing::warn!(pmcid = %response.custom_id, %error,
                        "skipping unparseable prediction");
                    continue;
                }
            };
            for gene in genes {
                match self.resolve_ensembl_id(gene)? {
                    Some(ensembl_id) => {
                        rows.insert((response.custom_id.clone(), ensembl_id));
                    }
                    None => {
                        tracing::debug!(pmcid = %response.custom_id, %gene,
                            "gene name did not resolve, dropped");
                    }
                }
            }
        }

        let tx = self.conn_mut().transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT OR IGNORE INTO GeneSignature (article_pmcid, gene_ensembl_id)
                 VALUES (?1, ?2)",
            )?;
            for (pmcid, ensembl_id) in &rows {
                insert.execute(rusqlite::params![pmcid, ensembl_id])?;
            }
        }
        tx.commit()?;
        tracing::info!(n_rows = rows.len(), "gene signatures inserted");
        Ok(rows.len())
    }
}
