//! Gene lexicon loading.
//!
//! The reference table is a TSV export with one row per (gene, synonym)
//! pair: Ensembl gene ID, canonical name, chromosome, and an optional
//! external synonym. The same records feed both the symbol list for regex
//! construction and the Gene/GeneSynonym tables in the relational store.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use genesig_common::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct GeneRecord {
    #[serde(rename = "ensembl_gene_id")]
    pub ensembl_id: String,
    #[serde(rename = "external_gene_name")]
    pub name: String,
    #[serde(rename = "chromosome_name")]
    pub chromosome: String,
    /// Empty in the export for genes without synonyms.
    #[serde(rename = "external_synonym")]
    pub synonym: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GeneLexicon {
    records: Vec<GeneRecord>,
}

impl GeneLexicon {
    pub fn from_tsv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("cannot open gene table {}", path.display()))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut tsv = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(reader);
        let records = tsv
            .deserialize()
            .collect::<std::result::Result<Vec<GeneRecord>, _>>()?;
        tracing::info!(n_records = records.len(), "loaded gene lexicon");
        Ok(Self { records })
    }

    pub fn records(&self) -> &[GeneRecord] {
        &self.records
    }

    /// Deduplicated canonical names and synonyms, empties dropped.
    pub fn symbols(&self) -> Vec<String> {
        let mut unique = BTreeSet::new();
        for record in &self.records {
            if !record.name.is_empty() {
                unique.insert(record.name.clone());
            }
            if let Some(synonym) = &record.synonym {
                if !synonym.is_empty() {
                    unique.insert(synonym.clone());
                }
            }
        }
        unique.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "\
ensembl_gene_id\texternal_gene_name\tchromosome_name\texternal_synonym
ENSG00000141510\tTP53\t17\tp53
ENSG00000141510\tTP53\t17\tLFS1
ENSG00000012048\tBRCA1\t17\t
ENSG00000133703\tKRAS\t12\tK-RAS
";

    #[test]
    fn test_records_keep_one_row_per_synonym() {
        let lexicon = GeneLexicon::from_reader(TSV.as_bytes()).unwrap();
        assert_eq!(lexicon.records().len(), 4);
        assert_eq!(lexicon.records()[0].ensembl_id, "ENSG00000141510");
        assert!(lexicon.records()[2].synonym.is_none());
    }

    #[test]
    fn test_symbols_merge_names_and_synonyms() {
        let lexicon = GeneLexicon::from_reader(TSV.as_bytes()).unwrap();
        let symbols = lexicon.symbols();
        for expected in ["TP53", "p53", "LFS1", "BRCA1", "KRAS", "K-RAS"] {
            assert!(symbols.iter().any(|s| s == expected), "missing {expected}");
        }
        // TP53 appears on two rows but once in the symbol list
        assert_eq!(symbols.iter().filter(|s| *s == "TP53").count(), 1);
    }
}
