//! Reference data loading: articles and authors from the metadata TSV,
//! genes and synonyms from the gene lexicon.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use genesig_extract::GeneRecord;

use crate::{Database, Result};

/// One (article, author) row of the metadata TSV written by the fetch step.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleInfoRecord {
    pub doi: String,
    pub pmcid: String,
    pub title: String,
    pub author: String,
    pub journal: String,
    pub volume: String,
    pub issue: String,
    pub pages: String,
    pub date: String,
}

pub fn read_article_info(path: &Path) -> Result<Vec<ArticleInfoRecord>> {
    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_path(path)?;
    Ok(reader.deserialize().collect::<std::result::Result<Vec<_>, _>>()?)
}

impl Database {
    /// Insert articles, authors, and their join rows. Re-running is
    /// harmless; every insert ignores existing rows.
    pub fn insert_articles(&mut self, records: &[ArticleInfoRecord]) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        {
            let mut insert_article = tx.prepare(
                "INSERT OR IGNORE INTO Article (pmcid, doi, title, journal, volume, issue, pages, date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            let mut insert_author =
                tx.prepare("INSERT OR IGNORE INTO Author (name) VALUES (?1)")?;
            let mut author_id = tx.prepare("SELECT id FROM Author WHERE name = ?1")?;
            let mut insert_contribution = tx.prepare(
                "INSERT OR IGNORE INTO ArticleAuthor (article_pmcid, author_id) VALUES (?1, ?2)",
            )?;

            for record in records {
                if record.pmcid.is_empty() {
                    continue;
                }
                insert_article.execute(rusqlite::params![
                    record.pmcid,
                    record.doi,
                    record.title,
                    record.journal,
                    record.volume,
                    record.issue,
                    record.pages,
                    record.date,
                ])?;
                if record.author.is_empty() {
                    continue;
                }
                insert_author.execute([&record.author])?;
                let id: i64 = author_id.query_row([&record.author], |row| row.get(0))?;
                insert_contribution.execute(rusqlite::params![record.pmcid, id])?;
            }
        }
        tx.commit()?;
        tracing::info!(n_rows = records.len(), "article reference data inserted");
        Ok(())
    }

    /// Insert genes and their synonyms from lexicon records.
    pub fn insert_genes(&mut self, records: &[GeneRecord]) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        {
            let mut insert_gene = tx.prepare(
                "INSERT OR IGNORE INTO Gene (ensembl_id, name, chromosome) VALUES (?1, ?2, ?3)",
            )?;
            let mut insert_synonym = tx.prepare(
                "INSERT OR IGNORE INTO GeneSynonym (gene_ensembl_id, name) VALUES (?1, ?2)",
            )?;

            let mut seen = BTreeSet::new();
            for record in records {
                if seen.insert(record.ensembl_id.as_str()) {
                    insert_gene.execute(rusqlite::params![
                        record.ensembl_id,
                        record.name,
                        record.chromosome,
                    ])?;
                }
                if let Some(synonym) = record.synonym.as_deref().filter(|s| !s.is_empty()) {
                    insert_synonym.execute(rusqlite::params![record.ensembl_id, synonym])?;
                }
            }
        }
        tx.commit()?;
        tracing::info!(n_rows = records.len(), "gene reference data inserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genesig_extract::GeneLexicon;

    fn lexicon() -> Vec<GeneRecord> {
        const TSV: &str = "\
ensembl_gene_id\texternal_gene_name\tchromosome_name\texternal_synonym
ENSG00000141510\tTP53\t17\tp53
ENSG00000141510\tTP53\t17\tLFS1
ENSG00000012048\tBRCA1\t17\t
";
        GeneLexicon::from_reader(TSV.as_bytes())
            .unwrap()
            .records()
            .to_vec()
    }

    #[test]
    fn test_articles_and_authors_deduplicated() {
        let mut db = Database::open_in_memory().unwrap();
        let row = |pmcid: &str, author: &str| ArticleInfoRecord {
            doi: String::new(),
            pmcid: pmcid.to_string(),
            title: "t".to_string(),
            author: author.to_string(),
            journal: "j".to_string(),
            volume: String::new(),
            issue: String::new(),
            pages: String::new(),
            date: String::new(),
        };
        db.insert_articles(&[
            row("PMC1", "Reyes A"),
            row("PMC1", "Okafor B"),
            row("PMC2", "Reyes A"),
        ])
        .unwrap();

        let conn = db.conn();
        let articles: i64 =
            conn.query_row("SELECT COUNT(*) FROM Article", [], |r| r.get(0)).unwrap();
        let authors: i64 =
            conn.query_row("SELECT COUNT(*) FROM Author", [], |r| r.get(0)).unwrap();
        let contributions: i64 =
            conn.query_row("SELECT COUNT(*) FROM ArticleAuthor", [], |r| r.get(0)).unwrap();
        assert_eq!((articles, authors, contributions), (2, 2, 3));
    }

    #[test]
    fn test_genes_one_row_per_gene_and_synonym() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_genes(&lexicon()).unwrap();

        let conn = db.conn();
        let genes: i64 = conn.query_row("SELECT COUNT(*) FROM Gene", [], |r| r.get(0)).unwrap();
        let synonyms: i64 =
            conn.query_row("SELECT COUNT(*) FROM GeneSynonym", [], |r| r.get(0)).unwrap();
        assert_eq!((genes, synonyms), (2, 2));
    }
}
