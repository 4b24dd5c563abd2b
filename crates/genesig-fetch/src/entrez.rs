//! PubMed Central E-utilities client.
//!
//! Endpoints:
//!   esearch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   esummary: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi
//!
//! Summaries are retrieved in bounded batches and flattened into one TSV
//! row per (article, author) pair, which is the shape the relational store
//! ingests.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use genesig_common::config::FetchConfig;

use crate::retry::RetryPolicy;

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const ESUMMARY_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi";

/// Corpus query: articles reporting gene signatures or gene sets.
pub const CORPUS_TERM: &str = r#""gene signature" OR "gene set""#;

/// E-utilities caps esummary requests below 10k ids.
const SUMMARY_BATCH: usize = 9999;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ArticleInfoRow {
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

pub struct EntrezClient {
    http: reqwest::Client,
    email: String,
    retry: RetryPolicy,
}

impl EntrezClient {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            email: config.email.clone(),
            retry: RetryPolicy::from_config(config),
        }
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("retmode", "json".to_string()),
            ("tool", "genesig".to_string()),
        ];
        if !self.email.is_empty() {
            params.push(("email", self.email.clone()));
        }
        params
    }

    /// Search PMC and return the full id list.
    pub async fn search_pmc(&self, term: &str) -> Result<Vec<String>> {
        let mut params = self.base_params();
        params.push(("db", "pmc".to_string()));
        params.push(("term", term.to_string()));
        params.push(("retmax", i32::MAX.to_string()));

        let json: Value = self
            .retry
            .run("pmc esearch", || {
                let request = self.http.get(ESEARCH_URL).query(&params);
                async move { request.send().await?.error_for_status()?.json::<Value>().await }
            })
            .await
            .context("PMC esearch failed")?;

        let ids: Vec<String> = json["esearchresult"]["idlist"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        tracing::info!(n_ids = ids.len(), "PMC esearch complete");
        Ok(ids)
    }

    /// Fetch summaries for all ids, batched, flattened per author.
    pub async fn summaries(&self, ids: &[String]) -> Result<Vec<ArticleInfoRow>> {
        let mut rows = Vec::new();
        for (i, batch) in ids.chunks(SUMMARY_BATCH).enumerate() {
            tracing::info!(batch = i, n_ids = batch.len(), "retrieving summaries");
            let mut params = self.base_params();
            params.push(("db", "pmc".to_string()));
            params.push(("id", batch.join(",")));

            let json: Value = self
                .retry
                .run("pmc esummary", || {
                    let request = self.http.post(ESUMMARY_URL).form(&params);
                    async move { request.send().await?.error_for_status()?.json::<Value>().await }
                })
                .await
                .context("PMC esummary failed")?;
            rows.extend(summary_rows(&json["result"]));
        }
        Ok(rows)
    }

    /// Query the corpus and write the article-info TSV.
    pub async fn write_article_info(&self, path: &Path) -> Result<usize> {
        let ids = self.search_pmc(CORPUS_TERM).await?;
        let rows = self.summaries(&ids).await?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .with_context(|| format!("cannot write article info {}", path.display()))?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        tracing::info!(n_rows = rows.len(), path = %path.display(), "article info written");
        Ok(rows.len())
    }
}

/// Flatten an esummary result object into one row per (article, author).
fn summary_rows(result: &Value) -> Vec<ArticleInfoRow> {
    let Some(uids) = result["uids"].as_array() else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for uid in uids.iter().filter_map(Value::as_str) {
        let summary = &result[uid];
        let field = |key: &str| summary[key].as_str().unwrap_or("").to_string();

        let id_of = |idtype: &str| {
            summary["articleids"]
                .as_array()
                .and_then(|ids| {
                    ids.iter()
                        .find(|id| id["idtype"].as_str() == Some(idtype))
                        .and_then(|id| id["value"].as_str())
                })
                .unwrap_or("")
                .to_string()
        };

        let authors: Vec<String> = summary["authors"]
            .as_array()
            .map(|authors| {
                authors
                    .iter()
                    .filter_map(|author| author["name"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        for author in authors {
            rows.push(ArticleInfoRow {
                doi: id_of("doi"),
                pmcid: id_of("pmcid"),
                title: field("title"),
                author,
                journal: field("fulljournalname"),
                volume: field("volume"),
                issue: field("issue"),
                pages: field("pages"),
                date: field("pubdate"),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_rows_flatten_per_author() {
        let result = serde_json::json!({
            "uids": ["10001"],
            "10001": {
                "title": "A gene signature of things",
                "fulljournalname": "Journal of Signatures",
                "volume": "12",
                "issue": "3",
                "pages": "1-10",
                "pubdate": "2024 Jan",
                "articleids": [
                    {"idtype": "pmcid", "value": "PMC10001"},
                    {"idtype": "doi", "value": "10.1000/sig.1"}
                ],
                "authors": [{"name": "Reyes A"}, {"name": "Okafor B"}]
            }
        });
        let rows = summary_rows(&result);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pmcid, "PMC10001");
        assert_eq!(rows[0].doi, "10.1000/sig.1");
        assert_eq!(rows[0].author, "Reyes A");
        assert_eq!(rows[1].author, "Okafor B");
    }

    #[test]
    fn test_summary_rows_tolerate_missing_fields() {
        let result = serde_json::json!({
            "uids": ["10002"],
            "10002": {
                "title": "No ids, no authors"
            }
        });
        // No authors: nothing to flatten, the article contributes no rows.
        assert!(summary_rows(&result).is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_pmc_search_returns_ids() {
        let client = EntrezClient::new(&FetchConfig::default());
        let ids = client.search_pmc("PMC7000000[uid]").await.unwrap();
        assert!(!ids.is_empty());
    }
}
