//! Full-text download from the PMC Open Access buckets.
//!
//! Each article's plain text lives under one of three prefixes depending
//! on its license; they are tried in order. Downloads fan out over a
//! bounded worker pool with a join on the whole set, which caps concurrent
//! connections at the pool size. Articles absent from every bucket are
//! skipped, not fatal — only a subset of PMC is open access.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::StatusCode;

use genesig_common::config::FetchConfig;

use crate::retry::RetryPolicy;

const OA_BASE_URL: &str = "https://pmc-oa-opendata.s3.amazonaws.com";
const OA_BUCKETS: &[&str] = &["oa_comm", "oa_noncomm", "phe_timebound"];

pub struct TextFetcher {
    http: reqwest::Client,
    retry: RetryPolicy,
    max_workers: usize,
}

impl TextFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            retry: RetryPolicy::from_config(config),
            max_workers: config.max_workers.max(1),
        }
    }

    /// Try each bucket in order; `None` when the article is in none of them.
    /// Statuses other than genuine absence count as failed attempts, so a
    /// transient 5xx is retried instead of skipping the article.
    async fn fetch_one(&self, pmcid: &str) -> Result<Option<String>> {
        for bucket in OA_BUCKETS {
            let url = format!("{OA_BASE_URL}/{bucket}/txt/all/{pmcid}.txt");
            let resp = self
                .retry
                .run("oa text download", || {
                    let request = self.http.get(&url);
                    async move {
                        let resp = request.send().await?;
                        match bucket_outcome(resp.status()) {
                            BucketOutcome::Absent => Ok(None),
                            _ => resp.error_for_status().map(Some),
                        }
                    }
                })
                .await
                .with_context(|| format!("download failed for {pmcid}"))?;
            if let Some(resp) = resp {
                return Ok(Some(resp.text().await?));
            }
        }
        Ok(None)
    }

    /// Download every article's text into `dest_dir/{pmcid}.txt`. Returns
    /// the number of texts written.
    pub async fn fetch_all(&self, pmcids: &[String], dest_dir: &Path) -> Result<usize> {
        std::fs::create_dir_all(dest_dir)?;

        let mut downloads = stream::iter(pmcids.iter().map(|pmcid| async move {
            let text = self.fetch_one(pmcid).await?;
            Ok::<(&String, Option<String>), anyhow::Error>((pmcid, text))
        }))
        .buffer_unordered(self.max_workers);

        let mut written = 0usize;
        while let Some(download) = downloads.next().await {
            let (pmcid, text) = download?;
            match text {
                Some(text) => {
                    std::fs::write(dest_dir.join(format!("{pmcid}.txt")), text)?;
                    written += 1;
                }
                None => tracing::warn!(%pmcid, "article not in any open-access bucket"),
            }
        }
        tracing::info!(written, requested = pmcids.len(), "text download complete");
        Ok(written)
    }
}

/// How one bucket answered for an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BucketOutcome {
    Found,
    /// The article is not under this prefix; try the next bucket. S3 answers
    /// 403 for keys the anonymous reader cannot see, so both count as absence.
    Absent,
    /// Anything else is a failed attempt for the retry policy.
    Transient,
}

fn bucket_outcome(status: StatusCode) -> BucketOutcome {
    if status.is_success() {
        BucketOutcome::Found
    } else if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
        BucketOutcome::Absent
    } else {
        BucketOutcome::Transient
    }
}

/// Extract a PMCID from an article text filename, e.g. `PMC123456.txt`.
pub fn pmcid_from_filename(name: &str) -> Option<&str> {
    let stem = name.strip_suffix(".txt")?;
    let digits = stem.strip_prefix("PMC")?;
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(stem)
}

/// All PMCIDs present in a downloaded-texts directory.
pub fn list_corpus_pmcids(dir: &Path) -> Result<Vec<String>> {
    let mut pmcids = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("cannot list article texts in {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(pmcid) = pmcid_from_filename(&name.to_string_lossy()) {
            pmcids.push(pmcid.to_string());
        }
    }
    pmcids.sort();
    Ok(pmcids)
}

/// Path of one article's text file.
pub fn article_text_path(dir: &Path, pmcid: &str) -> PathBuf {
    dir.join(format!("{pmcid}.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_retried_not_treated_as_absence() {
        assert_eq!(bucket_outcome(StatusCode::OK), BucketOutcome::Found);
        assert_eq!(bucket_outcome(StatusCode::NOT_FOUND), BucketOutcome::Absent);
        assert_eq!(bucket_outcome(StatusCode::FORBIDDEN), BucketOutcome::Absent);
        assert_eq!(bucket_outcome(StatusCode::INTERNAL_SERVER_ERROR), BucketOutcome::Transient);
        assert_eq!(bucket_outcome(StatusCode::SERVICE_UNAVAILABLE), BucketOutcome::Transient);
        assert_eq!(bucket_outcome(StatusCode::TOO_MANY_REQUESTS), BucketOutcome::Transient);
    }

    #[test]
    fn test_pmcid_from_filename() {
        assert_eq!(pmcid_from_filename("PMC123456.txt"), Some("PMC123456"));
        assert_eq!(pmcid_from_filename("PMC.txt"), None);
        assert_eq!(pmcid_from_filename("PMC12x4.txt"), None);
        assert_eq!(pmcid_from_filename("notes.txt"), None);
        assert_eq!(pmcid_from_filename("PMC123456.xml"), None);
    }

    #[test]
    fn test_list_corpus_pmcids_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["PMC2.txt", "PMC10.txt", "README.md", "PMCbad.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let pmcids = list_corpus_pmcids(dir.path()).unwrap();
        assert_eq!(pmcids, ["PMC10", "PMC2"]);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_known_open_access_article() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = TextFetcher::new(&FetchConfig::default());
        let written = fetcher
            .fetch_all(&["PMC7092803".to_string()], dir.path())
            .await
            .unwrap();
        assert_eq!(written, 1);
    }
}
