//! Bounded parallel line selection.
//!
//! Per-article selection is independent CPU work: each worker gets one
//! article's lines plus the shared immutable pattern and returns one
//! (pmcid, joined text) pair. At most `max_workers` tasks run at once and
//! the caller joins on the full set before continuing.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};

use crate::regex::GeneRegex;
use crate::select::relevant_lines;

/// One article's text, split into lines without trailing newlines.
#[derive(Debug, Clone)]
pub struct ArticleLines {
    pub pmcid: String,
    pub lines: Vec<String>,
}

impl ArticleLines {
    /// Read an article body from disk. Invalid UTF-8 bytes are replaced
    /// rather than rejected; OA conversions contain stray encodings.
    pub fn from_file(pmcid: impl Into<String>, path: &std::path::Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("cannot read article text {}", path.display()))?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(Self {
            pmcid: pmcid.into(),
            lines: text.lines().map(str::to_string).collect(),
        })
    }
}

/// Select relevant lines from every article, `max_workers` at a time, and
/// collect the joined texts keyed by PMCID once all workers finish.
pub async fn select_relevant(
    articles: Vec<ArticleLines>,
    regex: Arc<GeneRegex>,
    threshold: usize,
    max_workers: usize,
) -> Result<HashMap<String, String>> {
    let n_articles = articles.len();
    let mut selections = stream::iter(articles.into_iter().map(|article| {
        let regex = Arc::clone(&regex);
        tokio::task::spawn_blocking(move || {
            let lines: Vec<&str> = article.lines.iter().map(String::as_str).collect();
            let joined = relevant_lines(lines, &regex, threshold).join("\n");
            (article.pmcid, joined)
        })
    }))
    .buffer_unordered(max_workers.max(1));

    let mut texts = HashMap::with_capacity(n_articles);
    while let Some(joined) = selections.next().await {
        let (pmcid, text) = joined.context("line-selection worker panicked")?;
        texts.insert(pmcid, text);
    }
    tracing::info!(n_articles, "relevant-line selection complete");
    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(pmcid: &str, lines: &[&str]) -> ArticleLines {
        ArticleLines {
            pmcid: pmcid.to_string(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_all_articles_are_collected() {
        let regex = Arc::new(GeneRegex::build(["GeneA", "GeneB"]).unwrap());
        let articles = vec![
            article("PMC1", &["GeneA GeneB", "filler"]),
            article("PMC2", &["nothing relevant"]),
            article("PMC3", &["GeneB GeneA here", "GeneA GeneB again"]),
        ];

        let texts = select_relevant(articles, regex, 2, 2).await.unwrap();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts["PMC1"], "GeneA GeneB");
        assert_eq!(texts["PMC2"], "");
        assert_eq!(texts["PMC3"], "GeneB GeneA here\nGeneA GeneB again");
    }

    #[tokio::test]
    async fn test_worker_bound_of_one_still_completes() {
        let regex = Arc::new(GeneRegex::build(["GeneA"]).unwrap());
        let articles = (0..10)
            .map(|i| article(&format!("PMC{i}"), &["GeneA mention"]))
            .collect();
        let texts = select_relevant(articles, regex, 1, 1).await.unwrap();
        assert_eq!(texts.len(), 10);
    }
}
