//! Pipeline operations behind the subcommands.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use genesig_batch::{
    read_batch_input, read_batch_output, write_batch_input, BatchRequest, OpenAiClient,
};
use genesig_common::{Config, Partition, TargetSet};
use genesig_db::reference::read_article_info;
use genesig_db::Database;
use genesig_extract::{select_relevant, ArticleLines, GeneLexicon, GeneRegex};
use genesig_fetch::texts::{article_text_path, list_corpus_pmcids};
use genesig_fetch::{EntrezClient, TextFetcher};
use genesig_metrics::{actual_costs, estimate_costs, score, MetricsRow, MetricsStore};

/// PMCIDs of the articles a run covers: the labeled partition's target
/// keys, or every downloaded text for the full corpus.
fn run_pmcids(config: &Config, partition: Partition) -> Result<Vec<String>> {
    match partition {
        Partition::Full => list_corpus_pmcids(&config.paths.articles_texts),
        Partition::Val | Partition::Test => {
            Ok(load_targets(config, partition)?.pmcids().map(String::from).collect())
        }
    }
}

fn load_targets(config: &Config, partition: Partition) -> Result<TargetSet> {
    let path = match partition {
        Partition::Val => &config.paths.targets_val,
        Partition::Test => &config.paths.targets_test,
        Partition::Full => bail!("the full dataset has no target set"),
    };
    let targets = TargetSet::load(path)?;

    // Labeled partitions are curated by hand; refuse to run against one
    // that shares articles with its sibling.
    let other_path = match partition {
        Partition::Val => &config.paths.targets_test,
        _ => &config.paths.targets_val,
    };
    if other_path.exists() {
        let shared = targets.overlap(&TargetSet::load(other_path)?);
        if !shared.is_empty() {
            bail!(
                "validation and test sets share articles: {}",
                shared.join(", ")
            );
        }
    }
    Ok(targets)
}

pub async fn fetch_metadata(config: &Config) -> Result<()> {
    let client = EntrezClient::new(&config.fetch);
    let n_rows = client.write_article_info(&config.paths.articles_info).await?;
    println!("Wrote {n_rows} article-author rows to {}", config.paths.articles_info.display());
    Ok(())
}

pub async fn fetch_texts(config: &Config) -> Result<()> {
    let records = read_article_info(&config.paths.articles_info)
        .context("article metadata missing; run fetch-metadata first")?;
    let pmcids: Vec<String> = records
        .iter()
        .map(|record| record.pmcid.clone())
        .filter(|pmcid| !pmcid.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let fetcher = TextFetcher::new(&config.fetch);
    let written = fetcher.fetch_all(&pmcids, &config.paths.articles_texts).await?;
    println!("Downloaded {written} of {} article texts", pmcids.len());
    Ok(())
}

pub fn init_db(config: &Config) -> Result<()> {
    let mut db = Database::open(&config.paths.sqlite)?;

    let articles = read_article_info(&config.paths.articles_info)?;
    db.insert_articles(&articles)?;

    let lexicon = GeneLexicon::from_tsv_path(&config.paths.genes_info)?;
    db.insert_genes(lexicon.records())?;

    println!("Initialized store at {}", config.paths.sqlite.display());
    Ok(())
}

pub async fn create(
    config: &Config,
    prompt_number: u32,
    partition: Partition,
    max_workers: Option<usize>,
) -> Result<()> {
    let prompt_path = config.paths.prompt_path(prompt_number);
    let prompt = std::fs::read_to_string(&prompt_path)
        .with_context(|| format!("cannot read prompt {}", prompt_path.display()))?;

    let lexicon = GeneLexicon::from_tsv_path(&config.paths.genes_info)?;
    let regex = Arc::new(GeneRegex::build(lexicon.symbols())?);

    let pmcids = run_pmcids(config, partition)?;
    let articles = pmcids
        .iter()
        .map(|pmcid| {
            ArticleLines::from_file(
                pmcid.as_str(),
                &article_text_path(&config.paths.articles_texts, pmcid),
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let max_workers = max_workers.unwrap_or(config.run.max_workers);
    let mut texts =
        select_relevant(articles, regex, config.run.threshold, max_workers).await?;

    let requests: Vec<BatchRequest> = pmcids
        .iter()
        .map(|pmcid| {
            let content = texts.remove(pmcid).unwrap_or_default();
            BatchRequest::new(pmcid.as_str(), &prompt, &content, &config.llm)
        })
        .collect();

    let batch_id = partition.batch_id(prompt_number);
    let input_path = config.paths.batch_input_path(&batch_id);
    write_batch_input(&input_path, &requests)?;
    println!("Wrote {} requests to {}", requests.len(), input_path.display());
    Ok(())
}

pub fn cost(config: &Config, prompt_number: u32, partition: Partition) -> Result<()> {
    let batch_id = partition.batch_id(prompt_number);
    let input_path = config.paths.batch_input_path(&batch_id);
    let requests = read_batch_input(&input_path)
        .with_context(|| format!("cannot read batch input {}", input_path.display()))?;

    let estimate = estimate_costs(&requests)?;
    println!("Estimated Number of Input Tokens: {}", estimate.tokens);
    println!("Estimated Input Cost: ${}", estimate.input);
    println!("Maximum Output Cost: ${}", estimate.max_output);
    Ok(())
}

pub async fn execute(
    config: &Config,
    prompt_number: u32,
    partition: Partition,
    synchronous: bool,
) -> Result<()> {
    let batch_id = partition.batch_id(prompt_number);
    let input_path = config.paths.batch_input_path(&batch_id);
    let client = OpenAiClient::from_config(&config.llm)?;

    if synchronous {
        let output_path = config.paths.batch_output_path(&batch_id);
        let completed = client.execute_synchronous(&input_path, &output_path).await?;
        println!("Completed {completed} requests into {}", output_path.display());
    } else {
        let remote_id = client.submit_batch(&input_path).await?;
        println!("Submitted batch {batch_id} as {remote_id}");
    }
    Ok(())
}

pub fn metrics(config: &Config, prompt_number: u32, partition: Partition) -> Result<()> {
    let targets = load_targets(config, partition)?;
    let batch_id = partition.batch_id(prompt_number);
    let output_path = config.paths.batch_output_path(&batch_id);
    let responses = read_batch_output(&output_path)
        .with_context(|| format!("cannot read batch output {}", output_path.display()))?;

    let log_path = config.paths.accuracy_log_path(&batch_id);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut log = std::fs::File::create(&log_path)
        .with_context(|| format!("cannot write accuracy log {}", log_path.display()))?;

    let accuracy = score(&responses, &targets, &mut log)?;
    let positive_accuracy = accuracy
        .positive
        .ratio()
        .context("no positive articles in batch; accuracy undefined")?;
    let negative_accuracy = accuracy
        .negative
        .ratio()
        .context("no negative articles in batch; accuracy undefined")?;
    let costs = actual_costs(&responses)?;

    MetricsStore::new(&config.paths.metrics).upsert(MetricsRow {
        set: partition.as_str().to_string(),
        prompt_number,
        positive_accuracy,
        negative_accuracy,
        cost_input: costs.input,
        cost_output: costs.output,
    })?;

    println!("Positive Accuracy: {positive_accuracy}");
    println!("Negative Accuracy: {negative_accuracy}");
    println!("Input Cost: ${}", costs.input);
    println!("Output Cost: ${}", costs.output);
    Ok(())
}

pub fn insert_signatures(config: &Config, prompt_number: u32, partition: Partition) -> Result<()> {
    let batch_id = partition.batch_id(prompt_number);
    let output_path = config.paths.batch_output_path(&batch_id);
    let responses = read_batch_output(&output_path)
        .with_context(|| format!("cannot read batch output {}", output_path.display()))?;

    let mut db = Database::open(&config.paths.sqlite)?;
    let written = db.insert_signatures(&responses)?;
    println!("Inserted {written} gene-signature rows");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_targets(val: &str, test: &str) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.targets_val = dir.path().join("val.json");
        config.paths.targets_test = dir.path().join("test.json");
        std::fs::write(&config.paths.targets_val, val).unwrap();
        std::fs::write(&config.paths.targets_test, test).unwrap();
        (dir, config)
    }

    #[test]
    fn test_overlapping_partitions_refuse_to_load() {
        let (_dir, config) = config_with_targets(
            r#"{"PMC1": ["TP53"], "PMC2": []}"#,
            r#"{"PMC2": [], "PMC3": ["KRAS"]}"#,
        );
        for partition in [Partition::Val, Partition::Test] {
            let error = load_targets(&config, partition).unwrap_err();
            assert!(error.to_string().contains("PMC2"), "{error}");
        }
    }

    #[test]
    fn test_disjoint_partitions_load() {
        let (_dir, config) = config_with_targets(
            r#"{"PMC1": ["TP53"], "PMC2": []}"#,
            r#"{"PMC3": ["KRAS"]}"#,
        );
        assert_eq!(load_targets(&config, Partition::Val).unwrap().len(), 2);
        assert_eq!(load_targets(&config, Partition::Test).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_sibling_set_is_not_an_error() {
        let (dir, mut config) = config_with_targets(r#"{"PMC1": ["TP53"]}"#, "{}");
        config.paths.targets_test = dir.path().join("absent.json");
        assert_eq!(load_targets(&config, Partition::Val).unwrap().len(), 1);
    }
}
