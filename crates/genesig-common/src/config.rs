//! Configuration loading for genesig.
//! Reads genesig.toml from the current directory or the path in the
//! GENESIG_CONFIG env var. The resulting `Config` is built once in `main`
//! and passed by reference into every component; no module reads settings
//! on its own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GenesigError, Result};
use crate::partition::BatchId;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_articles_info")]
    pub articles_info: PathBuf,
    #[serde(default = "default_articles_texts")]
    pub articles_texts: PathBuf,
    #[serde(default = "default_genes_info")]
    pub genes_info: PathBuf,
    /// Template with a `{prompt_number}` placeholder (zero-padded to two digits).
    #[serde(default = "default_prompt_template")]
    pub prompt: String,
    /// Templates with a `{batch_id}` placeholder.
    #[serde(default = "default_batch_input")]
    pub batch_input: String,
    #[serde(default = "default_batch_output")]
    pub batch_output: String,
    #[serde(default = "default_accuracy_log")]
    pub accuracy_log: String,
    #[serde(default = "default_targets_val")]
    pub targets_val: PathBuf,
    #[serde(default = "default_targets_test")]
    pub targets_test: PathBuf,
    #[serde(default = "default_metrics")]
    pub metrics: PathBuf,
    #[serde(default = "default_sqlite")]
    pub sqlite: PathBuf,
}

fn default_articles_info()   -> PathBuf { "data/articles/articles.tsv".into() }
fn default_articles_texts()  -> PathBuf { "data/articles/texts".into() }
fn default_genes_info()      -> PathBuf { "data/genes/genes.tsv".into() }
fn default_prompt_template() -> String  { "prompts/prompt_{prompt_number}.txt".into() }
fn default_batch_input()     -> String  { "batch/input_{batch_id}.jsonl".into() }
fn default_batch_output()    -> String  { "batch/output_{batch_id}.jsonl".into() }
fn default_accuracy_log()    -> String  { "logs/accuracy_{batch_id}.log".into() }
fn default_targets_val()     -> PathBuf { "targets/val.json".into() }
fn default_targets_test()    -> PathBuf { "targets/test.json".into() }
fn default_metrics()         -> PathBuf { "analysis/metrics.csv".into() }
fn default_sqlite()          -> PathBuf { "db/genesig.sqlite".into() }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            articles_info:  default_articles_info(),
            articles_texts: default_articles_texts(),
            genes_info:     default_genes_info(),
            prompt:         default_prompt_template(),
            batch_input:    default_batch_input(),
            batch_output:   default_batch_output(),
            accuracy_log:   default_accuracy_log(),
            targets_val:    default_targets_val(),
            targets_test:   default_targets_test(),
            metrics:        default_metrics(),
            sqlite:         default_sqlite(),
        }
    }
}

impl PathsConfig {
    pub fn prompt_path(&self, prompt_number: u32) -> PathBuf {
        self.prompt
            .replace("{prompt_number}", &format!("{prompt_number:02}"))
            .into()
    }

    pub fn batch_input_path(&self, batch_id: &BatchId) -> PathBuf {
        self.batch_input.replace("{batch_id}", batch_id.as_str()).into()
    }

    pub fn batch_output_path(&self, batch_id: &BatchId) -> PathBuf {
        self.batch_output.replace("{batch_id}", batch_id.as_str()).into()
    }

    pub fn accuracy_log_path(&self, batch_id: &BatchId) -> PathBuf {
        self.accuracy_log.replace("{batch_id}", batch_id.as_str()).into()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_completion_tokens")]
    pub max_completion_tokens: u32,
    #[serde(default = "default_completion_window")]
    pub completion_window: String,
}

fn default_model()                 -> String { "gpt-4.1-nano".to_string() }
fn default_api_base()              -> String { "https://api.openai.com/v1".to_string() }
fn default_api_key_env()           -> String { "GENESIG_OPENAI_API_KEY".to_string() }
fn default_max_completion_tokens() -> u32    { 2048 }
fn default_completion_window()     -> String { "24h".to_string() }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model:                 default_model(),
            api_base:              default_api_base(),
            api_key_env:           default_api_key_env(),
            max_completion_tokens: default_max_completion_tokens(),
            completion_window:     default_completion_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Minimum number of distinct gene symbols a line must mention to be kept.
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    /// Upper bound on concurrent line-selection workers.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_threshold()   -> usize { 2 }
fn default_max_workers() -> usize { 5 }

impl Default for RunConfig {
    fn default() -> Self {
        Self { threshold: default_threshold(), max_workers: default_max_workers() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Contact email sent with every E-utilities request, per NCBI policy.
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_max_attempts()   -> u32 { 5 }
fn default_retry_delay_ms() -> u64 { 1000 }

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            max_attempts:   default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            max_workers:    default_max_workers(),
        }
    }
}

impl Config {
    /// Load from an explicit path.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GenesigError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| GenesigError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Load from GENESIG_CONFIG, ./genesig.toml, or defaults, in that order.
    pub fn discover() -> Result<Self> {
        if let Ok(path) = std::env::var("GENESIG_CONFIG") {
            return Self::load(Path::new(&path));
        }
        let local = Path::new("genesig.toml");
        if local.exists() {
            return Self::load(local);
        }
        tracing::info!("no genesig.toml found, using built-in defaults");
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Partition;

    #[test]
    fn test_defaults_parse_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.llm.model, "gpt-4.1-nano");
        assert_eq!(config.llm.max_completion_tokens, 2048);
        assert_eq!(config.run.threshold, 2);
        assert_eq!(config.run.max_workers, 5);
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config: Config = toml::from_str("[run]\nthreshold = 3\n").unwrap();
        assert_eq!(config.run.threshold, 3);
        assert_eq!(config.run.max_workers, 5);
    }

    #[test]
    fn test_path_templates_render() {
        let paths = PathsConfig::default();
        let batch_id = Partition::Val.batch_id(7);
        assert_eq!(
            paths.batch_input_path(&batch_id),
            PathBuf::from("batch/input_val_07.jsonl")
        );
        assert_eq!(paths.prompt_path(3), PathBuf::from("prompts/prompt_03.txt"));
    }
}
