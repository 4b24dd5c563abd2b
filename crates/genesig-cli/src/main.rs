//! genesig — mine PubMed Central full texts for gene signatures with an LLM.
//! Entry point for the pipeline binary.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use genesig_common::{Config, Partition};

#[derive(Parser)]
#[command(name = "genesig", version, about = "Gene-signature mining pipeline")]
struct Cli {
    /// Configuration file (default: GENESIG_CONFIG or ./genesig.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Mutually exclusive dataset-partition flags; neither means the full corpus.
#[derive(Args)]
#[group(multiple = false)]
struct PartitionArgs {
    /// Use the validation set instead of the entire dataset
    #[arg(long)]
    val_set: bool,
    /// Use the test set instead of the entire dataset
    #[arg(long)]
    test_set: bool,
}

impl PartitionArgs {
    fn partition(&self) -> Partition {
        Partition::from_flags(self.val_set, self.test_set)
    }
}

/// Same flags, but one of the two labeled partitions is required.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct RequiredPartitionArgs {
    /// Evaluate on the validation set
    #[arg(long)]
    val_set: bool,
    /// Evaluate on the test set
    #[arg(long)]
    test_set: bool,
}

impl RequiredPartitionArgs {
    fn partition(&self) -> Partition {
        Partition::from_flags(self.val_set, self.test_set)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Query PMC for the corpus and write the article-metadata table
    FetchMetadata,
    /// Download open-access article texts for the fetched metadata
    FetchTexts,
    /// Create the SQLite store and load article and gene reference data
    InitDb,
    /// Build a batch input file of requests for a prompt and article set
    Create {
        /// The number in the prompt filename
        prompt_number: u32,
        #[command(flatten)]
        partition: PartitionArgs,
        /// Maximum concurrent line-selection workers
        #[arg(short, long)]
        max_workers: Option<usize>,
    },
    /// Display token and cost estimates for an existing batch input file
    Cost {
        prompt_number: u32,
        #[command(flatten)]
        partition: PartitionArgs,
    },
    /// Execute a batch of requests from an existing input file
    Execute {
        prompt_number: u32,
        #[command(flatten)]
        partition: PartitionArgs,
        /// Run individual blocking chat completions instead of a batch job
        #[arg(short, long)]
        synchronous: bool,
    },
    /// Evaluate prompt accuracy and cost of a batch output, and record it
    Metrics {
        prompt_number: u32,
        #[command(flatten)]
        partition: RequiredPartitionArgs,
    },
    /// Insert gene signatures from a batch output into the SQLite store
    InsertSignatures {
        prompt_number: u32,
        #[command(flatten)]
        partition: PartitionArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover()?,
    };

    match cli.command {
        Command::FetchMetadata => commands::fetch_metadata(&config).await,
        Command::FetchTexts => commands::fetch_texts(&config).await,
        Command::InitDb => commands::init_db(&config),
        Command::Create { prompt_number, partition, max_workers } => {
            commands::create(&config, prompt_number, partition.partition(), max_workers).await
        }
        Command::Cost { prompt_number, partition } => {
            commands::cost(&config, prompt_number, partition.partition())
        }
        Command::Execute { prompt_number, partition, synchronous } => {
            commands::execute(&config, prompt_number, partition.partition(), synchronous).await
        }
        Command::Metrics { prompt_number, partition } => {
            commands::metrics(&config, prompt_number, partition.partition())
        }
        Command::InsertSignatures { prompt_number, partition } => {
            commands::insert_signatures(&config, prompt_number, partition.partition())
        }
    }
}
