use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use sciqa_core::{
    load_folder, Answer, AnswerOutcome, EmbeddingBackend, HashedNgramEmbedder, IndexBuilder,
    InMemoryVectorIndex, IngestionReport, ModelConfig, OllamaBackend, OllamaClient,
    OllamaEmbedder, PipelineConfig, QaPipeline, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_FAST_MODEL,
    DEFAULT_OLLAMA_URL, DEFAULT_PRIMARY_MODEL, DEFAULT_TOP_K,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Pipeline = QaPipeline<InMemoryVectorIndex<EmbeddingBackend>, OllamaBackend>;

const PREVIEW_RECORDS: usize = 3;
const PREVIEW_CHARS: usize = 800;

#[derive(Parser)]
#[command(name = "sciqa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    models: ModelArgs,
}

#[derive(Args)]
struct ModelArgs {
    /// Ollama base URL
    #[arg(long, env = "SCIQA_OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL, global = true)]
    ollama_url: String,

    /// Low-context model used to pick the most relevant sources
    #[arg(long, env = "SCIQA_FAST_MODEL", default_value = DEFAULT_FAST_MODEL, global = true)]
    fast_model: String,

    /// Model used to write the final answer
    #[arg(long, env = "SCIQA_PRIMARY_MODEL", default_value = DEFAULT_PRIMARY_MODEL, global = true)]
    primary_model: String,

    /// Ollama embedding model; the local hashing embedder is used when unset
    #[arg(long, env = "SCIQA_EMBEDDING_MODEL", global = true)]
    embedding_model: Option<String>,

    /// Vector size of the embedder; must match the Ollama model's output when one is set
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS, global = true)]
    embedding_dimensions: usize,

    /// Per-request timeout for model calls, in seconds
    #[arg(long, env = "SCIQA_TIMEOUT_SECS", default_value_t = 300, global = true)]
    timeout_secs: u64,

    /// Thread count hint passed to the models
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Load a folder of PDF/DOCX/TXT files, build the index and preview the text.
    Load {
        /// Folder that contains the documents, searched recursively.
        #[arg(long)]
        folder: PathBuf,
    },
    /// Answer a single question.
    Ask {
        #[arg(long)]
        folder: PathBuf,
        #[arg(long)]
        question: String,
        /// Number of candidate chunks to retrieve.
        #[arg(long, env = "SCIQA_TOP_K", default_value_t = DEFAULT_TOP_K)]
        k: usize,
        /// Print the answer as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Answer questions read line by line from stdin until EOF.
    Chat {
        #[arg(long)]
        folder: PathBuf,
        #[arg(long, env = "SCIQA_TOP_K", default_value_t = DEFAULT_TOP_K)]
        k: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "sciqa boot"
    );

    match cli.command {
        Command::Load { folder } => {
            let report = load_documents(&folder)?;
            let records = report.records.len();
            let (_, chunk_count) = IndexBuilder::new(embedder(&cli.models)?)
                .build(&report.records)
                .await?;

            println!("Loaded {records} document pages.");
            println!("Created vector store with {chunk_count} chunks.");
            for (position, record) in report.records.iter().take(PREVIEW_RECORDS).enumerate() {
                let preview: String = record.text.chars().take(PREVIEW_CHARS).collect();
                println!("--- document page {} ---\n{preview}", position + 1);
            }
        }
        Command::Ask {
            folder,
            question,
            k,
            json,
        } => {
            let pipeline = build_pipeline(&cli.models, &folder).await?;
            let answer = pipeline.answer_question(&question, k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                print_answer(&answer);
            }
        }
        Command::Chat { folder, k } => {
            let pipeline = build_pipeline(&cli.models, &folder).await?;
            println!("Ask a question (Ctrl-D to quit).");

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                match pipeline.answer_question(&line, k).await {
                    Ok(answer) => print_answer(&answer),
                    Err(error) => println!("error: {error}"),
                }
            }

            let stats = pipeline.cache().stats().await;
            info!(
                session = %pipeline.session_id(),
                entries = stats.entries,
                hits = stats.hits,
                misses = stats.misses,
                "chat session finished"
            );
        }
    }

    Ok(())
}

fn load_documents(folder: &Path) -> anyhow::Result<IngestionReport> {
    let report = load_folder(folder)
        .with_context(|| format!("loading documents from {}", folder.display()))?;

    for skipped in &report.skipped_files {
        warn!(file = %skipped.name, reason = %skipped.reason, "skipped document");
    }
    if report.records.is_empty() {
        bail!("no readable text found in {}", folder.display());
    }

    info!(
        folder = %folder.display(),
        records = report.records.len(),
        loaded_at = %report.loaded_at.to_rfc3339(),
        "documents loaded"
    );
    Ok(report)
}

fn ollama_client(models: &ModelArgs) -> anyhow::Result<OllamaClient> {
    Ok(OllamaClient::new(
        &models.ollama_url,
        Duration::from_secs(models.timeout_secs),
    )?)
}

fn embedder(models: &ModelArgs) -> anyhow::Result<EmbeddingBackend> {
    Ok(match &models.embedding_model {
        Some(model) => EmbeddingBackend::Ollama(OllamaEmbedder::new(
            ollama_client(models)?,
            model.clone(),
            models.embedding_dimensions,
        )),
        None => EmbeddingBackend::Hashed(HashedNgramEmbedder {
            dimensions: models.embedding_dimensions,
        }),
    })
}

fn pipeline_config(models: &ModelArgs) -> PipelineConfig {
    let mut config = PipelineConfig {
        fast: ModelConfig::fast(&models.fast_model),
        primary: ModelConfig::primary(&models.primary_model),
        ..PipelineConfig::default()
    };
    if let Some(threads) = models.threads {
        config.fast.thread_hint = threads;
        config.primary.thread_hint = threads;
    }
    config
}

async fn build_pipeline(models: &ModelArgs, folder: &Path) -> anyhow::Result<Pipeline> {
    let report = load_documents(folder)?;
    let (index, chunk_count) = IndexBuilder::new(embedder(models)?)
        .build(&report.records)
        .await?;
    println!(
        "Loaded {} document pages, {chunk_count} chunks indexed.",
        report.records.len()
    );

    let config = pipeline_config(models);
    let client = ollama_client(models)?;
    let fast = OllamaBackend::new(client.clone(), config.fast.clone());
    let primary = OllamaBackend::new(client, config.primary.clone());

    Ok(QaPipeline::new(index, fast, primary, &config)?)
}

fn print_answer(answer: &Answer) {
    println!("\n{}\n", answer.text.trim());
    if answer.outcome == AnswerOutcome::Blocked {
        return;
    }

    println!("Sources:");
    for source in &answer.sources {
        let name = source.source_name().unwrap_or("unknown");
        match source.page() {
            Some(page) => println!("  [Source {}] {name}, page {page}", source.source_index),
            None => println!("  [Source {}] {name}", source.source_index),
        }
    }
}
