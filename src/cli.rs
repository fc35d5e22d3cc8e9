use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::answer::AnswerGenerator;
use crate::check;
use crate::config::Config;
use crate::embedding::EmbeddingBackend;
use crate::faq;
use crate::gemini::VertexClient;
use crate::index::{self, FaqIndex, IndexLocation, build_with_fallback};
use crate::pipeline::{self, QueryOrchestrator};
use crate::session::Conversation;
use crate::translate::{GoogleTranslateClient, Translator};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type Orchestrator = QueryOrchestrator<GoogleTranslateClient, EmbeddingBackend, VertexClient>;
type BoxError = Box<dyn std::error::Error>;

/// Multilingual FAQ assistant backed by Google Translate and Vertex AI.
#[derive(Debug, Parser)]
#[command(name = "polyglot-faq", version, about)]
pub struct Cli {
    /// FAQ file (overrides FAQ_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    faqs: Option<PathBuf>,

    /// Index directory (overrides INDEX_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat (default)
    Chat,
    /// Answer a single question and exit
    Ask {
        message: String,
        /// Also print the retrieved FAQ entries with their scores
        #[arg(long)]
        sources: bool,
    },
    /// Rebuild the FAQ index from the FAQ file
    BuildIndex {
        /// Use the local MiniLM embedder even when OpenAI is configured
        #[arg(long)]
        free: bool,
    },
    /// ServiceReport each backend service once
    Check,
}

pub async fn run(cli: Cli) -> Result<(), BoxError> {
    let mut config = Config::from_env();
    if let Some(path) = cli.faqs {
        config.faq_path = path;
    }
    if let Some(dir) = cli.index_dir {
        config.index_dir = dir;
    }

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(&http, &config).await,
        Command::Ask { message, sources } => ask(&http, &config, &message, sources).await,
        Command::BuildIndex { free } => build_index(&http, &config, free).await,
        Command::Check => run_checks(&http, &config).await,
    }
}

async fn start(http: &Client, config: &Config) -> Result<Orchestrator, BoxError> {
    // Missing project id is fatal before any query runs.
    let model = VertexClient::from_config(http.clone(), config)?;

    let location = IndexLocation::from_config(config);
    if !location.index_file().exists() {
        info!(dir = %location.dir.display(), "first run, embedding the FAQ file before the first query");
    }
    let embedder = index::query_embedder(http.clone(), config, &location)?;
    let index = FaqIndex::load(embedder, &location).await?;
    if index.is_empty() {
        warn!(faqs = %config.faq_path.display(), "FAQ index is empty, every answer will be the apology");
    }
    info!(entries = index.len(), embedder = %index.identity(), "FAQ index ready");

    Ok(QueryOrchestrator::new(
        Translator::new(GoogleTranslateClient::from_config(http.clone(), config)),
        index,
        AnswerGenerator::new(model),
    ))
}

async fn chat(http: &Client, config: &Config) -> Result<(), BoxError> {
    let orchestrator = start(http, config).await?;
    let mut conversation = Conversation::new();

    println!("Ask a question in any language. /history shows the conversation, /quit exits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/quit" | "/exit" => break,
            "/history" => {
                if conversation.messages().is_empty() {
                    println!("(no messages yet)\n");
                } else {
                    println!("{}\n", conversation.transcript());
                }
            }
            input => {
                if let Some(reply) = conversation.submit(&orchestrator, input).await {
                    println!("Assistant: {reply}\n");
                }
            }
        }
    }
    Ok(())
}

async fn ask(http: &Client, config: &Config, message: &str, sources: bool) -> Result<(), BoxError> {
    let orchestrator = start(http, config).await?;

    if !sources {
        println!("{}", orchestrator.respond(message).await);
        return Ok(());
    }

    match orchestrator.answer_with_sources(message).await {
        Ok((answer, retrieved)) => {
            for scored in &retrieved {
                eprintln!("[{:.3}] {}", scored.score, scored.entry.question);
            }
            println!("{answer}");
        }
        Err(e) => println!("{}", pipeline::error_reply(&e)),
    }
    Ok(())
}

async fn build_index(http: &Client, config: &Config, free: bool) -> Result<(), BoxError> {
    let faqs = faq::load_faqs(&config.faq_path)?;
    let primary = if free {
        EmbeddingBackend::free(config)
    } else {
        EmbeddingBackend::from_config(http.clone(), config)
    };

    let outcome = build_with_fallback(
        primary,
        || EmbeddingBackend::free(config),
        &IndexLocation::from_config(config),
        faqs,
    )
    .await?;

    println!(
        "Indexed {} FAQ entries with {} into {}",
        outcome.entries,
        outcome.embedder,
        config.index_dir.display()
    );
    if outcome.fell_back {
        println!("Note: embedding quota was exhausted; the free local embedder was used instead.");
    }
    Ok(())
}

async fn run_checks(http: &Client, config: &Config) -> Result<(), BoxError> {
    let translator = Translator::new(GoogleTranslateClient::from_config(http.clone(), config));
    let generator = VertexClient::from_config(http.clone(), config)
        .ok()
        .map(AnswerGenerator::new);

    let location = IndexLocation::from_config(config);
    let embedder = index::query_embedder(http.clone(), config, &location)
        .unwrap_or_else(|_| EmbeddingBackend::from_config(http.clone(), config));

    let reports = vec![
        check::check_translation(&translator).await,
        check::check_index(embedder, &location).await,
        check::check_generation(generator.as_ref()).await,
    ];

    for report in &reports {
        println!("== {} ==", report.service);
        for line in &report.details {
            println!("{line}");
        }
        println!();
    }
    println!("{}", check::format_summary(&reports));
    Ok(())
}
