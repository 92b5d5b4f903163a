//! llm4geo CLI
//!
//! Sends requests to a running llm4geo server and keeps a local, bounded
//! chat history between invocations.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use llm4geo::api::models::QgisChatRequest;
use llm4geo::client::Llm4GeoClient;
use llm4geo::history::{ChatHistory, HistoryPolicy, DEFAULT_HISTORY_LIMIT};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "llm4geo")]
#[command(about = "Ask an llm4geo server for QGIS function calls", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Server base URL
    #[arg(long, env = "LLM4GEO_URL", default_value = "http://127.0.0.1:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a request into a QGIS function call
    Ask {
        /// What you want done, e.g. "add OpenStreetMap imagery"
        text: String,

        /// JSON file describing the current project
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Chat history file, read before and updated after the request
        #[arg(long)]
        history: Option<PathBuf>,

        /// Number of history entries to keep
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        history_limit: usize,

        /// Which entries survive when the history is full: keep-recent, keep-oldest
        #[arg(long, default_value = "keep-recent")]
        history_policy: HistoryPolicy,
    },

    /// Ask which data source and file formats to export
    Data {
        text: String,
    },

    /// List the functions the server can produce
    Functions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(rust_log)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = Llm4GeoClient::new(&cli.url).context("Failed to create HTTP client")?;

    match cli.command {
        Commands::Ask {
            text,
            project,
            history,
            history_limit,
            history_policy,
        } => {
            let project_description = match &project {
                Some(path) => read_json(path)?,
                None => Value::Null,
            };
            let mut chat_history = match &history {
                Some(path) => load_history(path, history_limit, history_policy)?,
                None => ChatHistory::new(history_limit, history_policy),
            };

            let request = QgisChatRequest {
                text_input: text.clone(),
                project_description,
                chat_history: chat_history.to_entries(),
            };
            let result = client.qgis_chat(&request).await?;

            println!("{}", result.chat);
            println!("{}", serde_json::to_string_pretty(&result)?);

            if let Some(path) = &history {
                chat_history.push(text);
                chat_history.push(result.chat);
                save_history(path, &chat_history)?;
            }
        }
        Commands::Data { text } => {
            let recommendation = client.data_chat(&text).await?;
            println!("{}", serde_json::to_string_pretty(&recommendation)?);
        }
        Commands::Functions => {
            let listing = client.functions().await?;
            for spec in listing.functions {
                let marker = if spec.takes_parameters() { "" } else { " (no parameters)" };
                println!("{}{}\n    {}", spec.name, marker, spec.description);
            }
        }
    }

    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn load_history(path: &Path, limit: usize, policy: HistoryPolicy) -> Result<ChatHistory> {
    if !path.exists() {
        return Ok(ChatHistory::new(limit, policy));
    }
    let entries: Vec<String> = serde_json::from_value(read_json(path)?)
        .with_context(|| format!("{} must be a JSON array of strings", path.display()))?;
    Ok(ChatHistory::from_entries(entries, limit, policy))
}

fn save_history(path: &Path, history: &ChatHistory) -> Result<()> {
    let content = serde_json::to_string_pretty(&history.to_entries())?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
