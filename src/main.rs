//! # FlashRead CLI (`flashread`)
//!
//! Runs the FlashRead HTTP server and drives it from the terminal: summarize
//! URLs and text, upload documents, chat about them, and manage the local
//! history and credentials.
//!
//! ## Usage
//!
//! ```bash
//! flashread --config ./config/flashread.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `flashread serve` | Start the HTTP server |
//! | `flashread summarize` | Summarize a URL or text |
//! | `flashread upload <files>` | Upload documents for extraction |
//! | `flashread docs list\|remove\|clear\|summarize` | Manage uploaded documents |
//! | `flashread history list\|clear` | Show or clear summary history |
//! | `flashread chat` | Chat about a document or summary |
//! | `flashread enhance` | Restructure a summary into cleaner markdown |
//! | `flashread credentials set\|show\|clear` | Manage stored API keys |
//! | `flashread extract <file>` | Extract text locally, without a server |
//!
//! ## Examples
//!
//! ```bash
//! # Start the server
//! flashread serve --config ./config/flashread.toml
//!
//! # Store keys once
//! flashread credentials set --rapidapi rk_... --groq gsk_...
//!
//! # Summarize a page, falling back to Groq if RapidAPI fails
//! flashread summarize --url https://example.com/article --length short
//!
//! # Upload and chat
//! flashread upload report.docx notes.md
//! flashread chat --doc <id> "What are the main findings?"
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use flashread::app::{FlashRead, UploadFile};
use flashread::client::ApiClient;
use flashread::config::{self, Config};
use flashread::extract::{self, mime_from_file_name};
use flashread::markdown::{parse_blocks, render_plain};
use flashread::models::{Credentials, DocumentStatus, HistoryMode, Length, Provider, SummarizeRequest};
use flashread::server;
use flashread::state::{StateManager, RECONCILE_DELAY};
use flashread::storage::FileStorage;

/// FlashRead: summarize pages, text, and documents, then chat about them.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/flashread.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "flashread",
    about = "FlashRead: AI summaries of web pages, text, and documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/flashread.toml`; built-in defaults are used
    /// when the file does not exist.
    #[arg(long, global = true, default_value = "./config/flashread.toml")]
    config: PathBuf,

    /// RapidAPI key for this invocation, overriding the stored one.
    #[arg(long, global = true, env = "FLASHREAD_RAPIDAPI_KEY", hide_env_values = true)]
    rapidapi_key: Option<String>,

    /// Groq key for this invocation, overriding the stored one.
    #[arg(long, global = true, env = "FLASHREAD_GROQ_KEY", hide_env_values = true)]
    groq_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Summarize a web page or a piece of text.
    Summarize {
        /// URL of the page to summarize.
        #[arg(long, conflicts_with_all = ["text", "file"])]
        url: Option<String>,

        /// Raw text to summarize.
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the text to summarize from a file.
        #[arg(long)]
        file: Option<PathBuf>,

        /// `rapidapi` or `groq`.
        #[arg(long, default_value = "rapidapi")]
        provider: Provider,

        /// `short`, `medium`, or `detailed`.
        #[arg(long, default_value = "medium")]
        length: Length,

        /// Run the summary through the enhancement endpoint afterwards.
        #[arg(long)]
        enhance: bool,
    },

    /// Upload documents to the server for text extraction.
    Upload {
        /// Files to upload (.txt, .md, .docx, .doc, .rtf).
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Manage uploaded documents.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Show or clear summary history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Chat about a document or a summary from history.
    ///
    /// With a message, sends one turn and prints the reply. Without one,
    /// reads messages from stdin until EOF.
    Chat {
        /// Document id to chat about.
        #[arg(long, conflicts_with = "history")]
        doc: Option<String>,

        /// History item id to chat about.
        #[arg(long)]
        history: Option<String>,

        message: Option<String>,
    },

    /// Restructure a summary into cleaner markdown.
    Enhance {
        /// History item whose summary should be enhanced.
        #[arg(long, conflicts_with = "file")]
        history: Option<String>,

        /// Read the summary from a file.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Manage locally stored API keys.
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },

    /// Extract text from a file locally and print it.
    Extract {
        path: PathBuf,

        /// MIME type; inferred from the extension when omitted.
        #[arg(long = "type")]
        content_type: Option<String>,

        /// Print counts only.
        #[arg(long)]
        stats: bool,
    },
}

#[derive(Subcommand)]
enum DocsAction {
    /// List uploaded documents.
    List,
    /// Remove a document by id.
    Remove { id: String },
    /// Remove all documents.
    Clear,
    /// Summarize a processed document with Groq.
    Summarize {
        id: String,
        #[arg(long, default_value = "medium")]
        length: Length,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List recent summaries, newest first.
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Print the full summary of each item.
        #[arg(long)]
        full: bool,
    },
    /// Delete all history.
    Clear,
}

#[derive(Subcommand)]
enum CredentialsAction {
    /// Store API keys. Omitted keys keep their current value.
    Set {
        #[arg(long = "rapidapi")]
        rapidapi: Option<String>,
        #[arg(long = "groq")]
        groq: Option<String>,
    },
    /// Show which keys are stored (masked).
    Show,
    /// Delete stored keys.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flashread=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load_or_default(&cli.config)?;

    // Commands that need neither local state nor a server
    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            return server::run_server(&cfg).await;
        }
        Commands::Extract {
            path,
            content_type,
            stats,
        } => return run_extract(&path, content_type.as_deref(), stats),
        _ => {}
    }

    let overrides = Credentials::new(
        cli.rapidapi_key.unwrap_or_default(),
        cli.groq_key.unwrap_or_default(),
    );
    let mut app = open_app(&cfg)?.with_credential_override(overrides);

    match cli.command {
        Commands::Serve { .. } | Commands::Extract { .. } => unreachable!(),
        Commands::Summarize {
            url,
            text,
            file,
            provider,
            length,
            enhance,
        } => {
            let req = match (url, text, file) {
                (Some(url), _, _) => SummarizeRequest::url(url, provider, length),
                (None, Some(text), _) => SummarizeRequest::text(text, provider, length),
                (None, None, Some(path)) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    SummarizeRequest::text(text, provider, length)
                }
                (None, None, None) => bail!("one of --url, --text, or --file is required"),
            };
            let resp = app.summarize(req).await?;
            eprintln!("Summary ready (via {})", resp.provider);
            let summary = if enhance {
                app.enhance(&resp.summary, None).await?
            } else {
                resp.summary
            };
            print_summary(&summary);
        }
        Commands::Upload { files } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                uploads.push(UploadFile {
                    file_name: file_name_of(path),
                    bytes,
                });
            }
            let ids = app.upload(uploads).await?;
            for id in ids {
                if let Some(doc) = app.state().document(&id) {
                    match doc.status {
                        DocumentStatus::Completed => println!(
                            "{}  {}  {} words",
                            doc.id, doc.file_name, doc.word_count
                        ),
                        _ => println!(
                            "{}  {}  failed: {}",
                            doc.id,
                            doc.file_name,
                            doc.error.as_deref().unwrap_or("unknown error")
                        ),
                    }
                }
            }
        }
        Commands::Docs { action } => match action {
            DocsAction::List => {
                let docs = app.state().documents();
                if docs.is_empty() {
                    println!("No documents.");
                }
                for doc in docs {
                    println!(
                        "{}  {:<32} {:<10} {:>7} words{}",
                        doc.id,
                        doc.file_name,
                        doc.status.as_str(),
                        doc.word_count,
                        if doc.summary.is_some() { "  (summarized)" } else { "" }
                    );
                }
            }
            DocsAction::Remove { id } => {
                if app.state_mut().remove_document(&id)? {
                    // Let the reconcile write land before the runtime shuts down.
                    tokio::time::sleep(RECONCILE_DELAY * 2).await;
                    println!("Removed {}", id);
                } else {
                    bail!("no document with id {}", id);
                }
            }
            DocsAction::Clear => {
                app.state_mut().clear_documents()?;
                println!("Documents cleared.");
            }
            DocsAction::Summarize { id, length } => {
                let summary = app.summarize_document(&id, length).await?;
                print_summary(&summary);
            }
        },
        Commands::History { action } => match action {
            HistoryAction::List { limit, full } => {
                let history = app.state().history();
                if history.is_empty() {
                    println!("No history.");
                }
                for item in history.iter().take(limit) {
                    let when = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(item.created_at)
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    let source = match item.mode {
                        HistoryMode::Text => excerpt(&item.source, 60),
                        _ => item.source.clone(),
                    };
                    println!(
                        "{}  {}  {:<8} {:<8} {:<8} {}",
                        item.id,
                        when,
                        item.mode.as_str(),
                        item.provider,
                        item.length,
                        source
                    );
                    if full {
                        print_summary(&item.summary);
                        println!();
                    }
                }
            }
            HistoryAction::Clear => {
                app.state_mut().clear_history()?;
                println!("History cleared.");
            }
        },
        Commands::Chat {
            doc,
            history,
            message,
        } => {
            match (doc, history) {
                (Some(id), _) => app.chat_with_document(&id)?,
                (None, Some(id)) => app.chat_with_summary(&id)?,
                (None, None) => false,
            };
            if let Some(welcome) = app.state().chat_messages().first() {
                eprintln!("{}", welcome.content);
            }
            match message {
                Some(message) => {
                    let reply = app.send_chat(&message).await?;
                    print_summary(&reply.content);
                }
                None => chat_loop(&mut app).await?,
            }
        }
        Commands::Enhance { history, file } => {
            let (content, name) = match (history, file) {
                (Some(id), _) => {
                    let item = app
                        .state()
                        .history_item(&id)
                        .with_context(|| format!("no history item {}", id))?;
                    (item.summary.clone(), Some(item.source.clone()))
                }
                (None, Some(path)) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    (content, Some(file_name_of(&path)))
                }
                (None, None) => bail!("one of --history or --file is required"),
            };
            let enhanced = app.enhance(&content, name.as_deref()).await?;
            print_summary(&enhanced);
        }
        Commands::Credentials { action } => match action {
            CredentialsAction::Set { rapidapi, groq } => {
                let current = app.state().credentials().clone();
                let updated = Credentials::new(
                    rapidapi.unwrap_or(current.rapidapi_key),
                    groq.unwrap_or(current.groq_key),
                );
                app.state_mut().set_credentials(updated)?;
                println!("Credentials saved.");
            }
            CredentialsAction::Show => {
                let creds = app.state().credentials();
                println!("rapidapi: {}", mask(creds.rapidapi()));
                println!("groq:     {}", mask(creds.groq()));
            }
            CredentialsAction::Clear => {
                app.state_mut().clear_credentials()?;
                println!("Credentials cleared.");
            }
        },
    }

    Ok(())
}

fn open_app(cfg: &Config) -> anyhow::Result<FlashRead> {
    let storage = FileStorage::open(&cfg.storage.dir)
        .with_context(|| format!("Failed to open storage at {}", cfg.storage.dir.display()))?;
    let state = StateManager::load(Arc::new(storage))?;
    Ok(FlashRead::new(state, ApiClient::new(&cfg.client.api_url)))
}

fn run_extract(path: &Path, content_type: Option<&str>, stats: bool) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = file_name_of(path);
    let content_type = match content_type {
        Some(ct) => ct,
        None => mime_from_file_name(&file_name)
            .with_context(|| format!("cannot infer a supported type for {}", file_name))?,
    };
    let extracted = extract::extract(&bytes, content_type)?;
    if stats {
        println!(
            "{}: {} words, {} chars",
            file_name, extracted.word_count, extracted.char_count
        );
    } else {
        println!("{}", extracted.text);
    }
    Ok(())
}

async fn chat_loop(app: &mut FlashRead) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        std::io::stderr().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match app.send_chat(&line).await {
            Ok(reply) => print_summary(&reply.content),
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}

fn print_summary(markdown: &str) {
    println!("{}", render_plain(&parse_blocks(markdown)));
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        format!("{}...", flat.chars().take(max_chars).collect::<String>())
    }
}

fn mask(key: Option<&str>) -> String {
    match key {
        Some(k) if k.chars().count() > 8 => {
            format!("{}…", k.chars().take(4).collect::<String>())
        }
        Some(_) => "set".to_string(),
        None => "(not set)".to_string(),
    }
}
