use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use fs_err as fs;
use ghpool::client::Client;
use ghpool::config::LogConfig;
use ghpool::error::ConfigError;
use ghpool::queue::Queue;
use ghpool::request::Request;
use ghpool::token::resolve_github_token;
use ghpool::transport::{HttpSearchTransport, RequestParams, SearchTransport};
use ghpool::ui;

const SEARCH_ENDPOINT: &str = "https://api.github.com/search/repositories";

/// Pooled, rate-limit-aware dispatcher for a GitHub-shaped search API
#[derive(Debug, clap::Parser)]
#[command(name = "ghpool")]
#[command(about = "Pooled, rate-limit-aware dispatcher for a GitHub-shaped search API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Run a backlog of search queries across a pool of credentials
    Search {
        /// A search query string (e.g. "stars:>=1000 language:rust"). May
        /// be repeated; each becomes one queued request.
        #[arg(long = "query", required = true)]
        queries: Vec<String>,

        /// A credential to add to the pool. May be repeated.
        #[arg(long = "token")]
        tokens: Vec<String>,

        /// Path to a file of credentials, one per line, blank lines and
        /// `#`-prefixed comments ignored.
        #[arg(long = "token-file")]
        token_file: Option<PathBuf>,

        /// Retry budget per distinct URL before it's abandoned (default 5)
        #[arg(long)]
        max_per_request: Option<u64>,

        /// Global failure budget across all URLs (default max_per_request * 1000)
        #[arg(long)]
        max_total: Option<u64>,

        /// Directory for the file logger (default ./logs)
        #[arg(long, env = "GHPOOL_LOG_DIR")]
        log_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {}", style("✗").red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = <Cli as clap::Parser>::parse();

    match cli.command {
        Commands::Search { queries, tokens, token_file, max_per_request, max_total, log_dir } => {
            run_search(queries, tokens, token_file, max_per_request, max_total, log_dir).await
        }
    }
}

async fn run_search(
    queries: Vec<String>,
    tokens: Vec<String>,
    token_file: Option<PathBuf>,
    max_per_request: Option<u64>,
    max_total: Option<u64>,
    log_dir: Option<PathBuf>,
) -> Result<()> {
    if queries.is_empty() {
        return Err(ConfigError::NoQueries.into());
    }

    let log_config = LogConfig::new(log_dir);
    let _guard = log_config.init_subscriber().context("failed to start file logger")?;

    let tokens = collect_tokens(tokens, token_file)?;
    ui::info!("Pooling {} credential(s)", tokens.len());

    let transport: Arc<HttpSearchTransport> =
        Arc::new(HttpSearchTransport::new("ghpool").context("failed to build HTTP transport")?);

    let clients: Vec<Client> = tokens
        .into_iter()
        .map(|token| {
            let transport: Arc<dyn SearchTransport> = transport.clone();
            Client::new(token, None, None, transport)
        })
        .collect();

    let queue = Arc::new(Queue::new(clients, max_per_request, max_total));

    let requests: Vec<Request> = queries
        .iter()
        .map(|query| {
            let url = format!("{SEARCH_ENDPOINT}?q={}", urlencode(query));
            Request::new(
                url,
                RequestParams::default(),
                Some(Box::new(move |response| {
                    tracing::debug!(bytes = response.body.len(), "search response received");
                })),
            )
        })
        .collect();
    let queued = requests.len();
    queue.push(requests).await;

    ui::info!("Dispatching {} quer{}", queued, if queued == 1 { "y" } else { "ies" });
    queue.start();

    wait_for_drain(&queue).await;
    queue.stop();

    let succeeded = queue.success_count().await;
    let aborted = queue.request_fail_count().await;
    let errors = queue.error_count().await;
    if aborted > 0 {
        ui::warn!(
            "{} succeeded, {} retried ({} url(s) exhausted their retry budget)",
            succeeded,
            errors,
            aborted
        );
    } else {
        ui::success!("{} succeeded, {} retried, 0 aborted", succeeded, errors);
    }

    Ok(())
}

/// Poll until the backlog is empty and every client has gone idle, or the
/// queue reports its global failure budget was exceeded. There is no
/// persistent state to resume from (a non-goal), so the CLI simply waits
/// out one full drain per invocation.
async fn wait_for_drain(queue: &Arc<Queue>) {
    loop {
        tokio::time::sleep(Duration::from_millis(200)).await;

        if queue.queue_length().await == 0 {
            let mut all_idle = true;
            for client in queue.clients() {
                if client.is_busy().await {
                    all_idle = false;
                    break;
                }
            }
            if all_idle {
                return;
            }
        }
    }
}

fn collect_tokens(explicit: Vec<String>, token_file: Option<PathBuf>) -> Result<Vec<String>> {
    let mut tokens = explicit;

    if let Some(path) = &token_file {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::TokenFile {
            path: path.display().to_string(),
            source,
        })?;
        let from_file: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        if from_file.is_empty() {
            return Err(ConfigError::EmptyTokenFile { path: path.display().to_string() }.into());
        }
        tokens.extend(from_file);
    }

    if tokens.is_empty() {
        match resolve_github_token(None) {
            Some(token) => tokens.push(token),
            None => return Err(ConfigError::NoCredential.into()),
        }
    }

    Ok(tokens)
}

fn urlencode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
