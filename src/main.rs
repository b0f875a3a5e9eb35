//! scholarif - Google Scholar journal Impact Factor resolver
//!
//! Resolves the journal of Scholar results to Impact Factor / quartile records from a
//! bundled dataset, with Crossref assistance for truncated or abbreviated names.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! scholarif --data data.json resolve --journal "Nature"
//! scholarif --data data.json annotate saved_results.html
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! scholarif --data data.json serve --port 3000
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use scholarif::{
    config::{default_dataset_path, EngineConfig},
    dataset::Dataset,
    engine::{CandidateInput, MatchEngine, MatchOutcome, Row, RowOutcome},
    index::JournalIndex,
    normalize::normalize,
    scholar,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Google Scholar journal Impact Factor resolver
#[derive(Parser)]
#[command(name = "scholarif")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Journal dataset (JSON object: name -> {if, q, rank})
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look a journal name up in the dataset only (no network)
    Lookup {
        /// Journal name as displayed
        name: String,

        /// Also try prefix/containment matching
        #[arg(long)]
        fuzzy: bool,
    },

    /// Resolve one candidate through the full pipeline
    Resolve {
        /// Journal text as displayed on the page
        #[arg(long)]
        journal: String,

        /// Paper title used for Crossref assistance
        #[arg(long)]
        title: Option<String>,

        /// The journal text was cut off (ends in an ellipsis)
        #[arg(long)]
        truncated: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Resolve every row of a saved Google Scholar page
    Annotate {
        /// Saved search results or profile HTML
        html: PathBuf,

        /// Write a CSV of the outcomes into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Engine tunables shared by the resolving commands
#[derive(Args)]
struct EngineArgs {
    /// Crossref API base URL
    #[arg(long, default_value = scholarif::config::DEFAULT_API_BASE_URL)]
    api_url: String,

    /// Polite pool e-mail for Crossref
    #[arg(long)]
    mailto: Option<String>,

    /// Top matches requested per title
    #[arg(long, default_value = "3")]
    rows: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Maximum concurrent Crossref lookups
    #[arg(long, default_value = "3")]
    max_concurrent: usize,

    /// Resolve rows containing Hangul instead of skipping them
    #[arg(long)]
    keep_hangul: bool,
}

impl EngineArgs {
    fn to_config(&self) -> EngineConfig {
        EngineConfig {
            api_base_url: self.api_url.clone(),
            rows: self.rows,
            request_timeout: Duration::from_secs(self.timeout),
            max_concurrent: self.max_concurrent,
            mailto: self.mailto.clone(),
            skip_hangul: !self.keep_hangul,
            ..Default::default()
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let data_path = cli.data.unwrap_or_else(default_dataset_path);
    let index = load_index(&data_path)?;

    match cli.command {
        Commands::Lookup { name, fuzzy } => run_lookup(&index, &name, fuzzy),
        Commands::Resolve {
            journal,
            title,
            truncated,
            engine,
        } => {
            let engine = build_engine(index, &engine)?;
            let candidate = CandidateInput {
                journal_candidate: journal,
                paper_title: title,
                is_truncated: truncated,
            };
            let outcome = engine.resolve_detailed(&candidate).await;
            println!("{}", describe(&outcome));
            Ok(())
        }
        Commands::Annotate {
            html,
            output,
            engine,
        } => {
            let engine = build_engine(index, &engine)?;
            run_annotate(&engine, &html, output.as_deref()).await
        }
        Commands::Serve { port, host, engine } => {
            let engine = build_engine(index, &engine)?;
            run_server(host, port, engine).await
        }
    }
}

fn load_index(path: &Path) -> Result<Arc<JournalIndex>> {
    let dataset = Dataset::load(path)
        .with_context(|| format!("Failed to load journal dataset from {}", path.display()))?;
    if dataset.is_empty() {
        anyhow::bail!("Journal dataset {} has no usable entries", path.display());
    }
    Ok(Arc::new(JournalIndex::build(&dataset)))
}

fn build_engine(index: Arc<JournalIndex>, args: &EngineArgs) -> Result<MatchEngine> {
    MatchEngine::from_config(index, &args.to_config()).context("Invalid engine configuration")
}

// ============================================================================
// Offline Lookup
// ============================================================================

fn run_lookup(index: &JournalIndex, name: &str, fuzzy: bool) -> Result<()> {
    let key = normalize(name);
    println!("Key: {}", key);

    let found = index
        .exact_lookup(&key)
        .map(|r| ("exact", r))
        .or_else(|| {
            fuzzy
                .then(|| index.fuzzy_lookup(&key).map(|r| ("fuzzy", r)))
                .flatten()
        });

    match found {
        Some((how, record)) => {
            println!(
                "{} match: {} | IF {} | {} | rank {}",
                how,
                record.original_name,
                record.impact_factor(),
                record.quartile(),
                record.metrics.rank.as_deref().unwrap_or("-")
            );
        }
        None => println!("No match."),
    }
    Ok(())
}

/// One-line human description of an outcome
fn describe(outcome: &MatchOutcome) -> String {
    match outcome {
        MatchOutcome::Matched { record, strategy } => {
            let mut line = format!(
                "IF {} ({}) [{}] via {:?}",
                record.impact_factor(),
                record.quartile(),
                record.original_name,
                strategy
            );
            if let Some(top) = outcome.top_percent_badge() {
                line.push_str(&format!(" TOP {}%", top));
            }
            line
        }
        MatchOutcome::NotFound { api_name } => {
            format!("IF DB match not found (Crossref: {})", api_name)
        }
        MatchOutcome::Unmatched => "No match".to_string(),
        MatchOutcome::Skipped => "Skipped".to_string(),
    }
}

// ============================================================================
// Page Annotation
// ============================================================================

async fn run_annotate(
    engine: &MatchEngine,
    html_path: &Path,
    output_dir: Option<&Path>,
) -> Result<()> {
    let html = std::fs::read_to_string(html_path)
        .with_context(|| format!("Failed to read {}", html_path.display()))?;
    let rows = scholar::parse_rows(&html).context("Failed to parse Scholar page")?;

    if rows.is_empty() {
        println!("No Scholar rows found in {}", html_path.display());
        return Ok(());
    }

    println!(
        "Resolving {} rows ({} concurrent lookups)...",
        rows.len(),
        engine.scheduler().capacity()
    );

    let candidates: Vec<(String, CandidateInput)> = rows
        .iter()
        .map(|r| (r.id.clone(), r.candidate.clone()))
        .collect();
    let outcomes = engine.resolve_rows(rows).await;

    for outcome in &outcomes {
        let journal = candidates
            .iter()
            .find(|(id, _)| *id == outcome.id)
            .map(|(_, c)| c.journal_candidate.as_str())
            .unwrap_or("");
        println!("{:<40} {}", journal, describe(&outcome.outcome));
    }

    let matched = outcomes.iter().filter(|o| o.outcome.record().is_some()).count();
    println!("Matched {} / {} rows", matched, outcomes.len());

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir).context("Failed to create output directory")?;
        let stem = html_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("page");
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let path = dir.join(format!("{}_{}.csv", timestamp, stem));

        let records: Vec<AnnotatedRow> = outcomes
            .iter()
            .filter_map(|o| {
                candidates
                    .iter()
                    .find(|(id, _)| *id == o.id)
                    .map(|(_, c)| AnnotatedRow::new(o, c))
            })
            .collect();
        save_csv(&path, &records)?;
    }

    Ok(())
}

/// Flat CSV record for one annotated row
#[derive(Debug, Serialize)]
struct AnnotatedRow {
    id: String,
    journal_candidate: String,
    paper_title: String,
    truncated: bool,
    status: String,
    matched_journal: String,
    impact_factor: String,
    quartile: String,
    rank: String,
    top_percent: String,
    api_name: String,
}

impl AnnotatedRow {
    fn new(outcome: &RowOutcome, candidate: &CandidateInput) -> Self {
        let record = outcome.outcome.record();
        let status = match &outcome.outcome {
            MatchOutcome::Matched { .. } => "matched",
            MatchOutcome::NotFound { .. } => "not_found",
            MatchOutcome::Unmatched => "unmatched",
            MatchOutcome::Skipped => "skipped",
        };
        let api_name = match &outcome.outcome {
            MatchOutcome::NotFound { api_name } => api_name.clone(),
            _ => String::new(),
        };

        Self {
            id: outcome.id.clone(),
            journal_candidate: candidate.journal_candidate.clone(),
            paper_title: candidate.paper_title.clone().unwrap_or_default(),
            truncated: candidate.is_truncated,
            status: status.to_string(),
            matched_journal: record.map(|r| r.original_name.clone()).unwrap_or_default(),
            impact_factor: record.map(|r| r.impact_factor().to_string()).unwrap_or_default(),
            quartile: record.map(|r| r.quartile().to_string()).unwrap_or_default(),
            rank: record
                .and_then(|r| r.metrics.rank.clone())
                .unwrap_or_default(),
            top_percent: outcome
                .outcome
                .top_percent_badge()
                .map(|p| p.to_string())
                .unwrap_or_default(),
            api_name,
        }
    }
}

/// Save data to CSV file
fn save_csv<T: Serialize>(path: &Path, data: &[T]) -> Result<()> {
    if data.is_empty() {
        println!("No data to save to {:?}", path);
        return Ok(());
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context("Failed to create CSV writer")?;

    for item in data {
        wtr.serialize(item).context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV")?;
    println!("Saved: {:?}", path);
    Ok(())
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16, engine: MatchEngine) -> Result<()> {
    info!(host = %host, port = port, journals = engine.index().len(), "Starting HTTP server");

    let app_state = Arc::new(AppState { engine });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/resolve", post(resolve_handler))
        .route("/resolve/batch", post(batch_handler))
        .route("/reset", post(reset_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

struct AppState {
    engine: MatchEngine,
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Single resolution response
#[derive(Debug, Serialize)]
struct ResolveResponse {
    #[serde(flatten)]
    outcome: MatchOutcome,
    /// Q1 top-percent badge value
    top_percent: Option<u32>,
}

/// Resolve one candidate
async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    Json(candidate): Json<CandidateInput>,
) -> Json<ResolveResponse> {
    let outcome = state.engine.resolve_detailed(&candidate).await;
    let top_percent = outcome.top_percent_badge();
    Json(ResolveResponse {
        outcome,
        top_percent,
    })
}

/// Resolve a page's rows; rows already resolved by this server are left out
async fn batch_handler(
    State(state): State<Arc<AppState>>,
    Json(rows): Json<Vec<Row>>,
) -> Json<Vec<RowOutcome>> {
    info!(rows = rows.len(), "Batch request");
    Json(state.engine.resolve_rows(rows).await)
}

/// Forget processed rows (the page was reloaded)
async fn reset_handler(State(state): State<Arc<AppState>>) -> &'static str {
    state.engine.reset_processed();
    "OK"
}
