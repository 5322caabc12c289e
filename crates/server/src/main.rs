//! Themify Server
//!
//! Axum server exposing the agent chains to the browser, plus CLI passes
//! that stamp or strip `data-block-id` attributes in a host project.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use themify_core::config::AppConfig;
use themify_core::skills::{AgentRegistry, ChatCompletionsClient};
use themify_core::skills::tools::ToolSurface;
use themify_core::speech::SpeechToText;
use themify_core::swarm::Coordinator;
use themify_core::tools::block_ids::{run_pass, BlockIdPass};
use themify_core::tools::ProjectRoot;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod api;

const DEFAULT_PORT: u16 = 3001;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// `None` when no completion credentials are configured
    pub coordinator: Option<Arc<Coordinator>>,
    pub project_root: PathBuf,
    pub speech: Option<Arc<SpeechToText>>,
}

#[derive(Parser, Clone)]
#[command(author, version, about = "Themify - multi-agent UI generation")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the Themify server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Host project root (overrides THEMIFY_PROJECT_ROOT)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Stamp data-block-id attributes into matching TSX files
    Annotate {
        /// Glob patterns relative to the project root
        #[arg(required = true)]
        patterns: Vec<String>,
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Remove data-block-id attributes from matching TSX files
    Strip {
        #[arg(required = true)]
        patterns: Vec<String>,
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_root(config: AppConfig, root: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match root {
        Some(root) => config.with_project_root(root),
        None => config,
    };
    let canonical = std::fs::canonicalize(&config.project_root)
        .with_context(|| format!("Project root {} not found", config.project_root.display()))?;
    Ok(config.with_project_root(canonical))
}

fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let coordinator = match &config.model {
        Some(model) => {
            tracing::info!(
                provider = model.provider.display_name(),
                model = %model.model,
                "Completion service configured"
            );
            let llm = Arc::new(
                ChatCompletionsClient::new(model.clone())
                    .context("Failed to build the completion client")?,
            );
            let surface = ToolSurface::open(&config.project_root, config.layout.clone());
            Some(Arc::new(Coordinator::new(AgentRegistry::new(llm, surface))))
        }
        None => {
            tracing::warn!("No completion credentials found; agent routes will answer 503");
            None
        }
    };

    let speech = match config.speech.clone() {
        Some(speech) => Some(Arc::new(
            SpeechToText::new(speech).context("Failed to build the speech client")?,
        )),
        None => None,
    };

    Ok(AppState {
        coordinator,
        project_root: config.project_root.clone(),
        speech,
    })
}

async fn serve(config: AppConfig, port: u16) -> anyhow::Result<()> {
    for (feature, enabled) in config.feature_summary() {
        tracing::info!(feature, enabled, "Feature");
    }
    if config.web_search_key.is_some() {
        tracing::info!("TAVILY_API_KEY is set but no agent uses web search");
    }

    let app = api::build_router(build_state(&config)?);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(%addr, root = %config.project_root.display(), "Themify server listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn block_id_pass(root: &Path, patterns: &[String], pass: BlockIdPass) -> anyhow::Result<()> {
    let root = ProjectRoot::new(root);
    let report = run_pass(&root, patterns, pass)
        .await
        .with_context(|| format!("{:?} pass failed", pass))?;

    for path in &report.changed {
        println!("updated  {}", path);
    }
    for (path, error) in &report.failed {
        eprintln!("failed   {}: {}", path, error);
    }
    println!(
        "{} scanned, {} updated, {} failed",
        report.scanned,
        report.changed.len(),
        report.failed.len()
    );
    if !report.failed.is_empty() {
        anyhow::bail!("{} file(s) could not be processed", report.failed.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    let config = AppConfig::from_env();

    match args.command {
        None => serve(resolve_root(config, None)?, DEFAULT_PORT).await,
        Some(CliCommand::Serve { port, root }) => serve(resolve_root(config, root)?, port).await,
        Some(CliCommand::Annotate { patterns, root }) => {
            let config = resolve_root(config, root)?;
            block_id_pass(&config.project_root, &patterns, BlockIdPass::Inject).await
        }
        Some(CliCommand::Strip { patterns, root }) => {
            let config = resolve_root(config, root)?;
            block_id_pass(&config.project_root, &patterns, BlockIdPass::Strip).await
        }
    }
}
