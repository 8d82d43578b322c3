//! # Remindr
//!
//! Texts every participant of an upcoming info session a reminder with a link
//! to the session details.
//!
//! Usage:
//!   remindr serve                          # Start the HTTP gateway (default port 8080)
//!   remindr run --period "1 day"           # One dispatch run from the shell
//!   remindr run --period "2 hours" --dry-run
//!   remindr import sessions.json           # Load sessions and venues into the store

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use remindr_channels::{InfoLinkRenderer, LinkShortener, TwilioSender};
use remindr_core::config::RemindrConfig;
use remindr_core::types::{DispatchRequest, JobArgs};
use remindr_scheduler::{DeliveryPipeline, Dispatcher, PipelineTimeouts, ReminderService, SessionDb};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "remindr", version, about = "📱 Remindr: SMS reminders for upcoming info sessions")]
struct Cli {
    /// Config file (default: ~/.remindr/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP gateway
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long)]
        host: Option<String>,
    },
    /// Run one dispatch now
    Run {
        /// Lookahead window, e.g. "1 day", "3 hours", "30 mins"
        #[arg(short, long, default_value = "1 day")]
        period: String,
        /// Log messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Import sessions and venues from a JSON file into the session store
    Import { file: PathBuf },
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

fn load_config(path: Option<&str>) -> Result<RemindrConfig> {
    let config = match path {
        Some(p) => RemindrConfig::load_from(&expand_path(p))?,
        None => RemindrConfig::load()?,
    };
    Ok(config.with_env_overrides())
}

fn open_store(config: &RemindrConfig) -> Result<SessionDb> {
    let path = expand_path(&config.store.db_path);
    SessionDb::open(&path).with_context(|| format!("opening session store {}", path.display()))
}

fn build_service(config: &RemindrConfig) -> Result<ReminderService> {
    let pipeline = DeliveryPipeline::new(
        Arc::new(TwilioSender::new(config.twilio.clone())),
        Arc::new(LinkShortener::new(config.shortener.clone())),
        Arc::new(InfoLinkRenderer::new(config.renderer.clone())),
        PipelineTimeouts::from(&config.dispatch),
    );
    let dispatcher = Dispatcher::from_config(Arc::new(pipeline), &config.dispatch);
    let store = Arc::new(open_store(config)?);
    Ok(ReminderService::new(store, dispatcher, &config.timezone))
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("🛑 Ctrl-C received, shutting down");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "remindr=debug,remindr_scheduler=debug,remindr_channels=debug,remindr_gateway=debug,tower_http=debug"
    } else {
        "remindr=info,remindr_scheduler=info,remindr_channels=info,remindr_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Err(e) = config.resolve_timezone() {
        tracing::warn!("⚠️ {e}; dispatch runs will fail until it is fixed");
    }

    match cli.command {
        Command::Serve { port, host } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }
            let service = build_service(&config)?;
            let shutdown = CancellationToken::new();
            cancel_on_ctrl_c(shutdown.clone());

            let state = remindr_gateway::AppState::new(Arc::new(service), shutdown);
            remindr_gateway::start_server(&config.gateway, state).await?;
        }
        Command::Run { period, dry_run } => {
            let service = build_service(&config)?;
            let request = DispatchRequest {
                job_name: "cli".into(),
                job_args: JobArgs { period, dry_run },
            };

            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(cancel.clone());
            let report = service.run(&request, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let summary = open_store(&config)?.import(&json)?;
            println!(
                "Imported {} venues, {} sessions, {} participants",
                summary.venues, summary.sessions, summary.participants
            );
        }
    }

    Ok(())
}
