use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evergreen::api::{create_router, AppState};
use evergreen::client::{FamilyTreeSession, HttpFamilyClient};
use evergreen::config::{Config, LogFormat};
use evergreen::db::{Database, DatabaseBackend, LibSqlBackend};
use evergreen::hierarchy::render_text;
use evergreen::services::processor_from_config;

#[derive(Parser)]
#[command(name = "evergreen")]
#[command(about = "Self-hostable family-tree service for digital memorials")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Print a memorial's family tree from a running server
    Tree {
        /// Memorial to load
        #[arg(long)]
        memorial: String,
        /// Server base URL; defaults to EVERGREEN_SERVER_URL
        #[arg(long)]
        server: Option<String>,
        /// Member ids to show collapsed
        #[arg(long)]
        collapsed: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let json_logs = LogFormat::from_env() == LogFormat::Json;
    let json_layer = json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let pretty_layer =
        (!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evergreen=info,tower_http=debug".into()),
        )
        .with(json_layer)
        .with(pretty_layer)
        .init();

    let config = Config::from_env();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Tree {
            memorial,
            server,
            collapsed,
        } => print_tree(config, memorial, server, collapsed).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    let payments = processor_from_config(&config.payments)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, db, payments);
    let app = create_router(state);

    let cancel_token = CancellationToken::new();

    tracing::info!("Evergreen starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    tokio::spawn(shutdown_signal(cancel_token.clone()));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await?;

    tracing::info!("Server stopped");

    Ok(())
}

async fn print_tree(
    config: Config,
    memorial: String,
    server: Option<String>,
    collapsed: Vec<String>,
) -> anyhow::Result<()> {
    let server_url = server.unwrap_or(config.client.server_url);
    let client = Arc::new(HttpFamilyClient::with_base_url(
        &server_url,
        Duration::from_secs(config.client.timeout_secs),
    )?);

    let mut session = FamilyTreeSession::new(memorial.as_str(), client.clone(), client);
    session
        .load()
        .await
        .with_context(|| format!("Failed to load family tree for memorial '{memorial}' from {server_url}"))?;

    for id in &collapsed {
        session.collapse(id);
    }

    let rows = session.rows(false);
    if rows.is_empty() {
        println!("No family members recorded for memorial '{memorial}'.");
    } else {
        print!("{}", render_text(&rows));
    }
    for warning in &session.forest().warnings {
        eprintln!("warning: {warning:?}");
    }

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    cancel_token.cancel();
}
