use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classbook::config::Config;
use classbook::AppState;

#[derive(Parser, Debug)]
#[command(name = "classbook")]
#[command(author, version, about = "Class booking backend for students and instructors", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "classbook.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the listening port
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Override the database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Token signing secret
    #[arg(long, env = "CLASSBOOK_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting classbook v{}", env!("CARGO_PKG_VERSION"));

    apply_overrides(&mut config, cli);
    config.validate()?;

    // Ensure data and upload directories exist
    if let Some(dir) = classbook::utils::sqlite_parent_dir(&config.database.url) {
        classbook::utils::ensure_dir(dir)?;
    }
    classbook::utils::ensure_dir(&config.server.uploads_dir)?;

    // Initialize database
    let db = classbook::db::init(&config.database).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let static_dir = config.server.static_dir.clone();

    // Create app state
    let state = Arc::new(AppState::new(config, db));

    // API first, then the static front-end as fallback
    let app = classbook::api::create_router(state).fallback_service(serve_static(&static_dir));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// CLI flags and environment variables win over the config file
fn apply_overrides(config: &mut Config, cli: Cli) {
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if let Some(secret) = cli.jwt_secret {
        config.auth.jwt_secret = Some(secret);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
}

fn serve_static(dir: &Path) -> ServeDir {
    if !dir.exists() {
        tracing::warn!("Static directory {} does not exist", dir.display());
    }
    ServeDir::new(dir).append_index_html_on_directories(true)
}

async fn shutdown_signal() {
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
                tracing::error!("Failed to install signal handler: {}", e);
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
}
