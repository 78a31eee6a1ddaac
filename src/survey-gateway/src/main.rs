//! Survey Gateway — A/B survey counterbalancing and collection service.
//!
//! Main entry point: loads configuration, brings up storage (fatal on
//! failure), and starts the HTTP server.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use survey_api::ApiServer;
use survey_core::config::AppConfig;
use survey_core::{AssignmentCodec, AssignmentResolver, CookieKey, RotationSet, SurveyCatalog};
use survey_storage::SurveyStore;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "survey-gateway")]
#[command(about = "A/B survey counterbalancing and collection service")]
#[command(version)]
struct Cli {
    /// HTTP port (overrides config)
    #[arg(long, env = "SURVEY_GATEWAY__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// SQLite database path (overrides config)
    #[arg(long, env = "SURVEY_GATEWAY__STORAGE__DB_PATH")]
    db_path: Option<String>,

    /// Path to a file holding the base64 cookie signing key (overrides config)
    #[arg(long, env = "SURVEY_GATEWAY__COOKIE__SECRET_FILE")]
    cookie_key_file: Option<String>,
}

/// Resolve the cookie signing key from the configured secret sources.
/// Falls back to a random per-process key so development setups work, at
/// the cost of invalidating outstanding cookies on restart.
fn load_cookie_key(config: &survey_core::config::CookieConfig) -> anyhow::Result<CookieKey> {
    if let Some(secret) = &config.secret {
        return CookieKey::from_base64(secret).context("invalid cookie secret");
    }
    if let Some(path) = &config.secret_file {
        return CookieKey::load_from_file(std::path::Path::new(path))
            .with_context(|| format!("failed to load cookie key from {path}"));
    }
    warn!("No cookie secret configured, generating a per-process key; assignments will not survive a restart");
    Ok(CookieKey::generate())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "survey_gateway=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Survey Gateway starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(db_path) = cli.db_path {
        config.storage.db_path = db_path;
    }
    if let Some(path) = cli.cookie_key_file {
        config.cookie.secret_file = Some(path);
    }

    info!(
        service = %config.service_name,
        http_port = config.api.http_port,
        db_path = %config.storage.db_path,
        "Configuration loaded"
    );

    // Variant catalog is immutable after this point
    let catalog = Arc::new(SurveyCatalog::new(
        config.surveys.feedback.clone(),
        config.surveys.poll.clone(),
        config.surveys.employee.clone(),
    )?);

    let cookie_key = load_cookie_key(&config.cookie)?;

    // Storage is the only fatal dependency: the service does not start
    // without a working append-only store.
    let store = Arc::new(
        SurveyStore::open(&config.storage.db_path)
            .with_context(|| format!("failed to open survey store at {}", config.storage.db_path))?,
    );
    info!("Storage connection successful");

    let resolver = Arc::new(AssignmentResolver::new(
        RotationSet::new(catalog),
        AssignmentCodec::new(cookie_key),
        store.clone(),
    ));

    let api_server = ApiServer::new(config, resolver, store);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Survey Gateway is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
