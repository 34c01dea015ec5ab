//! MLMart Server
//!
//! HTTP server for the MLMart commission ledger. Runs the REST API, the
//! periodic settlement sweep and a Prometheus exporter.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! mlmart-server
//!
//! # Start with a config file
//! mlmart-server --config /etc/mlmart/server.toml
//!
//! # Start with environment overrides
//! MLMART__SERVER__PORT=8080 MLMART__LEDGER__HOLD_HOURS=24 mlmart-server
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mlmart_api::{create_router, ApiConfig, AppState};
use mlmart_db::Database;
use mlmart_ledger::CommissionEngine;

use crate::config::ServerConfig;

// =============================================================================
// CLI Arguments
// =============================================================================

/// MLMart Server - commission ledger API
#[derive(Parser, Debug)]
#[command(name = "mlmart-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "MLMART_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "MLMART_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MLMART_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MLMART_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "MLMART_LOG_FORMAT")]
    log_format: Option<String>,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Commission hold in hours
    #[arg(long)]
    hold_hours: Option<u32>,

    /// Disable the automatic settlement sweep
    #[arg(long)]
    no_auto_sweep: bool,

    /// Skip database migrations on startup
    #[arg(long)]
    skip_migrations: bool,
}

impl Args {
    /// Apply CLI overrides on top of the loaded configuration
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(url) = self.database_url {
            config.database.postgres_url = url;
        }
        if let Some(hours) = self.hold_hours {
            config.ledger.hold_hours = hours;
        }
        if self.no_auto_sweep {
            config.ledger.auto_sweep = false;
        }
        if self.skip_migrations {
            config.database.run_migrations = false;
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;
    args.apply(&mut server_config);
    server_config.ledger.validate()?;

    init_logging(&server_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        hold_hours = server_config.ledger.hold_hours,
        auto_sweep = server_config.ledger.auto_sweep,
        "Starting MLMart server"
    );

    if server_config.metrics.enabled {
        start_metrics_exporter(&server_config.metrics)?;
    }

    let db = init_database(&server_config.database).await?;

    let engine = CommissionEngine::new(db, server_config.ledger.clone());

    // Settlement sweep runs until the server stops accepting requests
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = server_config
        .ledger
        .auto_sweep
        .then(|| engine.spawn_sweeper(shutdown_rx));

    let state = AppState::new(engine);
    let api_config = ApiConfig {
        enable_cors: server_config.api.enable_cors,
        enable_tracing: server_config.api.enable_tracing,
    };
    let app = create_router(state, api_config);

    let addr = server_config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if shutdown_tx.send(true).is_err() {
        tracing::debug!("Settlement sweep already stopped");
    }
    if let Some(handle) = sweeper {
        let timeout = server_config.server.shutdown_timeout();
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => tracing::info!("Settlement sweep stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Settlement sweep task failed"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Settlement sweep did not stop in time"
            ),
        }
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .try_init()?;
        }
    }

    Ok(())
}

/// Connect, migrate and health-check the database
async fn init_database(config: &config::DatabaseConfig) -> anyhow::Result<Arc<Database>> {
    let db_config = config.to_db_config();

    tracing::info!(url = %db_config.postgres_url_masked(), "Connecting to database...");

    let db = Database::connect(&db_config).await?;

    if config.run_migrations {
        db.migrate().await?;
        tracing::info!("Database migrations applied");
    }

    let health = db.health_check().await?;
    if !health.healthy {
        anyhow::bail!("Database health check failed");
    }

    tracing::info!(postgres = health.postgres, "Database health check passed");

    Ok(Arc::new(db))
}

/// Install the Prometheus recorder with its own HTTP listener
fn start_metrics_exporter(config: &config::MetricsConfig) -> anyhow::Result<()> {
    let Some(port) = config.port else {
        return Ok(());
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    describe_metrics();

    tracing::info!(port, "Metrics exporter started");
    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!(
        "mlmart_deliveries_confirmed_total",
        "Orders whose delivery confirmation distributed commissions"
    );
    metrics::describe_counter!(
        "mlmart_commission_credits_total",
        "Commission credits written, by category"
    );
    metrics::describe_counter!(
        "mlmart_payouts_skipped_total",
        "Commission credits skipped, by reason"
    );
    metrics::describe_counter!(
        "mlmart_settled_transactions_total",
        "Pending commission credits released to cash"
    );
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["mlmart-server", "--port", "8080", "--no-auto-sweep"]);
        assert_eq!(args.port, Some(8080));
        assert!(args.no_auto_sweep);
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "mlmart-server",
            "--hold-hours",
            "24",
            "--log-format",
            "json",
            "--skip-migrations",
        ]);
        let mut config = ServerConfig::development();
        args.apply(&mut config);

        assert_eq!(config.ledger.hold_hours, 24);
        assert_eq!(config.logging.format, "json");
        assert!(!config.database.run_migrations);
        assert!(config.ledger.auto_sweep);
    }

    #[test]
    fn test_hold_hours_override_is_validated() {
        let args = Args::parse_from(["mlmart-server", "--hold-hours", "4294967295"]);
        let mut config = ServerConfig::development();
        args.apply(&mut config);

        assert!(config.ledger.validate().is_err());
    }
}
