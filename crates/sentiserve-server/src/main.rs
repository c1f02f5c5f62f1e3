//! Sentiserve
//!
//! Versioned sentiment-classification models behind an HTTP API, with lazy
//! per-version model loading and an optional Redis result cache.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use sentiserve_server::{create_router, AppState, LogFormat, ServerConfig};
use sentiserve_telemetry::PrometheusSink;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "sentiserve")]
#[command(about = "Sentiment model inference server", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SENTISERVE_CONFIG", default_value = "config/sentiserve.yaml")]
    config: String,

    /// Model registry file
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Redis URL for the result cache
    #[arg(long, env = "SENTISERVE_REDIS_URL")]
    redis_url: Option<String>,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(registry) = &self.registry {
            config.registry = Some(registry.clone());
        }
        if let Some(url) = &self.redis_url {
            config.redis_url = Some(url.clone());
        }
        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.json_logs {
            config.log_format = LogFormat::Json;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(&cli.config)?;
    cli.apply(&mut config);

    init_tracing(cli.verbose, config.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config,
        "Starting Sentiserve"
    );
    info!(
        registry = ?config.registry,
        cache = config.redis_url.is_some(),
        execution = ?config.execution,
        "Configuration loaded"
    );

    let metrics_handle = init_metrics()?;

    let state = AppState::new(config.clone(), Some(metrics_handle)).await?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            warn!("Shutdown signal received, stopping server...");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("sentiserve=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sentiserve=info"))
    };

    let (text, json) = match format {
        LogFormat::Text => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    PrometheusSink::describe();

    info!("Metrics exporter initialized");
    Ok(handle)
}
