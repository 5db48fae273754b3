//! Palpiteiro API gateway binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use palpiteiro_server::{
    BackendConfig, GatewayConfig, IdentityProvider, NetworkConfig, NetworkModule, ObjectStore,
    RetryPolicy, SupabaseClient,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Timeout for a single call to the hosted backend.
const BACKEND_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Palpiteiro API gateway: CORS, bearer authentication, and admin gating.
#[derive(Parser, Debug)]
#[command(name = "palpiteiro-gateway", version, about)]
struct Cli {
    /// Base URL of the hosted backend project.
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: String,

    /// Public (anon) API key.
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    supabase_anon_key: String,

    /// Service-role key used for profile lookups and object deletion.
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    supabase_service_role_key: Option<String>,

    /// Bind host.
    #[arg(long, env = "PALPITEIRO_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port.
    #[arg(long, env = "PALPITEIRO_PORT", default_value_t = 8080)]
    port: u16,

    /// Attempts per identity/object-store call, including the first.
    #[arg(long, env = "PALPITEIRO_RETRY_ATTEMPTS", default_value_t = 3)]
    retry_attempts: u32,

    /// Fixed delay between attempts, in milliseconds.
    #[arg(long, env = "PALPITEIRO_RETRY_DELAY_MS", default_value_t = 500)]
    retry_delay_ms: u64,

    /// Emit logs as JSON lines.
    #[arg(long, env = "PALPITEIRO_LOG_JSON")]
    log_json: bool,

    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "PALPITEIRO_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Some(addr) = cli.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        info!(%addr, "metrics exporter listening");
    }

    let mut backend = BackendConfig::new(cli.supabase_url, cli.supabase_anon_key);
    if let Some(key) = cli.supabase_service_role_key {
        backend = backend.with_service_role_key(key);
    }
    let backend = Arc::new(backend);
    info!(?backend, "backend configured");

    let client = Arc::new(
        SupabaseClient::new(Arc::clone(&backend), BACKEND_CALL_TIMEOUT)
            .context("failed to build backend HTTP client")?,
    );

    let gateway = GatewayConfig {
        retry: RetryPolicy {
            max_attempts: cli.retry_attempts,
            delay: Duration::from_millis(cli.retry_delay_ms),
        },
        ..GatewayConfig::default()
    };
    let network = NetworkConfig {
        host: cli.host,
        port: cli.port,
        ..NetworkConfig::default()
    };

    let identity: Arc<dyn IdentityProvider> = client.clone();
    let objects: Arc<dyn ObjectStore> = client;
    let mut module = NetworkModule::new(network, gateway, backend, identity, objects);
    let port = module.start().await?;
    info!(port, "palpiteiro gateway starting");

    module
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
}
