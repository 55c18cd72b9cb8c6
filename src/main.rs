//! Edge device service host.
//!
//! Loads the service configuration, serves it on the status endpoint and
//! applies remote changes as the pairs file is edited.
//!
//! ```text
//! res/configuration.toml ─┐
//! environment ────────────┼─▶ ConfigLoader ─▶ ConfigContext ◀── /api/v2/config
//! remote pairs file ──────┘                        ▲
//!        │                                         │
//!        └──▶ ConfigWatcher ──▶ mpsc ──▶ reconfigure
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use edge_device_config::admin::setup_admin_router;
use edge_device_config::config::loader::load_document;
use edge_device_config::config::schema::TelemetryConfig;
use edge_device_config::config::watcher::ConfigWatcher;
use edge_device_config::config::{CanonicalStore, ConfigLoader, NameValuePairs};
use edge_device_config::observability::{init_logging, LogLevel};
use edge_device_config::service::{
    Collaborators, ConfigContext, DiscoveryController, DriverHandle, SecretStoreClient, TelemetryScheduler,
};

#[derive(Parser, Debug)]
#[command(name = "edge-device")]
#[command(about = "Edge device service configuration host", long_about = None)]
struct Args {
    /// Configuration document
    #[arg(short, long, default_value = "res/configuration.toml")]
    config: PathBuf,

    #[arg(short = 'n', long, default_value = "device-virtual")]
    service_name: String,

    /// Remote pairs file, applied at startup and watched for changes
    #[arg(short, long)]
    remote: Option<PathBuf>,

    /// Bind address of the status endpoint
    #[arg(short, long)]
    admin: Option<SocketAddr>,
}

/// Stand-in for a device driver: reports what it would be given.
struct LoggedDriver;

impl DriverHandle for LoggedDriver {
    fn reconfigure(&self, config: &CanonicalStore) {
        tracing::info!(keys = config.len(), "Driver reconfigured");
    }
}

struct LoggedTelemetry;

impl TelemetryScheduler for LoggedTelemetry {
    fn reschedule(&self, telemetry: &TelemetryConfig) {
        tracing::info!(interval = %telemetry.interval, "Telemetry rescheduled");
    }
}

struct LoggedDiscovery;

impl DiscoveryController for LoggedDiscovery {
    fn configure(&self, enabled: bool, interval: u32) {
        tracing::debug!(enabled, interval, "Discovery configured");
    }
}

struct LoggedSecretStore;

impl SecretStoreClient for LoggedSecretStore {
    fn reconfigure(&self, store: &CanonicalStore) {
        tracing::debug!(keys = store.len(), "Secret store refreshed");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let logging = Arc::new(init_logging(LogLevel::default()));

    tracing::info!(service = %args.service_name, version = env!("CARGO_PKG_VERSION"), "Starting");

    let document = load_document(&args.config)?;
    let pairs = match &args.remote {
        Some(path) => Some(NameValuePairs::load(path)?),
        None => None,
    };

    let loaded = ConfigLoader::new(&args.service_name)
        .document(Some(&document))
        .remote(pairs.as_ref())
        .load()?;
    tracing::info!(registry = %document.registry_url(), "Configuration registry");

    let hooks = Collaborators::new()
        .with_driver(Arc::new(LoggedDriver))
        .with_telemetry(Arc::new(LoggedTelemetry))
        .with_discovery(Arc::new(LoggedDiscovery))
        .with_secret_store(Arc::new(LoggedSecretStore));
    let ctx = Arc::new(ConfigContext::start(args.service_name.clone(), loaded, logging, hooks)?);

    let live = ctx.current();
    if !live.config.service.startup_msg.is_empty() {
        tracing::info!("{}", live.config.service.startup_msg);
    }
    drop(live);

    if let Some(addr) = args.admin {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(address = %listener.local_addr()?, "Status endpoint listening");
        let router = setup_admin_router(ctx.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "Status endpoint failed");
            }
        });
    }

    match &args.remote {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let _watcher = watcher.run()?;
            loop {
                tokio::select! {
                    Some(pairs) = updates.recv() => {
                        if let Err(e) = ctx.reconfigure(&pairs) {
                            tracing::error!(error = %e, "Reconfiguration failed");
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
