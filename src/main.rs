mod config;
mod context;
mod monitor;
mod server;
mod utils;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const APP_NAME: &str = "aci-pulse";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9643";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug)]
#[command(
    name = APP_NAME,
    version = VERSION,
    about = "Prometheus exporter for Cisco ACI fabrics",
    long_about = "ACI Pulse: polls APIC controllers for fabric, pod, node and tenant health, fault counts and controller inventory, and exposes them as Prometheus metrics"
)]
struct Args {
    /// The address to listen on for HTTP requests
    #[arg(
        long,
        env = "ACI_PULSE_LISTEN",
        default_value = DEFAULT_LISTEN_ADDRESS,
        help = "The address to listen on for HTTP requests"
    )]
    listen_address: String,

    /// Path of the YAML configuration file
    #[arg(
        long,
        env = "ACI_PULSE_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Path of the YAML configuration file"
    )]
    config: String,

    /// Log level
    #[arg(
        long,
        env = "RUST_LOG",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level (trace/debug/info/warn/error)"
    )]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        return;
    }

    info!(
        app = APP_NAME,
        version = VERSION,
        listen_address = %args.listen_address,
        config = %args.config,
        log_level = %args.log_level,
        "announcement"
    );

    let exporter_config = match config::ExporterConfig::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            return;
        }
    };

    info!(
        fabrics = exporter_config.fabrics.len(),
        prefix = %exporter_config.prefix,
        "Configuration loaded"
    );

    // Create application context with all singletons
    let app_context = match context::AppContext::new(exporter_config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Failed to initialize application context: {:#}", e);
            return;
        }
    };

    // Start HTTP server
    tracing::debug!(listen_address = %args.listen_address, "Starting HTTP server");
    if let Err(e) = server::start_server(&args.listen_address, app_context).await {
        tracing::error!(error = %e, "Server error");
    }
}

/// Initialize the logging system
fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = match log_level {
        "trace" => EnvFilter::new("trace"),
        "debug" => EnvFilter::new("debug"),
        "info" => EnvFilter::new("info"),
        "warn" => EnvFilter::new("warn"),
        "error" => EnvFilter::new("error"),
        _ => EnvFilter::new("info"),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true),
        )
        .with(env_filter)
        .try_init()?;

    Ok(())
}
