use std::path::PathBuf;
use clap::Parser;
use service_gateway::lifecycle::{signals, startup, Shutdown};
use service_gateway::observability::{logging, metrics};
use service_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "service-gateway")]
#[command(about = "Adaptive request-routing gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match startup::resolve_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            // Logging is not configured yet.
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        algorithm = %config.gateway.algorithm,
        request_timeout_ms = config.gateway.request_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = startup::bind_listener(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
