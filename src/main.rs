use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use campus_gateway::config::{load_config, GatewayConfig};
use campus_gateway::observability::{logging, metrics};
use campus_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "campus-gateway", about = "API gateway for the campus services")]
struct Args {
    /// Path to a TOML config file. Without it the built-in demo
    /// topology (usuarios/cursos/pagos on localhost) is used.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::demo(),
    };

    logging::init_tracing(&config.observability.log_level);

    if config.observability.metrics_enabled {
        let addr: std::net::SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let bind = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&bind).await?;

    let shutdown = Arc::new(Shutdown::new());
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received");
            signal_shutdown.trigger();
        }
    });

    for service in &config.services {
        tracing::info!(
            service = %service.name,
            base_url = %service.base_url,
            timeout_ms = service.timeout_ms,
            max_retries = service.max_retries,
            "downstream registered"
        );
    }

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;
    tracing::info!("gateway stopped");
    Ok(())
}
