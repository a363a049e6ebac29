// coordinator: multicast group coordinator daemon.

use clap::Parser;
use coordinator::Coordinator;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser)]
#[command(name = "coordinator", about = "Persistent multicast group coordinator")]
struct Args {
    /// Config file: line 1 listening port, line 2 persistence window seconds.
    config: std::path::PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = match coordinator::config::load_config_from_path(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("FATAL: failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        persistence_window_secs = cfg.persistence_window_secs,
        "coordinator starting"
    );

    let coordinator = match Coordinator::bind(&cfg).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("FATAL: failed to bind port {}: {}", cfg.port, e);
            std::process::exit(1);
        }
    };
    info!(addr = %coordinator.local_addr(), "listening for control connections");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(coordinator.run(shutdown_rx));

    let _ = tokio::signal::ctrl_c().await;
    info!("interrupt received, shutting down");
    let _ = shutdown_tx.send(true);
    let _ = server.await;
}
