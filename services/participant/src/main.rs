// participant: interactive multicast group member.

use clap::Parser;
use participant::Session;
use tracing::info;

#[derive(Parser)]
#[command(name = "participant", about = "Persistent multicast group participant")]
struct Args {
    /// Config file: participant id, log-file path, `<coordinator_ip> <coordinator_port>`.
    config: std::path::PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let cfg = match participant::config::load_config_from_path(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("FATAL: failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        version = env!("CARGO_PKG_VERSION"),
        participant_id = %cfg.participant_id,
        coordinator = %cfg.coordinator_addr,
        "participant starting"
    );
    println!("Coordinator: {}", cfg.coordinator_addr);

    let mut session = match Session::new(&cfg) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("FATAL: failed to open log file '{}': {}", cfg.log_path.display(), e);
            std::process::exit(1);
        }
    };

    participant::repl::run(&mut session).await;
}
