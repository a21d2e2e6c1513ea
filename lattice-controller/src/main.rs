use std::sync::Arc;

use clap::{Parser, Subcommand};
use lattice_controller::config::ControllerConfig;
use lattice_controller::db::Store;
use lattice_controller::engine::Controller;
use lattice_controller::rest_api::RestApiServer;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

#[derive(Parser, Debug)]
#[command(name = "lattice-controller")]
#[command(about = "Authoritative configuration controller for latticenet virtual networks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the controller daemon
    Run,
    /// Shows the version of the controller
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_controller().await,
        Commands::Version => show_version(),
    }
}

async fn run_controller() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    // config
    let config_path =
        std::env::var("LATTICE_CONFIG").unwrap_or_else(|_| "controller.toml".to_string());
    let config = ControllerConfig::load_or_generate(&config_path)?;

    // identity
    info!("I am {}", config.identity.public().address());

    // a schema version mismatch aborts right here
    let store = Store::open(&config.db).await?;

    let controller = Arc::new(Controller::new(store, config.identity.clone()));
    let rest_api = RestApiServer::new(controller.clone());
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {e}");
                    return;
                }
            };
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Shutdown initiated via SIGTERM.");
                }
                _ = signal::ctrl_c() => {
                    info!("Shutdown initiated via SIGINT.");
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = signal::ctrl_c().await;
            info!("Shutdown initiated via Ctrl+C.");
        }
        signal_token.cancel();
    });

    rest_api.bind(config.listen, shutdown.clone()).await?;
    trace!("Control plane shut down");

    controller.shutdown().await;

    Ok(())
}

fn show_version() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    println!("lattice-controller {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
