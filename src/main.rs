use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dexbot::adapter::outbound::sqlite::{create_pool, run_migrations};
use dexbot::app::config::Config;
use dexbot::app::App;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

/// dexbot - event-driven DEX pair trading engine.
#[derive(Parser, Debug)]
#[command(name = "dexbot")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the engine until Ctrl-C
    Run(ConfigPathArg),
    /// Validate the configuration and apply database migrations
    Check(ConfigPathArg),
}

#[derive(Parser, Debug)]
struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

fn load_config(path: &PathBuf) -> anyhow::Result<Config> {
    Config::load(path).with_context(|| format!("failed to load config from {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let config = load_config(&args.config)?;
            config.init_logging();
            info!(chain = %config.chain.name, "dexbot starting");

            let app = App::build(&config)?;
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let engine = tokio::spawn(app.run(shutdown_rx));

            signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
            engine.await.context("engine task panicked")?;

            info!("dexbot stopped");
        }
        Command::Check(args) => {
            let config = load_config(&args.config)?;
            config.init_logging();
            let pool = create_pool(&config.database.url)?;
            run_migrations(&pool)?;
            println!("Configuration OK, database {} migrated", config.database.url);
        }
    }
    Ok(())
}
