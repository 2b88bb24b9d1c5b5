//! Athlete Monitor CLI Entry Point

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use athlete_monitor_cli::{monitor, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            monitor::execute_run(args).await?;
        }
        Commands::Ranges(args) => {
            monitor::execute_ranges(args)?;
        }
        Commands::Version => {
            println!("athlete-monitor {}", env!("CARGO_PKG_VERSION"));
            println!("vitals library version: {}", athlete_monitor_vitals::VERSION);
        }
    }

    Ok(())
}
