use clap::Parser;
use sweepfade::cli::{Cli, Commands};
use sweepfade::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
        }
    };

    sweepfade::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(markets = config.markets.len(), "Starting engine");
            args.execute(config).await?;
        }
        Commands::Status => {
            println!("sweepfade status");
            println!("  Mode: {:?}", config.execution.mode);
            println!("  Status: Not running");
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Markets: {:?}", config.markets);
            println!(
                "  Spike: threshold={}, reactivity={}, min_sweep={}, cooldown={}s",
                config.spike.absolute_threshold,
                config.spike.reactivity_multiplier,
                config.spike.min_sweep_size,
                config.spike.cooldown_secs
            );
            println!(
                "  Risk: max_positions={}, max_size=${}",
                config.risk.max_concurrent_positions, config.risk.max_position_size
            );
            println!("  Execution: {:?}", config.execution.mode);
        }
    }

    Ok(())
}
