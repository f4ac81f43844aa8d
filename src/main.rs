//! Vehicle telematics pipeline - Main Entry Point

use clap::Parser;
use vehicle_telematics::cli::{
    cmd_clean, cmd_config, cmd_describe, cmd_export, cmd_features, cmd_predict, cmd_run,
    cmd_train, cmd_watch, load_config, Cli, Commands,
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vehicle_telematics=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { input, output } => {
            cmd_run(config, input, output)?;
        }
        Commands::Watch { iterations, interval } => {
            cmd_watch(config, iterations, interval)?;
        }
        Commands::Clean { data, output, threshold, standardize } => {
            cmd_clean(config, &data, &output, threshold, standardize)?;
        }
        Commands::Features { data, output, zero_fuel } => {
            cmd_features(config, &data, &output, zero_fuel.as_deref())?;
        }
        Commands::Train { data, output, trees, seed, test_fraction, per_partition_scaling } => {
            cmd_train(config, &data, output.as_deref(), trees, seed, test_fraction, per_partition_scaling)?;
        }
        Commands::Predict { model, data, output } => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
        Commands::Export { data, output } => {
            cmd_export(&data, &output)?;
        }
        Commands::Describe { data } => {
            cmd_describe(&data)?;
        }
        Commands::Config { write } => {
            cmd_config(&config, write.as_deref())?;
        }
    }

    Ok(())
}
