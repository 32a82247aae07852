//! Academic Stress - Main Entry Point
//!
//! Runs the classifier lifecycle from the command line or as an HTTP server.

use clap::Parser;
use academic_stress::cli::{
    cmd_metrics, cmd_predict, cmd_predict_batch, cmd_schema, cmd_serve, cmd_train, Cli, Commands,
};

// The dataset loader uses a blocking HTTP client, so the async runtime is
// only started for `serve`.
fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academic_stress=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.app_config();

    match cli.command {
        Commands::Train => cmd_train(&config)?,
        Commands::Predict { input, fields } => cmd_predict(&config, input.as_deref(), &fields)?,
        Commands::PredictBatch { data, output } => {
            cmd_predict_batch(&config, &data, output.as_deref())?
        }
        Commands::Metrics => cmd_metrics(&config)?,
        Commands::Schema => cmd_schema(&config)?,
        Commands::Serve { host, port, train_if_missing } => {
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(cmd_serve(config, &host, port, train_if_missing))?;
        }
    }

    Ok(())
}
