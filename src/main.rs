mod cli;

use bulkfetch::config::Config;
use bulkfetch::observability::TracingSink;
use bulkfetch::pipeline::Pipeline;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let mut config = Config::load_with(args.config.clone())?;
            args.apply(&mut config);
            config.validate()?;

            let pipeline = Pipeline::new(config, Arc::new(TracingSink));
            let report = pipeline.run(&args.file).await?;
            info!(run_id = %report.run_id, "Done");
        }
        Commands::Check(args) => {
            let config = Config::load_with(args.config)?;
            let pipeline = Pipeline::new(config, Arc::new(TracingSink));
            let summary = pipeline.check(&args.file).await?;
            println!("accepted: {}", summary.accepted);
            println!("rejected: {}", summary.rejected);
        }
        Commands::Config(args) => {
            let config = Config::load_with(args.config)?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
