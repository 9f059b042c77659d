//! Scriptorium CLI binary.
//!
//! This binary provides command-line access to Scriptorium's functionality:
//! - Run pipeline plans against a project snapshot
//! - Render a project's narrative context
//! - Validate plan files

use clap::Parser;
use scriptorium::{ObservabilityConfig, init_tracing};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, print_context, run_pipeline, validate_plan};

    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    init_tracing(
        ObservabilityConfig::new(env!("CARGO_PKG_NAME"))
            .with_log_level(log_level)
            .with_json_logs(cli.json_logs),
    )?;

    match cli.command {
        Commands::Run(args) => {
            run_pipeline(&args).await?;
        }

        Commands::Context(args) => {
            print_context(&args)?;
        }

        Commands::Validate { plan } => {
            validate_plan(&plan)?;
        }
    }

    Ok(())
}
