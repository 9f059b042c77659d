//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Scriptorium - run multi-agent fiction pipelines
#[derive(Parser, Debug)]
#[command(name = "scriptorium")]
#[command(about = "Run multi-agent fiction pipelines against a project's narrative state", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a pipeline plan, printing every event as a JSON line
    Run(RunArgs),

    /// Print the rendered narrative context of a project
    Context(ContextArgs),

    /// Check a plan file without running it
    Validate {
        /// Path to the plan TOML file
        #[arg(long)]
        plan: PathBuf,
    },
}

/// Arguments of `scriptorium run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the plan TOML file
    #[arg(long)]
    pub plan: PathBuf,

    /// Path to the project snapshot JSON file
    #[arg(long)]
    pub project: PathBuf,

    /// Chapter the run is scoped to
    #[arg(long)]
    pub chapter: Option<String>,

    /// Configuration file overlaid on the bundled defaults
    #[arg(long, env = "SCRIPTORIUM_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON map of step index to a previous run's output; those steps are skipped
    #[arg(long)]
    pub resume_from: Option<PathBuf>,

    /// Write the final outputs as JSON to this file
    #[arg(long)]
    pub save_outputs: Option<PathBuf>,
}

/// Arguments of `scriptorium context`.
#[derive(Args, Debug)]
pub struct ContextArgs {
    /// Path to the project snapshot JSON file
    #[arg(long)]
    pub project: PathBuf,

    /// Render the chapter-scoped overlay for this chapter
    #[arg(long)]
    pub chapter: Option<String>,

    /// Configuration file overlaid on the bundled defaults
    #[arg(long, env = "SCRIPTORIUM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Omit the plot outline
    #[arg(long)]
    pub no_plot_points: bool,

    /// Omit style references
    #[arg(long)]
    pub no_style: bool,

    /// Omit chapter summaries
    #[arg(long)]
    pub no_summaries: bool,

    /// Omit chapter synopses
    #[arg(long)]
    pub no_synopses: bool,
}
