//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the scriptorium binary.

mod commands;
mod context;
mod run;
mod validate;

pub use commands::{Cli, Commands, ContextArgs, RunArgs};
pub use context::print_context;
pub use run::run_pipeline;
pub use validate::validate_plan;
