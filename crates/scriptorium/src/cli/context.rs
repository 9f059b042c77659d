//! Context rendering command handler.

use super::ContextArgs;
use super::run::{load_config, read_json};
use scriptorium::{ContextOptions, ProjectSnapshot, ScriptoriumResult, render_context};
use tracing::debug;

/// Prints the context document a step of this project would receive.
pub fn print_context(args: &ContextArgs) -> ScriptoriumResult<()> {
    let config = load_config(args.config.as_deref())?;
    let snapshot: ProjectSnapshot = read_json(&args.project)?;
    let options = apply_flags(config.context, args);
    debug!(?options, "Rendering context");

    let text = render_context(&snapshot, args.chapter.as_deref(), &options)?;
    println!("{}", text);
    Ok(())
}

/// Command-line switches only ever turn sections off.
fn apply_flags(mut options: ContextOptions, args: &ContextArgs) -> ContextOptions {
    options.include_plot_points &= !args.no_plot_points;
    options.include_style_references &= !args.no_style;
    options.include_chapter_summaries &= !args.no_summaries;
    options.include_chapter_synopses &= !args.no_synopses;
    options
}
