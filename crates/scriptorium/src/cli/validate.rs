//! Plan validation command handler.

use scriptorium::{PipelinePlan, ScriptoriumResult};
use std::path::Path;

/// Parses and validates a plan, then prints its steps.
pub fn validate_plan(path: &Path) -> ScriptoriumResult<()> {
    let plan = PipelinePlan::from_file(path)?;

    println!(
        "Plan '{}' is valid ({} steps)",
        plan.name.as_deref().unwrap_or("unnamed"),
        plan.steps.len()
    );
    for (index, step) in plan.into_steps().iter().enumerate() {
        if step.depends_on.is_empty() {
            println!("  {}. {}: {}", index, step.role, step.task);
        } else {
            let deps: Vec<String> = step.depends_on.iter().map(|d| d.to_string()).collect();
            println!(
                "  {}. {}: {} (after {})",
                index,
                step.role,
                step.task,
                deps.join(", ")
            );
        }
    }
    Ok(())
}
