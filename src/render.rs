//! Terminal rendering for plans and run summaries.

use crate::syncer::SyncSummary;
use crate::syncer::planner::{OperationKind, Plan};
use anyhow::Result;
use colored::Colorize;

/// Print an info line
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success line
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning line
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error line
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Display a plan in a user-friendly format
pub fn display_plan(plan: &Plan) {
    if plan.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Plan".bold()
    );
    println!("│");

    for op in &plan.operations {
        let symbol = match op.kind {
            OperationKind::Import => "»".cyan(),
            OperationKind::Create => "+".green(),
            OperationKind::Update => "~".yellow(),
            OperationKind::Delete => "-".red(),
        };
        println!(
            "│   {} {:<40} {}",
            symbol,
            op.urn.to_string(),
            op.kind.to_string().dimmed()
        );
    }

    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} to import, {} to create, {} to update, {} to delete",
        plan.count(OperationKind::Import).to_string().cyan(),
        plan.count(OperationKind::Create).to_string().green(),
        plan.count(OperationKind::Update).to_string().yellow(),
        plan.count(OperationKind::Delete).to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Print the result of an apply or destroy run
pub fn print_summary(summary: &SyncSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Catalog is in sync!", "✓".green().bold());
    } else {
        println!("  {} Sync finished with errors", "⚠".yellow().bold());
    }

    if summary.imported > 0 {
        println!("    • {} resources imported", summary.imported);
    }
    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} resources updated", summary.updated);
    }
    if summary.deleted > 0 {
        println!("    • {} resources deleted", summary.deleted);
    }
    if !summary.errors.is_empty() {
        println!(
            "    • {} {} failed",
            summary.errors.len(),
            "operations".red()
        );
        for error in &summary.errors {
            use std::error::Error as _;
            match error.source() {
                Some(source) => println!("      {} {error}: {source}", "✗".red()),
                None => println!("      {} {error}", "✗".red()),
            }
        }
    }
}

/// Confirm with user
pub fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}
