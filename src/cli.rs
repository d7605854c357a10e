use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "catsync")]
#[command(version)]
#[command(about = "Declarative CLI for event-catalog resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change, without touching the remote
    Plan(PlanArgs),

    /// Reconcile the remote catalog to match the local specs
    Apply(ApplyArgs),

    /// Delete every resource recorded in state
    Destroy(DestroyArgs),

    /// Check spec files for structural problems
    Validate(ValidateArgs),
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Directory containing spec files
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Directory containing spec files
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Number of operations to run in parallel
    #[arg(short, long, default_value = "4")]
    pub concurrency: usize,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Show the plan and stop before executing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct DestroyArgs {
    /// Number of operations to run in parallel
    #[arg(short, long, default_value = "4")]
    pub concurrency: usize,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Show what would be deleted and stop
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Directory containing spec files
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,
}
