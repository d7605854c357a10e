use crate::cli::DestroyArgs;
use crate::config::Config;
use crate::provider::Provider;
use crate::providers::CatalogProvider;
use crate::syncer::{ProjectSyncer, SyncOptions};
use crate::{progress, render, syncer};
use anyhow::Result;
use resgraph::Graph;
use std::sync::Arc;

pub async fn run(args: DestroyArgs) -> Result<()> {
    let config = Config::load()?;
    let provider: Arc<dyn Provider> = Arc::new(CatalogProvider::new(&config)?);

    let state = provider.load_state().await?;
    let plan = syncer::planner::plan(&Graph::new(), &state)?;
    render::display_plan(&plan);

    if plan.is_empty() {
        return Ok(());
    }
    if args.dry_run {
        println!();
        render::info("Dry run - no changes made");
        return Ok(());
    }
    if !args.yes && !render::confirm_proceed()? {
        println!();
        render::error("Aborted");
        return Ok(());
    }

    let cancel = super::apply::cancel_on_interrupt();
    let pb = progress::spinner("Destroying resources...");
    // Keep going on individual failures: every resource that can go, goes.
    let summary = ProjectSyncer::new(provider)
        .destroy(
            &cancel,
            &SyncOptions {
                concurrency: args.concurrency,
                continue_on_fail: true,
            },
        )
        .await?;
    pb.finish_and_clear();

    render::print_summary(&summary);
    if !summary.is_success() {
        anyhow::bail!("destroy finished with {} errors", summary.errors.len());
    }
    Ok(())
}
