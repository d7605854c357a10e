use crate::cli::ApplyArgs;
use crate::config::Config;
use crate::provider::Provider;
use crate::providers::CatalogProvider;
use crate::syncer::{ProjectSyncer, SyncOptions};
use crate::{progress, render, spec, syncer};
use anyhow::Result;
use std::sync::Arc;
use taskpool::CancelToken;

pub async fn run(args: ApplyArgs) -> Result<()> {
    let config = Config::load()?;
    let provider: Arc<dyn Provider> = Arc::new(CatalogProvider::new(&config)?);

    let graph = spec::build_graph(spec::load_dir(&args.dir)?);
    let state = provider.load_state().await?;
    let plan = syncer::planner::plan(&graph, &state)?;
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

    let cancel = cancel_on_interrupt();
    let pb = progress::spinner("Applying changes...");
    let summary = ProjectSyncer::new(provider)
        .apply(
            &cancel,
            &graph,
            &SyncOptions {
                concurrency: args.concurrency,
                continue_on_fail: false,
            },
        )
        .await?;
    pb.finish_and_clear();

    render::print_summary(&summary);
    if !summary.is_success() {
        anyhow::bail!("apply finished with {} errors", summary.errors.len());
    }
    Ok(())
}

/// A token that fires on Ctrl-C. In-flight operations finish; everything
/// still waiting is reported as cancelled.
pub fn cancel_on_interrupt() -> CancelToken {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, finishing in-flight operations");
            trigger.cancel();
        }
    });
    cancel
}
