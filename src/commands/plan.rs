use crate::cli::PlanArgs;
use crate::config::Config;
use crate::provider::Provider;
use crate::providers::CatalogProvider;
use crate::{render, spec, syncer};
use anyhow::Result;

pub async fn run(args: PlanArgs) -> Result<()> {
    let config = Config::load()?;
    let provider = CatalogProvider::new(&config)?;

    let graph = spec::build_graph(spec::load_dir(&args.dir)?);
    let state = provider.load_state().await?;

    let plan = syncer::planner::plan(&graph, &state)?;
    render::display_plan(&plan);
    Ok(())
}
