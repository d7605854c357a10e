use crate::cli::ValidateArgs;
use crate::{render, spec};
use anyhow::{Result, bail};
use std::collections::HashSet;

pub fn run(args: &ValidateArgs) -> Result<()> {
    let resources = spec::load_dir(&args.dir)?;
    if resources.is_empty() {
        render::warn(&format!("no spec files found under {}", args.dir.display()));
        return Ok(());
    }
    let count = resources.len();

    let mut seen = HashSet::new();
    for resource in &resources {
        let urn = resource.urn();
        if !seen.insert(urn.clone()) {
            bail!("duplicate resource definition: {urn}");
        }
    }

    let graph = spec::build_graph(resources);
    if let Some(cycle) = graph.detect_cycles() {
        let path: Vec<String> = cycle.iter().map(ToString::to_string).collect();
        bail!("dependency cycle detected: {}", path.join(" -> "));
    }

    // References to resources outside the spec dir may still exist remotely,
    // so they only warn.
    for urn in graph.resources().keys() {
        for dep in graph.get_dependencies(urn) {
            if graph.get_resource(dep).is_none() {
                render::warn(&format!("{urn} references {dep}, which no spec defines"));
            }
        }
    }

    render::success(&format!("{count} spec files OK"));
    Ok(())
}
