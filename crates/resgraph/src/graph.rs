//! In-memory resource graph with derived dependency edges.

use crate::resource::Resource;
use crate::urn::Urn;
use crate::value::collect_references;
use std::collections::HashMap;

/// An index of resources plus two adjacency maps: `dependencies` (what a
/// resource depends on) and `dependents` (its exact transpose).
///
/// Both adjacency lists are deduplicated; inserting the same edge twice is a
/// no-op. The graph is a construction-time structure and is not safe for
/// concurrent mutation.
#[derive(Debug, Default)]
pub struct Graph {
    resources: HashMap<Urn, Resource>,
    dependencies: HashMap<Urn, Vec<Urn>>,
    dependents: HashMap<Urn, Vec<Urn>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resources(&self) -> &HashMap<Urn, Resource> {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Add a resource, deriving one dependency edge per unique reference
    /// found in its data, unioned with its declared dependencies.
    ///
    /// References are collected from the semi-structured data walk and, when
    /// a strongly-typed payload is attached, from its own description; both
    /// feed the same edge-insertion path as declared dependencies. A URN
    /// collision overwrites the previous entry (last write wins).
    pub fn add_resource(&mut self, resource: Resource) {
        let urn = resource.urn();

        let mut refs = collect_references(resource.data());
        if let Some(raw) = resource.raw_data() {
            refs.extend(raw.references());
        }
        for re in refs {
            self.add_dependency(&urn, re.urn());
        }
        for dep in resource.dependencies().to_vec() {
            self.add_dependency(&urn, &dep);
        }

        self.resources.insert(urn, resource);
    }

    pub fn get_resource(&self, urn: &Urn) -> Option<&Resource> {
        self.resources.get(urn)
    }

    /// Idempotent edge insertion; updates the reverse index in lock-step.
    pub fn add_dependency(&mut self, from: &Urn, to: &Urn) {
        let deps = self.dependencies.entry(from.clone()).or_default();
        if deps.contains(to) {
            return;
        }
        deps.push(to.clone());

        let dependents = self.dependents.entry(to.clone()).or_default();
        if !dependents.contains(from) {
            dependents.push(from.clone());
        }
    }

    pub fn add_dependencies(&mut self, from: &Urn, to: &[Urn]) {
        for dep in to {
            self.add_dependency(from, dep);
        }
    }

    /// URNs this resource depends on; empty when none are recorded.
    pub fn get_dependencies(&self, urn: &Urn) -> &[Urn] {
        self.dependencies.get(urn).map_or(&[], Vec::as_slice)
    }

    /// URNs that depend on this resource; empty when none are recorded.
    pub fn get_dependents(&self, urn: &Urn) -> &[Urn] {
        self.dependents.get(urn).map_or(&[], Vec::as_slice)
    }

    /// Fold another graph's resources and edges into this one.
    ///
    /// Everything is re-inserted through the same paths as direct insertion,
    /// so the merged graph satisfies the same invariants as one built from
    /// scratch.
    pub fn merge(&mut self, other: Graph) {
        let edges: Vec<(Urn, Vec<Urn>)> = other
            .dependencies
            .iter()
            .map(|(from, to)| (from.clone(), to.clone()))
            .collect();

        for (_, resource) in other.resources {
            self.add_resource(resource);
        }
        for (from, deps) in edges {
            self.add_dependencies(&from, &deps);
        }
    }

    /// Find the first dependency cycle, if any, as the URN path that closes
    /// it (first and last element equal).
    ///
    /// Depth-first search over `dependencies`; nodes finished on a previous
    /// branch are never revisited, nodes on the current path signal a back
    /// edge.
    pub fn detect_cycles(&self) -> Option<Vec<Urn>> {
        let mut visited = HashMap::new();

        let mut roots: Vec<&Urn> = self.resources.keys().collect();
        roots.sort();

        for root in roots {
            if !visited.contains_key(root)
                && let Some(cycle) = self.cycle_from(root, &mut visited, &mut Vec::new())
            {
                return Some(cycle);
            }
        }
        None
    }

    fn cycle_from(
        &self,
        node: &Urn,
        visited: &mut HashMap<Urn, bool>,
        path: &mut Vec<Urn>,
    ) -> Option<Vec<Urn>> {
        visited.insert(node.clone(), true);
        path.push(node.clone());

        for dep in self.get_dependencies(node) {
            if let Some(start) = path.iter().position(|p| p == dep) {
                let mut cycle: Vec<Urn> = path[start..].to_vec();
                cycle.push(dep.clone());
                return Some(cycle);
            }
            if !visited.contains_key(dep)
                && let Some(cycle) = self.cycle_from(dep, visited, path)
            {
                return Some(cycle);
            }
        }

        path.pop();
        None
    }
}
