//! Diff between the desired graph and recorded state.

use resgraph::{Graph, State, Urn};

/// URNs partitioned by what has to happen to them.
#[derive(Debug, Default)]
pub struct Diff {
    /// In the graph, not in state.
    pub new: Vec<Urn>,
    /// In both, with different input data.
    pub updated: Vec<Urn>,
    /// In state, no longer in the graph.
    pub removed: Vec<Urn>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.updated.len() + self.removed.len()
    }
}

pub fn compute_diff(target: &Graph, state: &State) -> Diff {
    let mut diff = Diff::default();

    for (urn, resource) in target.resources() {
        match state.get_resource(urn) {
            None => diff.new.push(urn.clone()),
            Some(recorded) => {
                if recorded.input != *resource.data() {
                    diff.updated.push(urn.clone());
                }
            }
        }
    }

    for recorded in state.resources.values() {
        let urn = recorded.urn();
        if target.get_resource(&urn).is_none() {
            diff.removed.push(urn);
        }
    }

    // Map iteration order is arbitrary; keep output stable.
    diff.new.sort();
    diff.updated.sort();
    diff.removed.sort();
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use resgraph::{PropertyValue, Resource, ResourceData, ResourceState};

    fn resource(id: &str, kind: &str, name: &str) -> Resource {
        Resource::new(
            id,
            kind,
            ResourceData::from([("name".to_string(), PropertyValue::from(name))]),
            Vec::new(),
        )
    }

    fn recorded(id: &str, kind: &str, name: &str) -> ResourceState {
        ResourceState {
            id: id.into(),
            kind: kind.into(),
            input: ResourceData::from([("name".to_string(), PropertyValue::from(name))]),
            output: ResourceData::new(),
            output_raw: None,
            dependencies: vec![],
        }
    }

    #[test]
    fn partitions_new_updated_and_removed() {
        let mut graph = Graph::new();
        graph.add_resource(resource("checkout", "event", "Checkout"));
        graph.add_resource(resource("mobile", "tracking-plan", "Mobile v2"));

        let mut state = State::empty();
        state.add_resource(recorded("mobile", "tracking-plan", "Mobile"));
        state.add_resource(recorded("legacy", "event", "Legacy"));

        let diff = compute_diff(&graph, &state);
        assert_eq!(diff.new, vec![Urn::new("checkout", "event")]);
        assert_eq!(diff.updated, vec![Urn::new("mobile", "tracking-plan")]);
        assert_eq!(diff.removed, vec![Urn::new("legacy", "event")]);
        assert_eq!(diff.len(), 3);
    }

    #[test]
    fn identical_input_produces_no_diff() {
        let mut graph = Graph::new();
        graph.add_resource(resource("mobile", "tracking-plan", "Mobile"));

        let mut state = State::empty();
        state.add_resource(recorded("mobile", "tracking-plan", "Mobile"));

        assert!(compute_diff(&graph, &state).is_empty());
    }
}
