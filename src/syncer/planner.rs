//! Turns a diff into an ordered list of operations.

use super::differ::{Diff, compute_diff};
use anyhow::{Result, bail};
use resgraph::{Graph, State, Urn};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Import,
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Import => "import",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperationKind,
    pub urn: Urn,
}

/// Ordered operations: imports, then creates, then updates, then deletes.
/// Dependency ordering within each group is the scheduler's job; the plan
/// only fixes the group order.
#[derive(Debug, Default)]
pub struct Plan {
    pub operations: Vec<Operation>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations.iter().filter(|op| op.kind == kind).count()
    }

    /// Operations that touch the desired graph (everything but deletes).
    pub fn forward(&self) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(|op| op.kind != OperationKind::Delete)
    }

    pub fn deletes(&self) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(|op| op.kind == OperationKind::Delete)
    }
}

/// Compute the plan for reconciling `state` to `target`.
///
/// Fails when the graph contains a reference cycle; nothing is schedulable
/// in that case.
pub fn plan(target: &Graph, state: &State) -> Result<Plan> {
    if let Some(cycle) = target.detect_cycles() {
        let path: Vec<String> = cycle.iter().map(ToString::to_string).collect();
        bail!("dependency cycle detected: {}", path.join(" -> "));
    }

    let diff = compute_diff(target, state);
    Ok(from_diff(target, &diff))
}

fn from_diff(target: &Graph, diff: &Diff) -> Plan {
    let mut operations = Vec::with_capacity(diff.len());

    for urn in &diff.new {
        // Resources carrying import metadata are adopted, not recreated.
        let kind = match target.get_resource(urn).and_then(|r| r.import_metadata()) {
            Some(_) => OperationKind::Import,
            None => OperationKind::Create,
        };
        operations.push(Operation {
            kind,
            urn: urn.clone(),
        });
    }
    operations.sort_by_key(|op| op.kind == OperationKind::Create);

    for urn in &diff.updated {
        operations.push(Operation {
            kind: OperationKind::Update,
            urn: urn.clone(),
        });
    }
    for urn in &diff.removed {
        operations.push(Operation {
            kind: OperationKind::Delete,
            urn: urn.clone(),
        });
    }

    Plan { operations }
}
