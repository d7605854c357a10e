//! Recorded inputs and outputs of applied resources.
//!
//! The state is what deferred references are bound against: once a
//! resource's apply step has produced its output, every [`PropertyRef`]
//! pointing at it can be dereferenced to a concrete value.

use crate::error::{ResolveError, StateError};
use crate::reference::PropertyRef;
use crate::urn::Urn;
use crate::value::{PropertyValue, ResourceData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Version tag written into persisted state files.
pub const STATE_VERSION: &str = "1";

/// Recorded state of one applied resource.
#[derive(Clone, Serialize, Deserialize)]
pub struct ResourceState {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// The input the resource was applied with.
    #[serde(default)]
    pub input: ResourceData,
    /// What the remote reported back (remote ids and derived fields).
    #[serde(default)]
    pub output: ResourceData,
    /// Strongly-typed output state, available only within the run that
    /// produced it; never persisted.
    #[serde(skip)]
    pub output_raw: Option<Arc<dyn Any + Send + Sync>>,
    #[serde(default)]
    pub dependencies: Vec<Urn>,
}

impl ResourceState {
    pub fn urn(&self) -> Urn {
        Urn::new(&self.id, &self.kind)
    }

    /// Input and output merged into one view; output entries win.
    pub fn data(&self) -> ResourceData {
        let mut merged = self.input.clone();
        for (key, value) in &self.output {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

impl fmt::Debug for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceState")
            .field("urn", &self.urn())
            .field("input", &self.input)
            .field("output", &self.output)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// All recorded resources, keyed by URN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub version: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub resources: HashMap<String, ResourceState>,
}

impl State {
    pub fn empty() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            updated_at: Utc::now(),
            resources: HashMap::new(),
        }
    }

    pub fn add_resource(&mut self, resource: ResourceState) {
        self.resources
            .insert(resource.urn().as_str().to_string(), resource);
        self.updated_at = Utc::now();
    }

    pub fn remove_resource(&mut self, urn: &Urn) {
        self.resources.remove(urn.as_str());
        self.updated_at = Utc::now();
    }

    pub fn get_resource(&self, urn: &Urn) -> Option<&ResourceState> {
        self.resources.get(urn.as_str())
    }

    /// Combine with another state, rejecting incompatible versions and
    /// duplicate URNs.
    pub fn merge(mut self, other: State) -> Result<State, StateError> {
        if other.version != self.version {
            return Err(StateError::IncompatibleVersion {
                expected: self.version,
                found: other.version,
            });
        }
        for (urn, resource) in other.resources {
            if self.resources.contains_key(&urn) {
                return Err(StateError::DuplicateUrn { urn });
            }
            self.resources.insert(urn, resource);
        }
        Ok(self)
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, StateError> {
        let state: State = serde_json::from_str(raw)?;
        if state.version != STATE_VERSION {
            return Err(StateError::IncompatibleVersion {
                expected: STATE_VERSION.to_string(),
                found: state.version,
            });
        }
        Ok(state)
    }
}

/// Replace every reference in `data` with the concrete value recorded for
/// its target.
///
/// References carrying a typed resolver are bound against the target's raw
/// output state; plain references look up their property in the target's
/// merged data, following further references recursively. Either way the
/// reference's one-shot cell is bound as a side effect, so later readers of
/// the same reference observe it resolved.
pub fn dereference(data: &ResourceData, state: &State) -> Result<ResourceData, ResolveError> {
    let mut out = ResourceData::new();
    for (key, value) in data {
        out.insert(key.clone(), dereference_value(value, state)?);
    }
    Ok(out)
}

fn dereference_value(
    value: &PropertyValue,
    state: &State,
) -> Result<PropertyValue, ResolveError> {
    match value {
        PropertyValue::Ref(re) => resolve_ref(re, state),
        PropertyValue::Map(entries) => {
            let mut out = std::collections::BTreeMap::new();
            for (key, inner) in entries {
                out.insert(key.clone(), dereference_value(inner, state)?);
            }
            Ok(PropertyValue::Map(out))
        }
        PropertyValue::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(dereference_value(item, state)?);
            }
            Ok(PropertyValue::List(out))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_ref(re: &PropertyRef, state: &State) -> Result<PropertyValue, ResolveError> {
    let resource = state
        .get_resource(re.urn())
        .ok_or_else(|| ResolveError::MissingResource { urn: re.urn().clone() })?;

    if re.has_resolver() {
        let output = resource
            .output_raw
            .as_ref()
            .ok_or_else(|| ResolveError::MissingOutput { urn: re.urn().clone() })?;
        let value = re.resolve_with(output.as_ref())?;
        return Ok(PropertyValue::String(value.to_string()));
    }

    let data = resource.data();
    let target = data
        .get(re.property())
        .ok_or_else(|| ResolveError::MissingProperty {
            urn: re.urn().clone(),
            property: re.property().to_string(),
        })?;

    let resolved = dereference_value(target, state)?;
    re.bind(resolved.display_string());
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_state(remote_id: &str) -> ResourceState {
        ResourceState {
            id: "mobile".into(),
            kind: "tracking-plan".into(),
            input: ResourceData::from([("name".to_string(), PropertyValue::from("Mobile"))]),
            output: ResourceData::from([(
                "id".to_string(),
                PropertyValue::from(remote_id),
            )]),
            output_raw: None,
            dependencies: vec![],
        }
    }

    #[test]
    fn data_merges_input_and_output() {
        let rs = plan_state("tp_1");
        let data = rs.data();
        assert_eq!(data.get("name"), Some(&PropertyValue::from("Mobile")));
        assert_eq!(data.get("id"), Some(&PropertyValue::from("tp_1")));
    }

    #[test]
    fn dereference_replaces_refs_with_recorded_values() {
        let mut state = State::empty();
        state.add_resource(plan_state("tp_1"));

        let re = PropertyRef::new(Urn::new("mobile", "tracking-plan"), "id");
        let data = ResourceData::from([
            ("plan".to_string(), PropertyValue::Ref(re.clone())),
            ("name".to_string(), PropertyValue::from("Checkout")),
        ]);

        let resolved = dereference(&data, &state).unwrap();
        assert_eq!(resolved.get("plan"), Some(&PropertyValue::from("tp_1")));
        assert_eq!(re.value(), Some("tp_1"));
    }

    #[test]
    fn dereference_recurses_through_nesting() {
        let mut state = State::empty();
        state.add_resource(plan_state("tp_1"));

        let re = PropertyRef::new(Urn::new("mobile", "tracking-plan"), "id");
        let data = ResourceData::from([(
            "rules".to_string(),
            PropertyValue::List(vec![PropertyValue::Map(std::collections::BTreeMap::from(
                [("plan".to_string(), PropertyValue::Ref(re))],
            ))]),
        )]);

        let resolved = dereference(&data, &state).unwrap();
        let PropertyValue::List(items) = &resolved["rules"] else {
            panic!("expected list");
        };
        let PropertyValue::Map(entry) = &items[0] else {
            panic!("expected map");
        };
        assert_eq!(entry.get("plan"), Some(&PropertyValue::from("tp_1")));
    }

    #[test]
    fn dereference_fails_on_missing_resource() {
        let state = State::empty();
        let data = ResourceData::from([(
            "plan".to_string(),
            PropertyValue::Ref(PropertyRef::new(Urn::new("ghost", "tracking-plan"), "id")),
        )]);

        let err = dereference(&data, &state).unwrap_err();
        assert!(matches!(err, ResolveError::MissingResource { .. }));
    }

    #[test]
    fn dereference_fails_on_missing_property() {
        let mut state = State::empty();
        state.add_resource(plan_state("tp_1"));

        let data = ResourceData::from([(
            "plan".to_string(),
            PropertyValue::Ref(PropertyRef::new(
                Urn::new("mobile", "tracking-plan"),
                "no-such-property",
            )),
        )]);

        let err = dereference(&data, &state).unwrap_err();
        assert!(matches!(err, ResolveError::MissingProperty { .. }));
    }

    struct RemotePlan {
        remote_id: String,
    }

    #[test]
    fn typed_resolver_binds_against_raw_output() {
        let mut rs = plan_state("unused");
        rs.output_raw = Some(Arc::new(RemotePlan { remote_id: "tp_raw".into() }));
        let mut state = State::empty();
        state.add_resource(rs);

        let re = PropertyRef::with_resolver(
            Urn::new("mobile", "tracking-plan"),
            "id",
            |remote: &RemotePlan| Ok(remote.remote_id.clone()),
        );
        let data = ResourceData::from([("plan".to_string(), PropertyValue::Ref(re.clone()))]);

        let resolved = dereference(&data, &state).unwrap();
        assert_eq!(resolved.get("plan"), Some(&PropertyValue::from("tp_raw")));
        assert!(re.is_resolved());
    }

    #[test]
    fn merge_rejects_duplicate_urns() {
        let mut left = State::empty();
        left.add_resource(plan_state("tp_1"));
        let mut right = State::empty();
        right.add_resource(plan_state("tp_2"));

        let err = left.merge(right).unwrap_err();
        assert!(matches!(err, StateError::DuplicateUrn { .. }));
    }

    #[test]
    fn json_round_trip() {
        let mut state = State::empty();
        state.add_resource(plan_state("tp_1"));

        let encoded = state.to_json().unwrap();
        let decoded = State::from_json(&encoded).unwrap();
        assert!(decoded
            .get_resource(&Urn::new("mobile", "tracking-plan"))
            .is_some());
    }

    #[test]
    fn from_json_rejects_unknown_version() {
        let raw = r#"{"version":"99","updated_at":"2026-01-01T00:00:00Z","resources":{}}"#;
        let err = State::from_json(raw).unwrap_err();
        assert!(matches!(err, StateError::IncompatibleVersion { .. }));
    }
}
