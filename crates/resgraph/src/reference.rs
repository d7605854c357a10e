//! Typed references to another resource's eventual remote value.

use crate::error::ResolveError;
use crate::urn::Urn;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

type Resolver = Arc<dyn Fn(&dyn Any) -> Result<String, ResolveError> + Send + Sync>;

/// A pointer from one resource's data to a property of another resource.
///
/// A `PropertyRef` is declared at plan time, before the target resource
/// necessarily exists, and bound at apply time once the target's provisioning
/// step has produced its output. The bound value is held in a one-shot cell
/// shared by all clones of the reference, so resolution performed while
/// applying is visible to every holder.
///
/// Identity is `urn` plus `property`; resolution state does not participate
/// in equality or hashing.
#[derive(Clone)]
pub struct PropertyRef {
    urn: Urn,
    property: String,
    resolver: Option<Resolver>,
    resolved: Arc<OnceLock<String>>,
}

impl PropertyRef {
    /// A reference resolved by looking up `property` in the target's
    /// recorded data.
    pub fn new(urn: Urn, property: &str) -> Self {
        Self {
            urn,
            property: property.to_string(),
            resolver: None,
            resolved: Arc::new(OnceLock::new()),
        }
    }

    /// A reference resolved by a typed extractor against the target's raw
    /// output state.
    ///
    /// The extractor receives the output the target's apply step produced,
    /// downcast to `S`. An output of any other type resolves to
    /// [`ResolveError::InvalidOutputType`].
    pub fn with_resolver<S, F>(urn: Urn, property: &str, extractor: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn(&S) -> Result<String, ResolveError> + Send + Sync + 'static,
    {
        let target = urn.clone();
        let resolver: Resolver = Arc::new(move |output: &dyn Any| {
            let state = output
                .downcast_ref::<S>()
                .ok_or_else(|| ResolveError::InvalidOutputType { urn: target.clone() })?;
            extractor(state)
        });

        Self {
            urn,
            property: property.to_string(),
            resolver: Some(resolver),
            resolved: Arc::new(OnceLock::new()),
        }
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Whether a typed resolver was installed at construction time.
    pub fn has_resolver(&self) -> bool {
        self.resolver.is_some()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// The bound remote value, if resolution has happened.
    pub fn value(&self) -> Option<&str> {
        self.resolved.get().map(String::as_str)
    }

    /// Run the installed resolver against the target's raw output state and
    /// bind the result.
    ///
    /// Binding is idempotent: once a value is set, later calls return the
    /// existing value without re-running the resolver.
    pub fn resolve_with(&self, output: &dyn Any) -> Result<&str, ResolveError> {
        if let Some(value) = self.value() {
            return Ok(value);
        }

        let resolver = self
            .resolver
            .as_ref()
            .ok_or_else(|| ResolveError::MissingOutput { urn: self.urn.clone() })?;
        let value = resolver(output)?;
        Ok(self.resolved.get_or_init(|| value))
    }

    /// Bind a value computed outside the resolver (the plain lookup path).
    pub fn bind(&self, value: String) -> &str {
        self.resolved.get_or_init(|| value)
    }
}

impl fmt::Debug for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRef")
            .field("urn", &self.urn)
            .field("property", &self.property)
            .field("resolved", &self.resolved.get())
            .finish_non_exhaustive()
    }
}

impl PartialEq for PropertyRef {
    fn eq(&self, other: &Self) -> bool {
        self.urn == other.urn && self.property == other.property
    }
}

impl Eq for PropertyRef {}

impl Hash for PropertyRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.urn.hash(state);
        self.property.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RemoteEvent {
        remote_id: String,
    }

    #[test]
    fn starts_unresolved() {
        let re = PropertyRef::new(Urn::new("checkout", "event"), "id");
        assert!(!re.is_resolved());
        assert!(re.value().is_none());
    }

    #[test]
    fn typed_resolver_binds_once() {
        let re = PropertyRef::with_resolver(
            Urn::new("checkout", "event"),
            "id",
            |state: &RemoteEvent| Ok(state.remote_id.clone()),
        );

        let output = RemoteEvent { remote_id: "ev_123".into() };
        assert_eq!(re.resolve_with(&output).unwrap(), "ev_123");
        assert!(re.is_resolved());

        // Second resolution keeps the first binding.
        let other = RemoteEvent { remote_id: "ev_999".into() };
        assert_eq!(re.resolve_with(&other).unwrap(), "ev_123");
    }

    #[test]
    fn typed_resolver_rejects_wrong_output_type() {
        let re = PropertyRef::with_resolver(
            Urn::new("checkout", "event"),
            "id",
            |state: &RemoteEvent| Ok(state.remote_id.clone()),
        );

        let err = re.resolve_with(&"not an event").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidOutputType { .. }));
        assert!(!re.is_resolved());
    }

    #[test]
    fn binding_is_shared_across_clones() {
        let re = PropertyRef::new(Urn::new("checkout", "event"), "id");
        let clone = re.clone();

        re.bind("ev_42".into());
        assert_eq!(clone.value(), Some("ev_42"));
    }

    #[test]
    fn identity_ignores_resolution_state() {
        let a = PropertyRef::new(Urn::new("checkout", "event"), "id");
        let b = PropertyRef::new(Urn::new("checkout", "event"), "id");
        b.bind("ev_1".into());
        assert_eq!(a, b);
    }
}
