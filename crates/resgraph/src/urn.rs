//! Uniform resource names of the form `type:id`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A `type:id` identifier uniquely naming one resource across a graph.
///
/// Construction is pure and deterministic: the same `(id, kind)` pair always
/// yields the same URN, and distinct pairs yield distinct URNs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    /// Build a URN from a resource id and resource type.
    pub fn new(id: &str, kind: &str) -> Self {
        Self(format!("{kind}:{id}"))
    }

    /// Parse a raw `type:id` string.
    ///
    /// Returns `None` when the separator is missing or either side is empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let (kind, id) = raw.split_once(':')?;
        if kind.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resource type portion (everything before the first `:`).
    pub fn kind(&self) -> &str {
        self.0.split_once(':').map_or("", |(kind, _)| kind)
    }

    /// The resource id portion (everything after the first `:`).
    pub fn id(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, id)| id)
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urn_is_deterministic() {
        assert_eq!(Urn::new("checkout", "event"), Urn::new("checkout", "event"));
        assert_eq!(Urn::new("checkout", "event").as_str(), "event:checkout");
    }

    #[test]
    fn urn_is_injective_over_distinct_pairs() {
        assert_ne!(Urn::new("a", "event"), Urn::new("a", "property"));
        assert_ne!(Urn::new("a", "event"), Urn::new("b", "event"));
    }

    #[test]
    fn parse_accepts_well_formed_urns() {
        let urn = Urn::parse("tracking-plan:mobile").unwrap();
        assert_eq!(urn.kind(), "tracking-plan");
        assert_eq!(urn.id(), "mobile");
    }

    #[test]
    fn parse_rejects_malformed_urns() {
        assert!(Urn::parse("no-separator").is_none());
        assert!(Urn::parse(":id-only").is_none());
        assert!(Urn::parse("kind-only:").is_none());
    }

    #[test]
    fn id_may_contain_separator() {
        let urn = Urn::parse("event:ns:checkout").unwrap();
        assert_eq!(urn.kind(), "event");
        assert_eq!(urn.id(), "ns:checkout");
    }
}
