//! Error types for reference resolution and state handling.

use crate::urn::Urn;
use thiserror::Error;

/// Failure to bind a [`crate::PropertyRef`] to a concrete remote value.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The referenced resource has no entry in the state.
    #[error("referred resource '{urn}' does not exist")]
    MissingResource { urn: Urn },

    /// The referenced resource exists but does not carry the wanted property.
    #[error("property '{property}' does not exist in resource '{urn}'")]
    MissingProperty { urn: Urn, property: String },

    /// A typed resolver was handed an output state of the wrong type.
    #[error("invalid output state type for resource '{urn}'")]
    InvalidOutputType { urn: Urn },

    /// The referenced resource produced no output state to resolve against.
    #[error("resource '{urn}' has no recorded output")]
    MissingOutput { urn: Urn },

    /// A custom resolver reported a failure of its own.
    #[error("resolving reference to '{urn}': {message}")]
    Resolver { urn: Urn, message: String },
}

/// Failure to load, merge, or persist recorded state.
#[derive(Debug, Error)]
pub enum StateError {
    /// Two states being merged both claim the same URN.
    #[error("resource '{urn}' exists in both states")]
    DuplicateUrn { urn: String },

    /// The state file was written by an incompatible version of the tool.
    #[error("incompatible state version '{found}', expected '{expected}'")]
    IncompatibleVersion { expected: String, found: String },

    /// The state file could not be encoded or decoded.
    #[error("state serialization failed")]
    Serialization(#[from] serde_json::Error),
}
