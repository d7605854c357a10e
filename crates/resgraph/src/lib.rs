//! # resgraph
//!
//! Resource graph model for declarative provisioning.
//!
//! This crate provides the data model that planning and execution are built
//! on: identity-bearing resources, typed references between them, and an
//! in-memory graph that derives dependency edges from the references a
//! resource embeds in its data.
//!
//! ## Core Concepts
//!
//! - **[`Urn`]**: a `type:id` identifier uniquely naming one resource
//! - **[`PropertyRef`]**: a pointer from one resource's data to another
//!   resource's eventual remote value, bound only after that resource has
//!   been provisioned ("declare now, bind later")
//! - **[`Resource`]**: an immutable unit of identity plus data
//! - **[`Graph`]**: an index of resources with dependency and dependent
//!   adjacency maps kept in exact transposition
//! - **[`State`]**: recorded inputs and outputs of applied resources, used
//!   to dereference `PropertyRef`s at apply time
//!
//! ## Reference Discovery
//!
//! References are discovered by walking a resource's semi-structured
//! [`ResourceData`], where they are a first-class [`PropertyValue`] variant,
//! and by asking strongly-typed payloads to describe their own references
//! through the [`TypedData`] trait. Both feed the same edge-insertion path,
//! so a resource's dependency list is the union of declared dependencies and
//! discovered references.

pub mod error;
pub mod graph;
pub mod reference;
pub mod resource;
pub mod state;
pub mod urn;
pub mod value;

pub use error::{ResolveError, StateError};
pub use graph::Graph;
pub use reference::PropertyRef;
pub use resource::{ImportMetadata, Resource, SourceFile, TypedData};
pub use state::{dereference, ResourceState, State};
pub use urn::Urn;
pub use value::{collect_references, PropertyValue, ResourceData};
