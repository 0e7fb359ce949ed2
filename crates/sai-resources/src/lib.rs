//! SAI Resources - remote resource proxy and lifecycle layer
//!
//! Three mutation contracts over one proxy:
//!
//! - `ReadableResource`: fetch and refresh, never written
//! - `CrudResource`: create / update / delete with entity-tag preconditions
//! - `ImmutableResource`: content-addressed, created once, deleted as revocation
//!
//! `Resource` closes over the three for code that handles any of them.

#![forbid(unsafe_code)]

/// Mutable records
pub mod crud;

/// Write-once records
pub mod immutable;

/// Read-only mirrors
pub mod readable;

/// Remote resource proxy
pub mod remote;

/// Closed resource union
pub mod resource;

pub use crud::CrudResource;
pub use immutable::{content_address, ImmutableResource};
pub use readable::ReadableResource;
pub use remote::RemoteResource;
pub use resource::{Resource, ResourceKind};
