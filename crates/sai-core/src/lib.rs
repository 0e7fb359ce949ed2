//! SAI Core - foundation of the interoperability client runtime
//!
//! Everything above this crate talks to the remote store through the types
//! defined here:
//!
//! - `ResourceId` / `EntityTag`: document addressing and freshness tokens
//! - `Graph` / `GraphCodec`: term-keyed view over decoded documents
//! - `TransportEffects` / `Session`: authenticated request execution and the
//!   single status-to-error mapping
//! - `AccessMode` / `AccessModes`: mode sets carried by grants
//! - `SaiConfig`: policies for dangling references and duplicate creates
//! - `SaiError`: unified error taxonomy

#![forbid(unsafe_code)]

/// Access modes and mode sets
pub mod access;

/// Runtime configuration
pub mod config;

/// Transport effect interface and status mapping
pub mod effects;

/// Unified error handling
pub mod errors;

/// Graph view and codec interface
pub mod graph;

/// Content hashing for write-once records
pub mod hash;

/// Resource identifiers and entity tags
pub mod identifiers;

/// Authenticated session
pub mod session;

/// Vocabulary terms
pub mod vocabulary;

pub use access::{AccessMode, AccessModes};
pub use config::{DanglingReferencePolicy, DuplicateCreatePolicy, SaiConfig};
pub use effects::{
    check_status, HttpMethod, HttpRequest, HttpResponse, TransportEffects, TransportError,
    WriteIntent,
};
pub use errors::{Result, SaiError};
pub use graph::{Graph, GraphCodec, Value};
pub use hash::Hash32;
pub use identifiers::{EntityTag, ResourceId};
pub use session::Session;
