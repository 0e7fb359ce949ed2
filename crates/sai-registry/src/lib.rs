//! SAI Registry - registry navigation layer
//!
//! Typed wrappers over the owner's registry documents. Each registry exposes
//! its registrations as an indexed `RegistrationList` for O(1) membership
//! and as a lazy, restartable `RegistrationCursor` that loads one
//! registration per pull.
//!
//! Adding a registration is two writes (registration, then registry
//! membership) and is not atomic; see `AgentRegistry::add_registration`.

#![forbid(unsafe_code)]

/// Agent registry and registrations
pub mod agents;

/// Authorization registry
pub mod authorizations;

/// Data registry and registrations
pub mod data;

/// Social agent and application profiles
pub mod profiles;

/// Registration lists and cursors
pub mod registration;

/// Registry set
pub mod registry_set;

pub use agents::{AgentKind, AgentRegistration, AgentRegistry};
pub use authorizations::AuthorizationRegistry;
pub use data::{DataRegistration, DataRegistry};
pub use profiles::{ApplicationProfile, SocialAgentProfile};
pub use registration::{
    GranteeRegistration, Registration, RegistrationCursor, RegistrationList, RegistrationMetadata,
};
pub use registry_set::RegistrySet;
