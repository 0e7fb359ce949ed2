//! SAI Authorization - authorizations, grants and grant resolution
//!
//! An `AccessAuthorization` is the owner's statement of what one agent may
//! access; its nested `DataAuthorization`s each carry one scope rule. The
//! `GrantResolver` compiles an authorization into an `AccessGrant` with
//! concrete `DataGrant`s, checking every reference against the owner's
//! registries before anything is written.
//!
//! All four record types are write-once and content-addressed.

#![forbid(unsafe_code)]

/// Access authorizations
pub mod access_authorization;

/// Access grants
pub mod access_grant;

/// Data authorizations
pub mod data_authorization;

/// Data grants
pub mod data_grant;

/// Grant resolution engine
pub mod resolver;

/// Scope kinds
pub mod scope;

mod record;

pub use access_authorization::{AccessAuthorization, AccessAuthorizationBuilder};
pub use access_grant::AccessGrant;
pub use data_authorization::{DataAuthorization, DataAuthorizationBuilder};
pub use data_grant::DataGrant;
pub use resolver::{GrantPlan, GrantResolver};
pub use scope::{AuthorizationScope, GrantScope, ScopeKind};
