//! Unified error system for the SAI client runtime
//!
//! One error type covers the whole stack: remote store failures mapped from
//! HTTP status, optimistic-concurrency conflicts, grant resolution failures and
//! access-mode enforcement. Every variant names the identifier it concerns so
//! a failure can be traced back to the document that caused it.

use crate::access::AccessMode;
use crate::identifiers::ResourceId;

/// Unified error type for all SAI operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SaiError {
    /// The remote store has no document at the identifier
    #[error("Not found: {resource}")]
    NotFound {
        /// Identifier that was requested
        resource: ResourceId,
    },

    /// A create targeted an identifier that is already occupied
    #[error("Already exists: {resource} ({message})")]
    AlreadyExists {
        /// Identifier that is occupied
        resource: ResourceId,
        /// What was being created
        message: String,
    },

    /// The freshness token sent with a write no longer matches the remote state
    #[error("Conflict on {resource}: {message}")]
    Conflict {
        /// Identifier of the conflicting document
        resource: ResourceId,
        /// Description of the stale state
        message: String,
    },

    /// Transport failure or server-side error
    #[error("Unreachable: {resource}: {message}")]
    Unreachable {
        /// Identifier the request targeted
        resource: ResourceId,
        /// Transport or status description
        message: String,
    },

    /// The remote store rejected the request
    #[error("Denied ({status}) on {resource}")]
    Denied {
        /// Identifier the request targeted
        resource: ResourceId,
        /// HTTP status returned by the store
        status: u16,
    },

    /// The grantee of an authorization has no registration in the agent registry
    #[error("Unknown agent {agent}: no registration found in agent registry {registry}")]
    UnknownAgent {
        /// Agent that was looked up
        agent: ResourceId,
        /// Registry that was searched
        registry: ResourceId,
    },

    /// An authorization references a registration or instance that does not exist
    #[error("Dangling reference in {authorization}: {reference} does not exist")]
    DanglingReference {
        /// Authorization holding the reference
        authorization: ResourceId,
        /// Missing identifier
        reference: ResourceId,
    },

    /// An inherited authorization names a parent that is absent or not inheritable
    #[error("Invalid inheritance for {authorization}: {message}")]
    InvalidInheritance {
        /// Inheriting authorization
        authorization: ResourceId,
        /// Violated rule
        message: String,
    },

    /// Data authorizations inherit from each other in a cycle
    #[error("Cyclic inheritance between data authorizations: {}", join_ids(.cycle))]
    CyclicInheritance {
        /// Authorizations forming the cycle, in traversal order
        cycle: Vec<ResourceId>,
    },

    /// The access grant has been superseded by a newer grant
    #[error("Grant revoked: {grant} is no longer the active grant of {registration}")]
    GrantRevoked {
        /// Superseded grant
        grant: ResourceId,
        /// Agent registration holding the current grant
        registration: ResourceId,
    },

    /// The grant covering a data instance does not include the requested mode
    #[error("Mode {mode} not granted on {resource} by {grant}")]
    ModeNotGranted {
        /// Data instance the operation targeted
        resource: ResourceId,
        /// Requested mode
        mode: AccessMode,
        /// Grant that governs the instance
        grant: ResourceId,
    },

    /// Grant issuance failed after some records had already been written
    #[error(
        "Partial grant failure writing {failed} ({} record(s) already persisted: {}): {source}",
        .persisted.len(),
        join_ids(.persisted)
    )]
    PartialGrantFailure {
        /// Records written before the failure, in write order
        persisted: Vec<ResourceId>,
        /// Record whose write failed
        failed: ResourceId,
        /// Underlying failure
        source: Box<SaiError>,
    },

    /// Operation is not part of the contract of this resource kind
    #[error("Unsupported: {operation} on {resource}")]
    Unsupported {
        /// Resource the operation targeted
        resource: ResourceId,
        /// Operation that was attempted
        operation: String,
    },

    /// Invalid input, malformed document, or incomplete builder state
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Graph codec failure
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the codec failure
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },
}

fn join_ids(ids: &[ResourceId]) -> String {
    ids.iter()
        .map(ResourceId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl SaiError {
    /// Create a not found error
    pub fn not_found(resource: &ResourceId) -> Self {
        Self::NotFound {
            resource: resource.clone(),
        }
    }

    /// Create an already exists error
    pub fn already_exists(resource: &ResourceId, message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource: resource.clone(),
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(resource: &ResourceId, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.clone(),
            message: message.into(),
        }
    }

    /// Create an unreachable error
    pub fn unreachable(resource: &ResourceId, message: impl Into<String>) -> Self {
        Self::Unreachable {
            resource: resource.clone(),
            message: message.into(),
        }
    }

    /// Create a denied error
    pub fn denied(resource: &ResourceId, status: u16) -> Self {
        Self::Denied {
            resource: resource.clone(),
            status,
        }
    }

    /// Create an invalid inheritance error
    pub fn invalid_inheritance(authorization: &ResourceId, message: impl Into<String>) -> Self {
        Self::InvalidInheritance {
            authorization: authorization.clone(),
            message: message.into(),
        }
    }

    /// Create a dangling reference error
    pub fn dangling_reference(authorization: &ResourceId, reference: &ResourceId) -> Self {
        Self::DanglingReference {
            authorization: authorization.clone(),
            reference: reference.clone(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(resource: &ResourceId, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            resource: resource.clone(),
            operation: operation.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for `Conflict`
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Standard Result type for SAI operations
pub type Result<T> = std::result::Result<T, SaiError>;

impl From<serde_json::Error> for SaiError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for SaiError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<std::io::Error> for SaiError {
    fn from(err: std::io::Error) -> Self {
        Self::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ResourceId {
        ResourceId::parse(s).unwrap()
    }

    #[test]
    fn test_error_names_identifier() {
        let err = SaiError::not_found(&id("https://alice.example/data/projects/"));
        assert!(matches!(err, SaiError::NotFound { .. }));
        assert_eq!(
            err.to_string(),
            "Not found: https://alice.example/data/projects/"
        );
    }

    #[test]
    fn test_cycle_display() {
        let err = SaiError::CyclicInheritance {
            cycle: vec![
                id("https://alice.example/authz/a"),
                id("https://alice.example/authz/b"),
                id("https://alice.example/authz/a"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Cyclic inheritance between data authorizations: \
             https://alice.example/authz/a -> https://alice.example/authz/b -> https://alice.example/authz/a"
        );
    }

    #[test]
    fn test_partial_failure_carries_cause() {
        let cause = SaiError::unreachable(&id("https://alice.example/grants/2"), "connection reset");
        let err = SaiError::PartialGrantFailure {
            persisted: vec![id("https://alice.example/grants/1")],
            failed: id("https://alice.example/grants/2"),
            source: Box::new(cause),
        };
        let text = err.to_string();
        assert!(text.contains("1 record(s) already persisted"));
        assert!(text.contains("connection reset"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_error_is_config() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "sai.toml");
        assert!(matches!(SaiError::from(io_err), SaiError::Config { .. }));
    }
}
