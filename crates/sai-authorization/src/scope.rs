//! Scope rules for data authorizations and data grants
//!
//! Both families are closed unions: adding a scope kind forces every match
//! over them to be revisited.

use sai_core::vocabulary::interop;
use sai_core::{Graph, ResourceId, Result, SaiError};
use std::fmt;

/// Scope kind as written in authorization and grant documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Every instance of a data registration
    AllFromRegistry,
    /// Listed instances of a data registration
    SelectedFromRegistry,
    /// Whatever another social agent has shared with the owner
    AllFromAgent,
    /// Children of a parent's instances
    Inherited,
}

impl ScopeKind {
    /// Vocabulary term
    pub fn term(&self) -> &'static str {
        match self {
            ScopeKind::AllFromRegistry => interop::ALL_FROM_REGISTRY,
            ScopeKind::SelectedFromRegistry => interop::SELECTED_FROM_REGISTRY,
            ScopeKind::AllFromAgent => interop::ALL_FROM_AGENT,
            ScopeKind::Inherited => interop::INHERITED,
        }
    }

    /// Kind named by a vocabulary term
    pub fn from_term(term: &str) -> Result<Self> {
        [
            ScopeKind::AllFromRegistry,
            ScopeKind::SelectedFromRegistry,
            ScopeKind::AllFromAgent,
            ScopeKind::Inherited,
        ]
        .into_iter()
        .find(|kind| kind.term() == term)
        .ok_or_else(|| SaiError::invalid(format!("Unknown scope {term}")))
    }

    /// Read the kind stored under `term` in `graph`
    pub(crate) fn read(graph: &Graph, term: &str) -> Result<Self> {
        let value = graph
            .text(term)
            .ok_or_else(|| SaiError::invalid(format!("{} has no {term}", graph.id())))?;
        Self::from_term(value)
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeKind::AllFromRegistry => "AllFromRegistry",
            ScopeKind::SelectedFromRegistry => "SelectedFromRegistry",
            ScopeKind::AllFromAgent => "AllFromAgent",
            ScopeKind::Inherited => "Inherited",
        };
        f.write_str(name)
    }
}

/// Scope rule of a data authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationScope {
    /// All current and future instances of a data registration
    AllFromRegistry {
        /// Registration holding the instances
        data_registration: ResourceId,
    },
    /// An explicit set of instances from one data registration
    SelectedFromRegistry {
        /// Registration holding the instances
        data_registration: ResourceId,
        /// Selected instances, in declaration order
        instances: Vec<ResourceId>,
        /// Skip selected instances that no longer exist instead of failing
        tolerate_missing: bool,
    },
    /// Delegation of what the data owner shared with the granting agent
    AllFromAgent,
    /// Children of the instances resolved for a parent authorization
    Inherited {
        /// Parent data authorization
        inherits_from: ResourceId,
        /// Registration holding the child instances, when known up front
        data_registration: Option<ResourceId>,
    },
}

impl AuthorizationScope {
    /// Scope kind
    pub fn kind(&self) -> ScopeKind {
        match self {
            AuthorizationScope::AllFromRegistry { .. } => ScopeKind::AllFromRegistry,
            AuthorizationScope::SelectedFromRegistry { .. } => ScopeKind::SelectedFromRegistry,
            AuthorizationScope::AllFromAgent => ScopeKind::AllFromAgent,
            AuthorizationScope::Inherited { .. } => ScopeKind::Inherited,
        }
    }

    /// Parent authorization, for inherited scopes
    pub fn inherits_from(&self) -> Option<&ResourceId> {
        match self {
            AuthorizationScope::Inherited { inherits_from, .. } => Some(inherits_from),
            _ => None,
        }
    }

    /// True when other authorizations may inherit from this scope
    pub fn is_inheritable(&self) -> bool {
        !matches!(self, AuthorizationScope::AllFromAgent)
    }
}

/// Resolved, concrete scope of a data grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantScope {
    /// Every instance the data registration lists at enumeration time
    AllFromRegistry,
    /// Listed instances that the data registration still holds
    SelectedFromRegistry {
        /// Instances validated at resolution time
        instances: Vec<ResourceId>,
    },
    /// Children of the parent grant's instances, one level deep
    Inherited {
        /// Parent data grant
        inherits_from: ResourceId,
    },
}

impl GrantScope {
    /// Scope kind
    pub fn kind(&self) -> ScopeKind {
        match self {
            GrantScope::AllFromRegistry => ScopeKind::AllFromRegistry,
            GrantScope::SelectedFromRegistry { .. } => ScopeKind::SelectedFromRegistry,
            GrantScope::Inherited { .. } => ScopeKind::Inherited,
        }
    }

    /// Parent grant, for inherited scopes
    pub fn inherits_from(&self) -> Option<&ResourceId> {
        match self {
            GrantScope::Inherited { inherits_from } => Some(inherits_from),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_roundtrip() {
        for kind in [
            ScopeKind::AllFromRegistry,
            ScopeKind::SelectedFromRegistry,
            ScopeKind::AllFromAgent,
            ScopeKind::Inherited,
        ] {
            assert_eq!(ScopeKind::from_term(kind.term()).unwrap(), kind);
        }
        assert!(ScopeKind::from_term("https://example.org/NoSuchScope").is_err());
    }

    #[test]
    fn test_delegated_scope_not_inheritable() {
        assert!(!AuthorizationScope::AllFromAgent.is_inheritable());
        let registration = ResourceId::parse("https://alice.example/data/projects/").unwrap();
        assert!(AuthorizationScope::AllFromRegistry {
            data_registration: registration
        }
        .is_inheritable());
    }
}
