//! Access modes carried by authorizations and grants
//!
//! Modes form a plain set; grants only ever narrow a set (intersection), so
//! every derived grant is a subset of its originating authorization.

use crate::errors::{Result, SaiError};
use crate::vocabulary::acl;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Single access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessMode {
    /// Read an instance
    Read,
    /// Create new instances
    Create,
    /// Modify an existing instance
    Update,
    /// Remove an instance
    Delete,
}

impl AccessMode {
    /// All modes, in canonical order
    pub const ALL: [AccessMode; 4] = [
        AccessMode::Read,
        AccessMode::Create,
        AccessMode::Update,
        AccessMode::Delete,
    ];

    /// Vocabulary term for this mode
    pub fn term(&self) -> &'static str {
        match self {
            AccessMode::Read => acl::READ,
            AccessMode::Create => acl::CREATE,
            AccessMode::Update => acl::UPDATE,
            AccessMode::Delete => acl::DELETE,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessMode::Read => "read",
            AccessMode::Create => "create",
            AccessMode::Update => "update",
            AccessMode::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Set of access modes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessModes(BTreeSet<AccessMode>);

impl AccessModes {
    /// Empty set
    pub fn none() -> Self {
        Self::default()
    }

    /// Read only
    pub fn read_only() -> Self {
        Self::from_iter([AccessMode::Read])
    }

    /// Every mode
    pub fn all() -> Self {
        Self::from_iter(AccessMode::ALL)
    }

    /// Expand a vocabulary term into the modes it stands for.
    ///
    /// `acl:Write` expands to create, update and delete; `acl:Append` to create.
    pub fn from_term(term: &str) -> Result<Self> {
        let modes = match term {
            acl::READ => vec![AccessMode::Read],
            acl::CREATE | acl::APPEND => vec![AccessMode::Create],
            acl::UPDATE => vec![AccessMode::Update],
            acl::DELETE => vec![AccessMode::Delete],
            acl::WRITE => vec![AccessMode::Create, AccessMode::Update, AccessMode::Delete],
            other => {
                return Err(SaiError::invalid(format!("Unsupported access mode: {other}")));
            }
        };
        Ok(Self::from_iter(modes))
    }

    /// Union of the modes named by each term
    pub fn from_terms<'a>(terms: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut modes = Self::none();
        for term in terms {
            modes.0.extend(Self::from_term(term)?.0);
        }
        Ok(modes)
    }

    /// Vocabulary terms, one per mode
    pub fn terms(&self) -> Vec<&'static str> {
        self.0.iter().map(AccessMode::term).collect()
    }

    /// Check membership
    pub fn contains(&self, mode: AccessMode) -> bool {
        self.0.contains(&mode)
    }

    /// Add a mode
    pub fn insert(&mut self, mode: AccessMode) {
        self.0.insert(mode);
    }

    /// Modes present in both sets
    pub fn intersect(&self, other: &AccessModes) -> AccessModes {
        Self(self.0.intersection(&other.0).copied().collect())
    }

    /// Modes present in either set
    pub fn union(&self, other: &AccessModes) -> AccessModes {
        Self(self.0.union(&other.0).copied().collect())
    }

    /// True when every mode here is also in `other`
    pub fn is_subset(&self, other: &AccessModes) -> bool {
        self.0.is_subset(&other.0)
    }

    /// True when the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in canonical order
    pub fn iter(&self) -> impl Iterator<Item = AccessMode> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<AccessMode> for AccessModes {
    fn from_iter<I: IntoIterator<Item = AccessMode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for AccessModes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_expands() {
        let modes = AccessModes::from_term(acl::WRITE).unwrap();
        assert!(!modes.contains(AccessMode::Read));
        assert!(modes.contains(AccessMode::Create));
        assert!(modes.contains(AccessMode::Update));
        assert!(modes.contains(AccessMode::Delete));
    }

    #[test]
    fn test_unknown_term_rejected() {
        assert!(AccessModes::from_term("http://www.w3.org/ns/auth/acl#Control").is_err());
    }

    #[test]
    fn test_intersection_is_subset_of_both() {
        let a = AccessModes::from_iter([AccessMode::Read, AccessMode::Update]);
        let b = AccessModes::from_iter([AccessMode::Read, AccessMode::Delete]);
        let both = a.intersect(&b);
        assert_eq!(both, AccessModes::read_only());
        assert!(both.is_subset(&a));
        assert!(both.is_subset(&b));
    }

    #[test]
    fn test_terms_roundtrip_through_from_terms() {
        let modes = AccessModes::all();
        assert_eq!(AccessModes::from_terms(modes.terms()).unwrap(), modes);
    }

    #[test]
    fn test_display() {
        assert_eq!(AccessModes::all().to_string(), "{read, create, update, delete}");
    }
}
