//! Resource identifiers and freshness tokens
//!
//! Every document in the remote store is addressed by a URL. `ResourceId`
//! wraps a parsed URL so identifiers are validated once at the boundary and
//! compared structurally afterwards.

use crate::errors::{Result, SaiError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

/// Stable identifier of a remote document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(Url);

impl ResourceId {
    /// Parse an identifier from its string form
    pub fn parse(value: &str) -> Result<Self> {
        Url::parse(value)
            .map(Self)
            .map_err(|e| SaiError::invalid(format!("Invalid resource identifier '{value}': {e}")))
    }

    /// Wrap an already parsed URL
    pub fn from_url(url: Url) -> Self {
        Self(url)
    }

    /// Get the identifier string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the underlying URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// True when the identifier names a container (trailing slash)
    pub fn is_container(&self) -> bool {
        self.0.path().ends_with('/')
    }

    /// Identifier of a document directly inside this one.
    ///
    /// A missing trailing slash is added, so `https://a.example/x` and
    /// `https://a.example/x/` produce the same children.
    pub fn child(&self, segment: &str) -> Result<Self> {
        if segment.is_empty() || segment.contains('/') {
            return Err(SaiError::invalid(format!(
                "Invalid child segment '{segment}' for {self}"
            )));
        }
        let mut base = self.0.clone();
        base.set_query(None);
        base.set_fragment(None);
        let mut raw = base.to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        raw.push_str(segment);
        Self::parse(&raw)
    }

    /// Mint a fresh contained identifier with a random UUID segment
    pub fn generate_contained(&self) -> Result<Self> {
        self.child(&Uuid::new_v4().to_string())
    }

    /// Container one level up, when there is one
    pub fn parent_container(&self) -> Option<Self> {
        let path = self.0.path().trim_end_matches('/');
        let cut = path.rfind('/')?;
        let mut parent = self.0.clone();
        parent.set_path(&path[..=cut]);
        parent.set_query(None);
        parent.set_fragment(None);
        Some(Self(parent))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for ResourceId {
    type Err = SaiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Url> for ResourceId {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl From<ResourceId> for Url {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

/// Freshness token (entity tag) identifying the remote state last observed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityTag(String);

impl EntityTag {
    /// Create a new entity tag from its opaque header value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the opaque header value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
