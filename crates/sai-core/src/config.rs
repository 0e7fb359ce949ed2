//! Runtime configuration
//!
//! Loaded from TOML, overridden by `SAI_*` environment variables, validated
//! before use.

use crate::errors::{Result, SaiError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Handling of selected instances that no longer exist at resolution time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingReferencePolicy {
    /// Abort resolution with `DanglingReference`
    #[default]
    Fail,
    /// Log and leave the identifier out of the grant
    Skip,
}

impl FromStr for DanglingReferencePolicy {
    type Err = SaiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            other => Err(SaiError::config(format!(
                "Unknown dangling reference policy '{other}' (expected fail or skip)"
            ))),
        }
    }
}

/// Handling of an immutable create whose identifier is already occupied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateCreatePolicy {
    /// Treat as success: same identifier implies same content
    #[default]
    Idempotent,
    /// Surface `AlreadyExists`
    Reject,
}

impl FromStr for DuplicateCreatePolicy {
    type Err = SaiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "idempotent" => Ok(Self::Idempotent),
            "reject" => Ok(Self::Reject),
            other => Err(SaiError::config(format!(
                "Unknown duplicate create policy '{other}' (expected idempotent or reject)"
            ))),
        }
    }
}

fn default_content_type() -> String {
    "application/ld+json".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("sai-rs/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Client runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaiConfig {
    /// Media type sent as `Accept` and `Content-Type`
    pub content_type: String,
    /// Selected-from-registry resolution policy
    pub dangling_reference_policy: DanglingReferencePolicy,
    /// Immutable create collision policy
    pub duplicate_create_policy: DuplicateCreatePolicy,
    /// Per-request timeout for the HTTP transport
    pub request_timeout_secs: u64,
    /// Bearer token for the HTTP transport
    pub access_token: Option<String>,
    /// `User-Agent` header for the HTTP transport
    pub user_agent: String,
}

impl Default for SaiConfig {
    fn default() -> Self {
        Self {
            content_type: default_content_type(),
            dangling_reference_policy: DanglingReferencePolicy::default(),
            duplicate_create_policy: DuplicateCreatePolicy::default(),
            request_timeout_secs: default_timeout(),
            access_token: None,
            user_agent: default_user_agent(),
        }
    }
}

impl SaiConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SaiError::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `SAI_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `SAI_*` overrides from an explicit variable list
    pub fn merge_with_vars(
        &mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<()> {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix("SAI_") else {
                continue;
            };
            match name {
                "CONTENT_TYPE" => self.content_type = value,
                "DANGLING_REFERENCE_POLICY" => self.dangling_reference_policy = value.parse()?,
                "DUPLICATE_CREATE_POLICY" => self.duplicate_create_policy = value.parse()?,
                "REQUEST_TIMEOUT_SECS" => {
                    self.request_timeout_secs = value.parse().map_err(|e| {
                        SaiError::config(format!("Invalid SAI_REQUEST_TIMEOUT_SECS '{value}': {e}"))
                    })?;
                }
                "ACCESS_TOKEN" => self.access_token = Some(value),
                "USER_AGENT" => self.user_agent = value,
                _ => tracing::debug!(variable = %key, "Ignoring unknown SAI_ variable"),
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.content_type.trim().is_empty() {
            return Err(SaiError::config("content_type must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(SaiError::config("request_timeout_secs must be greater than zero"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(SaiError::config("user_agent must not be empty"));
        }
        Ok(())
    }
}
