//! Transport effect trait definitions
//!
//! The session collaborator supplies an authenticated transport that executes
//! one request against one identifier and reports status, body and entity tag.
//! Connection pooling and retry belong to the implementation, never to the
//! resource layers.
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `sai-effects` (reqwest), `sai-testkit` (in-memory)
//! - **Usage**: every resource fetch and write, through `Session::send`

use crate::errors::{Result, SaiError};
use crate::identifiers::{EntityTag, ResourceId};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Fetch a representation
    Get,
    /// Probe for existence
    Head,
    /// Create or replace
    Put,
    /// Create inside a container
    Post,
    /// Partial modification
    Patch,
    /// Remove
    Delete,
}

impl HttpMethod {
    /// Method name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request against one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method
    pub method: HttpMethod,
    /// Target identifier
    pub target: ResourceId,
    /// `Accept` header
    pub accept: Option<String>,
    /// `Content-Type` header
    pub content_type: Option<String>,
    /// `If-Match` header
    pub if_match: Option<EntityTag>,
    /// `If-None-Match: *` header
    pub if_none_match_any: bool,
    /// Request body
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Request with no headers and no body
    pub fn new(method: HttpMethod, target: ResourceId) -> Self {
        Self {
            method,
            target,
            accept: None,
            content_type: None,
            if_match: None,
            if_none_match_any: false,
            body: None,
        }
    }

    /// GET request
    pub fn get(target: ResourceId) -> Self {
        Self::new(HttpMethod::Get, target)
    }

    /// HEAD request
    pub fn head(target: ResourceId) -> Self {
        Self::new(HttpMethod::Head, target)
    }

    /// PUT request carrying `body`
    pub fn put(target: ResourceId, body: Vec<u8>) -> Self {
        Self::new(HttpMethod::Put, target).with_body(body)
    }

    /// DELETE request
    pub fn delete(target: ResourceId) -> Self {
        Self::new(HttpMethod::Delete, target)
    }

    /// Set the request body
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Set `Accept`
    pub fn accept(mut self, media_type: impl Into<String>) -> Self {
        self.accept = Some(media_type.into());
        self
    }

    /// Set `Content-Type`
    pub fn content_type(mut self, media_type: impl Into<String>) -> Self {
        self.content_type = Some(media_type.into());
        self
    }

    /// Only apply the write if the remote state still carries `etag`
    pub fn if_match(mut self, etag: EntityTag) -> Self {
        self.if_match = Some(etag);
        self
    }

    /// Only apply the write if nothing exists at the target
    pub fn if_none_match_any(mut self) -> Self {
        self.if_none_match_any = true;
        self
    }
}

/// Status, body and entity tag returned for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response body (empty for HEAD and most writes)
    pub body: Vec<u8>,
    /// Entity tag, when the store sent one
    pub etag: Option<EntityTag>,
}

impl HttpResponse {
    /// Response with no body
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            etag: None,
        }
    }

    /// Attach a body
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Attach an entity tag
    pub fn with_etag(mut self, etag: EntityTag) -> Self {
        self.etag = Some(etag);
        self
    }

    /// True for any 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure (no status was received)
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established or was dropped
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout
        timeout_secs: u64,
    },
    /// Request could not be built from the given parts
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Attach the identifier the failed request targeted
    pub fn at(self, resource: &ResourceId) -> SaiError {
        SaiError::unreachable(resource, self.to_string())
    }
}

/// What a write was trying to do, used to refine status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteIntent {
    /// Plain read or unconditional write
    Plain,
    /// Conditional create (`If-None-Match: *`)
    Create,
    /// Conditional update (`If-Match`)
    Update,
}

/// Map a status to the unified error taxonomy.
///
/// 2xx succeeds; 404 is `NotFound`; 409/412 is `Conflict`, except that a 412
/// answering a conditional create becomes `AlreadyExists`; 401, 403, 405 and
/// every other 4xx is `Denied`; 5xx and anything else is `Unreachable`.
pub fn check_status(resource: &ResourceId, status: u16, intent: WriteIntent) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        404 => Err(SaiError::not_found(resource)),
        412 if intent == WriteIntent::Create => Err(SaiError::already_exists(
            resource,
            "conditional create rejected, identifier is occupied",
        )),
        409 | 412 => Err(SaiError::conflict(
            resource,
            format!("remote state changed since last fetch (status {status})"),
        )),
        400..=499 => Err(SaiError::denied(resource, status)),
        _ => Err(SaiError::unreachable(
            resource,
            format!("remote store answered with status {status}"),
        )),
    }
}

/// Transport effects interface
#[async_trait]
pub trait TransportEffects: Send + Sync {
    /// Execute one request and return whatever status the store answered with
    async fn execute(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportError>;
}

/// Blanket implementation for Arc<T> where T: TransportEffects
#[async_trait]
impl<T: TransportEffects + ?Sized> TransportEffects for Arc<T> {
    async fn execute(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn id() -> ResourceId {
        ResourceId::parse("https://alice.example/data/projects/1").unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status(&id(), 200, WriteIntent::Plain).is_ok());
        assert!(check_status(&id(), 205, WriteIntent::Update).is_ok());
        assert_matches!(
            check_status(&id(), 404, WriteIntent::Plain),
            Err(SaiError::NotFound { .. })
        );
        assert_matches!(
            check_status(&id(), 409, WriteIntent::Plain),
            Err(SaiError::Conflict { .. })
        );
        assert_matches!(
            check_status(&id(), 412, WriteIntent::Update),
            Err(SaiError::Conflict { .. })
        );
        assert_matches!(
            check_status(&id(), 403, WriteIntent::Plain),
            Err(SaiError::Denied { status: 403, .. })
        );
        assert_matches!(
            check_status(&id(), 503, WriteIntent::Plain),
            Err(SaiError::Unreachable { .. })
        );
    }

    #[test]
    fn test_conditional_create_collision() {
        assert_matches!(
            check_status(&id(), 412, WriteIntent::Create),
            Err(SaiError::AlreadyExists { .. })
        );
        // 409 stays a conflict even for creates
        assert_matches!(
            check_status(&id(), 409, WriteIntent::Create),
            Err(SaiError::Conflict { .. })
        );
    }

    #[test]
    fn test_transport_error_names_target() {
        let err = TransportError::ConnectionFailed("reset".into()).at(&id());
        assert_matches!(err, SaiError::Unreachable { ref resource, .. } if *resource == id());
    }
}
