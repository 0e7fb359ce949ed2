//! Per-actor session: transport, codec and configuration bundled together

use crate::config::SaiConfig;
use crate::effects::{HttpRequest, HttpResponse, TransportEffects};
use crate::errors::Result;
use crate::graph::{Graph, GraphCodec};
use crate::identifiers::ResourceId;
use std::fmt;
use std::sync::Arc;

/// Authenticated session used by every resource operation
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn TransportEffects>,
    codec: Arc<dyn GraphCodec>,
    config: Arc<SaiConfig>,
}

impl Session {
    /// Bundle a transport and a codec with a configuration
    pub fn new(
        transport: Arc<dyn TransportEffects>,
        codec: Arc<dyn GraphCodec>,
        config: SaiConfig,
    ) -> Self {
        Self {
            transport,
            codec,
            config: Arc::new(config),
        }
    }

    /// Runtime configuration
    pub fn config(&self) -> &SaiConfig {
        &self.config
    }

    /// Graph codec
    pub fn codec(&self) -> &dyn GraphCodec {
        self.codec.as_ref()
    }

    /// Execute one request. Transport failures become `Unreachable`; the
    /// status is returned untouched for the caller to map.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let target = request.target.clone();
        let method = request.method;
        tracing::debug!(method = %method, resource = %target, "Sending request");
        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| e.at(&target))?;
        tracing::debug!(
            method = %method,
            resource = %target,
            status = response.status,
            "Received response"
        );
        Ok(response)
    }

    /// Decode a body about `id`
    pub fn decode(&self, id: &ResourceId, body: &[u8]) -> Result<Graph> {
        self.codec.decode(id, body)
    }

    /// Encode a graph for a write
    pub fn encode(&self, graph: &Graph) -> Result<Vec<u8>> {
        self.codec.encode(graph)
    }

    /// Media type for `Accept` and `Content-Type`
    pub fn content_type(&self) -> &str {
        &self.config.content_type
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("content_type", &self.config.content_type)
            .field("codec", &self.codec.content_type())
            .finish_non_exhaustive()
    }
}
