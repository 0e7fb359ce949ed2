//! HTTP transport handler backed by `reqwest`

use async_trait::async_trait;
use reqwest::{header, Client, Method};
use sai_core::{
    EntityTag, HttpMethod, HttpRequest, HttpResponse, SaiConfig, TransportEffects, TransportError,
};
use std::time::Duration;

/// Production transport: one pooled `reqwest` client per session
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestTransport {
    /// Build a client with the configured timeout, user agent and bearer token
    pub fn new(config: &SaiConfig) -> Result<Self, TransportError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = config.access_token {
            let value = header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::InvalidRequest(format!("Invalid access token: {e}")))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Post => Method::POST,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::ConnectionFailed(err.to_string())
        }
    }
}

#[async_trait]
impl TransportEffects for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(Self::method(request.method), request.target.as_url().clone());
        if let Some(accept) = request.accept {
            builder = builder.header(header::ACCEPT, accept);
        }
        if let Some(content_type) = request.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(etag) = request.if_match {
            builder = builder.header(header::IF_MATCH, etag.as_str());
        }
        if request.if_none_match_any {
            builder = builder.header(header::IF_NONE_MATCH, "*");
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(EntityTag::new);
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;

        let mut result = HttpResponse::new(status).with_body(body.to_vec());
        if let Some(etag) = etag {
            result = result.with_etag(etag);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_with_token() {
        let config = SaiConfig {
            access_token: Some("abc".into()),
            ..SaiConfig::default()
        };
        assert!(ReqwestTransport::new(&config).is_ok());
    }

    #[test]
    fn test_rejects_unprintable_token() {
        let config = SaiConfig {
            access_token: Some("bad\ntoken".into()),
            ..SaiConfig::default()
        };
        assert!(matches!(
            ReqwestTransport::new(&config),
            Err(TransportError::InvalidRequest(_))
        ));
    }
}
