//! SAI Effects - production collaborators
//!
//! `ReqwestTransport` implements `TransportEffects` over HTTP;
//! `JsonGraphCodec` implements `GraphCodec` for expanded JSON documents.
//! `open_session` wires both into a `Session` from a validated configuration.

#![forbid(unsafe_code)]

/// JSON graph codec
pub mod codec;

/// HTTP transport
pub mod transport;

pub use codec::JsonGraphCodec;
pub use transport::ReqwestTransport;

use sai_core::{Result, SaiConfig, SaiError, Session};
use std::sync::Arc;

/// Session over HTTP with the JSON codec
pub fn open_session(config: SaiConfig) -> Result<Session> {
    config.validate()?;
    let transport = ReqwestTransport::new(&config).map_err(|e| SaiError::config(e.to_string()))?;
    let codec = JsonGraphCodec::with_content_type(config.content_type.clone());
    Ok(Session::new(Arc::new(transport), Arc::new(codec), config))
}
