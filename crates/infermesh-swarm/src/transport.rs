//! Transport collaborator boundary.
//!
//! The streaming transport itself (WebSocket framing, token events) lives
//! outside this crate; only its connect contract matters here. The reconnect
//! manager hands a fully resolved [`ConnectRequest`] to an implementation
//! and records the returned [`Channel`] handle so duplicate resume attempts
//! for the same job become no-ops.

use async_trait::async_trait;

use crate::error::Result;

/// Everything the transport needs to open an authenticated streaming
/// channel to a node.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Conversation being resumed or started.
    pub chat_id: String,
    /// Job to attach to on the node.
    pub job_id: String,
    /// Node dial address.
    pub address: String,
    /// Node identifier.
    pub node_id: String,
    /// Node public key; required, no insecure fallback exists.
    pub public_key: String,
    /// Opaque resume token from a previous session, if any.
    pub resume_token: Option<String>,
}

/// Opaque handle to an open streaming channel.
///
/// Carries just enough identity for the channel registry; everything else
/// about the stream is the transport's business.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Job this channel is attached to.
    pub job_id: String,
    /// Conversation the channel serves.
    pub chat_id: String,
    /// Node on the other end.
    pub node_id: String,
}

/// The transport collaborator: opens authenticated streaming channels.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a channel for `request`. Implementations authenticate against
    /// the node's public key before any payload flows.
    async fn connect(&self, request: ConnectRequest) -> Result<Channel>;
}
