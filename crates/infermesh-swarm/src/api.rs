//! Collaborator traits for the two node authorities.
//!
//! The reconciler consumes two independently sourced feeds: the global node
//! directory ([`IndexApi`], no authentication, network-wide liveness) and
//! the caller's own registry ([`UserApi`], scoped to an authenticated
//! identity and registry handle obtained from an external auth lifecycle).
//! Both are abstract here so tests can substitute deterministic fakes and
//! the HTTP binding stays swappable.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chat, IndexNode, Job, UserNode};

/// Global node directory: authoritative for liveness and model assignment.
#[async_trait]
pub trait IndexApi: Send + Sync {
    /// List all nodes the directory currently considers active.
    async fn list_active_nodes(&self) -> Result<Vec<IndexNode>>;
}

/// Caller-scoped registry: authoritative for authorization and addresses.
///
/// `identity` is the caller's principal identity; `registry_id` is the
/// registry handle issued by the authentication lifecycle (out of scope
/// here, passed through opaquely).
#[async_trait]
pub trait UserApi: Send + Sync {
    /// Nodes the caller is authorized to use.
    async fn get_nodes(&self, identity: &str, registry_id: &str) -> Result<Vec<UserNode>>;

    /// Jobs dispatched for a given chat, most recent last.
    async fn get_chat_jobs(
        &self,
        identity: &str,
        registry_id: &str,
        chat_id: &str,
    ) -> Result<Vec<Job>>;

    /// The caller's conversations, optionally including archived ones.
    async fn list_chats(
        &self,
        identity: &str,
        registry_id: &str,
        include_archived: bool,
    ) -> Result<Vec<Chat>>;
}
