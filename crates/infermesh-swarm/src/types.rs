//! Wire and domain types for node orchestration.
//!
//! Two independent authorities describe a compute node: the global directory
//! (authoritative for liveness and model assignment) and the caller's own
//! registry (authoritative for authorization and network address). A node is
//! selectable only as a [`ReconciledNode`], the identity-checked intersection
//! of the two.

use serde::{Deserialize, Serialize};

/// A node as reported by the global directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexNode {
    /// Unique node identifier.
    pub node_id: String,
    /// Whether the directory currently considers this node live.
    pub is_active: bool,
    /// The model this node is serving.
    pub model_id: String,
    /// Identity of the principal operating the node, when published.
    pub principal: Option<String>,
    /// Node public key as known to the directory, if any.
    pub public_key: Option<String>,
    /// Hostname as known to the directory, if any.
    pub hostname: Option<String>,
}

/// A node as reported by the caller's own registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNode {
    /// Unique node identifier (shared with the directory).
    pub node_id: String,
    /// Operating principal, when the registry records one.
    pub principal: Option<String>,
    /// Node public key (the registry always carries one, possibly empty).
    pub public_key: String,
    /// Network address the caller should dial.
    pub hostname: String,
}

/// A node that is simultaneously active (directory) and authorized
/// (registry), with the operating principal cross-checked between the two.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciledNode {
    /// Unique node identifier. At most one reconciled node per id.
    pub node_id: String,
    /// Dial address, taken from the caller's registry.
    pub address: String,
    /// The model this node serves.
    pub model_id: String,
    /// The cross-checked operating principal.
    pub principal: String,
    /// Public key for the secure channel; registry value wins, directory
    /// value is the fallback, `None` when both are absent or empty.
    pub public_key: Option<String>,
}

/// The picker's answer: where to dial and with which key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedNode {
    /// Dial address.
    pub address: String,
    /// Selected node id.
    pub node_id: String,
    /// Public key for the secure channel, if the node published one.
    pub public_key: Option<String>,
}

/// The binding between a conversation, a dispatched job, and the node
/// executing it. Used to resume an interrupted streaming session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub job_id: String,
    /// Node the job was dispatched to.
    pub node_id: String,
    /// Conversation the job belongs to.
    pub chat_id: String,
}

/// A conversation summary from the caller's registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Unique chat identifier.
    pub chat_id: String,
    /// Display title.
    pub title: String,
    /// Whether the chat has been archived.
    #[serde(default)]
    pub archived: bool,
}

impl ReconciledNode {
    /// The picker/reconnect projection of this node.
    pub fn to_picked(&self) -> PickedNode {
        PickedNode {
            address: self.address.clone(),
            node_id: self.node_id.clone(),
            public_key: self.public_key.clone(),
        }
    }
}
