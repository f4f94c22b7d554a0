//! Swarm error types.
//!
//! All node-orchestration subsystems surface errors through [`SwarmError`].
//! Two of the spec'd outcomes are deliberately *not* errors: an empty
//! selection (`pick_node_for_model` returning `None`) and a failed reconnect
//! attempt (logged, flags reset) — those are expected operational states.

/// Unified error type for the Infermesh swarm subsystem.
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    // -- Reconciliation errors ----------------------------------------------
    /// The global node directory fetch failed. The previous reconciled set
    /// is left in place; callers degrade to last known good.
    #[error("directory fetch failed: {reason}")]
    DirectoryFetchFailed { reason: String },

    /// The caller-scoped registry fetch failed. Same degradation policy as
    /// the directory fetch.
    #[error("registry fetch failed: {reason}")]
    RegistryFetchFailed { reason: String },

    // -- Reconnection errors ------------------------------------------------
    /// The job to resume was not found in the chat's job list.
    #[error("job not found: job_id={job_id}")]
    JobNotFound { job_id: String },

    /// The node assigned to a job is absent from the reconciled set.
    #[error("node not found in reconciled set: node_id={node_id}")]
    NodeNotFound { node_id: String },

    /// The node has no public key; a secure channel cannot be established
    /// and there is no insecure fallback.
    #[error("node has no public key: node_id={node_id}")]
    MissingPublicKey { node_id: String },

    /// The transport collaborator failed to open the channel.
    #[error("transport connect failed: {reason}")]
    TransportFailed { reason: String },

    // -- Config errors ------------------------------------------------------
    /// Swarm configuration could not be loaded or was invalid.
    #[error("config error: {reason}")]
    Config { reason: String },

    // -- Underlying errors --------------------------------------------------
    /// HTTP-level error from `reqwest`.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Generic ------------------------------------------------------------
    /// Catch-all for unexpected internal errors that don't fit a specific
    /// variant.  Prefer a typed variant whenever possible.
    #[error("internal swarm error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the swarm crate.
pub type Result<T> = std::result::Result<T, SwarmError>;
