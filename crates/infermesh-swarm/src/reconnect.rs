//! Session reconnection.
//!
//! Re-establishes an interrupted streaming session against the node a job
//! was previously assigned to. The attempt is a small state machine:
//!
//! ```text
//! Idle → Probing → Connecting → Attached   (success)
//! Idle → Probing → Failed                  (any lookup error)
//! ```
//!
//! Failures are absorbed, not thrown: the caller-visible session flags are
//! reset so the conversation lands in a consistent "not generating" state
//! instead of a stuck spinner, and the cause is logged.

use std::sync::Arc;

use crate::api::UserApi;
use crate::error::{Result, SwarmError};
use crate::state::SwarmState;
use crate::transport::{ConnectRequest, Transport};

/// Phases of a reconnect attempt. The public operation returns the terminal
/// phase: [`Attached`](ReconnectPhase::Attached) or
/// [`Failed`](ReconnectPhase::Failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    /// No attempt in progress.
    Idle,
    /// Resolving job and node details.
    Probing,
    /// Opening the authenticated streaming channel.
    Connecting,
    /// Channel open; session resumed.
    Attached,
    /// Attempt failed; flags reset, error logged.
    Failed,
}

/// Resumes interrupted streaming sessions.
pub struct ReconnectManager {
    user_api: Arc<dyn UserApi>,
    transport: Arc<dyn Transport>,
    state: SwarmState,
}

impl ReconnectManager {
    /// Build a reconnect manager over its collaborators and shared state.
    pub fn new(
        user_api: Arc<dyn UserApi>,
        transport: Arc<dyn Transport>,
        state: SwarmState,
    ) -> Self {
        Self {
            user_api,
            transport,
            state,
        }
    }

    /// Re-attach to `job_id` in `chat_id`.
    ///
    /// Idempotent: if a live channel already exists for the job this is a
    /// fast no-op returning `Attached` — exactly one channel is ever opened
    /// per job, and a duplicate call never cancels the other.
    ///
    /// Reads the *last completed* reconciled set for node details; the
    /// caller is responsible for reconciling first.
    pub async fn reconnect_to_active_job(
        &self,
        identity: &str,
        registry_id: &str,
        chat_id: &str,
        job_id: &str,
    ) -> ReconnectPhase {
        if self.state.has_channel(job_id) {
            tracing::debug!(job_id = %job_id, "channel already open, reconnect is a no-op");
            return ReconnectPhase::Attached;
        }

        // Probing: make the in-flight reconnection visible to the UI.
        self.state.set_session_busy(chat_id, true);

        match self.probe_and_connect(identity, registry_id, chat_id, job_id).await {
            Ok(()) => {
                tracing::info!(job_id = %job_id, chat_id = %chat_id, "session reattached");
                ReconnectPhase::Attached
            }
            Err(e) => {
                self.state.set_session_busy(chat_id, false);
                tracing::warn!(
                    job_id = %job_id,
                    chat_id = %chat_id,
                    error = %e,
                    "could not resume session"
                );
                ReconnectPhase::Failed
            }
        }
    }

    /// The fallible middle of the state machine: Probing then Connecting.
    async fn probe_and_connect(
        &self,
        identity: &str,
        registry_id: &str,
        chat_id: &str,
        job_id: &str,
    ) -> Result<()> {
        let jobs = self
            .user_api
            .get_chat_jobs(identity, registry_id, chat_id)
            .await?;
        let job = jobs
            .into_iter()
            .find(|j| j.job_id == job_id)
            .ok_or_else(|| SwarmError::JobNotFound {
                job_id: job_id.to_owned(),
            })?;

        let node =
            self.state
                .reconciled_get(&job.node_id)
                .ok_or_else(|| SwarmError::NodeNotFound {
                    node_id: job.node_id.clone(),
                })?;

        // A node without a key cannot carry a secure channel; there is no
        // insecure fallback.
        let public_key = node
            .public_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SwarmError::MissingPublicKey {
                node_id: node.node_id.clone(),
            })?;

        tracing::debug!(
            job_id = %job_id,
            node_id = %node.node_id,
            address = %node.address,
            "probe resolved, connecting"
        );

        let channel = self
            .transport
            .connect(ConnectRequest {
                chat_id: chat_id.to_owned(),
                job_id: job_id.to_owned(),
                address: node.address,
                node_id: node.node_id,
                public_key,
                resume_token: None,
            })
            .await
            .map_err(|e| SwarmError::TransportFailed {
                reason: e.to_string(),
            })?;

        self.state.register_channel(channel);
        Ok(())
    }
}
