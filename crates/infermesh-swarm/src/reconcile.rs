//! Node reconciliation.
//!
//! Merges the global directory feed with the caller's registry feed into the
//! single trusted node set: a node is selectable only if it is active in the
//! directory, present in the caller's registry, and both sources agree on
//! the operating principal. The double-check prevents an
//! active-but-unauthorized node, or a spoofed identity, from ever being
//! selectable.
//!
//! The merge is a full rebuild on every call — no incremental patching. If
//! either fetch fails the whole reconciliation aborts and the previous set
//! stays in place, so callers degrade to last known good.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::api::{IndexApi, UserApi};
use crate::error::{Result, SwarmError};
use crate::state::SwarmState;
use crate::types::{IndexNode, ReconciledNode, UserNode};

/// Reconciles the two node authorities into [`SwarmState`]'s trusted set.
pub struct NodeReconciler {
    index_api: Arc<dyn IndexApi>,
    user_api: Arc<dyn UserApi>,
    state: SwarmState,
}

impl NodeReconciler {
    /// Build a reconciler over the two collaborators and the shared state.
    pub fn new(
        index_api: Arc<dyn IndexApi>,
        user_api: Arc<dyn UserApi>,
        state: SwarmState,
    ) -> Self {
        Self {
            index_api,
            user_api,
            state,
        }
    }

    /// Refresh both feeds and rebuild the reconciled set.
    ///
    /// If a fetch is already in flight and `force` is false, the refetch is
    /// skipped and the current snapshot is returned as-is. Both fetches run
    /// concurrently; the merge only runs once both have completed.
    ///
    /// # Errors
    ///
    /// [`SwarmError::DirectoryFetchFailed`] / [`SwarmError::RegistryFetchFailed`]
    /// when the respective feed cannot be fetched. The previous reconciled
    /// set is left untouched in that case.
    pub async fn reconcile(
        &self,
        identity: &str,
        registry_id: &str,
        force: bool,
    ) -> Result<Vec<ReconciledNode>> {
        if !self.state.try_begin_fetch(force) {
            tracing::debug!("reconcile skipped: fetch already in flight");
            return Ok(self.state.reconciled_snapshot());
        }

        let index_fut = async {
            self.index_api
                .list_active_nodes()
                .await
                .map_err(|e| SwarmError::DirectoryFetchFailed {
                    reason: e.to_string(),
                })
        };
        let user_fut = async {
            self.user_api
                .get_nodes(identity, registry_id)
                .await
                .map_err(|e| SwarmError::RegistryFetchFailed {
                    reason: e.to_string(),
                })
        };

        match futures::try_join!(index_fut, user_fut) {
            Ok((index_nodes, user_nodes)) => {
                let merged = merge(index_nodes, user_nodes);
                tracing::info!(count = merged.len(), "node reconciliation completed");
                self.state.set_reconciled(merged.clone());
                self.state.end_fetch();
                Ok(merged)
            }
            Err(e) => {
                // Terminal for this attempt; previous set stays in place.
                self.state.end_fetch();
                tracing::warn!(error = %e, "reconciliation aborted, keeping previous node set");
                Err(e)
            }
        }
    }
}

/// Single-pass join of the two feeds, keyed by node id, with the principal
/// cross-check as a filter predicate.
fn merge(index_nodes: Vec<IndexNode>, user_nodes: Vec<UserNode>) -> Vec<ReconciledNode> {
    // Index the registry side (the smaller, user-scoped list).
    let by_id: HashMap<&str, &UserNode> = user_nodes
        .iter()
        .map(|n| (n.node_id.as_str(), n))
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for index_node in &index_nodes {
        if !index_node.is_active {
            tracing::debug!(node_id = %index_node.node_id, reason = "inactive", "node excluded");
            continue;
        }
        let Some(principal) = index_node.principal.as_deref() else {
            tracing::debug!(node_id = %index_node.node_id, reason = "no_principal", "node excluded");
            continue;
        };
        let Some(user_node) = by_id.get(index_node.node_id.as_str()) else {
            // Indistinguishable from "not yet registered" at this layer;
            // observable in logs alongside the fetch trace.
            tracing::debug!(node_id = %index_node.node_id, reason = "no_user_node", "node excluded");
            continue;
        };
        if let Some(user_principal) = user_node.principal.as_deref() {
            if user_principal != principal {
                tracing::debug!(node_id = %index_node.node_id, reason = "principal_mismatch", "node excluded");
                continue;
            }
        }
        if !seen.insert(index_node.node_id.clone()) {
            tracing::debug!(node_id = %index_node.node_id, reason = "duplicate", "node excluded");
            continue;
        }

        merged.push(ReconciledNode {
            node_id: index_node.node_id.clone(),
            address: user_node.hostname.clone(),
            model_id: index_node.model_id.clone(),
            principal: principal.to_owned(),
            public_key: pick_public_key(user_node, index_node),
        });
    }

    merged
}

/// Registry key wins; directory key is the fallback; empty strings count as
/// absent.
fn pick_public_key(user_node: &UserNode, index_node: &IndexNode) -> Option<String> {
    if !user_node.public_key.is_empty() {
        return Some(user_node.public_key.clone());
    }
    index_node
        .public_key
        .as_ref()
        .filter(|k| !k.is_empty())
        .cloned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
