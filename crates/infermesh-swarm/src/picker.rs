//! Node selection.
//!
//! Picks one reconciled node for a requested model, honoring the temporary
//! failure blacklist. Selection is uniformly random among eligible
//! candidates: many concurrent callers then spread load across nodes
//! without any live load telemetry.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

use crate::state::SwarmState;
use crate::types::PickedNode;

/// Selects nodes from the last completed reconciled set.
pub struct NodePicker {
    state: SwarmState,
}

impl NodePicker {
    /// Build a picker over the shared state.
    pub fn new(state: SwarmState) -> Self {
        Self { state }
    }

    /// Pick a node serving `model_id`, or `None` when no eligible node
    /// exists right now (a retryable condition, not a fault).
    ///
    /// Pure read: neither the reconciled set nor the blacklist is mutated,
    /// and no fresh reconciliation is triggered — callers bound staleness
    /// themselves by reconciling first.
    pub fn pick_node_for_model(&self, model_id: &str) -> Option<PickedNode> {
        self.pick_node_for_model_at(model_id, Utc::now())
    }

    /// Same as [`pick_node_for_model`](Self::pick_node_for_model) with an
    /// explicit clock, so blacklist expiry is testable without sleeping.
    pub fn pick_node_for_model_at(
        &self,
        model_id: &str,
        now: DateTime<Utc>,
    ) -> Option<PickedNode> {
        let snapshot = self.state.reconciled_snapshot();
        let eligible: Vec<_> = snapshot
            .iter()
            .filter(|n| n.model_id == model_id)
            .filter(|n| !self.state.is_blacklisted(&n.node_id, now))
            .collect();

        if eligible.is_empty() {
            tracing::debug!(model_id = %model_id, "no eligible node for model");
            return None;
        }

        let chosen = eligible.choose(&mut rand::thread_rng())?;
        tracing::debug!(
            model_id = %model_id,
            node_id = %chosen.node_id,
            candidates = eligible.len(),
            "node picked"
        );
        Some(chosen.to_picked())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
