//! Process-wide swarm state store.
//!
//! All mutable state shared by the reconciler, picker and reconnect manager
//! lives here: the last completed reconciled node set, the fetch-in-flight
//! gate, the failure blacklist, per-chat session flags, and the registry of
//! open streaming channels. [`SwarmState`] is cheaply cloneable
//! (`Arc`-backed) and its accessor/mutator methods are the *only* mutation
//! surface — components never reach into each other's state.
//!
//! The blacklist uses lazy expiry: entries are ignored once expired, never
//! proactively pruned. The map is bounded by the node population, so no
//! cleanup job exists.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::transport::Channel;
use crate::types::ReconciledNode;

/// Caller-visible per-chat status flags, mirrored by the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFlags {
    /// A generation is in progress for this chat.
    pub generating: bool,
    /// The "assistant is typing" indicator.
    pub ai_typing: bool,
    /// Waiting on the node (no tokens flowing yet).
    pub waiting: bool,
}

impl SessionFlags {
    fn all(value: bool) -> Self {
        Self {
            generating: value,
            ai_typing: value,
            waiting: value,
        }
    }
}

struct Inner {
    /// Last completed reconciled set, replaced wholesale on every successful
    /// reconcile. Unique by node id (enforced at merge time).
    reconciled: RwLock<Vec<ReconciledNode>>,
    /// A directory/registry fetch is in flight.
    loading: AtomicBool,
    /// node_id → blacklist expiry. Read-only for the picker; written by
    /// callers reporting node failures.
    blacklist: DashMap<String, DateTime<Utc>>,
    /// chat_id → session flags.
    flags: DashMap<String, SessionFlags>,
    /// job_id → open streaming channel (reconnect idempotency guard).
    channels: DashMap<String, Channel>,
}

/// Shared swarm state handle.
#[derive(Clone)]
pub struct SwarmState {
    inner: Arc<Inner>,
}

impl SwarmState {
    /// Create an empty state store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                reconciled: RwLock::new(Vec::new()),
                loading: AtomicBool::new(false),
                blacklist: DashMap::new(),
                flags: DashMap::new(),
                channels: DashMap::new(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Reconciled set
    // -----------------------------------------------------------------------

    /// Replace the reconciled set with a freshly merged one.
    pub fn set_reconciled(&self, nodes: Vec<ReconciledNode>) {
        tracing::debug!(count = nodes.len(), "reconciled node set replaced");
        if let Ok(mut set) = self.inner.reconciled.write() {
            *set = nodes;
        }
    }

    /// Snapshot of the last completed reconciled set.
    pub fn reconciled_snapshot(&self) -> Vec<ReconciledNode> {
        self.inner
            .reconciled
            .read()
            .map(|set| set.clone())
            .unwrap_or_default()
    }

    /// Look a single node up in the last completed reconciled set.
    pub fn reconciled_get(&self, node_id: &str) -> Option<ReconciledNode> {
        self.inner
            .reconciled
            .read()
            .ok()
            .and_then(|set| set.iter().find(|n| n.node_id == node_id).cloned())
    }

    // -----------------------------------------------------------------------
    // Fetch gate
    // -----------------------------------------------------------------------

    /// Claim the fetch-in-flight gate.
    ///
    /// Returns `true` if the caller should proceed with a refetch: either no
    /// fetch was in flight, or `force` overrides the gate.
    pub fn try_begin_fetch(&self, force: bool) -> bool {
        if force {
            self.inner.loading.store(true, Ordering::SeqCst);
            return true;
        }
        self.inner
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the fetch gate. Terminal for the attempt, success or failure.
    pub fn end_fetch(&self) {
        self.inner.loading.store(false, Ordering::SeqCst);
    }

    /// Whether a reconcile fetch is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Blacklist
    // -----------------------------------------------------------------------

    /// Blacklist a node for `ttl`, typically after a dispatch failure.
    /// The node becomes selectable again once the entry expires.
    pub fn blacklist_node(&self, node_id: impl Into<String>, ttl: Duration) {
        let node_id = node_id.into();
        let expiry = Utc::now() + ttl;
        tracing::warn!(node_id = %node_id, expiry = %expiry, "node blacklisted");
        self.inner.blacklist.insert(node_id, expiry);
    }

    /// Whether the node is excluded from selection at `now`.
    /// Expired entries are ignored (lazy expiry), not removed.
    pub fn is_blacklisted(&self, node_id: &str, now: DateTime<Utc>) -> bool {
        self.inner
            .blacklist
            .get(node_id)
            .map(|expiry| now < *expiry)
            .unwrap_or(false)
    }

    /// Insert a blacklist entry with an explicit expiry (test hook and
    /// backfill path for externally computed expiries).
    pub fn blacklist_until(&self, node_id: impl Into<String>, expiry: DateTime<Utc>) {
        self.inner.blacklist.insert(node_id.into(), expiry);
    }

    // -----------------------------------------------------------------------
    // Session flags
    // -----------------------------------------------------------------------

    /// Set all three status flags for a chat at once, the way the reconnect
    /// flow raises and clears them.
    pub fn set_session_busy(&self, chat_id: impl Into<String>, busy: bool) {
        let chat_id = chat_id.into();
        tracing::debug!(chat_id = %chat_id, busy, "session flags updated");
        self.inner.flags.insert(chat_id, SessionFlags::all(busy));
    }

    /// Current flags for a chat; all-false if never touched.
    pub fn session_flags(&self, chat_id: &str) -> SessionFlags {
        self.inner
            .flags
            .get(chat_id)
            .map(|f| *f)
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Channels
    // -----------------------------------------------------------------------

    /// Register an open channel for a job.
    pub fn register_channel(&self, channel: Channel) {
        tracing::info!(job_id = %channel.job_id, node_id = %channel.node_id, "channel registered");
        self.inner.channels.insert(channel.job_id.clone(), channel);
    }

    /// Whether a live channel already exists for the job.
    pub fn has_channel(&self, job_id: &str) -> bool {
        self.inner.channels.contains_key(job_id)
    }

    /// Drop the channel for a job (stream ended or torn down).
    pub fn remove_channel(&self, job_id: &str) -> Option<Channel> {
        self.inner.channels.remove(job_id).map(|(_, ch)| ch)
    }

    /// Number of currently open channels.
    pub fn channel_count(&self) -> usize {
        self.inner.channels.len()
    }
}

impl Default for SwarmState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
