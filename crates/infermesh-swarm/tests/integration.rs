//! Integration tests for the infermesh-swarm crate.
//!
//! These exercise reconciliation, selection and reconnection as integrated
//! subsystems over mock collaborators, including the failure-degradation and
//! idempotency guarantees.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use infermesh_swarm::{
    Channel, ConnectRequest, IndexApi, IndexNode, Job, NodePicker, NodeReconciler,
    ReconnectManager, ReconnectPhase, Result, SwarmError, SwarmState, Transport, UserApi,
    UserNode,
};

// ═══════════════════════════════════════════════════════════════════════
//  Mock collaborators
// ═══════════════════════════════════════════════════════════════════════

struct MockIndexApi {
    nodes: Vec<IndexNode>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl MockIndexApi {
    fn new(nodes: Vec<IndexNode>) -> Arc<Self> {
        Arc::new(Self {
            nodes,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl IndexApi for MockIndexApi {
    async fn list_active_nodes(&self) -> Result<Vec<IndexNode>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SwarmError::DirectoryFetchFailed {
                reason: "directory unreachable".into(),
            });
        }
        Ok(self.nodes.clone())
    }
}

struct MockUserApi {
    nodes: Vec<UserNode>,
    jobs: Vec<Job>,
    fail_nodes: AtomicBool,
}

impl MockUserApi {
    fn new(nodes: Vec<UserNode>, jobs: Vec<Job>) -> Arc<Self> {
        Arc::new(Self {
            nodes,
            jobs,
            fail_nodes: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl UserApi for MockUserApi {
    async fn get_nodes(&self, _identity: &str, _registry_id: &str) -> Result<Vec<UserNode>> {
        if self.fail_nodes.load(Ordering::SeqCst) {
            return Err(SwarmError::RegistryFetchFailed {
                reason: "registry unreachable".into(),
            });
        }
        Ok(self.nodes.clone())
    }

    async fn get_chat_jobs(
        &self,
        _identity: &str,
        _registry_id: &str,
        chat_id: &str,
    ) -> Result<Vec<Job>> {
        Ok(self
            .jobs
            .iter()
            .filter(|j| j.chat_id == chat_id)
            .cloned()
            .collect())
    }

    async fn list_chats(
        &self,
        _identity: &str,
        _registry_id: &str,
        _include_archived: bool,
    ) -> Result<Vec<infermesh_swarm::Chat>> {
        Ok(Vec::new())
    }
}

struct MockTransport {
    connects: AtomicUsize,
    fail: AtomicBool,
}

impl MockTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            connects: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, request: ConnectRequest) -> Result<Channel> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SwarmError::TransportFailed {
                reason: "handshake refused".into(),
            });
        }
        assert!(!request.public_key.is_empty());
        Ok(Channel {
            job_id: request.job_id,
            chat_id: request.chat_id,
            node_id: request.node_id,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Fixtures
// ═══════════════════════════════════════════════════════════════════════

fn index_node(id: &str, model: &str, principal: &str) -> IndexNode {
    IndexNode {
        node_id: id.into(),
        is_active: true,
        model_id: model.into(),
        principal: Some(principal.into()),
        public_key: None,
        hostname: None,
    }
}

fn user_node(id: &str, principal: &str) -> UserNode {
    UserNode {
        node_id: id.into(),
        principal: Some(principal.into()),
        public_key: format!("pk-{id}"),
        hostname: format!("{id}.mesh:7070"),
    }
}

fn job(job_id: &str, node_id: &str, chat_id: &str) -> Job {
    Job {
        job_id: job_id.into(),
        node_id: node_id.into(),
        chat_id: chat_id.into(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Reconciliation
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn reconcile_builds_the_identity_checked_intersection() {
    let index = MockIndexApi::new(vec![
        index_node("n1", "model-a", "P"),
        index_node("n2", "model-a", "P"),
        index_node("n3", "model-b", "P"),
    ]);
    let user = MockUserApi::new(
        vec![
            user_node("n1", "P"),
            user_node("n2", "Q"), // principal mismatch
            // n3 missing from the registry
        ],
        vec![],
    );
    let state = SwarmState::new();
    let reconciler = NodeReconciler::new(index, user, state.clone());

    let merged = reconciler.reconcile("alice", "reg-1", false).await.unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].node_id, "n1");
    assert_eq!(state.reconciled_snapshot().len(), 1);
    assert!(!state.is_loading());
}

#[tokio::test]
async fn failed_fetch_preserves_previous_set() {
    let index = MockIndexApi::new(vec![index_node("n1", "model-a", "P")]);
    let user = MockUserApi::new(vec![user_node("n1", "P")], vec![]);
    let state = SwarmState::new();
    let reconciler = NodeReconciler::new(index, user.clone(), state.clone());

    reconciler.reconcile("alice", "reg-1", false).await.unwrap();
    assert_eq!(state.reconciled_snapshot().len(), 1);

    // Registry goes down: the attempt aborts, the old set survives, and the
    // loading flag ends terminal-false.
    user.fail_nodes.store(true, Ordering::SeqCst);
    let result = reconciler.reconcile("alice", "reg-1", false).await;
    assert!(matches!(result, Err(SwarmError::RegistryFetchFailed { .. })));
    assert_eq!(state.reconciled_snapshot().len(), 1);
    assert!(!state.is_loading());
}

#[tokio::test]
async fn in_flight_fetch_is_skipped_unless_forced() {
    let index = MockIndexApi::new(vec![index_node("n1", "model-a", "P")]);
    let user = MockUserApi::new(vec![user_node("n1", "P")], vec![]);
    let state = SwarmState::new();
    let reconciler = NodeReconciler::new(index.clone(), user, state.clone());

    // Simulate a fetch somebody else started and never finished.
    assert!(state.try_begin_fetch(false));

    // Unforced call: skips the refetch entirely.
    let snapshot = reconciler.reconcile("alice", "reg-1", false).await.unwrap();
    assert!(snapshot.is_empty());
    assert_eq!(index.calls.load(Ordering::SeqCst), 0);

    // Forced call: refetches despite the in-flight gate.
    let merged = reconciler.reconcile("alice", "reg-1", true).await.unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(index.calls.load(Ordering::SeqCst), 1);
}

// ═══════════════════════════════════════════════════════════════════════
//  Selection
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn pick_after_reconcile_respects_model_and_blacklist() {
    let index = MockIndexApi::new(vec![
        index_node("n1", "model-a", "P"),
        index_node("n2", "model-a", "P"),
    ]);
    let user = MockUserApi::new(vec![user_node("n1", "P"), user_node("n2", "P")], vec![]);
    let state = SwarmState::new();
    let reconciler = NodeReconciler::new(index, user, state.clone());
    reconciler.reconcile("alice", "reg-1", false).await.unwrap();

    let picker = NodePicker::new(state.clone());
    let now = Utc::now();

    // n1 just failed: only n2 remains eligible.
    state.blacklist_until("n1", now + Duration::seconds(60));
    for _ in 0..10 {
        let picked = picker.pick_node_for_model_at("model-a", now).unwrap();
        assert_eq!(picked.node_id, "n2");
        assert_eq!(picked.public_key.as_deref(), Some("pk-n2"));
    }

    // Both blacklisted: selection exhausted, retryable None.
    state.blacklist_until("n2", now + Duration::seconds(60));
    assert!(picker.pick_node_for_model_at("model-a", now).is_none());

    // After expiry both return to the pool.
    let later = now + Duration::seconds(61);
    assert!(picker.pick_node_for_model_at("model-a", later).is_some());
}

// ═══════════════════════════════════════════════════════════════════════
//  Reconnection
// ═══════════════════════════════════════════════════════════════════════

struct ReconnectFixture {
    manager: ReconnectManager,
    state: SwarmState,
    transport: Arc<MockTransport>,
}

async fn reconnect_fixture() -> ReconnectFixture {
    let index = MockIndexApi::new(vec![index_node("n1", "model-a", "P")]);
    let user = MockUserApi::new(
        vec![user_node("n1", "P")],
        vec![job("j1", "n1", "c1"), job("j-orphan", "n-gone", "c1")],
    );
    let state = SwarmState::new();
    let reconciler = NodeReconciler::new(index, user.clone(), state.clone());
    reconciler.reconcile("alice", "reg-1", false).await.unwrap();

    let transport = MockTransport::new();
    let manager = ReconnectManager::new(user, transport.clone(), state.clone());
    ReconnectFixture {
        manager,
        state,
        transport,
    }
}

#[tokio::test]
async fn reconnect_attaches_and_registers_the_channel() {
    let fx = reconnect_fixture().await;

    let phase = fx
        .manager
        .reconnect_to_active_job("alice", "reg-1", "c1", "j1")
        .await;
    assert_eq!(phase, ReconnectPhase::Attached);
    assert!(fx.state.has_channel("j1"));
    assert_eq!(fx.transport.connects.load(Ordering::SeqCst), 1);

    // The session is visibly in flight after a successful attach.
    let flags = fx.state.session_flags("c1");
    assert!(flags.generating && flags.ai_typing && flags.waiting);
}

#[tokio::test]
async fn duplicate_reconnect_opens_exactly_one_channel() {
    let fx = reconnect_fixture().await;

    let first = fx
        .manager
        .reconnect_to_active_job("alice", "reg-1", "c1", "j1")
        .await;
    let second = fx
        .manager
        .reconnect_to_active_job("alice", "reg-1", "c1", "j1")
        .await;

    assert_eq!(first, ReconnectPhase::Attached);
    assert_eq!(second, ReconnectPhase::Attached);
    assert_eq!(fx.transport.connects.load(Ordering::SeqCst), 1);
    assert_eq!(fx.state.channel_count(), 1);
}

#[tokio::test]
async fn concurrent_duplicate_reconnects_with_open_channel_are_no_ops() {
    let fx = reconnect_fixture().await;

    // Channel already open for j1.
    fx.state.register_channel(Channel {
        job_id: "j1".into(),
        chat_id: "c1".into(),
        node_id: "n1".into(),
    });

    let (a, b) = tokio::join!(
        fx.manager.reconnect_to_active_job("alice", "reg-1", "c1", "j1"),
        fx.manager.reconnect_to_active_job("alice", "reg-1", "c1", "j1"),
    );
    assert_eq!(a, ReconnectPhase::Attached);
    assert_eq!(b, ReconnectPhase::Attached);
    assert_eq!(fx.transport.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_job_fails_and_resets_flags() {
    let fx = reconnect_fixture().await;

    let phase = fx
        .manager
        .reconnect_to_active_job("alice", "reg-1", "c1", "j-missing")
        .await;
    assert_eq!(phase, ReconnectPhase::Failed);

    let flags = fx.state.session_flags("c1");
    assert!(!flags.generating && !flags.ai_typing && !flags.waiting);
    assert!(!fx.state.has_channel("j-missing"));
}

#[tokio::test]
async fn job_on_unreconciled_node_fails() {
    let fx = reconnect_fixture().await;

    let phase = fx
        .manager
        .reconnect_to_active_job("alice", "reg-1", "c1", "j-orphan")
        .await;
    assert_eq!(phase, ReconnectPhase::Failed);
    assert_eq!(fx.transport.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_public_key_is_a_hard_failure() {
    let index = MockIndexApi::new(vec![index_node("n1", "model-a", "P")]);
    let mut keyless = user_node("n1", "P");
    keyless.public_key.clear();
    let user = MockUserApi::new(vec![keyless], vec![job("j1", "n1", "c1")]);
    let state = SwarmState::new();
    let reconciler = NodeReconciler::new(index, user.clone(), state.clone());
    reconciler.reconcile("alice", "reg-1", false).await.unwrap();

    let transport = MockTransport::new();
    let manager = ReconnectManager::new(user, transport.clone(), state.clone());

    let phase = manager
        .reconnect_to_active_job("alice", "reg-1", "c1", "j1")
        .await;
    assert_eq!(phase, ReconnectPhase::Failed);
    // No insecure fallback: the transport is never reached.
    assert_eq!(transport.connects.load(Ordering::SeqCst), 0);

    let flags = state.session_flags("c1");
    assert!(!flags.generating && !flags.ai_typing && !flags.waiting);
}

#[tokio::test]
async fn transport_failure_resets_flags() {
    let fx = reconnect_fixture().await;
    fx.transport.fail.store(true, Ordering::SeqCst);

    let phase = fx
        .manager
        .reconnect_to_active_job("alice", "reg-1", "c1", "j1")
        .await;
    assert_eq!(phase, ReconnectPhase::Failed);
    assert!(!fx.state.has_channel("j1"));

    let flags = fx.state.session_flags("c1");
    assert!(!flags.generating && !flags.ai_typing && !flags.waiting);
}
