//! Node orchestration for the Infermesh client.
//!
//! This crate reconciles the two independent node authorities (the global
//! directory and the caller's registry) into a single trusted set, selects
//! nodes for models under a time-boxed failure blacklist, and resumes
//! interrupted streaming sessions against previously assigned nodes.
//!
//! # Modules
//!
//! - [`types`] — wire and domain types (`IndexNode`, `UserNode`, …).
//! - [`state`] — the process-wide [`SwarmState`] store (reconciled set,
//!   blacklist, session flags, open channels).
//! - [`api`] / [`transport`] — collaborator trait boundaries.
//! - [`http`] — `reqwest`-backed collaborator implementations.
//! - [`reconcile`] — the directory/registry join.
//! - [`picker`] — blacklist-aware uniform-random node selection.
//! - [`reconnect`] — the session resume state machine.
//! - [`config`] — endpoints and blacklist TTL.
//! - [`error`] — unified error types.
//!
//! All components are stateless request/response units over [`SwarmState`];
//! none owns a background loop, and all mutation goes through the state
//! store's accessor methods.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod picker;
pub mod reconcile;
pub mod reconnect;
pub mod state;
pub mod transport;
pub mod types;

// Re-export the most commonly used types at the crate root for convenience.
pub use api::{IndexApi, UserApi};
pub use config::SwarmConfig;
pub use error::{Result, SwarmError};
pub use picker::NodePicker;
pub use reconcile::NodeReconciler;
pub use reconnect::{ReconnectManager, ReconnectPhase};
pub use state::{SessionFlags, SwarmState};
pub use transport::{Channel, ConnectRequest, Transport};
pub use types::{Chat, IndexNode, Job, PickedNode, ReconciledNode, UserNode};
