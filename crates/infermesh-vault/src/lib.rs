//! PIN-protected root key vault for Infermesh.
//!
//! This crate implements the client-side secure vault of the Infermesh
//! distributed inference client: deriving a durable root secret from a
//! low-entropy PIN with a memory-hard KDF, and persisting/verifying it via
//! an asymmetric "encrypted validator" so that neither the PIN nor the
//! plaintext key ever touches disk.
//!
//! # Modules
//!
//! - [`kdf`] — Argon2id root key derivation and the canonical key encoding.
//! - [`validator`] — sealed-box sentinel encryption and PIN/key verification.
//! - [`store`] — on-disk vault record (salt + sealed validator).
//! - [`error`] — unified error types.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use infermesh_vault::store::Vault;
//!
//! # fn example() -> infermesh_vault::error::Result<()> {
//! // Onboarding: create the vault once.
//! let (vault, root_key) = Vault::create("data/vault.json", "4812")?;
//!
//! // Later sessions: re-open and unlock.
//! let vault = Vault::open("data/vault.json")?;
//! match vault.unlock("4812")? {
//!     Some(root_key) => { /* hold in memory for the session */ }
//!     None => { /* wrong PIN — prompt again */ }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod kdf;
pub mod store;
pub mod validator;

// Re-export the most commonly used types at the crate root for convenience.
pub use error::{Result, VaultError};
pub use kdf::{RootKey, derive_root_key, generate_salt};
pub use store::Vault;
pub use validator::{encrypt_validator, verify_key, verify_pin};
