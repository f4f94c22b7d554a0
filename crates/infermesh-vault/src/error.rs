//! Vault error types.
//!
//! All vault subsystems surface errors through [`VaultError`], which is the
//! single error type returned by every public API in this crate.  Note that a
//! wrong PIN is *not* an error: verification APIs report it as `Ok(None)` or
//! `false`, because a mistyped PIN is an expected user-facing outcome, not a
//! system fault.

/// Unified error type for the Infermesh vault.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    // -- Derivation errors --------------------------------------------------
    /// The PIN was empty. An empty PIN would make the derived key trivially
    /// guessable, so it is rejected up front.
    #[error("pin must not be empty")]
    EmptyPin,

    /// The salt was shorter than the required minimum.
    #[error("salt too short: need at least {min} bytes, got {len}")]
    SaltTooShort { min: usize, len: usize },

    /// The Argon2 derivation itself rejected its parameters or inputs.
    #[error("key derivation failed: {reason}")]
    KeyDerivationFailed { reason: String },

    // -- Encoding errors ----------------------------------------------------
    /// A root key string was not in the canonical encoded form. This
    /// indicates a derivation or encoding bug upstream, never user error.
    #[error("malformed root key encoding: {reason}")]
    MalformedRootKey { reason: String },

    /// Sealing the validator plaintext failed.
    #[error("validator encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    // -- Store errors -------------------------------------------------------
    /// A vault file already exists at the target path; refusing to clobber.
    #[error("vault already exists at {path}")]
    VaultExists { path: String },

    /// No vault file was found at the given path.
    #[error("vault not found at {path}")]
    VaultNotFound { path: String },

    /// The on-disk vault record failed shape validation.
    #[error("malformed vault file: {reason}")]
    MalformedVault { reason: String },

    // -- Underlying errors --------------------------------------------------
    /// I/O error from the filesystem.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Generic ------------------------------------------------------------
    /// Catch-all for unexpected internal errors that don't fit a specific
    /// variant.  Prefer a typed variant whenever possible.
    #[error("internal vault error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the vault crate.
pub type Result<T> = std::result::Result<T, VaultError>;
