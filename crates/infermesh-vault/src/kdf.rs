//! Root key derivation from a low-entropy PIN.
//!
//! The root key is derived with Argon2id, a memory-hard KDF, so that an
//! attacker who steals the on-disk vault cannot cheaply brute-force a short
//! numeric PIN offline. Parameters are fixed (64 MiB, 3 passes, 1 lane);
//! changing them changes every derived key and therefore invalidates every
//! existing vault.
//!
//! The derived key is carried around in its canonical encoded form: a
//! self-describing `MESH-SECRET-KEY-` prefix followed by the 32 key bytes as
//! strictly uppercase hex. The downstream sealed-box parser accepts only
//! that case, so canonicalization is mandatory, not cosmetic.

use std::fmt;
use std::str::FromStr;

use argon2::{Algorithm, Argon2, Params, Version};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, VaultError};

/// Length of the derived root key in bytes.
pub const KEY_LEN: usize = 32;

/// Minimum accepted salt length in bytes.
pub const MIN_SALT_LEN: usize = 16;

/// Length of a freshly generated salt.
pub const SALT_LEN: usize = 16;

/// Human-inspectable prefix of the canonical root key encoding.
pub const KEY_PREFIX: &str = "MESH-SECRET-KEY-";

/// Argon2id memory cost in KiB (64 MiB).
const ARGON2_MEMORY_KIB: u32 = 64 * 1024;

/// Argon2id pass count.
const ARGON2_PASSES: u32 = 3;

/// Argon2id lane count. Single-lane keeps derivation sequential, which is
/// the memory-hard sweet spot for a client-side unlock.
const ARGON2_LANES: u32 = 1;

// ---------------------------------------------------------------------------
// RootKey
// ---------------------------------------------------------------------------

/// A derived 256-bit root secret.
///
/// Held only in process memory; zeroized on drop. The canonical textual form
/// (via [`fmt::Display`]) is `MESH-SECRET-KEY-` + 64 uppercase hex digits,
/// and [`FromStr`] accepts *only* that form — lowercase hex, a foreign
/// prefix, or a wrong length all fail to parse.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RootKey([u8; KEY_LEN]);

impl RootKey {
    /// Wrap raw key bytes. Intended for derivation and tests; normal callers
    /// obtain a `RootKey` from [`derive_root_key`] or parsing.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Render the canonical encoded form.
    pub fn encoded(&self) -> String {
        format!("{KEY_PREFIX}{}", hex::encode_upper(self.0))
    }
}

// Never leak key material through debug output.
impl fmt::Debug for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootKey(MESH-SECRET-KEY-…)")
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encoded())
    }
}

impl FromStr for RootKey {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix(KEY_PREFIX)
            .ok_or_else(|| VaultError::MalformedRootKey {
                reason: format!("missing {KEY_PREFIX} prefix"),
            })?;

        if body.len() != KEY_LEN * 2 {
            return Err(VaultError::MalformedRootKey {
                reason: format!("expected {} hex digits, got {}", KEY_LEN * 2, body.len()),
            });
        }

        // Strict uppercase: `hex::decode` would accept mixed case, and the
        // downstream parser does not.
        if !body
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
        {
            return Err(VaultError::MalformedRootKey {
                reason: "key body must be strictly uppercase hex".into(),
            });
        }

        let decoded = hex::decode(body).map_err(|e| VaultError::MalformedRootKey {
            reason: e.to_string(),
        })?;

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive the root key from a PIN and a stored salt.
///
/// Deterministic: the same `(pin, salt)` pair always yields the same key.
/// There is no "wrong PIN" signal here — any well-formed PIN derives *a*
/// key; whether it is the right one is decided later against the encrypted
/// validator.
///
/// # Errors
///
/// Returns [`VaultError::EmptyPin`] or [`VaultError::SaltTooShort`] for
/// malformed inputs, [`VaultError::KeyDerivationFailed`] if Argon2 rejects
/// its parameters. These are always propagated, never defaulted.
pub fn derive_root_key(pin: &str, salt: &[u8]) -> Result<RootKey> {
    if pin.is_empty() {
        return Err(VaultError::EmptyPin);
    }
    if salt.len() < MIN_SALT_LEN {
        return Err(VaultError::SaltTooShort {
            min: MIN_SALT_LEN,
            len: salt.len(),
        });
    }

    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_PASSES, ARGON2_LANES, Some(KEY_LEN))
        .map_err(|e| VaultError::KeyDerivationFailed {
            reason: e.to_string(),
        })?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(pin.as_bytes(), salt, &mut key)
        .map_err(|e| VaultError::KeyDerivationFailed {
            reason: e.to_string(),
        })?;

    tracing::debug!(salt_len = salt.len(), "derived root key via Argon2id");

    Ok(RootKey(key))
}

/// Generate a fresh random salt for a new vault.
///
/// # Errors
///
/// Returns [`VaultError::Internal`] if the system CSPRNG fails.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| VaultError::Internal("failed to generate random salt".into()))?;
    Ok(salt)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
