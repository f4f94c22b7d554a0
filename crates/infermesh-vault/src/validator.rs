//! Encrypted validator scheme for PIN verification.
//!
//! The vault never stores the PIN or the root key. Instead, at onboarding a
//! fixed sentinel plaintext is sealed to the asymmetric recipient derived
//! from the root key, and the resulting ciphertext is the only artifact on
//! disk. Verification is then defined as "can this key open this ciphertext
//! to exactly this value" — tampering shows up as a decryption failure (the
//! AEAD is authenticated), never as silent acceptance.
//!
//! Sealed-box construction:
//!
//! ```text
//! recipient_sk = root key bytes (X25519 static secret)
//! recipient_pk = X25519(recipient_sk, basepoint)
//! eph_sk, eph_pk = fresh X25519 keypair per encryption
//! shared  = X25519(eph_sk, recipient_pk)
//! aead_key = HKDF-SHA256(salt = eph_pk || recipient_pk, ikm = shared)
//! payload = eph_pk(32) || nonce(24) || XChaCha20-Poly1305(aead_key, nonce, sentinel)
//! ```
//!
//! The payload is base64-encoded for storage and transport.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::{Result, VaultError};
use crate::kdf::{self, RootKey};

/// Fixed sentinel plaintext, identical across all vaults. Changing it
/// invalidates every existing vault — a breaking format change.
pub const SENTINEL: &[u8] = b"mesh-vault-ok-v1";

/// HKDF domain-separation info string.
const HKDF_INFO: &[u8] = b"infermesh-vault-validator";

/// XChaCha20-Poly1305 nonce length in bytes.
const NONCE_LEN: usize = 24;

/// Ephemeral public key length in bytes.
const EPH_PK_LEN: usize = 32;

/// Minimum decoded payload length: ephemeral key + nonce + AEAD tag.
const MIN_PAYLOAD_LEN: usize = EPH_PK_LEN + NONCE_LEN + 16;

// ---------------------------------------------------------------------------
// Encryption
// ---------------------------------------------------------------------------

/// Seal the sentinel plaintext to the recipient derived from `root_key_str`.
///
/// Takes the *encoded* root key: a malformed encoding here means a
/// derivation or canonicalization bug upstream, and must surface loudly
/// rather than be masked as a verification failure.
///
/// # Errors
///
/// [`VaultError::MalformedRootKey`] if the encoding does not parse;
/// [`VaultError::EncryptionFailed`] if the AEAD seal fails.
pub fn encrypt_validator(root_key_str: &str) -> Result<String> {
    let root_key: RootKey = root_key_str.parse()?;
    let recipient_pk = PublicKey::from(&StaticSecret::from(*root_key.as_bytes()));

    let eph_sk = EphemeralSecret::random_from_rng(OsRng);
    let eph_pk = PublicKey::from(&eph_sk);
    let shared = eph_sk.diffie_hellman(&recipient_pk);

    let aead_key = derive_aead_key(eph_pk.as_bytes(), recipient_pk.as_bytes(), shared.as_bytes());
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&aead_key));

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), SENTINEL)
        .map_err(|_| VaultError::EncryptionFailed {
            reason: "AEAD seal failed".into(),
        })?;

    let mut payload = Vec::with_capacity(EPH_PK_LEN + NONCE_LEN + ciphertext.len());
    payload.extend_from_slice(eph_pk.as_bytes());
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&ciphertext);

    tracing::debug!(payload_len = payload.len(), "sealed vault validator");

    Ok(BASE64.encode(payload))
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Re-derive the root key from `(pin, salt)` and check it against the stored
/// validator ciphertext.
///
/// Returns `Ok(Some(root_key))` only if decryption succeeds *and* the
/// plaintext equals the sentinel exactly. A wrong PIN, a tampered or
/// corrupted validator, or undecodable base64 all yield `Ok(None)` — this is
/// the sole legitimate "wrong PIN" path and is not an error.
///
/// # Errors
///
/// Only malformed derivation inputs (empty PIN, short salt) propagate, per
/// [`kdf::derive_root_key`].
pub fn verify_pin(pin: &str, salt: &[u8], validator_b64: &str) -> Result<Option<RootKey>> {
    let root_key = kdf::derive_root_key(pin, salt)?;
    if open_validator(&root_key, validator_b64) {
        Ok(Some(root_key))
    } else {
        Ok(None)
    }
}

/// Check an already-held root key (e.g. one cached for the session) against
/// the stored validator. Never errors: any failure, including a malformed
/// key encoding, is `false`.
pub fn verify_key(root_key_str: &str, validator_b64: &str) -> bool {
    let Ok(root_key) = root_key_str.parse::<RootKey>() else {
        return false;
    };
    open_validator(&root_key, validator_b64)
}

/// Attempt to open the validator with `root_key` and compare against the
/// sentinel. All failure modes collapse to `false`.
fn open_validator(root_key: &RootKey, validator_b64: &str) -> bool {
    let Ok(payload) = BASE64.decode(validator_b64) else {
        return false;
    };
    if payload.len() < MIN_PAYLOAD_LEN {
        return false;
    }

    let mut eph_pk_bytes = [0u8; EPH_PK_LEN];
    eph_pk_bytes.copy_from_slice(&payload[..EPH_PK_LEN]);
    let eph_pk = PublicKey::from(eph_pk_bytes);
    let nonce = &payload[EPH_PK_LEN..EPH_PK_LEN + NONCE_LEN];
    let ciphertext = &payload[EPH_PK_LEN + NONCE_LEN..];

    let recipient_sk = StaticSecret::from(*root_key.as_bytes());
    let recipient_pk = PublicKey::from(&recipient_sk);
    let shared = recipient_sk.diffie_hellman(&eph_pk);

    let aead_key = derive_aead_key(eph_pk.as_bytes(), recipient_pk.as_bytes(), shared.as_bytes());
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&aead_key));

    match cipher.decrypt(XNonce::from_slice(nonce), ciphertext) {
        Ok(plaintext) => plaintext == SENTINEL,
        Err(_) => false,
    }
}

/// HKDF-SHA256 key schedule binding both public keys into the AEAD key.
fn derive_aead_key(eph_pk: &[u8], recipient_pk: &[u8], shared: &[u8]) -> [u8; 32] {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(eph_pk);
    salt[32..].copy_from_slice(recipient_pk);

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut okm = [0u8; 32];
    hk.expand(HKDF_INFO, &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    okm
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
