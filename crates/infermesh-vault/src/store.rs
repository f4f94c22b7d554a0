//! On-disk vault persistence.
//!
//! The vault file is a small JSON blob holding exactly two secrets-adjacent
//! artifacts: the KDF salt and the sealed validator ciphertext. The root key
//! itself is never written to disk — after a successful unlock it lives only
//! in process memory for the session's lifetime.
//!
//! File layout (JSON):
//!
//! ```json
//! { "version": 1, "salt": "<base64, 16+ raw bytes>", "encrypted_validator": "<base64>" }
//! ```

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::kdf::{self, RootKey};
use crate::validator;

/// Current vault file format version.
const VAULT_VERSION: u32 = 1;

/// Serialized vault record.
#[derive(Debug, Serialize, Deserialize)]
struct VaultFile {
    version: u32,
    /// Base64-encoded KDF salt (16+ raw bytes).
    salt: String,
    /// Base64-encoded sealed validator payload.
    encrypted_validator: String,
}

/// A loaded vault: the salt and sealed validator for one user.
///
/// Created once during onboarding via [`Vault::create`] and re-opened on
/// every subsequent session via [`Vault::open`].
pub struct Vault {
    path: PathBuf,
    salt: Vec<u8>,
    encrypted_validator: String,
}

impl Vault {
    /// Create a brand-new vault at `path` protected by `pin`.
    ///
    /// Generates a fresh random salt, derives the root key, seals the
    /// validator, and persists the record. Returns the vault together with
    /// the unlocked root key so onboarding can proceed without a second
    /// derivation.
    ///
    /// # Errors
    ///
    /// [`VaultError::VaultExists`] if a file is already present at `path`;
    /// derivation and I/O errors propagate.
    pub fn create(path: impl Into<PathBuf>, pin: &str) -> Result<(Self, RootKey)> {
        let path = path.into();
        if path.exists() {
            return Err(VaultError::VaultExists {
                path: path.display().to_string(),
            });
        }

        let salt = kdf::generate_salt()?;
        let root_key = kdf::derive_root_key(pin, &salt)?;
        let encrypted_validator = validator::encrypt_validator(&root_key.encoded())?;

        let record = VaultFile {
            version: VAULT_VERSION,
            salt: BASE64.encode(salt),
            encrypted_validator: encrypted_validator.clone(),
        };
        write_record(&path, &record)?;

        tracing::info!(path = %path.display(), "vault created");

        let vault = Self {
            path,
            salt: salt.to_vec(),
            encrypted_validator,
        };
        Ok((vault, root_key))
    }

    /// Open an existing vault file and validate its shape.
    ///
    /// # Errors
    ///
    /// [`VaultError::VaultNotFound`] if the file is missing,
    /// [`VaultError::MalformedVault`] if the record fails validation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(VaultError::VaultNotFound {
                path: path.display().to_string(),
            });
        }

        let raw = std::fs::read_to_string(&path)?;
        let record: VaultFile = serde_json::from_str(&raw)?;

        if record.version != VAULT_VERSION {
            return Err(VaultError::MalformedVault {
                reason: format!("unsupported vault version {}", record.version),
            });
        }

        let salt = BASE64
            .decode(&record.salt)
            .map_err(|e| VaultError::MalformedVault {
                reason: format!("undecodable salt: {e}"),
            })?;
        if salt.len() < kdf::MIN_SALT_LEN {
            return Err(VaultError::MalformedVault {
                reason: format!(
                    "salt too short: {} bytes, need {}",
                    salt.len(),
                    kdf::MIN_SALT_LEN
                ),
            });
        }

        tracing::debug!(path = %path.display(), "vault opened");

        Ok(Self {
            path,
            salt,
            encrypted_validator: record.encrypted_validator,
        })
    }

    /// Attempt to unlock the vault with `pin`.
    ///
    /// `Ok(Some(root_key))` on the correct PIN, `Ok(None)` on a wrong PIN
    /// (an expected outcome the caller turns into a re-prompt, not a fault).
    pub fn unlock(&self, pin: &str) -> Result<Option<RootKey>> {
        let unlocked = validator::verify_pin(pin, &self.salt, &self.encrypted_validator)?;
        match &unlocked {
            Some(_) => tracing::info!(path = %self.path.display(), "vault unlocked"),
            None => tracing::warn!(path = %self.path.display(), "vault unlock rejected"),
        }
        Ok(unlocked)
    }

    /// Check that a cached session key is still consistent with this vault.
    ///
    /// Never errors; `false` on any mismatch or malformed encoding.
    pub fn verify_session_key(&self, root_key_str: &str) -> bool {
        validator::verify_key(root_key_str, &self.encrypted_validator)
    }

    /// The KDF salt stored in this vault.
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// The sealed validator ciphertext (base64).
    pub fn encrypted_validator(&self) -> &str {
        &self.encrypted_validator
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Persist a vault record, restricting permissions to the owner on unix.
fn write_record(path: &Path, record: &VaultFile) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
