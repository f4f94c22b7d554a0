//! Swarm configuration.
//!
//! Endpoints for the two collaborator services plus the default blacklist
//! TTL, loadable from TOML with sensible defaults for local development.

use chrono::Duration;
use serde::Deserialize;

use crate::error::{Result, SwarmError};

/// Default blacklist TTL in seconds applied when a caller reports a node
/// failure without choosing its own duration.
const DEFAULT_BLACKLIST_TTL_SECS: i64 = 60;

/// Configuration for the swarm subsystem.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Base URL of the global node directory.
    pub index_url: String,
    /// Base URL of the caller-scoped registry.
    pub user_url: String,
    /// Seconds a failed node stays blacklisted.
    pub blacklist_ttl_secs: i64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            index_url: "http://localhost:8800".into(),
            user_url: "http://localhost:8801".into(),
            blacklist_ttl_secs: DEFAULT_BLACKLIST_TTL_SECS,
        }
    }
}

impl SwarmConfig {
    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| SwarmError::Config {
            reason: e.to_string(),
        })
    }

    /// The blacklist TTL as a [`chrono::Duration`].
    pub fn blacklist_ttl(&self) -> Duration {
        Duration::seconds(self.blacklist_ttl_secs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let config = SwarmConfig::from_toml_str("index_url = \"https://dir.mesh\"").unwrap();
        assert_eq!(config.index_url, "https://dir.mesh");
        assert_eq!(config.blacklist_ttl_secs, DEFAULT_BLACKLIST_TTL_SECS);
    }

    #[test]
    fn full_document_parses() {
        let raw = r#"
            index_url = "https://dir.mesh"
            user_url = "https://registry.mesh"
            blacklist_ttl_secs = 300
        "#;
        let config = SwarmConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.user_url, "https://registry.mesh");
        assert_eq!(config.blacklist_ttl(), Duration::seconds(300));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let result = SwarmConfig::from_toml_str("index_url = ");
        assert!(matches!(result, Err(SwarmError::Config { .. })));
    }
}
