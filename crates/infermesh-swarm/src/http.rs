//! HTTP bindings for the directory and registry collaborators.
//!
//! Thin `reqwest` JSON clients implementing [`IndexApi`] and [`UserApi`].
//! The directory is unauthenticated; registry calls carry the caller
//! identity and registry handle as headers.

use async_trait::async_trait;
use reqwest::Client;

use crate::api::{IndexApi, UserApi};
use crate::config::SwarmConfig;
use crate::error::{Result, SwarmError};
use crate::types::{Chat, IndexNode, Job, UserNode};

/// Header carrying the caller's principal identity.
const IDENTITY_HEADER: &str = "x-mesh-identity";

/// Header carrying the registry handle.
const REGISTRY_HEADER: &str = "x-mesh-registry";

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// HTTP client for the global node directory.
#[derive(Clone)]
pub struct HttpIndexApi {
    client: Client,
    base_url: String,
}

impl HttpIndexApi {
    /// Build a directory client from config.
    pub fn new(config: &SwarmConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.index_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl IndexApi for HttpIndexApi {
    async fn list_active_nodes(&self) -> Result<Vec<IndexNode>> {
        let url = format!("{}/v1/nodes/active", self.base_url);
        tracing::debug!(url = %url, "fetching active node directory");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SwarmError::DirectoryFetchFailed {
                reason: format!("directory returned {}", response.status()),
            });
        }
        Ok(response.json().await?)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// HTTP client for the caller-scoped registry.
#[derive(Clone)]
pub struct HttpUserApi {
    client: Client,
    base_url: String,
}

impl HttpUserApi {
    /// Build a registry client from config.
    pub fn new(config: &SwarmConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.user_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        identity: &str,
        registry_id: &str,
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(url = %url, "fetching user registry");

        let response = self
            .client
            .get(&url)
            .header(IDENTITY_HEADER, identity)
            .header(REGISTRY_HEADER, registry_id)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SwarmError::RegistryFetchFailed {
                reason: format!("registry returned {}", response.status()),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl UserApi for HttpUserApi {
    async fn get_nodes(&self, identity: &str, registry_id: &str) -> Result<Vec<UserNode>> {
        self.get_json("/v1/nodes", identity, registry_id).await
    }

    async fn get_chat_jobs(
        &self,
        identity: &str,
        registry_id: &str,
        chat_id: &str,
    ) -> Result<Vec<Job>> {
        self.get_json(&format!("/v1/chats/{chat_id}/jobs"), identity, registry_id)
            .await
    }

    async fn list_chats(
        &self,
        identity: &str,
        registry_id: &str,
        include_archived: bool,
    ) -> Result<Vec<Chat>> {
        self.get_json(
            &format!("/v1/chats?include_archived={include_archived}"),
            identity,
            registry_id,
        )
        .await
    }
}
