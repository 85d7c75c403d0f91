//! Family backend
//!
//! [`FamilyBackend`] is the remote half of family sharing: one-shot calls that
//! each independently succeed or fail. [`HttpBackend`] implements it against
//! the REST API served by `remedy-sync-server`:
//!
//! ```text
//! POST   /api/family
//! POST   /api/family/{family_id}/join
//! DELETE /api/family/{family_id}/members/{member_id}
//! GET    /api/family/{family_id}/medicines
//! POST   /api/family/{family_id}/medicines
//! PUT    /api/family/{family_id}/medicines/{id}
//! DELETE /api/family/{family_id}/medicines/{id}
//! ```
//!
//! No call is retried.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::entry::{EntryId, EntryPatch, InventoryEntry, NewEntry};
use crate::error::{Error, Result};
use crate::family::{
    CreateFamilyRequest, DeleteMedicineRequest, FamilyMembership, JoinFamilyRequest,
    MedicineRequest, MedicineUpdateRequest,
};

/// Remote operations on a shared family inventory
#[async_trait]
pub trait FamilyBackend: Send + Sync {
    /// Whether cloud credentials are present
    fn is_configured(&self) -> bool;

    /// Create a new family with the caller as its first member
    async fn create_family(&self, family_name: &str, member_name: &str)
        -> Result<FamilyMembership>;

    /// Join an existing family
    async fn join_family(&self, family_id: &str, member_name: &str) -> Result<FamilyMembership>;

    /// Remove a member from a family
    async fn leave_family(&self, family_id: &str, member_id: &str) -> Result<()>;

    /// Fetch the full family inventory
    async fn list_medicines(&self, family_id: &str) -> Result<Vec<InventoryEntry>>;

    /// Create an entry; the backend assigns its id
    async fn add_medicine(
        &self,
        family_id: &str,
        entry: &NewEntry,
        updated_by: &str,
    ) -> Result<InventoryEntry>;

    /// Update an entry
    async fn update_medicine(
        &self,
        family_id: &str,
        id: EntryId,
        patch: &EntryPatch,
        updated_by: &str,
    ) -> Result<InventoryEntry>;

    /// Delete an entry
    async fn delete_medicine(&self, family_id: &str, id: EntryId, updated_by: &str) -> Result<()>;
}

/// [`FamilyBackend`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    /// Base URL without trailing slash; `None` when not configured
    base_url: Option<String>,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Self {
            base_url: (!base_url.is_empty()).then_some(base_url),
            client: reqwest::Client::new(),
        }
    }

    /// A backend with no server; every call fails with [`Error::Config`]
    pub fn unconfigured() -> Self {
        Self {
            base_url: None,
            client: reqwest::Client::new(),
        }
    }

    /// Create a backend from config
    pub fn from_config(config: &Config) -> Self {
        match &config.server_url {
            Some(url) if config.is_cloud_configured() => Self::new(url.clone()),
            _ => Self::unconfigured(),
        }
    }

    fn url(&self, path: &str) -> Result<String> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| Error::config("family server URL is not set"))?;
        Ok(format!("{base}{path}"))
    }

    /// Send a request and fail on transport errors or non-success statuses
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::remote(format!("failed to reach family server: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::remote(format!("server returned {status}: {text}")));
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| Error::remote(format!("invalid response from server: {e}")))
    }
}

#[async_trait]
impl FamilyBackend for HttpBackend {
    fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    async fn create_family(
        &self,
        family_name: &str,
        member_name: &str,
    ) -> Result<FamilyMembership> {
        let url = self.url("/api/family")?;
        debug!(%url, family_name, "Creating family");
        let body = CreateFamilyRequest {
            family_name: family_name.to_string(),
            member_name: member_name.to_string(),
        };
        self.send_json(self.client.post(&url).json(&body)).await
    }

    async fn join_family(&self, family_id: &str, member_name: &str) -> Result<FamilyMembership> {
        let url = self.url(&format!("/api/family/{family_id}/join"))?;
        debug!(%url, "Joining family");
        let body = JoinFamilyRequest {
            member_name: member_name.to_string(),
        };
        self.send_json(self.client.post(&url).json(&body)).await
    }

    async fn leave_family(&self, family_id: &str, member_id: &str) -> Result<()> {
        let url = self.url(&format!("/api/family/{family_id}/members/{member_id}"))?;
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }

    async fn list_medicines(&self, family_id: &str) -> Result<Vec<InventoryEntry>> {
        let url = self.url(&format!("/api/family/{family_id}/medicines"))?;
        self.send_json(self.client.get(&url)).await
    }

    async fn add_medicine(
        &self,
        family_id: &str,
        entry: &NewEntry,
        updated_by: &str,
    ) -> Result<InventoryEntry> {
        let url = self.url(&format!("/api/family/{family_id}/medicines"))?;
        let body = MedicineRequest {
            entry: entry.clone(),
            updated_by: updated_by.to_string(),
        };
        self.send_json(self.client.post(&url).json(&body)).await
    }

    async fn update_medicine(
        &self,
        family_id: &str,
        id: EntryId,
        patch: &EntryPatch,
        updated_by: &str,
    ) -> Result<InventoryEntry> {
        let url = self.url(&format!("/api/family/{family_id}/medicines/{id}"))?;
        let body = MedicineUpdateRequest {
            patch: patch.clone(),
            updated_by: updated_by.to_string(),
        };
        self.send_json(self.client.put(&url).json(&body)).await
    }

    async fn delete_medicine(&self, family_id: &str, id: EntryId, updated_by: &str) -> Result<()> {
        let url = self.url(&format!("/api/family/{family_id}/medicines/{id}"))?;
        let body = DeleteMedicineRequest {
            updated_by: updated_by.to_string(),
        };
        self.send(self.client.delete(&url).json(&body)).await?;
        Ok(())
    }
}
