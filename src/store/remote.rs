use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::catalog::{Catalog, CatalogRow, CatalogStore};
use super::{StoreError, StoreResult, UserStore, prepare_insert};
use crate::domain::{SchemaProfile, UserCandidate, UserRecord, validate};

const PREFER_REPRESENTATION: (&str, &str) = ("Prefer", "return=representation");

#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub timeout: Duration,
}

/// Users kept in a remote PostgREST table.
///
/// Reads go straight to the table. Creates and deletes run their
/// read-then-write sequence under one in-process lock, which also holds the
/// highest id this process has seen.
pub struct RemoteUserStore {
    client: Client,
    endpoint: String,
    api_key: String,
    profile: SchemaProfile,
    writer: Mutex<u64>,
}

impl RemoteUserStore {
    pub fn new(config: RemoteStoreConfig, profile: SchemaProfile) -> StoreResult<Self> {
        Ok(Self {
            client: build_client(&config)?,
            endpoint: table_endpoint(&config.base_url, &config.table),
            api_key: config.api_key,
            profile,
            writer: Mutex::new(0),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch_all(&self) -> StoreResult<Vec<UserRecord>> {
        let response = self
            .request(Method::GET)
            .query(&[("select", "*"), ("order", "id.asc")])
            .send()
            .await
            .map_err(|e| transport_error("list users", e))?;

        decode(ensure_success(response, "list users").await?, "list users").await
    }

    async fn fetch_one(&self, id: u64) -> StoreResult<Option<UserRecord>> {
        let response = self
            .request(Method::GET)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))])
            .send()
            .await
            .map_err(|e| transport_error("fetch user", e))?;

        let rows: Vec<UserRecord> =
            decode(ensure_success(response, "fetch user").await?, "fetch user").await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl UserStore for RemoteUserStore {
    async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        self.fetch_all().await
    }

    async fn get_user(&self, id: u64) -> StoreResult<Option<UserRecord>> {
        self.fetch_one(id).await
    }

    async fn create_user(&self, candidate: UserCandidate) -> StoreResult<UserRecord> {
        validate(&candidate, self.profile)?;

        let mut high_water = self.writer.lock().await;

        let users = self.fetch_all().await?;
        let max_id = users.iter().map(|user| user.id).max().unwrap_or(0);
        *high_water = (*high_water).max(max_id);

        let created = prepare_insert(&users, *high_water, candidate)?;

        let response = self
            .request(Method::POST)
            .header(PREFER_REPRESENTATION.0, PREFER_REPRESENTATION.1)
            .json(&created)
            .send()
            .await
            .map_err(|e| transport_error("insert user", e))?;
        let rows: Vec<UserRecord> =
            decode(ensure_success(response, "insert user").await?, "insert user").await?;

        *high_water = created.id;
        debug!(id = created.id, "user inserted into remote table");

        Ok(rows.into_iter().next().unwrap_or(created))
    }

    async fn delete_user(&self, id: u64) -> StoreResult<UserRecord> {
        let mut high_water = self.writer.lock().await;

        let Some(existing) = self.fetch_one(id).await? else {
            return Err(StoreError::NotFound(id));
        };

        let response = self
            .request(Method::DELETE)
            .header(PREFER_REPRESENTATION.0, PREFER_REPRESENTATION.1)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await
            .map_err(|e| transport_error("delete user", e))?;
        let rows: Vec<UserRecord> =
            decode(ensure_success(response, "delete user").await?, "delete user").await?;

        // Someone else removed it between our read and delete.
        if rows.is_empty() {
            return Err(StoreError::NotFound(id));
        }

        *high_water = (*high_water).max(id);
        debug!(id, "user deleted from remote table");

        Ok(existing)
    }

    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Read-only catalog tables on the same PostgREST project as the users.
pub struct RemoteCatalog {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RemoteCatalog {
    pub fn new(config: &RemoteStoreConfig) -> StoreResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self, catalog: Catalog) -> String {
        table_endpoint(&self.base_url, catalog.table())
    }
}

#[async_trait]
impl CatalogStore for RemoteCatalog {
    async fn list_rows(&self, catalog: Catalog) -> StoreResult<Vec<CatalogRow>> {
        let action = format!("list {catalog}");
        let response = self
            .client
            .get(self.endpoint(catalog))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "*")])
            .send()
            .await
            .map_err(|e| transport_error(&action, e))?;

        decode(ensure_success(response, &action).await?, &action).await
    }
}

fn build_client(config: &RemoteStoreConfig) -> StoreResult<Client> {
    Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| StoreError::storage(format!("Failed to build HTTP client: {}", e)))
}

fn table_endpoint(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table)
}

fn transport_error(action: &str, err: reqwest::Error) -> StoreError {
    error!(error = %err, action, "remote store request failed");
    StoreError::storage(format!("Failed to {}: {}", action, err))
}

async fn ensure_success(response: Response, action: &str) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!(%status, body = %body, action, "remote store rejected request");
    Err(StoreError::storage(format!(
        "Failed to {}: remote store answered {}",
        action, status
    )))
}

async fn decode<T: DeserializeOwned>(response: Response, action: &str) -> StoreResult<Vec<T>> {
    response
        .json::<Vec<T>>()
        .await
        .map_err(|e| StoreError::storage(format!("Failed to decode {} response: {}", action, e)))
}
