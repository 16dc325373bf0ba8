//! User store adapters.
//!
//! `UserStore` is the one capability route handlers talk to. Two backends
//! implement it:
//! - **`FileUserStore`**: the whole collection lives in memory and is
//!   rewritten to a JSON file after every mutation.
//! - **`RemoteUserStore`**: rows live in a remote PostgREST table and are
//!   queried live.
//!
//! Both validate a candidate before touching storage, then run the same
//! admission step (`prepare_insert`): reject a duplicate email, assign the
//! next id.
//!
//! `CatalogStore` serves the read-only reference tables (customers,
//! countries) next to the users.

pub mod catalog;
pub mod file;
pub mod remote;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{UserCandidate, UserRecord, ValidationError};

pub use catalog::{Catalog, CatalogRow, CatalogStore, FileCatalog};
pub use file::FileUserStore;
pub use remote::{RemoteCatalog, RemoteStoreConfig, RemoteUserStore};

pub type StoreResult<T> = Result<T, StoreError>;

pub const EMAIL_CONFLICT_MESSAGE: &str = "email already exists";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("user {0} not found")]
    NotFound(u64),

    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users in insertion order.
    async fn list_users(&self) -> StoreResult<Vec<UserRecord>>;

    /// `Ok(None)` when no user has this id.
    async fn get_user(&self, id: u64) -> StoreResult<Option<UserRecord>>;

    async fn create_user(&self, candidate: UserCandidate) -> StoreResult<UserRecord>;

    /// Returns the removed record.
    async fn delete_user(&self, id: u64) -> StoreResult<UserRecord>;

    /// Pushes the current state to durable storage.
    async fn flush(&self) -> StoreResult<()>;
}

/// Next identifier given the current collection size and the largest id
/// the store has seen.
pub fn next_id(count: usize, high_water: u64) -> u64 {
    (count as u64).max(high_water) + 1
}

/// Admits an already validated candidate into `existing`.
pub(crate) fn prepare_insert(
    existing: &[UserRecord],
    high_water: u64,
    candidate: UserCandidate,
) -> StoreResult<UserRecord> {
    let email = candidate.email.as_deref().unwrap_or_default();
    if existing.iter().any(|user| user.has_email(email)) {
        return Err(StoreError::Conflict(EMAIL_CONFLICT_MESSAGE.to_string()));
    }

    let id = next_id(existing.len(), high_water);
    Ok(UserRecord::from_candidate(id, candidate))
}
