use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::{StoreError, StoreResult, UserStore, prepare_insert};
use crate::domain::{SchemaProfile, UserCandidate, UserRecord, validate};

/// Users held in memory and mirrored to a JSON file.
///
/// The file holds one JSON array in insertion order and is rewritten whole
/// after every create and delete. Candidates are validated before the
/// write lock is taken; the lock is then held across the email check, id
/// assignment and persist, so concurrent writers are serialized.
pub struct FileUserStore {
    path: PathBuf,
    profile: SchemaProfile,
    state: RwLock<Collection>,
}

struct Collection {
    users: Vec<UserRecord>,
    high_water: u64,
}

impl FileUserStore {
    /// Loads the collection from `path`. A missing file is an empty
    /// collection; an unreadable or malformed one is an error.
    pub async fn open(path: impl AsRef<Path>, profile: SchemaProfile) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let users = load(&path).await?;
        let high_water = users.iter().map(|user| user.id).max().unwrap_or(0);

        info!(path = %path.display(), users = users.len(), "users file loaded");

        Ok(Self {
            path,
            profile,
            state: RwLock::new(Collection { users, high_water }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        Ok(self.state.read().await.users.clone())
    }

    async fn get_user(&self, id: u64) -> StoreResult<Option<UserRecord>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn create_user(&self, candidate: UserCandidate) -> StoreResult<UserRecord> {
        validate(&candidate, self.profile)?;

        let mut state = self.state.write().await;
        let created = prepare_insert(&state.users, state.high_water, candidate)?;

        state.users.push(created.clone());
        if let Err(err) = save(&self.path, &state.users).await {
            state.users.pop();
            error!(error = %err, id = created.id, "failed to persist new user, rolled back");
            return Err(err);
        }
        state.high_water = state.high_water.max(created.id);

        debug!(id = created.id, "user created");
        Ok(created)
    }

    async fn delete_user(&self, id: u64) -> StoreResult<UserRecord> {
        let mut state = self.state.write().await;
        let Some(index) = state.users.iter().position(|user| user.id == id) else {
            return Err(StoreError::NotFound(id));
        };

        let removed = state.users.remove(index);
        if let Err(err) = save(&self.path, &state.users).await {
            state.users.insert(index, removed);
            error!(error = %err, id, "failed to persist user removal, rolled back");
            return Err(err);
        }

        debug!(id, "user deleted");
        Ok(removed)
    }

    async fn flush(&self) -> StoreResult<()> {
        let state = self.state.read().await;
        save(&self.path, &state.users).await?;
        info!(path = %self.path.display(), users = state.users.len(), "users file flushed");
        Ok(())
    }
}

async fn load(path: &Path) -> StoreResult<Vec<UserRecord>> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(StoreError::storage(format!(
                "Failed to read {}: {}",
                path.display(),
                err
            )));
        }
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let users: Vec<UserRecord> = serde_json::from_slice(&data).map_err(|e| {
        StoreError::storage(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    let mut ids = HashSet::with_capacity(users.len());
    let mut emails = HashSet::with_capacity(users.len());
    for user in &users {
        if !ids.insert(user.id) {
            return Err(StoreError::storage(format!(
                "Duplicate user id {} in {}",
                user.id,
                path.display()
            )));
        }
        if !emails.insert(user.email.trim().to_lowercase()) {
            return Err(StoreError::storage(format!(
                "Duplicate email {} in {}",
                user.email,
                path.display()
            )));
        }
    }

    Ok(users)
}

async fn save(path: &Path, users: &[UserRecord]) -> StoreResult<()> {
    let serialized = serde_json::to_vec_pretty(users)
        .map_err(|e| StoreError::storage(format!("Failed to serialize users: {}", e)))?;
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || write_replace(&path, &serialized))
        .await
        .map_err(|e| StoreError::storage(format!("Users file writer panicked: {}", e)))?
}

/// Writes to a temp file next to `path`, syncs it, then renames it over
/// `path`. Readers never see a partial document.
fn write_replace(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .map_err(|e| StoreError::storage(format!("Failed to create users directory: {}", e)))?;

    let mut temp = NamedTempFile::new_in(&dir)
        .map_err(|e| StoreError::storage(format!("Failed to create temp file: {}", e)))?;
    temp.write_all(bytes)
        .map_err(|e| StoreError::storage(format!("Failed to write users file: {}", e)))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| StoreError::storage(format!("Failed to sync users file: {}", e)))?;
    temp.persist(path)
        .map_err(|e| StoreError::storage(format!("Failed to replace users file: {}", e.error)))?;
    Ok(())
}
