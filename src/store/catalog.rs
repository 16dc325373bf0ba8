use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{StoreError, StoreResult};

/// One row of a catalog table, passed through untouched.
pub type CatalogRow = Map<String, Value>;

/// Read-only reference tables served next to the users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Customers,
    Countries,
}

impl Catalog {
    pub fn table(self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Countries => "countries",
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_rows(&self, catalog: Catalog) -> StoreResult<Vec<CatalogRow>>;
}

/// Catalog tables kept as `<table>.json` arrays in one directory.
///
/// Files are read on every call, so edits show up without a restart.
pub struct FileCatalog {
    dir: PathBuf,
}

impl FileCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(&self, catalog: Catalog) -> PathBuf {
        self.dir.join(format!("{}.json", catalog.table()))
    }
}

#[async_trait]
impl CatalogStore for FileCatalog {
    async fn list_rows(&self, catalog: Catalog) -> StoreResult<Vec<CatalogRow>> {
        read_rows(&self.path_of(catalog)).await
    }
}

async fn read_rows(path: &Path) -> StoreResult<Vec<CatalogRow>> {
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

    serde_json::from_slice(&data)
        .map_err(|e| StoreError::storage(format!("Failed to parse {}: {}", path.display(), e)))
}
