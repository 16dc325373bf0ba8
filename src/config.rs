use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use crate::domain::SchemaProfile;
use crate::store::RemoteStoreConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Remote,
}

impl StoreBackend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "remote" | "supabase" | "postgrest" => Ok(Self::Remote),
            _ => Err(anyhow!("USER_STORE must be one of: file, remote")),
        }
    }
}

/// Command line overrides for the environment configuration.
#[derive(Debug, Default, Parser)]
#[command(name = "userdeck")]
#[command(about = "Users REST service backed by a JSON file or a remote table")]
pub struct CliArgs {
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    /// `file` or `remote`
    #[arg(long)]
    pub store: Option<String>,
    #[arg(long)]
    pub users_file: Option<PathBuf>,
    /// `strict` or `legacy`
    #[arg(long)]
    pub schema: Option<String>,
    #[arg(long)]
    pub request_log: Option<PathBuf>,
    /// Directory holding `customers.json` and `countries.json`
    #[arg(long)]
    pub catalog_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    pub users_file: PathBuf,
    pub remote: Option<RemoteStoreConfig>,
    pub schema: SchemaProfile,
    pub request_log: Option<PathBuf>,
    pub catalog_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Environment (and `.env`, if present) with `args` applied on top.
    pub fn load(args: &CliArgs) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())?.with_overrides(args)
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let host = lookup("HOST", "0.0.0.0");

        let port = lookup("PORT", "3000")
            .parse::<u16>()
            .context("PORT must be a valid u16")?;

        let backend = StoreBackend::parse(&lookup("USER_STORE", "file"))?;

        let users_file = PathBuf::from(lookup("USERS_FILE", "users.json"));

        let schema = parse_schema(&lookup("USER_SCHEMA", "strict"))?;

        let base_url = var("REMOTE_STORE_URL").or_else(|| var("SUPABASE_URL"));
        let api_key = var("REMOTE_STORE_KEY").or_else(|| var("SUPABASE_KEY"));
        let timeout_secs = lookup("REMOTE_STORE_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .context("REMOTE_STORE_TIMEOUT_SECS must be a whole number of seconds")?;

        let remote = match (base_url, api_key) {
            (Some(base_url), Some(api_key)) => Some(RemoteStoreConfig {
                base_url,
                api_key,
                table: lookup("REMOTE_STORE_TABLE", "users"),
                timeout: Duration::from_secs(timeout_secs),
            }),
            _ => None,
        };

        let request_log = var("REQUEST_LOG_FILE")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let catalog_dir = var("CATALOG_DIR")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            backend,
            users_file,
            remote,
            schema,
            request_log,
            catalog_dir,
        }
        .checked()
    }

    pub fn with_overrides(mut self, args: &CliArgs) -> Result<Self> {
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(store) = &args.store {
            self.backend = StoreBackend::parse(store)?;
        }
        if let Some(users_file) = &args.users_file {
            self.users_file = users_file.clone();
        }
        if let Some(schema) = &args.schema {
            self.schema = parse_schema(schema)?;
        }
        if let Some(request_log) = &args.request_log {
            self.request_log = Some(request_log.clone());
        }
        if let Some(catalog_dir) = &args.catalog_dir {
            self.catalog_dir = Some(catalog_dir.clone());
        }
        self.checked()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Where the file backend looks for catalog tables: `CATALOG_DIR`, or
    /// the directory of the users file.
    pub fn catalog_dir(&self) -> PathBuf {
        if let Some(dir) = &self.catalog_dir {
            return dir.clone();
        }
        match self.users_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn checked(self) -> Result<Self> {
        if self.backend == StoreBackend::Remote && self.remote.is_none() {
            return Err(anyhow!(
                "remote store requires REMOTE_STORE_URL and REMOTE_STORE_KEY (or SUPABASE_URL and SUPABASE_KEY)"
            ));
        }
        Ok(self)
    }
}

fn parse_schema(raw: &str) -> Result<SchemaProfile> {
    SchemaProfile::parse(raw).ok_or_else(|| anyhow!("USER_SCHEMA must be one of: strict, legacy"))
}
