//! Resolved runtime configuration: command-line options, environment and
//! platform default locations.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::Session;
use crate::cli::GlobalArgs;
use crate::remote::{RemoteDirectory, SnapshotCache};
use crate::store::SqliteStore;

const DB_FILE: &str = "facilities.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub token: Option<String>,
    pub remote: Option<String>,
    pub timeout: Duration,
}

/// Database location under the platform data directory
pub fn default_db_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "lithium-facilities")
        .context("Could not determine data directory")?;
    Ok(proj_dirs.data_dir().join(DB_FILE))
}

impl Config {
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        let db_path = match &args.db {
            Some(path) => path.clone(),
            None => default_db_path()?,
        };
        if args.timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be greater than zero");
        }

        Ok(Self {
            db_path,
            cache_dir: args.cache_dir.clone(),
            token: args.token.clone().filter(|t| !t.trim().is_empty()),
            remote: args.remote.clone().filter(|r| !r.trim().is_empty()),
            timeout: Duration::from_secs(args.timeout_secs),
        })
    }

    pub fn session(&self) -> Session {
        Session::new(self.token.clone())
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.db_path)
    }

    /// Client for the configured remote directory, if any
    pub fn remote_directory(&self) -> Result<Option<RemoteDirectory>> {
        self.remote
            .as_deref()
            .map(|url| Ok(RemoteDirectory::new(url, self.timeout)?.with_token(self.token.clone())))
            .transpose()
    }

    pub fn snapshot_cache(&self) -> Result<SnapshotCache> {
        SnapshotCache::new(self.cache_dir.clone())
    }
}
