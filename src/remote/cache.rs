use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use crate::geojson::{records_from_collection, to_feature_collection};
use crate::model::FacilityRecord;

const SNAPSHOT_FILE: &str = "facilities.geojson";

/// Last successful directory listing, kept on disk for offline use
pub struct SnapshotCache {
    cache_dir: PathBuf,
}

impl SnapshotCache {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let cache_dir = match custom_dir {
            Some(dir) => dir,
            None => {
                let proj_dirs = ProjectDirs::from("", "", "lithium-facilities")
                    .context("Could not determine cache directory")?;
                proj_dirs.cache_dir().to_path_buf()
            }
        };

        fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;

        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.cache_dir.join(SNAPSHOT_FILE)
    }

    pub fn is_cached(&self) -> bool {
        self.snapshot_path().is_file()
    }

    /// When the snapshot was last written
    pub fn saved_at(&self) -> Option<SystemTime> {
        fs::metadata(self.snapshot_path()).ok()?.modified().ok()
    }

    /// Replace the snapshot. Writes to a temp file first so a crash never
    /// leaves a truncated listing behind.
    pub fn save(&self, records: &[FacilityRecord]) -> Result<()> {
        let collection = to_feature_collection(records)?;
        let tmp = self.cache_dir.join(format!("{}.tmp", SNAPSHOT_FILE));

        fs::write(&tmp, serde_json::to_vec(&collection)?)
            .with_context(|| format!("Failed to write snapshot: {:?}", tmp))?;
        fs::rename(&tmp, self.snapshot_path()).context("Failed to replace snapshot")?;

        debug!(count = records.len(), path = ?self.snapshot_path(), "saved directory snapshot");
        Ok(())
    }

    /// Read the snapshot, `None` if nothing was saved yet.
    pub fn load(&self) -> Result<Option<Vec<FacilityRecord>>> {
        let path = self.snapshot_path();
        if !path.is_file() {
            return Ok(None);
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read snapshot: {:?}", path))?;
        let value: Value = serde_json::from_str(&text).context("Failed to parse snapshot")?;
        Ok(Some(records_from_collection(value)?))
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.snapshot_path();
        if path.exists() {
            fs::remove_file(&path).context("Failed to remove snapshot")?;
        }
        Ok(())
    }
}
