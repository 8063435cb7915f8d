//! Seeding the local store from files and from the remote directory.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::geojson::{record_from_value, records_from_collection};
use crate::model::FacilityRecord;
use crate::remote::{RemoteDirectory, SnapshotCache};
use crate::store::{FacilityStore, ImportMode, ImportStats, SqliteStore};
use crate::ui::{Phase, Ui};

/// Parse facility records from `text`.
///
/// Accepts a GeoJSON FeatureCollection, a JSON array, or JSON Lines with one
/// feature or plain record per line.
pub fn parse_records(text: &str) -> Result<Vec<FacilityRecord>> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(records_from_collection(value)?);
    }

    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse record on line {}", line_no + 1))?;
        match record_from_value(value) {
            Ok(record) => records.push(record),
            Err(e) => warn!(line = line_no + 1, error = %e, "skipping malformed facility line"),
        }
    }
    Ok(records)
}

pub fn read_records(path: &Path) -> Result<Vec<FacilityRecord>> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to open: {:?}", path))?;
    parse_records(&text).with_context(|| format!("Failed to read facilities from {:?}", path))
}

fn progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template("{msg:20} [{bar:40.cyan/blue}] {pos}/{len}") {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_message(message.to_string());
    pb
}

/// Load a file into the store with a progress bar on stderr
pub fn import_file(store: &mut SqliteStore, path: &Path, mode: ImportMode) -> Result<ImportStats> {
    let records = read_records(path)?;
    let pb = progress_bar(records.len() as u64, "facilities");
    let stats = store
        .import_records(records, mode, &pb)
        .context("Failed to import facilities")?;
    Ok(stats)
}

/// Replace the local store with the remote listing and refresh the snapshot.
pub fn sync_from_remote(
    remote: &RemoteDirectory,
    store: &mut SqliteStore,
    cache: Option<&SnapshotCache>,
    ui: &mut impl Ui,
) -> Result<ImportStats> {
    ui.set_phase(Phase::Fetching);
    ui.set_info(remote.base_url().to_string());
    let records = remote
        .list_facilities()
        .context("Failed to fetch remote directory")?;
    ui.log(format!("Fetched {} facilities", records.len()));

    if let Some(cache) = cache {
        cache.save(&records)?;
        ui.log(format!("Snapshot saved to {:?}", cache.snapshot_path()));
    }

    ui.set_phase(Phase::Importing);
    let total = records.len() as u64;
    ui.set_progress(0, total, "facilities");
    let stats = store
        .import_records(records, ImportMode::Replace, &ProgressBar::hidden())
        .context("Failed to import facilities")?;
    ui.set_progress(total, total, "facilities");
    ui.clear_progress();

    ui.set_phase(Phase::Complete);
    ui.log(format!("Imported {} facilities ({} skipped)", stats.imported, stats.skipped));
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_feature_collection() {
        let records = parse_records(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"id":"a","name":"A","status":"Operating"},
                 "geometry":{"type":"Point","coordinates":[-84.4,33.7]}},
                {"type":"Feature","properties":{"id":"b","name":"B","status":"Pilot"},
                 "geometry":{"type":"Point","coordinates":[-84.4,33.7,120.0]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status.as_deref(), Some("Operating"));
        assert_eq!(records[1].geometry, records[0].geometry);
    }

    #[test]
    fn test_parse_jsonl_mixed_shapes() {
        let text = concat!(
            r#"{"properties":{"id":"a","name":"A"},"geometry":{"type":"Point","coordinates":[1,2]}}"#,
            "\n\n",
            r#"{"id":"b","name":"B","geometry":{"lon":3,"lat":4}}"#,
            "\n",
        );
        let records = parse_records(text).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(records[1].geometry.map(|g| g.lat), Some(4.0));
    }

    #[test]
    fn test_parse_jsonl_reports_line() {
        let err = parse_records("{\"id\":\"a\"}\n{broken\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_import_file_into_store() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id":"a","name":"A","status":"Operating"}}"#).unwrap();
        writeln!(file, r#"{{"name":"Ascend Elements Covington","status":"Planned","yearStarted":2026}}"#).unwrap();
        writeln!(file, r#"{{"id":"c","name":"No status"}}"#).unwrap();

        let mut store = SqliteStore::open_in_memory().unwrap();
        let stats = import_file(&mut store, file.path(), ImportMode::Replace).unwrap();
        assert_eq!(stats, ImportStats { imported: 2, skipped: 1 });

        let planned = store.get_facility("ascend-elements-covington").unwrap();
        assert_eq!(planned.year_planned.as_deref(), Some("2026"));
        assert_eq!(planned.year_started, None);
    }
}
