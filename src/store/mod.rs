//! Persistence boundary for facility records.

pub mod row;
pub mod schema_gen;
pub mod sqlite;

pub use sqlite::{ImportMode, ImportStats, SqliteStore};

use serde_json::Value;

use crate::error::FacilityResult;
use crate::model::{Document, FacilityRecord};

/// Bulk read plus the write operations the edit forms need.
///
/// Implementations apply [`crate::edit`] rules so every backend enforces the
/// same validation and year handling. Auth is checked by the caller.
pub trait FacilityStore {
    fn list_facilities(&self) -> FacilityResult<Vec<FacilityRecord>>;

    fn get_facility(&self, id: &str) -> FacilityResult<FacilityRecord>;

    /// Insert a new record. A blank id is derived from the name.
    fn create_facility(&mut self, record: FacilityRecord) -> FacilityResult<FacilityRecord>;

    /// Partial update; see [`crate::edit::apply_patch`].
    fn update_facility(&mut self, id: &str, patch: &Value) -> FacilityResult<FacilityRecord>;

    fn delete_facility(&mut self, id: &str) -> FacilityResult<()>;

    /// Append a document and return it as stored.
    fn add_document(&mut self, id: &str, document: Document) -> FacilityResult<Document>;

    fn remove_document(&mut self, id: &str, document_id: &str) -> FacilityResult<()>;
}
