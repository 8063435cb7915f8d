use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rusqlite::{Connection, ErrorCode, ToSql};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::row::{decode_row, encode_row, select_columns, ParsedRow, SqlValue};
use super::schema_gen::{generate_create_table, generate_indexes};
use super::FacilityStore;
use crate::edit::{apply_patch, prepare_new};
use crate::error::{FacilityError, FacilityResult};
use crate::model::{Document, FacilityRecord};
use crate::schema::{TableSchema, ALL_TABLES, DOCUMENTS, FACILITIES, TIMELINE_EVENTS};

/// How an import treats records already in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Drop every stored facility first
    Replace,
    /// Overwrite records with matching ids, keep the rest
    Merge,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub imported: u64,
    pub skipped: u64,
}

/// Facility store backed by a local SQLite database
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and create missing tables.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        Self::init(conn)
    }

    /// In-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;

        for schema in ALL_TABLES {
            conn.execute(&generate_create_table(schema), [])
                .with_context(|| format!("Failed to create table: {}", schema.name))?;

            for index_sql in generate_indexes(schema) {
                conn.execute(&index_sql, [])
                    .with_context(|| format!("Failed to create index for: {}", schema.name))?;
            }
        }

        Ok(Self { conn })
    }

    pub fn count(&self) -> FacilityResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM facilities", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Bulk load records in one transaction.
    ///
    /// Records failing validation or violating a constraint (such as a
    /// repeated document id) are skipped and logged. A record whose id is
    /// already stored overwrites it in place.
    pub fn import_records(
        &mut self,
        records: Vec<FacilityRecord>,
        mode: ImportMode,
        progress: &ProgressBar,
    ) -> FacilityResult<ImportStats> {
        let mut tx = self.conn.transaction()?;
        if mode == ImportMode::Replace {
            let removed = tx.execute("DELETE FROM facilities", [])?;
            debug!(removed, "cleared facilities before import");
        }

        let mut stats = ImportStats::default();
        for record in records {
            let source_id = record.id.clone();
            let outcome = prepare_new(record).and_then(|record| {
                // Each record gets its own savepoint so a rejected one leaves
                // no partial rows behind.
                let sp = tx.savepoint()?;
                if exists(&sp, &record.id)? {
                    replace_record(&sp, &record)?;
                } else {
                    insert_record(&sp, &record)?;
                }
                sp.commit()?;
                Ok(())
            });

            match outcome {
                Ok(()) => stats.imported += 1,
                Err(e @ FacilityError::Validation(_)) => {
                    warn!(id = %source_id, error = %e, "skipping invalid facility");
                    stats.skipped += 1;
                }
                Err(FacilityError::Storage(err)) if is_constraint(&err) => {
                    warn!(id = %source_id, error = %err, "skipping conflicting facility");
                    stats.skipped += 1;
                }
                Err(e) => return Err(e),
            }
            progress.inc(1);
        }

        tx.commit()?;
        progress.finish_with_message(format!("facilities: {} records", stats.imported));
        info!(imported = stats.imported, skipped = stats.skipped, "import complete");

        Ok(stats)
    }

    /// Run `change` against the stored record and write the result back
    /// atomically. Nothing is written if `change` fails.
    fn modify<T>(
        &mut self,
        id: &str,
        change: impl FnOnce(FacilityRecord) -> FacilityResult<(FacilityRecord, T)>,
    ) -> FacilityResult<T> {
        let tx = self.conn.transaction()?;
        let current = load_records(&tx, Some(id))?
            .into_iter()
            .next()
            .ok_or_else(|| FacilityError::NotFound(id.to_string()))?;

        let (updated, output) = change(current)?;
        replace_record(&tx, &updated)?;
        tx.commit()?;

        Ok(output)
    }
}

impl FacilityStore for SqliteStore {
    fn list_facilities(&self) -> FacilityResult<Vec<FacilityRecord>> {
        load_records(&self.conn, None)
    }

    fn get_facility(&self, id: &str) -> FacilityResult<FacilityRecord> {
        load_records(&self.conn, Some(id))?
            .into_iter()
            .next()
            .ok_or_else(|| FacilityError::NotFound(id.to_string()))
    }

    fn create_facility(&mut self, record: FacilityRecord) -> FacilityResult<FacilityRecord> {
        let record = prepare_new(record)?;

        let tx = self.conn.transaction()?;
        if exists(&tx, &record.id)? {
            return Err(FacilityError::Conflict(record.id));
        }
        insert_record(&tx, &record).map_err(|e| match e {
            FacilityError::Storage(err) if is_constraint(&err) => {
                FacilityError::Conflict(record.id.clone())
            }
            other => other,
        })?;
        tx.commit()?;

        info!(id = %record.id, "created facility");
        Ok(record)
    }

    fn update_facility(&mut self, id: &str, patch: &Value) -> FacilityResult<FacilityRecord> {
        let updated = self.modify(id, |current| {
            let updated = apply_patch(&current, patch)?;
            Ok((updated.clone(), updated))
        })?;

        info!(id, "updated facility");
        Ok(updated)
    }

    fn delete_facility(&mut self, id: &str) -> FacilityResult<()> {
        if delete_row(&self.conn, id)? == 0 {
            return Err(FacilityError::NotFound(id.to_string()));
        }
        info!(id, "deleted facility");
        Ok(())
    }

    fn add_document(&mut self, id: &str, document: Document) -> FacilityResult<Document> {
        self.modify(id, |mut record| {
            if record.document(&document.id).is_some() {
                return Err(FacilityError::Conflict(document.id));
            }
            record.documents.push(document.clone());
            Ok((record, document))
        })
    }

    fn remove_document(&mut self, id: &str, document_id: &str) -> FacilityResult<()> {
        self.modify(id, |mut record| {
            let pos = record
                .documents
                .iter()
                .position(|doc| doc.id == document_id)
                .ok_or_else(|| FacilityError::DocumentNotFound {
                    facility_id: id.to_string(),
                    document_id: document_id.to_string(),
                })?;
            record.documents.remove(pos);
            Ok((record, ()))
        })
    }
}

fn is_constraint(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn exists(conn: &Connection, id: &str) -> FacilityResult<bool> {
    let found: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM facilities WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(found != 0)
}

/// Delete the facility row; child rows cascade
fn delete_row(conn: &Connection, id: &str) -> FacilityResult<usize> {
    Ok(conn.execute("DELETE FROM facilities WHERE id = ?1", [id])?)
}

fn insert_record(conn: &Connection, record: &FacilityRecord) -> FacilityResult<()> {
    let json = serde_json::to_value(record)?;
    insert_rows(conn, &FACILITIES, &[encode_row(&json, &FACILITIES)])?;
    insert_children(conn, record)
}

/// Overwrite a stored record, keeping its row so list order is stable
fn replace_record(conn: &Connection, record: &FacilityRecord) -> FacilityResult<()> {
    let json = serde_json::to_value(record)?;
    update_row(conn, &FACILITIES, &encode_row(&json, &FACILITIES), &record.id)?;

    for schema in [&TIMELINE_EVENTS, &DOCUMENTS] {
        let sql = format!("DELETE FROM {} WHERE facility_id = ?1", schema.name);
        conn.execute(&sql, [&record.id])?;
    }
    insert_children(conn, record)
}

fn insert_children(conn: &Connection, record: &FacilityRecord) -> FacilityResult<()> {
    let mut events = Vec::with_capacity(record.timeline.len());
    for (pos, event) in record.timeline.iter().enumerate() {
        let mut row = encode_row(&serde_json::to_value(event)?, &TIMELINE_EVENTS);
        link(&mut row, &record.id, pos);
        events.push(row);
    }
    insert_rows(conn, &TIMELINE_EVENTS, &events)?;

    let mut documents = Vec::with_capacity(record.documents.len());
    for (pos, document) in record.documents.iter().enumerate() {
        let mut row = encode_row(&serde_json::to_value(document)?, &DOCUMENTS);
        link(&mut row, &record.id, pos);
        documents.push(row);
    }
    insert_rows(conn, &DOCUMENTS, &documents)?;

    Ok(())
}

fn link(row: &mut ParsedRow, facility_id: &str, position: usize) {
    row.set("facility_id", SqlValue::Text(facility_id.to_string()));
    row.set("position", SqlValue::Integer(position as i64));
}

/// Insert a batch of rows into the table
fn insert_rows(conn: &Connection, schema: &TableSchema, rows: &[ParsedRow]) -> rusqlite::Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let columns = schema.column_names();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema.name,
        columns.join(", "),
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare_cached(&sql)?;

    for row in rows {
        for (idx, col_name) in columns.iter().enumerate() {
            let value = row.values.get(*col_name).cloned().unwrap_or(SqlValue::Null);
            value.bind_to(idx + 1, &mut stmt)?;
        }
        stmt.raw_execute()?;
    }

    Ok(())
}

/// Update every non-key column of the row with primary key `id`
fn update_row(conn: &Connection, schema: &TableSchema, row: &ParsedRow, id: &str) -> rusqlite::Result<()> {
    let columns: Vec<&str> = schema
        .column_names()
        .into_iter()
        .filter(|name| *name != "id")
        .collect();
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(idx, name)| format!("{} = ?{}", name, idx + 1))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        schema.name,
        assignments.join(", "),
        columns.len() + 1
    );
    let mut stmt = conn.prepare_cached(&sql)?;

    for (idx, col_name) in columns.iter().enumerate() {
        let value = row.values.get(*col_name).cloned().unwrap_or(SqlValue::Null);
        value.bind_to(idx + 1, &mut stmt)?;
    }
    stmt.raw_bind_parameter(columns.len() + 1, id)?;
    stmt.raw_execute()?;

    Ok(())
}

/// Load all facilities, or the one with `id`, in insertion order
fn load_records(conn: &Connection, id: Option<&str>) -> FacilityResult<Vec<FacilityRecord>> {
    let params: Vec<&dyn ToSql> = match &id {
        Some(id) => vec![id as &dyn ToSql],
        None => Vec::new(),
    };
    let where_clause = |column: &str| match id {
        Some(_) => format!(" WHERE {} = ?1", column),
        None => String::new(),
    };

    let sql = format!(
        "SELECT {} FROM facilities{} ORDER BY rowid",
        select_columns(&FACILITIES),
        where_clause("id")
    );
    let mut stmt = conn.prepare(&sql)?;
    let parents = stmt
        .query_map(params.as_slice(), |row| decode_row(row, &FACILITIES))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut timelines = load_children(conn, &TIMELINE_EVENTS, &where_clause("facility_id"), &params)?;
    let mut documents = load_children(conn, &DOCUMENTS, &where_clause("facility_id"), &params)?;

    let mut records = Vec::with_capacity(parents.len());
    for mut object in parents {
        let facility_id = object
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if let Some(events) = timelines.remove(&facility_id) {
            object.insert("timeline".to_string(), Value::Array(events));
        }
        if let Some(docs) = documents.remove(&facility_id) {
            object.insert("documents".to_string(), Value::Array(docs));
        }
        records.push(serde_json::from_value(Value::Object(object))?);
    }

    Ok(records)
}

/// Child rows grouped by facility id, each group in position order
fn load_children(
    conn: &Connection,
    schema: &TableSchema,
    where_clause: &str,
    params: &[&dyn ToSql],
) -> FacilityResult<HashMap<String, Vec<Value>>> {
    let columns = select_columns(schema);
    let facility_idx = columns.split(", ").count();
    let sql = format!(
        "SELECT {}, facility_id FROM {}{} ORDER BY facility_id, position",
        columns, schema.name, where_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, |row| {
        let object: Map<String, Value> = decode_row(row, schema)?;
        let facility_id: String = row.get(facility_idx)?;
        Ok((facility_id, object))
    })?;

    let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
    for row in rows {
        let (facility_id, object) = row?;
        grouped
            .entry(facility_id)
            .or_default()
            .push(Value::Object(object));
    }

    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Geometry, TimelineEvent};
    use serde_json::json;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn facility(id: &str) -> FacilityRecord {
        FacilityRecord {
            id: id.to_string(),
            name: Some(format!("{} plant", id)),
            status: Some("Operating".to_string()),
            capacity: Some("10,000 tonnes/year".to_string()),
            geometry: Some(Geometry { lon: -119.7, lat: 39.5 }),
            year_started: Some("2022".to_string()),
            timeline: vec![
                TimelineEvent {
                    year: "2024".to_string(),
                    event: "Expanded".to_string(),
                },
                TimelineEvent {
                    year: "2021".to_string(),
                    event: "Announced".to_string(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_get_round_trip() {
        let mut store = store();
        let mut record = facility("rw-nv");
        record
            .documents
            .push(Document::link("Website", "https://example.com/").unwrap());
        let created = store.create_facility(record.clone()).unwrap();

        let loaded = store.get_facility("rw-nv").unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.timeline[0].event, "Expanded");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_create_conflict_and_slug_id() {
        let mut store = store();
        store.create_facility(facility("dup")).unwrap();
        assert!(matches!(
            store.create_facility(facility("dup")),
            Err(FacilityError::Conflict(_))
        ));

        let mut unnamed_id = facility("");
        unnamed_id.name = Some("Cirba Solutions Lancaster".to_string());
        let created = store.create_facility(unnamed_id).unwrap();
        assert_eq!(created.id, "cirba-solutions-lancaster");
    }

    #[test]
    fn test_update_is_partial_and_atomic() {
        let mut store = store();
        store.create_facility(facility("rw-nv")).unwrap();

        let updated = store
            .update_facility("rw-nv", &json!({"status": "Planned", "yearStarted": "2026"}))
            .unwrap();
        assert_eq!(updated.year_planned.as_deref(), Some("2026"));
        assert_eq!(updated.year_started, None);
        assert_eq!(updated.timeline.len(), 2);
        assert_eq!(store.get_facility("rw-nv").unwrap(), updated);

        store.create_facility(facility("later")).unwrap();
        store
            .update_facility("rw-nv", &json!({"capacity": "5 GWh"}))
            .unwrap();
        let ids: Vec<String> = store.list_facilities().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["rw-nv", "later"]);

        let before = store.get_facility("rw-nv").unwrap();
        assert!(store
            .update_facility("rw-nv", &json!({"name": null}))
            .is_err());
        assert_eq!(store.get_facility("rw-nv").unwrap(), before);

        assert!(matches!(
            store.update_facility("missing", &json!({"name": "x"})),
            Err(FacilityError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let mut store = store();
        store.create_facility(facility("a")).unwrap();
        store.delete_facility("a").unwrap();
        assert!(matches!(store.get_facility("a"), Err(FacilityError::NotFound(_))));
        assert!(matches!(store.delete_facility("a"), Err(FacilityError::NotFound(_))));

        let orphans: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM facility_timeline_events", [], |r| r.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_documents_add_remove() {
        let mut store = store();
        store.create_facility(facility("a")).unwrap();

        let first = store
            .add_document("a", Document::link("Permit", "https://example.com/permit").unwrap())
            .unwrap();
        let second = store
            .add_document("a", Document::file("Report", "facilities/a/report.pdf", Some(42)).unwrap())
            .unwrap();

        let ids: Vec<String> = store
            .get_facility("a")
            .unwrap()
            .documents
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![first.id.clone(), second.id.clone()]);

        store.remove_document("a", &first.id).unwrap();
        let docs = store.get_facility("a").unwrap().documents;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0], second);

        assert!(matches!(
            store.remove_document("a", &first.id),
            Err(FacilityError::DocumentNotFound { .. })
        ));
    }

    #[test]
    fn test_import_modes() {
        let mut store = store();
        let pb = ProgressBar::hidden();
        let mut invalid = facility("bad");
        invalid.status = None;

        let stats = store
            .import_records(vec![facility("a"), facility("b"), invalid], ImportMode::Replace, &pb)
            .unwrap();
        assert_eq!(stats, ImportStats { imported: 2, skipped: 1 });

        let mut changed = facility("a");
        changed.capacity = Some("1".to_string());
        store
            .import_records(vec![changed, facility("c")], ImportMode::Merge, &ProgressBar::hidden())
            .unwrap();
        let ids: Vec<String> = store.list_facilities().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.get_facility("a").unwrap().capacity.as_deref(), Some("1"));

        store
            .import_records(vec![facility("z")], ImportMode::Replace, &ProgressBar::hidden())
            .unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_import_document_ids_are_per_facility() {
        let mut store = store();
        let shared = Document::link("Permit", "https://example.com/permit").unwrap();
        let mut a = facility("a");
        a.documents.push(Document { id: "d1".to_string(), ..shared.clone() });
        let mut b = facility("b");
        b.documents.push(Document { id: "d1".to_string(), ..shared.clone() });

        let stats = store
            .import_records(vec![a, b, facility("c")], ImportMode::Replace, &ProgressBar::hidden())
            .unwrap();
        assert_eq!(stats, ImportStats { imported: 3, skipped: 0 });
        assert_eq!(store.get_facility("b").unwrap().documents[0].id, "d1");

        store.remove_document("a", "d1").unwrap();
        assert!(store.get_facility("a").unwrap().documents.is_empty());
        assert_eq!(store.get_facility("b").unwrap().documents.len(), 1);
    }

    #[test]
    fn test_import_skips_record_with_repeated_document_id() {
        let mut store = store();
        let doc = Document::link("Permit", "https://example.com/permit").unwrap();
        let mut twice = facility("twice");
        twice.documents = vec![doc.clone(), doc];

        let stats = store
            .import_records(vec![facility("a"), twice, facility("c")], ImportMode::Replace, &ProgressBar::hidden())
            .unwrap();
        assert_eq!(stats, ImportStats { imported: 2, skipped: 1 });
        assert!(matches!(store.get_facility("twice"), Err(FacilityError::NotFound(_))));
        let orphans: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM facility_timeline_events WHERE facility_id = 'twice'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
        assert_eq!(store.count().unwrap(), 2);
    }
}
