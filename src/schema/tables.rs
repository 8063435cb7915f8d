//! Table schema definitions for the facility store

use super::types::*;

// =============================================================================
// Parent table
// =============================================================================

pub static FACILITIES: TableSchema = TableSchema {
    name: "facilities",
    columns: &[
        Column::required("id", ColumnType::Text),
        Column::required("name", ColumnType::Text),
        Column::required("status", ColumnType::Text),
        Column::new("company", ColumnType::Text),
        Column::new("address", ColumnType::Text),
        Column::new("region", ColumnType::Text),
        Column::new("country", ColumnType::Text),
        Column::new("technology", ColumnType::Text),
        Column::new("technology_category", ColumnType::Text),
        Column::new("capacity", ColumnType::Text),
        Column::new("lon", ColumnType::Real).json("geometry.lon"),
        Column::new("lat", ColumnType::Real).json("geometry.lat"),
        Column::new("year_started", ColumnType::Text),
        Column::new("year_planned", ColumnType::Text),
        Column::new("description", ColumnType::Text),
        Column::new("website", ColumnType::Text),
        Column::new("feedstock", ColumnType::Text),
        Column::new("products", ColumnType::Text),
        Column::new("funding_source", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[Index::on(&["status"]), Index::on(&["region"])],
};

// =============================================================================
// Child tables (ordered sequences owned by a facility)
// =============================================================================

pub static TIMELINE_EVENTS: TableSchema = TableSchema {
    name: "facility_timeline_events",
    columns: &[
        Column::link("facility_id", ColumnType::Text),
        Column::link("position", ColumnType::Integer),
        Column::new("year", ColumnType::Text),
        Column::new("event", ColumnType::Text),
    ],
    foreign_keys: &[ForeignKey::cascading("facility_id", "facilities")],
    indexes: &[Index::unique(&["facility_id", "position"])],
};

pub static DOCUMENTS: TableSchema = TableSchema {
    name: "facility_documents",
    columns: &[
        Column::required("doc_id", ColumnType::Text).json("id"),
        Column::link("facility_id", ColumnType::Text),
        Column::link("position", ColumnType::Integer),
        Column::required("name", ColumnType::Text),
        Column::required("doc_type", ColumnType::Text).json("type"),
        Column::new("url", ColumnType::Text),
        Column::new("path", ColumnType::Text),
        Column::new("size", ColumnType::Integer),
        Column::new("added_at", ColumnType::Text),
    ],
    foreign_keys: &[ForeignKey::cascading("facility_id", "facilities")],
    indexes: &[
        Index::on(&["facility_id", "position"]),
        Index::unique(&["facility_id", "doc_id"]),
    ],
};

/// All tables, parents before children
pub static ALL_TABLES: &[&TableSchema] = &[&FACILITIES, &TIMELINE_EVENTS, &DOCUMENTS];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parents_listed_before_children() {
        for (pos, table) in ALL_TABLES.iter().enumerate() {
            for dep in table.dependencies() {
                let dep_pos = ALL_TABLES.iter().position(|t| t.name == dep).unwrap();
                assert!(dep_pos < pos, "{} must come before {}", dep, table.name);
            }
        }
    }

    #[test]
    fn test_child_tables_cascade_from_facilities() {
        for table in [&TIMELINE_EVENTS, &DOCUMENTS] {
            assert!(table
                .foreign_keys
                .iter()
                .any(|fk| fk.references_table == "facilities" && fk.cascade));
            assert!(table.columns.iter().filter(|c| c.link).count() == 2);
        }
        assert!(FACILITIES.columns.iter().all(|c| !c.link));
    }

    #[test]
    fn test_document_ids_scoped_to_facility() {
        assert!(DOCUMENTS.columns.iter().all(|c| c.name != "id"));
        assert!(DOCUMENTS
            .indexes
            .iter()
            .any(|i| i.unique && i.columns == ["facility_id", "doc_id"]));
    }
}
