//! Write-side rules shared by every store: partial updates, the
//! status-dependent year field, and preparing new records.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{FacilityError, FacilityResult};
use crate::model::{FacilityRecord, Status};

/// Keys a partial update may carry
pub const UPDATABLE_KEYS: &[&str] = &[
    "company",
    "name",
    "address",
    "region",
    "country",
    "status",
    "technology",
    "capacity",
    "geometry",
    "timeline",
    "yearStarted",
    "yearPlanned",
    "description",
    "website",
    "feedstock",
    "products",
    "technologyCategory",
    "fundingSource",
];

/// Keys silently dropped from a patch; documents change only via add/remove
pub const IGNORED_KEYS: &[&str] = &["documents", "filesystem"];

/// Merge `patch` into `current` and return the resulting record.
///
/// Keys missing from the patch keep their value, keys set to `null` are
/// cleared. The year is re-homed under `yearPlanned` or `yearStarted` in the
/// same merge, depending on the resulting status.
pub fn apply_patch(current: &FacilityRecord, patch: &Value) -> FacilityResult<FacilityRecord> {
    let mut patch = match patch {
        Value::Object(map) => map.clone(),
        _ => {
            return Err(FacilityError::validation(
                "Invalid update data format. Expecting an object of properties.",
            ))
        }
    };

    for key in IGNORED_KEYS {
        patch.remove(*key);
    }
    if let Some(id) = patch.remove("id") {
        if id.as_str() != Some(current.id.as_str()) {
            return Err(FacilityError::validation("Facility ID cannot be changed"));
        }
    }
    if patch.is_empty() {
        return Err(FacilityError::validation(
            "No valid properties provided for update.",
        ));
    }
    if let Some(key) = patch.keys().find(|k| !UPDATABLE_KEYS.contains(&k.as_str())) {
        return Err(FacilityError::validation(format!("Unknown field: {}", key)));
    }

    if let Some(timeline) = patch.get_mut("timeline") {
        *timeline = normalize_timeline(timeline)?;
    }

    let year = if patch.contains_key("yearStarted") || patch.contains_key("yearPlanned") {
        year_text(patch.get("yearStarted")).or_else(|| year_text(patch.get("yearPlanned")))
    } else {
        current.year().map(str::to_string)
    };
    patch.remove("yearStarted");
    patch.remove("yearPlanned");

    let mut merged = match serde_json::to_value(current)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in patch {
        if value.is_null() {
            merged.remove(&key);
        } else {
            merged.insert(key, value);
        }
    }

    let mut updated: FacilityRecord = serde_json::from_value(Value::Object(merged))
        .map_err(|e| FacilityError::validation(format!("Invalid field value: {}", e)))?;
    updated.id = current.id.clone();
    updated.documents = current.documents.clone();
    assign_year(&mut updated, year);
    updated.validate()?;

    debug!(id = %updated.id, status = ?updated.status, "applied facility patch");
    Ok(updated)
}

/// Store `year` under the field matching the record's status. `Planned`
/// facilities keep it in `year_planned`, everything else in `year_started`.
pub fn assign_year(record: &mut FacilityRecord, year: Option<String>) {
    record.year_started = None;
    record.year_planned = None;
    if let Some(year) = year.filter(|y| !y.trim().is_empty()) {
        if record.status_kind() == Some(Status::Planned) {
            record.year_planned = Some(year);
        } else {
            record.year_started = Some(year);
        }
    }
}

/// Validate and finish a record about to be created.
///
/// A missing id is derived from the name.
pub fn prepare_new(mut record: FacilityRecord) -> FacilityResult<FacilityRecord> {
    if record.id.trim().is_empty() {
        let name = record.name.as_deref().unwrap_or_default();
        record.id = slugify(name);
        if record.id.is_empty() {
            return Err(FacilityError::validation(
                "Missing required facility data (e.g., name).",
            ));
        }
    }
    let year = record.year().map(str::to_string);
    assign_year(&mut record, year);
    record.validate()?;
    Ok(record)
}

/// Lowercase, each whitespace run becomes `-` (leading and trailing runs
/// included), anything outside `[a-z0-9-]` dropped
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            slug.push(c);
        }
    }
    slug
}

/// Accept a timeline as an array or as JSON text holding an array.
fn normalize_timeline(value: &Value) -> FacilityResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => {
            if items.iter().all(Value::is_object) {
                Ok(value.clone())
            } else {
                Err(FacilityError::validation(
                    "Timeline entries must be objects with year and event",
                ))
            }
        }
        Value::String(text) if text.trim().is_empty() => Ok(Value::Null),
        Value::String(text) => {
            let parsed: Value = serde_json::from_str(text).map_err(|e| {
                FacilityError::validation(format!("Invalid Timeline JSON: {}", e))
            })?;
            if parsed.is_string() {
                return Err(FacilityError::validation("Timeline must be a JSON array."));
            }
            normalize_timeline(&parsed)
        }
        _ => Err(FacilityError::validation("Timeline must be a JSON array.")),
    }
}

fn year_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Document;
    use serde_json::json;

    fn operating() -> FacilityRecord {
        FacilityRecord {
            id: "rw-nv".to_string(),
            name: Some("Redwood Nevada".to_string()),
            company: Some("Redwood Materials".to_string()),
            status: Some("Operating".to_string()),
            capacity: Some("20,000 tonnes/year".to_string()),
            year_started: Some("2022".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_planned_moves_year() {
        let updated =
            apply_patch(&operating(), &json!({"status": "Planned", "yearStarted": "2026"})).unwrap();
        assert_eq!(updated.status.as_deref(), Some("Planned"));
        assert_eq!(updated.year_planned.as_deref(), Some("2026"));
        assert_eq!(updated.year_started, None);

        let value = serde_json::to_value(&updated).unwrap();
        assert!(value.get("yearStarted").is_none());
        assert_eq!(value["yearPlanned"], "2026");
    }

    #[test]
    fn test_status_change_keeps_existing_year() {
        let planned =
            apply_patch(&operating(), &json!({"status": "Planned"})).unwrap();
        assert_eq!(planned.year_planned.as_deref(), Some("2022"));
        assert_eq!(planned.year_started, None);

        let back = apply_patch(&planned, &json!({"status": "Operating"})).unwrap();
        assert_eq!(back.year_started.as_deref(), Some("2022"));
        assert_eq!(back.year_planned, None);
    }

    #[test]
    fn test_planned_year_moves_to_started() {
        let mut planned = operating();
        planned.status = Some("Planned".to_string());
        planned.year_started = None;
        planned.year_planned = Some("2028".to_string());

        let updated = apply_patch(&planned, &json!({"status": "Operating", "yearPlanned": "2030"})).unwrap();
        assert_eq!(updated.year_started.as_deref(), Some("2030"));
        assert_eq!(updated.year_planned, None);

        let value = serde_json::to_value(&updated).unwrap();
        assert!(value.get("yearPlanned").is_none());
        assert_eq!(value["yearStarted"], "2030");
    }

    #[test]
    fn test_both_year_keys_prefer_started() {
        let patch = json!({"yearStarted": "2023", "yearPlanned": "2030"});

        let operating_update = apply_patch(&operating(), &patch).unwrap();
        assert_eq!(operating_update.year_started.as_deref(), Some("2023"));
        assert_eq!(operating_update.year_planned, None);

        let mut patch = patch;
        patch["status"] = json!("Planned");
        let planned_update = apply_patch(&operating(), &patch).unwrap();
        assert_eq!(planned_update.year_planned.as_deref(), Some("2023"));
        assert_eq!(planned_update.year_started, None);

        let fallback = apply_patch(
            &operating(),
            &json!({"status": "Planned", "yearStarted": null, "yearPlanned": "2030"}),
        )
        .unwrap();
        assert_eq!(fallback.year_planned.as_deref(), Some("2030"));
        assert_eq!(fallback.year_started, None);
    }

    #[test]
    fn test_clearing_year() {
        let updated = apply_patch(&operating(), &json!({"yearStarted": null})).unwrap();
        assert_eq!(updated.year_started, None);
        assert_eq!(updated.year_planned, None);
    }

    #[test]
    fn test_partial_update_preserves_fields() {
        let mut current = operating();
        current
            .documents
            .push(Document::link("Site", "https://example.com").unwrap());
        let updated = apply_patch(
            &current,
            &json!({"capacity": "25,000 tonnes/year", "documents": [], "company": null}),
        )
        .unwrap();
        assert_eq!(updated.name, current.name);
        assert_eq!(updated.capacity.as_deref(), Some("25,000 tonnes/year"));
        assert_eq!(updated.company, None);
        assert_eq!(updated.documents, current.documents);
    }

    #[test]
    fn test_validation_failures() {
        let current = operating();
        let cases = vec![
            json!(["not", "an", "object"]),
            json!({}),
            json!({"documents": []}),
            json!({"name": null}),
            json!({"status": "  "}),
            json!({"id": "other"}),
            json!({"timeline": "[{oops"}),
            json!({"timeline": [1, 2]}),
            json!({"geometry": {"lon": 200.0, "lat": 0.0}}),
            json!({"favouriteColour": "green"}),
        ];
        for patch in cases {
            let result = apply_patch(&current, &patch);
            assert!(
                matches!(result, Err(FacilityError::Validation(_))),
                "expected validation error for {}",
                patch
            );
        }
    }

    #[test]
    fn test_timeline_accepts_json_text() {
        let updated = apply_patch(
            &operating(),
            &json!({"timeline": "[{\"year\": 2021, \"event\": \"Announced\"}]"}),
        )
        .unwrap();
        assert_eq!(updated.timeline.len(), 1);
        assert_eq!(updated.timeline[0].year, "2021");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Redwood Materials  Nevada"), "redwood-materials-nevada");
        assert_eq!(slugify("Li-Cycle (Arizona) Spoke"), "li-cycle-arizona-spoke");
        assert_eq!(slugify(" Foo"), "-foo");
        assert_eq!(slugify("Foo\t "), "foo-");
        assert_eq!(slugify("   "), "-");
        assert_eq!(slugify("()"), "");
    }

    #[test]
    fn test_prepare_new() {
        let record = prepare_new(FacilityRecord {
            name: Some("Ascend Elements Hopkinsville".to_string()),
            status: Some("Planned".to_string()),
            year_started: Some("2025".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(record.id, "ascend-elements-hopkinsville");
        assert_eq!(record.year_planned.as_deref(), Some("2025"));
        assert_eq!(record.year_started, None);

        assert!(prepare_new(FacilityRecord::default()).is_err());
    }
}
