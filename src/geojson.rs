//! GeoJSON feature shape used by the directory API and import files.
//!
//! A feature keeps the record fields under `properties` and the position
//! under a `Point` geometry. Plain record objects are accepted too.

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::{FacilityError, FacilityResult};
use crate::model::FacilityRecord;

/// Keys the server keeps inside properties that have no place in a record
const SERVER_ONLY_KEYS: &[&str] = &["filesystem"];

/// Decode one feature or plain record object.
pub fn record_from_value(value: Value) -> FacilityResult<FacilityRecord> {
    let Value::Object(mut object) = value else {
        return Err(FacilityError::validation("Facility entry is not a JSON object"));
    };

    let mut fields = match object.remove("properties") {
        Some(Value::Object(properties)) => {
            let mut fields = properties;
            if let Some(geometry) = object.remove("geometry").filter(|g| !g.is_null()) {
                fields.insert("geometry".to_string(), geometry);
            }
            if !fields.contains_key("id") {
                if let Some(id) = object.remove("id") {
                    fields.insert("id".to_string(), id);
                }
            }
            fields
        }
        Some(_) => return Err(FacilityError::validation("Feature properties must be an object")),
        None => object,
    };

    for key in SERVER_ONLY_KEYS {
        fields.remove(*key);
    }
    // Numeric ids appear in some exports
    if let Some(Value::Number(n)) = fields.get("id") {
        let id = n.to_string();
        fields.insert("id".to_string(), Value::String(id));
    }
    if !fields.contains_key("id") {
        fields.insert("id".to_string(), Value::String(String::new()));
    }

    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Decode a FeatureCollection, a bare feature array, or a single feature.
///
/// Entries that fail to decode are logged and skipped.
pub fn records_from_collection(value: Value) -> FacilityResult<Vec<FacilityRecord>> {
    let entries = match value {
        Value::Object(mut object) => match object.remove("features") {
            Some(Value::Array(features)) => features,
            Some(_) => return Err(FacilityError::validation("`features` must be an array")),
            None => vec![Value::Object(object)],
        },
        Value::Array(entries) => entries,
        _ => return Err(FacilityError::validation("Expected a FeatureCollection or array")),
    };

    let mut records = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        match record_from_value(entry) {
            Ok(record) => records.push(record),
            Err(e) => warn!(index = idx, error = %e, "skipping malformed facility entry"),
        }
    }
    Ok(records)
}

/// Encode a record as a GeoJSON feature.
pub fn to_feature(record: &FacilityRecord) -> FacilityResult<Value> {
    let mut properties = match serde_json::to_value(record)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    properties.remove("geometry");

    let geometry = match record.geometry {
        Some(g) => json!({"type": "Point", "coordinates": [g.lon, g.lat]}),
        None => Value::Null,
    };

    Ok(json!({
        "type": "Feature",
        "properties": properties,
        "geometry": geometry,
    }))
}

pub fn to_feature_collection<'a, I>(records: I) -> FacilityResult<Value>
where
    I: IntoIterator<Item = &'a FacilityRecord>,
{
    let features = records
        .into_iter()
        .map(to_feature)
        .collect::<FacilityResult<Vec<_>>>()?;
    Ok(json!({"type": "FeatureCollection", "features": features}))
}
