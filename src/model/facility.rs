use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::document::Document;
use super::status::Status;
use crate::capacity::parse_capacity;
use crate::error::{FacilityError, FacilityResult};

/// Placeholder for missing display fields
pub const NOT_AVAILABLE: &str = "N/A";

/// Bucket label for missing region/technology
pub const UNKNOWN: &str = "Unknown";

/// One facility as stored and exchanged.
///
/// Optional text fields treat blank strings as absent. Numbers are accepted
/// wherever text is expected, since older records store years and capacities
/// as JSON numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityRecord {
    pub id: String,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timeline: Vec<TimelineEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<Document>,

    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub year_started: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub year_planned: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub feedstock: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub products: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub technology_category: Option<String>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub funding_source: Option<String>,
}

/// Map position in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeometryRepr")]
pub struct Geometry {
    pub lon: f64,
    pub lat: f64,
}

/// Accepts both `{lon, lat}` and a GeoJSON point. Positions may carry an
/// altitude after longitude and latitude; it is dropped.
#[derive(Deserialize)]
#[serde(untagged)]
enum GeometryRepr {
    Plain { lon: f64, lat: f64 },
    Point { coordinates: Vec<f64> },
}

impl TryFrom<GeometryRepr> for Geometry {
    type Error = String;

    fn try_from(repr: GeometryRepr) -> Result<Self, Self::Error> {
        match repr {
            GeometryRepr::Plain { lon, lat } => Ok(Geometry { lon, lat }),
            GeometryRepr::Point { coordinates } => match coordinates[..] {
                [lon, lat, ..] => Ok(Geometry { lon, lat }),
                _ => Err(format!(
                    "Point needs at least 2 coordinates, got {}",
                    coordinates.len()
                )),
            },
        }
    }
}

impl Geometry {
    pub fn new(lon: f64, lat: f64) -> FacilityResult<Self> {
        let geometry = Geometry { lon, lat };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> FacilityResult<()> {
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(FacilityError::validation(format!(
                "Longitude {} is out of range",
                self.lon
            )));
        }
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(FacilityError::validation(format!(
                "Latitude {} is out of range",
                self.lat
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default, deserialize_with = "text")]
    pub year: String,
    #[serde(default, deserialize_with = "text")]
    pub event: String,
}

impl FacilityRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Recognized status, `None` when missing or unrecognized
    pub fn status_kind(&self) -> Option<Status> {
        self.status.as_deref().and_then(Status::parse)
    }

    /// Parsed numeric capacity in tonnes/year
    pub fn capacity_value(&self) -> Option<u64> {
        parse_capacity(self.capacity.as_deref())
    }

    pub fn technology_label(&self) -> &str {
        self.technology.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn region_label(&self) -> &str {
        self.region.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed Facility")
    }

    /// The facility's year regardless of which status field holds it
    pub fn year(&self) -> Option<&str> {
        self.year_started
            .as_deref()
            .or(self.year_planned.as_deref())
    }

    /// Lowercased name, company and address used for text search
    pub fn search_text(&self) -> String {
        [&self.name, &self.company, &self.address]
            .iter()
            .filter_map(|field| field.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Timeline ordered by year. Events with unparseable years keep their
    /// insertion order after all dated events.
    pub fn sorted_timeline(&self) -> Vec<&TimelineEvent> {
        let mut events: Vec<&TimelineEvent> = self.timeline.iter().collect();
        events.sort_by_key(|event| match event.year.trim().parse::<i32>() {
            Ok(year) => (0, year),
            Err(_) => (1, 0),
        });
        events
    }

    pub fn document(&self, document_id: &str) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.id == document_id)
    }

    /// Check the fields every stored record must carry.
    pub fn validate(&self) -> FacilityResult<()> {
        if self.id.trim().is_empty() {
            return Err(FacilityError::validation("Missing facility ID"));
        }
        if self.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(FacilityError::validation("Missing required field: name"));
        }
        if self.status.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(FacilityError::validation("Missing required field: status"));
        }
        if let Some(geometry) = &self.geometry {
            geometry.validate()?;
        }
        Ok(())
    }
}

/// Display helper: the value or "N/A"
pub fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}

fn value_to_text(value: Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s,
        other => other.to_string(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_text))
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_text(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_tolerates_numbers_and_blanks() {
        let record: FacilityRecord = serde_json::from_value(json!({
            "id": "li-cycle-arizona",
            "name": "Li-Cycle Arizona",
            "company": "",
            "capacity": 10000,
            "yearStarted": 2022,
            "timeline": [{"year": 2021, "event": "Announced"}]
        }))
        .unwrap();

        assert_eq!(record.company, None);
        assert_eq!(record.capacity.as_deref(), Some("10000"));
        assert_eq!(record.year_started.as_deref(), Some("2022"));
        assert_eq!(record.timeline[0].year, "2021");
    }

    #[test]
    fn test_geometry_accepts_geojson_point() {
        let plain: Geometry = serde_json::from_value(json!({"lon": -111.9, "lat": 33.4})).unwrap();
        let point: Geometry =
            serde_json::from_value(json!({"type": "Point", "coordinates": [-111.9, 33.4]})).unwrap();
        assert_eq!(plain, point);

        let value = serde_json::to_value(plain).unwrap();
        assert_eq!(value, json!({"lon": -111.9, "lat": 33.4}));
    }

    #[test]
    fn test_geometry_point_with_altitude() {
        let point: Geometry =
            serde_json::from_value(json!({"type": "Point", "coordinates": [-84.4, 33.7, 120.0]})).unwrap();
        assert_eq!(point, Geometry { lon: -84.4, lat: 33.7 });

        assert!(serde_json::from_value::<Geometry>(json!({"type": "Point", "coordinates": [-84.4]})).is_err());
        assert!(serde_json::from_value::<Geometry>(json!({"type": "Point", "coordinates": []})).is_err());
    }

    #[test]
    fn test_geometry_range() {
        assert!(Geometry::new(-180.0, 90.0).is_ok());
        assert!(Geometry::new(181.0, 0.0).is_err());
        assert!(Geometry::new(0.0, -90.5).is_err());
        assert!(Geometry::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_sorted_timeline_keeps_undated_last() {
        let mut record = FacilityRecord::new("x");
        for (year, event) in [("2024", "Opened"), ("TBD", "Expansion"), ("2021", "Announced")] {
            record.timeline.push(TimelineEvent {
                year: year.to_string(),
                event: event.to_string(),
            });
        }

        let events: Vec<&str> = record
            .sorted_timeline()
            .iter()
            .map(|e| e.event.as_str())
            .collect();
        assert_eq!(events, vec!["Announced", "Opened", "Expansion"]);
        assert_eq!(record.timeline[0].event, "Opened");
    }

    #[test]
    fn test_labels_for_missing_fields() {
        let record = FacilityRecord::new("x");
        assert_eq!(record.technology_label(), UNKNOWN);
        assert_eq!(record.region_label(), UNKNOWN);
        assert_eq!(or_na(record.company.as_deref()), NOT_AVAILABLE);
        assert_eq!(record.status_kind(), None);
    }

    #[test]
    fn test_validate_requires_name_and_status() {
        let mut record = FacilityRecord::new("x");
        assert!(record.validate().is_err());
        record.name = Some("Plant".to_string());
        assert!(record.validate().is_err());
        record.status = Some("Operating".to_string());
        assert!(record.validate().is_ok());
        record.geometry = Some(Geometry { lon: 0.0, lat: 95.0 });
        assert!(record.validate().is_err());
    }
}
