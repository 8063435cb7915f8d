//! Pure aggregates over a facility collection.
//!
//! Every function recomputes from scratch and accepts any iterator of record
//! references, so callers can aggregate a whole collection or a visible subset.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::ops::Index;

use crate::model::{FacilityRecord, Status};

/// One value per known status, in [`Status::ALL`] order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts([u64; 5]);

impl StatusCounts {
    pub fn get(&self, status: Status) -> u64 {
        self.0[status.index()]
    }

    fn add(&mut self, status: Status, amount: u64) {
        let slot = &mut self.0[status.index()];
        *slot = slot.saturating_add(amount);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Status, u64)> + '_ {
        Status::ALL.iter().map(move |s| (*s, self.get(*s)))
    }

    pub fn total(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

impl Index<Status> for StatusCounts {
    type Output = u64;

    fn index(&self, status: Status) -> &u64 {
        &self.0[status.index()]
    }
}

impl Serialize for StatusCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Status::ALL.len()))?;
        for (status, value) in self.iter() {
            map.serialize_entry(status.label(), &value)?;
        }
        map.end()
    }
}

/// Label counts in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    entries: Vec<(String, u64)>,
    positions: HashMap<String, usize>,
}

impl Histogram {
    pub fn increment(&mut self, label: &str) {
        match self.positions.get(label) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => {
                self.positions.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), 1));
            }
        }
    }

    pub fn get(&self, label: &str) -> u64 {
        self.positions
            .get(label)
            .map(|&pos| self.entries[pos].1)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(label, count)| (label.as_str(), *count))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(label, _)| label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }
}

impl Serialize for Histogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, count) in &self.entries {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Figures for the summary cards. Planned and Pilot share one card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: u64,
    pub operating: u64,
    pub under_construction: u64,
    pub planned_or_pilot: u64,
}

/// Count records per recognized status. Unrecognized statuses are skipped.
pub fn count_by_status<'a, I>(records: I) -> StatusCounts
where
    I: IntoIterator<Item = &'a FacilityRecord>,
{
    let mut counts = StatusCounts::default();
    for status in records.into_iter().filter_map(FacilityRecord::status_kind) {
        counts.add(status, 1);
    }
    counts
}

pub fn count_by_region<'a, I>(records: I) -> Histogram
where
    I: IntoIterator<Item = &'a FacilityRecord>,
{
    let mut histogram = Histogram::default();
    for record in records {
        histogram.increment(record.region_label());
    }
    histogram
}

pub fn count_by_technology<'a, I>(records: I) -> Histogram
where
    I: IntoIterator<Item = &'a FacilityRecord>,
{
    let mut histogram = Histogram::default();
    for record in records {
        histogram.increment(record.technology_label());
    }
    histogram
}

/// Sum parsed capacity per status. Records with an unrecognized status or an
/// unparseable capacity contribute nothing.
pub fn capacity_by_status<'a, I>(records: I) -> StatusCounts
where
    I: IntoIterator<Item = &'a FacilityRecord>,
{
    let mut totals = StatusCounts::default();
    for record in records {
        if let (Some(status), Some(capacity)) = (record.status_kind(), record.capacity_value()) {
            totals.add(status, capacity);
        }
    }
    totals
}

pub fn summary<'a, I>(records: I) -> Summary
where
    I: IntoIterator<Item = &'a FacilityRecord>,
{
    let mut total = 0u64;
    let mut counts = StatusCounts::default();
    for record in records {
        total += 1;
        if let Some(status) = record.status_kind() {
            counts.add(status, 1);
        }
    }

    Summary {
        total,
        operating: counts[Status::Operating],
        under_construction: counts[Status::UnderConstruction],
        planned_or_pilot: counts[Status::Planned] + counts[Status::Pilot],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, status: Option<&str>, capacity: Option<&str>) -> FacilityRecord {
        FacilityRecord {
            id: id.to_string(),
            status: status.map(String::from),
            capacity: capacity.map(String::from),
            ..Default::default()
        }
    }

    fn scenario() -> Vec<FacilityRecord> {
        vec![
            record("a", Some("Operating"), Some("1,000")),
            record("b", Some("Operating"), Some("2,000")),
            record("c", Some("Planned"), Some("500+")),
            record("d", Some("Pilot"), None),
        ]
    }

    #[test]
    fn test_count_by_status_scenario() {
        let counts = count_by_status(&scenario());
        let pairs: Vec<(Status, u64)> = counts.iter().collect();
        assert_eq!(
            pairs,
            vec![
                (Status::Operating, 2),
                (Status::UnderConstruction, 0),
                (Status::Planned, 1),
                (Status::Pilot, 1),
                (Status::Closed, 0),
            ]
        );
    }

    #[test]
    fn test_summary_merges_planned_and_pilot() {
        let summary = summary(&scenario());
        assert_eq!(summary.total, 4);
        assert_eq!(summary.operating, 2);
        assert_eq!(summary.under_construction, 0);
        assert_eq!(summary.planned_or_pilot, 2);
    }

    #[test]
    fn test_capacity_by_status_scenario() {
        let capacity = capacity_by_status(&scenario());
        assert_eq!(capacity[Status::Operating], 3000);
        assert_eq!(capacity[Status::Planned], 500);
        assert_eq!(capacity[Status::Pilot], 0);
    }

    #[test]
    fn test_unknown_status_counts_in_total_only() {
        let records = vec![
            record("a", Some("Operating"), Some("100")),
            record("b", Some("Mothballed"), Some("900")),
            record("c", None, None),
        ];
        assert_eq!(count_by_status(&records).total(), 1);
        assert_eq!(summary(&records).total, 3);
        assert_eq!(capacity_by_status(&records).total(), 100);
    }

    #[test]
    fn test_histograms_first_seen_order_and_unknown_bucket() {
        let mut records = scenario();
        records[0].region = Some("North America".to_string());
        records[1].region = Some("Europe".to_string());
        records[2].region = Some("North America".to_string());
        records[0].technology = Some("Hydrometallurgy".to_string());

        let regions = count_by_region(&records);
        assert_eq!(regions.labels(), vec!["North America", "Europe", "Unknown"]);
        assert_eq!(regions.get("North America"), 2);
        assert_eq!(regions.total(), 4);

        let tech = count_by_technology(&records);
        assert_eq!(tech.get("Unknown"), 3);
        assert_eq!(tech.total(), records.len() as u64);
    }

    #[test]
    fn test_empty_collection() {
        let empty: Vec<FacilityRecord> = Vec::new();
        assert_eq!(count_by_status(&empty), StatusCounts::default());
        assert!(count_by_region(&empty).is_empty());
        assert!(count_by_technology(&empty).is_empty());
        assert_eq!(capacity_by_status(&empty).total(), 0);
        assert_eq!(summary(&empty), Summary::default());
    }

    #[test]
    fn test_serialized_status_counts_keep_enum_order() {
        let json = serde_json::to_string(&count_by_status(&scenario())).unwrap();
        assert_eq!(
            json,
            r#"{"Operating":2,"Under Construction":0,"Planned":1,"Pilot":1,"Closed":0}"#
        );
    }
}
