//! Renderer-facing shapes derived from a [`ViewState`].

use serde::Serialize;

use super::marker::{marker_radius, Bounds};
use super::ViewState;
use crate::aggregate::{capacity_by_status, count_by_region, count_by_technology, Histogram};
use crate::model::{or_na, style_for, Status, NOT_AVAILABLE};

/// Colors for label-keyed charts, cycled in order
pub const CHART_PALETTE: &[&str] = &[
    "#4CAF50", "#FFC107", "#2196F3", "#9C27B0", "#FF5722", "#607D8B", "#795548", "#E91E63",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    pub radius: f64,
    pub color: &'static str,
    pub class: &'static str,
    pub title: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    pub id: String,
    pub company: String,
    pub address: String,
    pub capacity: String,
    pub technology: String,
    pub status: String,
    pub status_class: &'static str,
    pub visible: bool,
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: u64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: &'static str,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    fn from_histogram(label: &'static str, histogram: &Histogram) -> Self {
        let points = histogram
            .iter()
            .enumerate()
            .map(|(i, (name, count))| ChartPoint {
                label: name.to_string(),
                value: count,
                color: CHART_PALETTE[i % CHART_PALETTE.len()],
            })
            .collect();
        Self { label, points }
    }
}

impl ViewState {
    /// One marker per record that has a geometry, in collection order.
    pub fn markers(&self) -> Vec<MarkerSpec> {
        self.records
            .iter()
            .zip(self.visible.iter())
            .filter_map(|(record, visible)| {
                let geometry = record.geometry?;
                let style = style_for(record.status.as_deref());
                Some(MarkerSpec {
                    id: record.id.clone(),
                    lon: geometry.lon,
                    lat: geometry.lat,
                    radius: marker_radius(record.capacity_value(), self.size_by_capacity),
                    color: style.color,
                    class: style.class,
                    title: record.display_name().to_string(),
                    visible: *visible,
                })
            })
            .collect()
    }

    /// Bounds of the visible markers
    pub fn visible_bounds(&self) -> Option<Bounds> {
        Bounds::around(
            self.visible_records()
                .filter_map(|r| r.geometry)
                .map(|g| (g.lon, g.lat)),
        )
    }

    pub fn list_rows(&self) -> Vec<ListRow> {
        self.records
            .iter()
            .zip(self.visible.iter())
            .map(|(record, visible)| ListRow {
                id: record.id.clone(),
                company: or_na(record.company.as_deref()).to_string(),
                address: or_na(record.address.as_deref()).to_string(),
                capacity: record
                    .capacity
                    .as_deref()
                    .and_then(|c| c.split_whitespace().next())
                    .unwrap_or(NOT_AVAILABLE)
                    .to_string(),
                technology: or_na(record.technology.as_deref()).to_string(),
                status: or_na(record.status.as_deref()).to_string(),
                status_class: style_for(record.status.as_deref()).class,
                visible: *visible,
                editable: self.can_edit,
            })
            .collect()
    }

    /// Processing capacity per status over the whole collection
    pub fn capacity_series(&self) -> ChartSeries {
        let totals = capacity_by_status(&self.records);
        ChartSeries {
            label: "Processing Capacity (tonnes/year)",
            points: Status::ALL
                .iter()
                .map(|status| ChartPoint {
                    label: status.label().to_string(),
                    value: totals[*status],
                    color: status.style().color,
                })
                .collect(),
        }
    }

    pub fn technology_series(&self) -> ChartSeries {
        ChartSeries::from_histogram("Facilities by Technology", &count_by_technology(&self.records))
    }

    pub fn region_series(&self) -> ChartSeries {
        ChartSeries::from_histogram("Facilities by Region", &count_by_region(&self.records))
    }
}
