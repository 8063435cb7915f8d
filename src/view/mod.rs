//! Derived display state over a loaded facility collection.
//!
//! A [`ViewState`] owns the collection plus three display axes: status
//! filter, search text and marker sizing. Every change recomputes visibility
//! for the whole collection; records are never removed by a filter, so
//! renderers can keep one row/marker per id and just toggle it.

pub mod adapters;
pub mod filter;
pub mod marker;

pub use adapters::*;
pub use filter::*;
pub use marker::*;

use std::collections::HashMap;
use tracing::warn;

use crate::model::FacilityRecord;

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    records: Vec<FacilityRecord>,
    /// id -> position in `records`
    index: HashMap<String, usize>,
    /// Parallel to `records`
    visible: Vec<bool>,
    filter: StatusFilter,
    search: SearchQuery,
    size_by_capacity: bool,
    can_edit: bool,
}

impl ViewState {
    pub fn new(records: Vec<FacilityRecord>) -> Self {
        let mut state = Self::default();
        state.replace_collection(records);
        state
    }

    /// Swap in a freshly loaded collection, keeping the display axes.
    ///
    /// Ids are unique within the view: a repeated id keeps its first record
    /// and later ones are dropped.
    pub fn replace_collection(&mut self, records: Vec<FacilityRecord>) {
        self.index.clear();
        self.records = Vec::with_capacity(records.len());
        for record in records {
            if self.index.contains_key(&record.id) {
                warn!(id = %record.id, "dropping facility with duplicate id");
                continue;
            }
            self.index.insert(record.id.clone(), self.records.len());
            self.records.push(record);
        }
        self.recompute();
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
        self.recompute();
    }

    pub fn set_search(&mut self, text: &str) {
        self.search = SearchQuery::new(text);
        self.recompute();
    }

    /// Marker sizing does not affect visibility, only radii.
    pub fn set_size_by_capacity(&mut self, on: bool) {
        self.size_by_capacity = on;
    }

    pub fn toggle_size_by_capacity(&mut self) -> bool {
        self.size_by_capacity = !self.size_by_capacity;
        self.size_by_capacity
    }

    /// Whether list rows expose edit affordances
    pub fn set_can_edit(&mut self, can_edit: bool) {
        self.can_edit = can_edit;
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn search(&self) -> &str {
        self.search.as_str()
    }

    pub fn size_by_capacity(&self) -> bool {
        self.size_by_capacity
    }

    pub fn can_edit(&self) -> bool {
        self.can_edit
    }

    pub fn records(&self) -> &[FacilityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, id: &str) -> Option<&FacilityRecord> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    /// Visibility of one record; `None` for unknown ids
    pub fn is_visible(&self, id: &str) -> Option<bool> {
        self.index.get(id).map(|&pos| self.visible[pos])
    }

    pub fn visible_records(&self) -> impl Iterator<Item = &FacilityRecord> {
        self.records
            .iter()
            .zip(self.visible.iter())
            .filter(|(_, visible)| **visible)
            .map(|(record, _)| record)
    }

    pub fn visible_count(&self) -> usize {
        self.visible.iter().filter(|v| **v).count()
    }

    /// True when records are loaded but none pass the current filter/search
    pub fn has_no_match(&self) -> bool {
        !self.records.is_empty() && self.visible_count() == 0
    }

    fn recompute(&mut self) {
        let filter = self.filter;
        let search = &self.search;
        self.visible = self
            .records
            .iter()
            .map(|record| filter.matches(record) && search.matches(record))
            .collect();
    }
}
