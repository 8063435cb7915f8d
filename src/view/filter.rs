use std::fmt;
use std::str::FromStr;

use crate::model::{FacilityRecord, Status};

/// Status tab selection. `PlannedOrPilot` mirrors the merged summary card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    #[default]
    All,
    Operating,
    UnderConstruction,
    PlannedOrPilot,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Operating,
        StatusFilter::UnderConstruction,
        StatusFilter::PlannedOrPilot,
    ];

    pub fn matches(self, record: &FacilityRecord) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Operating => record.status_kind() == Some(Status::Operating),
            StatusFilter::UnderConstruction => {
                record.status_kind() == Some(Status::UnderConstruction)
            }
            StatusFilter::PlannedOrPilot => matches!(
                record.status_kind(),
                Some(Status::Planned) | Some(Status::Pilot)
            ),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Operating => "Operating",
            StatusFilter::UnderConstruction => "Under Construction",
            StatusFilter::PlannedOrPilot => "Planned / Pilot",
        }
    }

    /// Next tab, wrapping around
    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "operating" => Ok(StatusFilter::Operating),
            "construction" | "under-construction" | "under construction" => {
                Ok(StatusFilter::UnderConstruction)
            }
            "planned" | "pilot" | "planned-or-pilot" => Ok(StatusFilter::PlannedOrPilot),
            other => Err(format!(
                "Unknown status filter '{}' (expected all, operating, construction, planned)",
                other
            )),
        }
    }
}

/// Normalized search text. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    raw: String,
    needle: String,
}

impl SearchQuery {
    pub fn new(text: &str) -> Self {
        Self {
            raw: text.to_string(),
            needle: text.trim().to_lowercase(),
        }
    }

    /// Text as typed
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, record: &FacilityRecord) -> bool {
        self.needle.is_empty() || record.search_text().contains(&self.needle)
    }
}
