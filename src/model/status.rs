use std::fmt;

/// Lifecycle stage of a facility.
///
/// Variant order is the fixed display order used by every status-keyed
/// aggregate and chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    Operating,
    UnderConstruction,
    Planned,
    Pilot,
    Closed,
}

/// Presentation attributes shared by the list badge, map marker and charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusStyle {
    pub class: &'static str,
    pub color: &'static str,
    pub sort_order: u8,
}

static STATUS_STYLES: [StatusStyle; 5] = [
    StatusStyle {
        class: "status-operating",
        color: "#4CAF50",
        sort_order: 0,
    },
    StatusStyle {
        class: "status-construction",
        color: "#FFC107",
        sort_order: 1,
    },
    StatusStyle {
        class: "status-planned",
        color: "#2196F3",
        sort_order: 2,
    },
    StatusStyle {
        class: "status-pilot",
        color: "#9C27B0",
        sort_order: 3,
    },
    StatusStyle {
        class: "status-closed",
        color: "#F44336",
        sort_order: 4,
    },
];

/// Style for missing or unrecognized statuses
pub static UNKNOWN_STATUS_STYLE: StatusStyle = StatusStyle {
    class: "",
    color: "#9E9E9E",
    sort_order: u8::MAX,
};

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Operating,
        Status::UnderConstruction,
        Status::Planned,
        Status::Pilot,
        Status::Closed,
    ];

    /// Position in [`Status::ALL`]
    pub const fn index(self) -> usize {
        match self {
            Status::Operating => 0,
            Status::UnderConstruction => 1,
            Status::Planned => 2,
            Status::Pilot => 3,
            Status::Closed => 4,
        }
    }

    /// Canonical stored label
    pub const fn label(self) -> &'static str {
        match self {
            Status::Operating => "Operating",
            Status::UnderConstruction => "Under Construction",
            Status::Planned => "Planned",
            Status::Pilot => "Pilot",
            Status::Closed => "Closed",
        }
    }

    pub fn style(self) -> &'static StatusStyle {
        &STATUS_STYLES[self.index()]
    }

    /// Recognize a stored status string.
    ///
    /// Matching ignores case, surrounding whitespace, and treats `_`/`-` as
    /// spaces, so `"under_construction"` and `" OPERATING "` are recognized.
    /// Anything else is `None`.
    pub fn parse(text: &str) -> Option<Status> {
        let normalized: String = text
            .trim()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        match normalized.as_str() {
            "operating" => Some(Status::Operating),
            "under construction" => Some(Status::UnderConstruction),
            "planned" => Some(Status::Planned),
            "pilot" => Some(Status::Pilot),
            "closed" => Some(Status::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Style lookup for a raw stored status.
pub fn style_for(status: Option<&str>) -> &'static StatusStyle {
    status
        .and_then(Status::parse)
        .map(Status::style)
        .unwrap_or(&UNKNOWN_STATUS_STYLE)
}
