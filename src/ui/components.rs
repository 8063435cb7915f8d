//! UI Components for the facility browser

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;

use super::Phase;
use crate::aggregate::Summary;
use crate::model::{or_na, style_for, FacilityRecord};
use crate::view::{marker_radius, ListRow, StatusFilter, ViewState};

/// `#RRGGBB` to a terminal color; anything else falls back to gray
pub fn hex_color(hex: &str) -> Color {
    let parse = |range: std::ops::Range<usize>| {
        hex.get(range).and_then(|h| u8::from_str_radix(h, 16).ok())
    };
    match (hex.len(), parse(1..3), parse(3..5), parse(5..7)) {
        (7, Some(r), Some(g), Some(b)) if hex.starts_with('#') => Color::Rgb(r, g, b),
        _ => Color::Gray,
    }
}

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title))
        .border_style(Style::default().fg(Color::Blue))
}

/// Status line showing the current phase, info and the last error
pub struct StatusPanel {
    phase: Phase,
    info: String,
    error: Option<String>,
}

impl StatusPanel {
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading,
            info: String::new(),
            error: None,
        }
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let line = match &self.error {
            Some(error) => Line::from(vec![
                Span::styled(" ✗ ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                Span::styled(error.as_str(), Style::default().fg(Color::Red)),
            ]),
            None => {
                let style = match self.phase {
                    Phase::Complete => Style::default().fg(Color::Green),
                    _ => Style::default().fg(Color::Cyan),
                };
                Line::from(vec![
                    Span::styled(format!(" {} ", self.phase), style.add_modifier(Modifier::BOLD)),
                    Span::styled(self.info.as_str(), Style::default().fg(Color::Gray)),
                ])
            }
        };

        frame.render_widget(Paragraph::new(line), area);
    }
}

pub fn render_tabs(frame: &mut Frame, area: Rect, view: &ViewState) {
    let titles: Vec<Line> = StatusFilter::ALL
        .iter()
        .map(|filter| {
            let count = view.records().iter().filter(|r| filter.matches(r)).count();
            Line::from(format!("{} ({})", filter.label(), count))
        })
        .collect();
    let selected = StatusFilter::ALL
        .iter()
        .position(|f| *f == view.filter())
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .block(panel("Lithium Battery Recycling Facilities"))
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, area);
}

pub fn render_search(frame: &mut Frame, area: Rect, query: &str, editing: bool) {
    let style = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };
    let text = if query.is_empty() && !editing {
        Span::styled("press / to search name, company or address", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(format!("{}{}", query, if editing { "▏" } else { "" }), style)
    };
    frame.render_widget(Paragraph::new(Line::from(text)).block(panel("Search")), area);
}

/// Visible rows with the selection highlighted. `selected` indexes `rows`.
pub fn render_list(
    frame: &mut Frame,
    area: Rect,
    rows: &[&ListRow],
    records: &[&FacilityRecord],
    selected: Option<usize>,
    size_by_capacity: bool,
) {
    let title = if size_by_capacity {
        "Facilities (sized by capacity)"
    } else {
        "Facilities"
    };

    if rows.is_empty() {
        let empty = Paragraph::new("No facilities match the current filters.")
            .style(Style::default().fg(Color::DarkGray))
            .block(panel(title));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = rows
        .iter()
        .zip(records.iter())
        .map(|(row, record)| {
            let color = hex_color(style_for(Some(row.status.as_str())).color);
            let radius = marker_radius(record.capacity_value(), size_by_capacity);
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {:>2.0} ● ", radius), Style::default().fg(color)),
                Span::styled(format!("{:<28}", record.display_name()), Style::default().fg(Color::White)),
                Span::styled(format!(" {:<22}", row.company), Style::default().fg(Color::Gray)),
                Span::styled(format!(" {:<18}", row.status), Style::default().fg(color)),
                Span::styled(format!(" {}", row.capacity), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(panel(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut state);
}

pub fn render_detail(frame: &mut Frame, area: Rect, record: Option<&FacilityRecord>, can_edit: bool) {
    let Some(record) = record else {
        frame.render_widget(Paragraph::new("").block(panel("Details")), area);
        return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let field = |name: &'static str, value: Option<&str>| {
        Line::from(vec![
            Span::styled(format!("{:<12}", name), label),
            Span::raw(or_na(value).to_string()),
        ])
    };
    let status_color = hex_color(style_for(record.status.as_deref()).color);

    let mut lines = vec![
        Line::from(Span::styled(
            record.display_name().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            or_na(record.status.as_deref()).to_string(),
            Style::default().fg(status_color),
        )),
        Line::from(""),
        field("Company", record.company.as_deref()),
        field("Address", record.address.as_deref()),
        field("Region", record.region.as_deref()),
        field("Technology", record.technology.as_deref()),
        field("Capacity", record.capacity.as_deref()),
        field("Year", record.year()),
    ];

    if let Some(description) = record.description.as_deref() {
        lines.push(Line::from(""));
        lines.push(Line::from(description.to_string()));
    }

    if !record.timeline.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Timeline", label)));
        for event in record.sorted_timeline() {
            lines.push(Line::from(format!("  {}  {}", event.year, event.event)));
        }
    }

    if !record.documents.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Documents", label)));
        for doc in &record.documents {
            lines.push(Line::from(format!("  [{}] {}  {}", doc.type_name(), doc.name, doc.target())));
        }
    }

    if can_edit {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("d: delete", label)));
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel("Details"));
    frame.render_widget(paragraph, area);
}

pub fn render_summary(frame: &mut Frame, area: Rect, summary: &Summary) {
    let card = |label: &'static str, value: u64, color: Color| {
        vec![
            Span::styled(format!(" {} ", value), Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(format!("{}   ", label), Style::default().fg(Color::Gray)),
        ]
    };

    let mut spans = card("Total", summary.total, Color::White);
    spans.extend(card("Operating", summary.operating, hex_color("#4CAF50")));
    spans.extend(card("Under Construction", summary.under_construction, hex_color("#FFC107")));
    spans.extend(card("Planned / Pilot", summary.planned_or_pilot, hex_color("#2196F3")));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(panel("Summary")), area);
}

pub fn render_help(frame: &mut Frame, area: Rect, message: Option<&str>) {
    let text = message.unwrap_or(
        "q quit  tab filter  1-4 tabs  / search  s size  j/k move  r reload",
    );
    frame.render_widget(
        Paragraph::new(Span::styled(text.to_string(), Style::default().fg(Color::DarkGray))),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#4CAF50"), Color::Rgb(0x4C, 0xAF, 0x50));
        assert_eq!(hex_color("4CAF50"), Color::Gray);
        assert_eq!(hex_color("#XYZ123"), Color::Gray);
    }
}
