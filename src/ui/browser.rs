//! Interactive facility browser over a [`Directory`].

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;

use super::components::{
    render_detail, render_help, render_list, render_search, render_summary, render_tabs,
    StatusPanel,
};
use super::{Phase, Ui};
use crate::aggregate::summary;
use crate::directory::Directory;
use crate::model::FacilityRecord;
use crate::store::FacilityStore;
use crate::view::{StatusFilter, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// Cursor and input state, kept apart from the terminal so it can be tested
#[derive(Debug, Default)]
pub struct BrowserState {
    /// Index into the visible records
    selected: usize,
    editing_search: bool,
    search_input: String,
    pending_delete: Option<String>,
    message: Option<String>,
}

impl BrowserState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_editing_search(&self) -> bool {
        self.editing_search
    }

    pub fn selected_record<'a>(&self, view: &'a ViewState) -> Option<&'a FacilityRecord> {
        view.visible_records().nth(self.selected)
    }

    fn clamp(&mut self, view: &ViewState) {
        self.selected = self.selected.min(view.visible_count().saturating_sub(1));
    }

    pub fn handle_key<S: FacilityStore>(&mut self, directory: &mut Directory<S>, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }

        if let Some(id) = self.pending_delete.take() {
            self.message = Some(match key.code {
                KeyCode::Char('y') => match directory.delete(&id) {
                    Ok(()) => format!("Deleted {}", id),
                    Err(e) => format!("Delete failed: {}", e),
                },
                _ => "Delete cancelled".to_string(),
            });
            self.clamp(directory.view());
            return Action::Continue;
        }

        if self.editing_search {
            match key.code {
                KeyCode::Char(c) => self.search_input.push(c),
                KeyCode::Backspace => {
                    self.search_input.pop();
                }
                KeyCode::Esc => {
                    self.search_input.clear();
                    self.editing_search = false;
                }
                KeyCode::Enter => self.editing_search = false,
                _ => return Action::Continue,
            }
            directory.view_mut().set_search(&self.search_input);
            self.clamp(directory.view());
            return Action::Continue;
        }

        self.message = None;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
            KeyCode::Tab => {
                let next = directory.view().filter().next();
                directory.view_mut().set_filter(next);
            }
            KeyCode::Char(c @ '1'..='4') => {
                let idx = c as usize - '1' as usize;
                directory.view_mut().set_filter(StatusFilter::ALL[idx]);
            }
            KeyCode::Char('/') => self.editing_search = true,
            KeyCode::Char('s') => {
                let on = directory.view_mut().toggle_size_by_capacity();
                self.message = Some(format!(
                    "Marker sizing by capacity {}",
                    if on { "on" } else { "off" }
                ));
            }
            KeyCode::Down | KeyCode::Char('j') => self.selected += 1,
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Char('r') => {
                self.message = Some(match directory.load() {
                    Ok(count) => format!("Loaded {} facilities", count),
                    Err(e) => format!("Reload failed, showing previous data: {}", e),
                });
            }
            KeyCode::Char('d') => {
                if !directory.view().can_edit() {
                    self.message = Some("Sign in with a token to edit".to_string());
                } else if let Some(record) = self.selected_record(directory.view()) {
                    self.message = Some(format!("Delete {}? (y/n)", record.display_name()));
                    self.pending_delete = Some(record.id.clone());
                }
            }
            _ => {}
        }

        self.clamp(directory.view());
        Action::Continue
    }
}

/// Render the whole browser for the current view
pub fn draw_browser(frame: &mut Frame, view: &ViewState, state: &BrowserState, status: &StatusPanel) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Filter tabs
            Constraint::Length(3), // Search
            Constraint::Min(8),    // List + details
            Constraint::Length(3), // Summary cards
            Constraint::Length(1), // Status
            Constraint::Length(1), // Help / message
        ])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(chunks[2]);

    let all_rows = view.list_rows();
    let rows: Vec<_> = all_rows.iter().filter(|row| row.visible).collect();
    let records: Vec<_> = view.visible_records().collect();
    let selected = (!rows.is_empty()).then_some(state.selected);

    render_tabs(frame, chunks[0], view);
    render_search(frame, chunks[1], view.search(), state.editing_search);
    render_list(frame, body[0], &rows, &records, selected, view.size_by_capacity());
    render_detail(frame, body[1], state.selected_record(view), view.can_edit());
    render_summary(frame, chunks[3], &summary(view.records()));
    status.render(frame, chunks[4]);
    render_help(frame, chunks[5], state.message());
}

/// Full-screen terminal application
pub struct UiApp {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    status: StatusPanel,
    state: BrowserState,
}

impl UiApp {
    /// Create a new UI application and enter the alternate screen
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            status: StatusPanel::new(),
            state: BrowserState::new(),
        })
    }

    fn draw_status(&mut self) -> Result<()> {
        let status = &self.status;
        self.terminal.draw(|frame| status.render(frame, frame.area()))?;
        Ok(())
    }

    /// Event loop until the user quits
    pub fn run<S: FacilityStore>(&mut self, directory: &mut Directory<S>) -> Result<()> {
        loop {
            self.status.set_error(directory.last_error().map(str::to_string));
            let view = directory.view();
            let state = &self.state;
            let status = &self.status;
            self.terminal
                .draw(|frame| draw_browser(frame, view, state, status))?;

            if !event::poll(Duration::from_millis(250))? {
                continue;
            }
            if let CrosstermEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if self.state.handle_key(directory, key) == Action::Quit {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Restore terminal
    pub fn restore(mut self) -> Result<()> {
        terminal::disable_raw_mode()?;
        self.terminal.backend_mut().execute(LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Ui for UiApp {
    fn set_phase(&mut self, phase: Phase) {
        self.status.set_phase(phase);
        self.draw_status().ok();
    }

    fn set_info(&mut self, info: impl Into<String>) {
        self.status.set_info(info);
        self.draw_status().ok();
    }

    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>) {
        self.status
            .set_info(format!("{}: {}/{}", label.into(), current, total));
        self.draw_status().ok();
    }

    fn clear_progress(&mut self) {
        self.status.set_info("");
        self.draw_status().ok();
    }

    fn log(&mut self, message: impl Into<String>) {
        self.state.message = Some(message.into());
    }
}

impl Drop for UiApp {
    fn drop(&mut self) {
        // Best effort cleanup
        terminal::disable_raw_mode().ok();
        self.terminal
            .backend_mut()
            .execute(LeaveAlternateScreen)
            .ok();
        self.terminal.show_cursor().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Session;
    use crate::store::SqliteStore;
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn directory(token: Option<&str>) -> Directory<SqliteStore> {
        let mut store = SqliteStore::open_in_memory().unwrap();
        for (id, company, status, capacity) in [
            ("redwood", "Redwood Materials", "Operating", "20,000 tonnes"),
            ("li-cycle", "Li-Cycle", "Under Construction", "35,000"),
            ("ascend", "Ascend Elements", "Pilot", ""),
        ] {
            store
                .create_facility(FacilityRecord {
                    id: id.to_string(),
                    name: Some(format!("{} plant", company)),
                    company: Some(company.to_string()),
                    status: Some(status.to_string()),
                    capacity: Some(capacity.to_string()),
                    ..Default::default()
                })
                .unwrap();
        }
        let mut directory = Directory::new(store, Session::new(token.map(String::from)));
        directory.load().unwrap();
        directory
    }

    #[test]
    fn test_filter_keys() {
        let mut dir = directory(None);
        let mut state = BrowserState::new();

        state.handle_key(&mut dir, key(KeyCode::Tab));
        assert_eq!(dir.view().filter(), StatusFilter::Operating);
        state.handle_key(&mut dir, key(KeyCode::Char('4')));
        assert_eq!(dir.view().filter(), StatusFilter::PlannedOrPilot);
        assert_eq!(state.selected_record(dir.view()).map(|r| r.id.as_str()), Some("ascend"));
    }

    #[test]
    fn test_search_typing() {
        let mut dir = directory(None);
        let mut state = BrowserState::new();

        state.handle_key(&mut dir, key(KeyCode::Char('/')));
        assert!(state.is_editing_search());
        for c in "REDW".chars() {
            state.handle_key(&mut dir, key(KeyCode::Char(c)));
        }
        assert_eq!(dir.view().visible_count(), 1);

        state.handle_key(&mut dir, key(KeyCode::Esc));
        assert!(!state.is_editing_search());
        assert_eq!(dir.view().visible_count(), 3);
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut dir = directory(None);
        let mut state = BrowserState::new();
        for _ in 0..10 {
            state.handle_key(&mut dir, key(KeyCode::Down));
        }
        assert_eq!(state.selected_record(dir.view()).map(|r| r.id.as_str()), Some("ascend"));
        state.handle_key(&mut dir, key(KeyCode::Up));
        assert_eq!(state.selected_record(dir.view()).map(|r| r.id.as_str()), Some("li-cycle"));
    }

    #[test]
    fn test_delete_needs_token_and_confirmation() {
        let mut dir = directory(None);
        let mut state = BrowserState::new();
        state.handle_key(&mut dir, key(KeyCode::Char('d')));
        assert_eq!(state.message(), Some("Sign in with a token to edit"));
        assert_eq!(dir.view().len(), 3);

        let mut dir = directory(Some("token"));
        let mut state = BrowserState::new();
        state.handle_key(&mut dir, key(KeyCode::Char('d')));
        state.handle_key(&mut dir, key(KeyCode::Char('n')));
        assert_eq!(dir.view().len(), 3);

        state.handle_key(&mut dir, key(KeyCode::Char('d')));
        state.handle_key(&mut dir, key(KeyCode::Char('y')));
        assert_eq!(dir.view().len(), 2);
        assert_eq!(state.message(), Some("Deleted redwood"));
    }

    #[test]
    fn test_quit_and_sizing_toggle() {
        let mut dir = directory(None);
        let mut state = BrowserState::new();
        state.handle_key(&mut dir, key(KeyCode::Char('s')));
        assert!(dir.view().size_by_capacity());
        assert_eq!(state.handle_key(&mut dir, key(KeyCode::Char('q'))), Action::Quit);
    }

    #[test]
    fn test_draw_browser_renders_rows() {
        let dir = directory(None);
        let state = BrowserState::new();
        let status = StatusPanel::new();

        let mut terminal = Terminal::new(TestBackend::new(140, 30)).unwrap();
        terminal
            .draw(|frame| draw_browser(frame, dir.view(), &state, &status))
            .unwrap();

        let screen: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("Redwood Materials"));
        assert!(screen.contains("Planned / Pilot (1)"));
    }
}
