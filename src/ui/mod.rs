//! Terminal UI module using ratatui
//!
//! Two pieces:
//! - the [`Ui`] progress surface used by long-running commands (sync, load)
//! - the interactive facility browser in [`browser`]

pub mod browser;
mod components;

use indicatif::{ProgressBar, ProgressStyle};

pub use browser::{Action, BrowserState, UiApp};

/// Phases of a long-running command
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    Fetching,
    Importing,
    Complete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Loading => write!(f, "Loading facilities"),
            Phase::Fetching => write!(f, "Fetching directory"),
            Phase::Importing => write!(f, "Importing facilities"),
            Phase::Complete => write!(f, "Complete"),
        }
    }
}

/// Progress information for the current operation
#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub label: String,
}

impl Progress {
    pub fn new(current: u64, total: u64, label: impl Into<String>) -> Self {
        Self {
            current,
            total,
            label: label.into(),
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

/// Trait for UI implementations - allows both real TUI and silent/test modes
pub trait Ui {
    fn set_phase(&mut self, phase: Phase);
    fn set_info(&mut self, info: impl Into<String>);
    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>);
    fn clear_progress(&mut self);
    fn log(&mut self, message: impl Into<String>);
}

/// Line-oriented UI on stderr with an indicatif bar for progress
#[derive(Default)]
pub struct ConsoleUi {
    bar: Option<ProgressBar>,
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar(&mut self, total: u64) -> &ProgressBar {
        self.bar.get_or_insert_with(|| {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar().template("{msg:20} [{bar:40.cyan/blue}] {pos}/{len}") {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        })
    }
}

impl Ui for ConsoleUi {
    fn set_phase(&mut self, phase: Phase) {
        eprintln!("==> {}", phase);
    }

    fn set_info(&mut self, info: impl Into<String>) {
        eprintln!("    {}", info.into());
    }

    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>) {
        let bar = self.bar(total);
        bar.set_length(total);
        bar.set_position(current);
        bar.set_message(label.into());
    }

    fn clear_progress(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        match &self.bar {
            Some(bar) => bar.println(message),
            None => eprintln!("{}", message),
        }
    }
}

/// Silent UI implementation for testing and non-interactive use
#[derive(Default)]
pub struct SilentUi;

impl SilentUi {
    pub fn new() -> Self {
        Self
    }
}

impl Ui for SilentUi {
    fn set_phase(&mut self, _phase: Phase) {}
    fn set_info(&mut self, _info: impl Into<String>) {}
    fn set_progress(&mut self, _current: u64, _total: u64, _label: impl Into<String>) {}
    fn clear_progress(&mut self) {}
    fn log(&mut self, _message: impl Into<String>) {}
}
