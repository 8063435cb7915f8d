//! Bearer-token session and the capabilities it grants.

use crate::error::{FacilityError, FacilityResult};

/// What the current session may do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub can_edit: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    /// Blank tokens count as signed out.
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn sign_in(&mut self, token: impl Into<String>) {
        *self = Self::new(Some(token.into()));
    }

    pub fn sign_out(&mut self) {
        self.token = None;
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_edit: self.is_authenticated(),
        }
    }

    /// Gate for create, update, delete and document changes
    pub fn require_write(&self) -> FacilityResult<&str> {
        self.token().ok_or(FacilityError::Unauthorized)
    }
}
