//! A browsing session: one store, the view over its last good listing, and
//! the caller's auth.
//!
//! Reads degrade: a failed load keeps the previous collection and records
//! the failure in [`Directory::last_error`]. Writes are gated on the session
//! token, surface their error to the caller, and touch the loaded collection
//! only after the store confirms.

use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::Session;
use crate::error::FacilityResult;
use crate::model::{Document, FacilityRecord};
use crate::store::FacilityStore;
use crate::view::ViewState;

pub struct Directory<S> {
    store: S,
    view: ViewState,
    session: Session,
    last_error: Option<String>,
}

impl<S: FacilityStore> Directory<S> {
    /// Starts with an empty collection; call [`Directory::load`] to fill it.
    pub fn new(store: S, session: Session) -> Self {
        let mut view = ViewState::default();
        view.set_can_edit(session.capabilities().can_edit);
        Self {
            store,
            view,
            session,
            last_error: None,
        }
    }

    /// Fetch the full listing and swap it into the view.
    ///
    /// On failure the previous collection stays in place.
    pub fn load(&mut self) -> FacilityResult<usize> {
        match self.store.list_facilities() {
            Ok(records) => {
                let count = records.len();
                self.view.replace_collection(records);
                self.last_error = None;
                debug!(count, "loaded facility collection");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, kept = self.view.len(), "facility load failed");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Show an already fetched collection, e.g. an offline snapshot.
    pub fn seed(&mut self, records: Vec<FacilityRecord>) {
        self.view.replace_collection(records);
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Message of the most recent failed load, cleared by a successful one
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn sign_in(&mut self, token: impl Into<String>) {
        self.session.sign_in(token);
        self.view.set_can_edit(self.session.capabilities().can_edit);
    }

    pub fn sign_out(&mut self) {
        self.session.sign_out();
        self.view.set_can_edit(false);
    }

    /// Fresh read from the store, bypassing the loaded collection
    pub fn get(&self, id: &str) -> FacilityResult<FacilityRecord> {
        self.store.get_facility(id)
    }

    pub fn create(&mut self, record: FacilityRecord) -> FacilityResult<FacilityRecord> {
        self.session.require_write()?;
        let created = self.store.create_facility(record)?;
        self.refresh();
        Ok(created)
    }

    pub fn update(&mut self, id: &str, patch: &Value) -> FacilityResult<FacilityRecord> {
        self.session.require_write()?;
        let updated = self.store.update_facility(id, patch)?;
        self.refresh();
        Ok(updated)
    }

    pub fn delete(&mut self, id: &str) -> FacilityResult<()> {
        self.session.require_write()?;
        self.store.delete_facility(id)?;
        self.refresh();
        Ok(())
    }

    pub fn add_document(&mut self, id: &str, document: Document) -> FacilityResult<Document> {
        self.session.require_write()?;
        let added = self.store.add_document(id, document)?;
        self.refresh();
        Ok(added)
    }

    pub fn remove_document(&mut self, id: &str, document_id: &str) -> FacilityResult<()> {
        self.session.require_write()?;
        self.store.remove_document(id, document_id)?;
        self.refresh();
        Ok(())
    }

    /// Reload after a confirmed write. A failed reload does not undo the
    /// write; it only sets the error indicator.
    fn refresh(&mut self) {
        if let Err(e) = self.load() {
            debug!(error = %e, "reload after write failed");
        }
    }
}
