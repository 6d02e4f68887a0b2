//! Restore and autosave of one table's configuration.
//!
//! A [`ConfigSession`] owns the live [`ViewState`] for a storage key.
//! Restoration happens at most once per dataset identity and before any
//! write: until [`ConfigSession::restore`] has run, mutations are applied
//! but not persisted. Store failures are logged, never surfaced, except
//! for reads during an explicit import.

use serde_json::{Map, Value as Json};
use tabview_engine::filter::FilterState;
use tabview_engine::ViewState;

use crate::share;
use crate::snapshot::{apply_snapshot, build_snapshot, has_filter_fields, parse_document, SnapshotError};
use crate::store::KeyValueStore;
use crate::theme;

/// Where a restored configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    Stored,
    Defaults,
    BuiltIn,
}

pub struct ConfigSession<S: KeyValueStore> {
    store: S,
    storage_key: String,
    defaults: Option<Json>,
    headers: Vec<String>,
    state: ViewState,
    restored_for: Option<String>,
}

impl<S: KeyValueStore> ConfigSession<S> {
    /// `defaults` is the caller's default configuration as JSON text;
    /// unparseable or newer-version defaults are dropped with a warning.
    pub fn new(store: S, storage_key: impl Into<String>, defaults: Option<&str>) -> Self {
        let defaults = defaults.and_then(|text| match parse_document(text) {
            Ok(doc) => Some(doc),
            Err(e) => {
                log::warn!("ignoring default settings: {}", e);
                None
            }
        });
        Self {
            store,
            storage_key: storage_key.into(),
            defaults,
            headers: Vec::new(),
            state: ViewState::default(),
            restored_for: None,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn defaults(&self) -> Option<&Json> {
        self.defaults.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn is_restored(&self) -> bool {
        self.restored_for.is_some()
    }

    /// Restore for a dataset.
    ///
    /// Precedence: stored document > caller defaults > built-in defaults.
    /// Returns `None` when nothing ran: same identity as the last restore,
    /// or no headers yet.
    pub fn restore(&mut self, identity: &str, headers: &[String]) -> Option<RestoreSource> {
        if self.restored_for.as_deref() == Some(identity) || headers.is_empty() {
            return None;
        }
        self.headers = headers.to_vec();
        let mut state = ViewState::new(headers);

        let stored = match self.store.get(&self.storage_key) {
            Ok(Some(text)) => match parse_document(&text) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    log::warn!("{}: stored settings ignored: {}", self.storage_key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("{}: {}", self.storage_key, e);
                None
            }
        };

        let source = if let Some(doc) = stored {
            apply_snapshot(&mut state, &doc, headers);
            RestoreSource::Stored
        } else if let Some(doc) = &self.defaults {
            apply_snapshot(&mut state, doc, headers);
            RestoreSource::Defaults
        } else {
            RestoreSource::BuiltIn
        };
        log::debug!("{}: restored from {:?} for {}", self.storage_key, source, identity);

        self.state = state;
        self.restored_for = Some(identity.to_string());
        self.persist();
        Some(source)
    }

    /// Mutate the view and autosave
    pub fn update<R>(&mut self, edit: impl FnOnce(&mut ViewState) -> R) -> R {
        let out = edit(&mut self.state);
        self.persist();
        out
    }

    pub fn cycle_theme(&mut self) -> &'static str {
        let next = theme::next_theme(&self.state.theme);
        self.update(|s| s.theme = next.to_string());
        next
    }

    /// Fire-and-forget write of the current snapshot
    fn persist(&mut self) {
        if !self.is_restored() {
            log::debug!("{}: not restored yet, autosave skipped", self.storage_key);
            return;
        }
        let result = serde_json::to_string(&build_snapshot(&self.state))
            .map_err(SnapshotError::from)
            .and_then(|json| self.store.set(&self.storage_key, &json));
        if let Err(e) = result {
            log::warn!("{}: autosave failed: {}", self.storage_key, e);
        }
    }

    /// Pretty-printed snapshot of the current configuration
    pub fn export(&self) -> Result<String, SnapshotError> {
        build_snapshot(&self.state).to_string_pretty()
    }

    /// Parse, migrate and apply a document, then persist at once.
    /// On error the current configuration is untouched.
    ///
    /// Fails with [`SnapshotError::NotRestored`] until a dataset with headers
    /// has been restored; column lists would otherwise be reconciled away.
    pub fn import(&mut self, text: &str) -> Result<(), SnapshotError> {
        if !self.is_restored() {
            return Err(SnapshotError::NotRestored);
        }
        let doc = parse_document(text)?;
        let mut state = self.state.clone();
        apply_snapshot(&mut state, &doc, &self.headers);
        self.state = state;
        self.persist();
        Ok(())
    }

    /// Back to the caller defaults (persisted) or the built-in defaults (stored document removed)
    pub fn reset(&mut self) {
        let mut state = ViewState::new(&self.headers);
        match &self.defaults {
            Some(doc) => {
                apply_snapshot(&mut state, doc, &self.headers);
                self.state = state;
                self.persist();
            }
            None => {
                self.state = state;
                if let Err(e) = self.store.remove(&self.storage_key) {
                    log::warn!("{}: {}", self.storage_key, e);
                }
            }
        }
    }

    /// Clear filters, or restore the caller default's filter fields when it has any
    pub fn clear_filters(&mut self) {
        let defaults = self.defaults.as_ref().filter(|doc| has_filter_fields(doc));
        let mut filters = FilterState::new();
        let mut show_filter_row = false;

        if let Some(doc) = defaults {
            let mut subset = Map::new();
            for key in ["filters", "dropdownFilters", "filterMode"] {
                if let Some(v) = doc.get(key) {
                    subset.insert(key.to_string(), v.clone());
                }
            }
            let mut scratch = ViewState::new(&self.headers);
            apply_snapshot(&mut scratch, &Json::Object(subset), &self.headers);
            filters = scratch.filters;
            show_filter_row = doc.get("showFilterRow").and_then(Json::as_bool).unwrap_or(false);
        }

        self.update(|s| {
            s.filters = filters;
            s.show_filter_row = show_filter_row;
        });
    }

    pub fn share_url(&self, base: &str) -> Result<String, SnapshotError> {
        share::share_url(base, &build_snapshot(&self.state))
    }
}
