//! User actions of the barcode desk.
//!
//! Every action first passes the [`SessionGuard`], then works on the
//! in-memory [`Table`] and persists the whole table through the
//! [`RecordStore`]. The result is a [`DeskView`]: the notices raised along
//! the way plus everything the page needs to re-render.

use serde::Serialize;
use thiserror::Error;

use crate::barcode::{BarcodeError, BarcodeGenerator};
use crate::guard::{GuardError, SessionGuard};
use crate::notice::{Notice, Notices};
use crate::record::{Record, RecordFields, Table, TableError, timestamp_now};
use crate::store::RecordStore;

#[derive(Debug, Error)]
pub enum DeskError {
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Barcode(#[from] BarcodeError),
    #[error("generate a barcode first")]
    NoPendingBarcode,
}

impl DeskError {
    /// Text shown to the user for this failure
    pub fn user_message(&self) -> String {
        match self {
            DeskError::Guard(GuardError::Occupied) => {
                "Another user is currently connected. Please try again later.".to_string()
            }
            DeskError::Guard(e) => format!("Could not start an editing session: {}", e),
            DeskError::Table(TableError::DuplicateBarcode(b)) => {
                format!("Barcode {} is already issued. Generate a new one.", b)
            }
            DeskError::Table(TableError::NotFound(b)) => format!("Barcode {} does not exist.", b),
            DeskError::Barcode(e) => format!("Cannot generate a barcode: {}.", e),
            DeskError::NoPendingBarcode => "Generate a barcode first.".to_string(),
        }
    }
}

/// What the page shows after an action
#[derive(Debug, Clone, Serialize)]
pub struct DeskView {
    #[serde(skip)]
    pub token: String,
    pub status: &'static str,
    pub notices: Vec<Notice>,
    pub pending_barcode: Option<String>,
    pub records: Vec<Record>,
}

/// A caller that passed the guard
struct Entry {
    token: String,
    fresh: bool,
    reloaded: bool,
    notices: Notices,
}

/// Barcode desk state shared by all requests of one process
#[derive(Debug)]
pub struct Desk {
    store: RecordStore,
    guard: SessionGuard,
    generator: BarcodeGenerator,
    table: Option<Table>,
}

impl Desk {
    pub fn new(store: RecordStore, guard: SessionGuard, generator: BarcodeGenerator) -> Self {
        Desk {
            store,
            guard,
            generator,
            table: None,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    /// Table as last loaded or mutated, if any session has loaded it
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Start or resume a session and show the table
    pub fn open(&mut self, token: Option<&str>) -> Result<DeskView, DeskError> {
        let entry = self.enter(token)?;
        Ok(self.view(entry.token, entry.notices))
    }

    /// Release the desk so another user can connect
    pub fn close(&mut self, token: Option<&str>) -> Result<DeskView, DeskError> {
        self.guard.end(token)?;
        let mut notices = Notices::new();
        notices.success("Session ended. Another user can connect now.");

        Ok(DeskView {
            token: String::new(),
            status: "ok",
            notices: notices.into_vec(),
            pending_barcode: None,
            records: Vec::new(),
        })
    }

    /// Generate a candidate barcode for the next issue
    pub fn generate(&mut self, token: Option<&str>) -> Result<DeskView, DeskError> {
        self.within(token, |desk, entry| {
            let Entry {
                token, mut notices, ..
            } = entry;

            let table = desk.table.get_or_insert_with(Table::new);
            let barcode = desk.generator.generate(table)?;
            notices.info(format!("Generated barcode: {}", barcode));
            desk.guard.set_pending_barcode(barcode);

            Ok(desk.view(token, notices))
        })
    }

    /// Issue the pending barcode with the given product fields
    pub fn issue(
        &mut self,
        token: Option<&str>,
        fields: RecordFields,
    ) -> Result<DeskView, DeskError> {
        self.within(token, |desk, entry| {
            let Entry {
                token, mut notices, ..
            } = entry;

            let barcode = desk
                .guard
                .pending_barcode()
                .map(str::to_string)
                .ok_or(DeskError::NoPendingBarcode)?;

            let now = timestamp_now();
            desk.loaded_mut().issue(barcode.clone(), fields, &now)?;
            desk.guard.take_pending_barcode();

            if desk.persist(&mut notices) {
                notices.success(format!("Barcode {} issued.", barcode));
            } else {
                notices.info(format!("Barcode {} issued in memory only.", barcode));
            }
            log::info!("issued barcode {}", barcode);

            Ok(desk.view(token, notices))
        })
    }

    /// Edit the record with `barcode`; empty fields keep their value
    pub fn edit(
        &mut self,
        token: Option<&str>,
        barcode: &str,
        changes: RecordFields,
    ) -> Result<DeskView, DeskError> {
        self.within(token, |desk, entry| {
            let Entry {
                token, mut notices, ..
            } = entry;

            let now = timestamp_now();
            desk.loaded_mut().edit(barcode, changes, &now)?;

            if desk.persist(&mut notices) {
                notices.success(format!("Barcode {} updated.", barcode));
            } else {
                notices.info(format!("Barcode {} updated in memory only.", barcode));
            }
            log::info!("updated barcode {}", barcode);

            Ok(desk.view(token, notices))
        })
    }

    /// Delete every record with `barcode`
    pub fn delete(&mut self, token: Option<&str>, barcode: &str) -> Result<DeskView, DeskError> {
        let Entry {
            token, mut notices, ..
        } = self.enter(token)?;

        let removed = self.loaded_mut().delete(barcode);
        if removed == 0 {
            notices.info(format!("No record with barcode {}.", barcode));
        } else {
            if self.persist(&mut notices) {
                notices.success(format!("Barcode {} deleted.", barcode));
            } else {
                notices.info(format!("Barcode {} deleted in memory only.", barcode));
            }
            log::info!("deleted {} record(s) with barcode {}", removed, barcode);
        }

        Ok(self.view(token, notices))
    }

    /// Drop the in-memory table and reload it from the backing file
    pub fn refresh(&mut self, token: Option<&str>) -> Result<DeskView, DeskError> {
        let Entry {
            token,
            reloaded,
            mut notices,
            ..
        } = self.enter(token)?;

        // A fresh session has just read the file
        if !reloaded {
            self.table = Some(self.store.load(&mut notices));
        }
        notices.success("Barcode database reloaded.");

        Ok(self.view(token, notices))
    }

    /// Copy of the current table for download, with the caller's token
    pub fn export(&mut self, token: Option<&str>) -> Result<(String, Table), DeskError> {
        let Entry { token, .. } = self.enter(token)?;
        Ok((token, self.table.clone().unwrap_or_default()))
    }

    /// Pass the guard; a new session reloads the table from disk
    fn enter(&mut self, token: Option<&str>) -> Result<Entry, DeskError> {
        let admission = self.guard.enter(token)?;
        let mut notices = Notices::new();

        let reloaded = admission.fresh || self.table.is_none();
        if reloaded {
            self.table = Some(self.store.load(&mut notices));
        }

        Ok(Entry {
            token: admission.token,
            fresh: admission.fresh,
            reloaded,
            notices,
        })
    }

    /// Run an action that may fail after the guard admitted the caller
    ///
    /// A session started by this very call is released again on failure:
    /// its token never reaches the caller, so nobody could end it.
    fn within<T, F>(&mut self, token: Option<&str>, action: F) -> Result<T, DeskError>
    where
        F: FnOnce(&mut Self, Entry) -> Result<T, DeskError>,
    {
        let entry = self.enter(token)?;
        let started = entry.fresh.then(|| entry.token.clone());

        let result = action(self, entry);
        if let (Err(e), Some(started)) = (&result, started) {
            log::info!("releasing session started by a failed action: {}", e);
            if let Err(end_err) = self.guard.end(Some(&started)) {
                log::warn!("could not release the editing session: {}", end_err);
            }
        }
        result
    }

    fn persist(&self, notices: &mut Notices) -> bool {
        match &self.table {
            Some(table) => self.store.save(table, notices),
            None => false,
        }
    }

    fn loaded_mut(&mut self) -> &mut Table {
        self.table.get_or_insert_with(Table::new)
    }

    fn view(&self, token: String, notices: Notices) -> DeskView {
        DeskView {
            token,
            status: "ok",
            notices: notices.into_vec(),
            pending_barcode: self.guard.pending_barcode().map(str::to_string),
            records: self
                .table
                .as_ref()
                .map(|t| t.records().to_vec())
                .unwrap_or_default(),
        }
    }
}
