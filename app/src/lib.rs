//! FILENAME: app/src/lib.rs
//! PURPOSE: Service layer: spreadsheet registry, locking and the operations.
//! CONTEXT: Each spreadsheet (workbook + pivots) sits behind its own
//! `RwLock`. Edits hold the write lock through recalculation and pivot
//! refresh, so readers only ever see fully recalculated state. Collaboration
//! sessions live behind a separate mutex; it is never held while a
//! spreadsheet lock is being acquired.

pub mod api_types;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

pub use api_types::*;
pub use commands::*;
pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use logging::{init_logging, SeqLogger};

use collab::{Clock, SessionManager, SystemClock};
use engine::Workbook;
use pivot_engine::PivotRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

pub type SpreadsheetId = Uuid;

/// One open spreadsheet.
#[derive(Debug)]
pub struct Spreadsheet {
    pub workbook: Workbook,
    pub pivots: PivotRegistry,
}

pub type SpreadsheetHandle = Arc<RwLock<Spreadsheet>>;

pub struct AppState {
    pub config: ServiceConfig,
    spreadsheets: RwLock<HashMap<SpreadsheetId, SpreadsheetHandle>>,
    sessions: Mutex<SessionManager>,
}

pub fn create_app_state(config: ServiceConfig) -> AppState {
    create_app_state_with_clock(config, Arc::new(SystemClock))
}

/// Same as `create_app_state` with an injected clock for heartbeat expiry.
pub fn create_app_state_with_clock(config: ServiceConfig, clock: Arc<dyn Clock>) -> AppState {
    engine::log_info!("SYS", "Creating AppState");
    let sessions = SessionManager::new(config.session_config(), clock);
    AppState {
        config,
        spreadsheets: RwLock::new(HashMap::new()),
        sessions: Mutex::new(sessions),
    }
}

impl AppState {
    pub(crate) fn insert_spreadsheet(&self, id: SpreadsheetId, spreadsheet: Spreadsheet) {
        let mut map = self.spreadsheets.write().unwrap_or_else(|e| e.into_inner());
        map.insert(id, Arc::new(RwLock::new(spreadsheet)));
    }

    pub(crate) fn remove_spreadsheet(&self, id: SpreadsheetId) -> Option<SpreadsheetHandle> {
        let mut map = self.spreadsheets.write().unwrap_or_else(|e| e.into_inner());
        map.remove(&id)
    }

    pub(crate) fn handle(&self, id: SpreadsheetId) -> ServiceResult<SpreadsheetHandle> {
        let map = self.spreadsheets.read().unwrap_or_else(|e| e.into_inner());
        map.get(&id)
            .cloned()
            .ok_or(ServiceError::SpreadsheetNotFound(id))
    }

    pub(crate) fn contains(&self, id: SpreadsheetId) -> bool {
        let map = self.spreadsheets.read().unwrap_or_else(|e| e.into_inner());
        map.contains_key(&id)
    }

    pub fn spreadsheet_ids(&self) -> Vec<SpreadsheetId> {
        let map = self.spreadsheets.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<_> = map.keys().copied().collect();
        ids.sort();
        ids
    }

    pub(crate) fn sessions(&self) -> MutexGuard<'_, SessionManager> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub(crate) fn read(handle: &SpreadsheetHandle) -> RwLockReadGuard<'_, Spreadsheet> {
    handle.read().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn write(handle: &SpreadsheetHandle) -> RwLockWriteGuard<'_, Spreadsheet> {
    handle.write().unwrap_or_else(|e| e.into_inner())
}
