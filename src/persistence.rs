//! State file persistence.
//!
//! The full [`BotState`] is written as JSON at the end of every tick and read
//! once at startup. Writes go to a sibling `.tmp` file first and are renamed
//! into place, so a crash mid-write never leaves a truncated record behind.
//!
//! Loading never fails: a missing record and a corrupt record both fall back
//! to a fresh state, but are logged differently.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::PersistError;
use crate::types::BotState;

/// How a load attempt went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing saved (or persistence disabled)
    Fresh,
    /// Saved state restored
    Restored,
    /// Saved record unusable; the reason is kept for logging
    Corrupt(String),
}

/// Reads and writes the bot state file
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    path: Option<PathBuf>,
}

impl StateStore {
    /// `None` disables persistence
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Overwrite the saved record with `state`
    pub fn save(&self, state: &BotState) -> Result<(), PersistError> {
        let Some(path) = self.path.as_ref() else {
            debug!("No state file configured, skipping save");
            return Ok(());
        };

        let payload = serde_json::to_string_pretty(state)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = tmp_path_for(path);
        fs::write(&tmp_path, payload)?;
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            PersistError::Io(e)
        })?;

        debug!(path = %path.display(), status = state.status.name(), "State saved");
        Ok(())
    }

    /// Restore the saved state for `symbol`, or start fresh
    pub fn load(&self, symbol: &str) -> BotState {
        self.load_with_outcome(symbol).0
    }

    pub fn load_with_outcome(&self, symbol: &str) -> (BotState, LoadOutcome) {
        let Some(path) = self.path.as_ref() else {
            info!("No state file configured, starting fresh");
            return (BotState::new(symbol), LoadOutcome::Fresh);
        };

        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No saved state found, starting fresh");
                return (BotState::new(symbol), LoadOutcome::Fresh);
            }
            Err(e) => {
                warn!(path = %path.display(), "Could not read saved state ({}), starting fresh", e);
                return (BotState::new(symbol), LoadOutcome::Corrupt(e.to_string()));
            }
        };

        let state = match serde_json::from_str::<BotState>(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), "Corrupt saved state ({}), starting fresh", e);
                return (BotState::new(symbol), LoadOutcome::Corrupt(e.to_string()));
            }
        };

        if state.symbol != symbol {
            let reason = format!("saved for {}, running {}", state.symbol, symbol);
            warn!(
                path = %path.display(),
                "Saved state is for another symbol ({}), starting fresh", reason
            );
            return (BotState::new(symbol), LoadOutcome::Corrupt(reason));
        }

        info!(
            path = %path.display(),
            status = state.status.name(),
            has_position = state.position.is_some(),
            "Restored saved state"
        );
        (state, LoadOutcome::Restored)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
