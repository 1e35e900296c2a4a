//! Storage mode: which backend reads and writes prefer.
//!
//! TRADE-OFFS
//! ==========
//! Availability is checked once, at switch time. Nothing keeps the flag in
//! step with actual reachability afterwards; the orchestrator's fallback
//! covers a server that disappears later. Switching never moves data
//! between backends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StorageError;
use crate::local::{LocalStore, STORAGE_MODE_KEY};
use crate::notify::{Notice, Notifier, SERVER_MODE_UNAVAILABLE};
use crate::remote::RemoteBackend;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Local,
    Server,
}

impl StorageMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "server" => Ok(Self::Server),
            other => Err(format!("unknown storage mode '{other}' (expected 'local' or 'server')")),
        }
    }
}

/// Reads and writes the persisted mode flag.
///
/// The flag is stored as the bare word (`local` / `server`), not JSON.
#[derive(Clone)]
pub struct ModeSelector {
    store: LocalStore,
}

impl ModeSelector {
    #[must_use]
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn get_mode(&self) -> StorageMode {
        let Some(raw) = self.store.get_raw(STORAGE_MODE_KEY) else {
            return StorageMode::default();
        };
        raw.trim().parse().unwrap_or_else(|e: String| {
            warn!(error = %e, "stored storage mode unreadable; using local");
            StorageMode::Local
        })
    }

    /// # Errors
    ///
    /// Returns `QuotaExceeded` or `Io` if the flag cannot be written.
    pub fn set_mode(&self, mode: StorageMode) -> Result<(), StorageError> {
        self.store.set_raw(STORAGE_MODE_KEY, mode.as_str().to_owned())
    }
}

/// Probe the remote before allowing server mode.
pub async fn is_server_mode_available(remote: &dyn RemoteBackend) -> bool {
    remote.probe().await
}

/// Switch modes the way the settings screen does: server mode needs a
/// signed-in user and a reachable server, otherwise a notice is shown and
/// the stored flag is left untouched. Switching to local always succeeds.
///
/// # Errors
///
/// - `NotAuthenticated` when switching to server without a profile
/// - `RemoteUnavailable` when the probe fails
/// - write errors from `set_mode`
pub async fn switch_mode(
    selector: &ModeSelector,
    target: StorageMode,
    signed_in: bool,
    remote: &dyn RemoteBackend,
    notifier: &dyn Notifier,
) -> Result<StorageMode, StorageError> {
    if target == StorageMode::Server {
        if !signed_in {
            notifier.notify(Notice::error("Sign in to use server storage."));
            return Err(StorageError::NotAuthenticated);
        }
        if !is_server_mode_available(remote).await {
            notifier.notify(Notice::error(SERVER_MODE_UNAVAILABLE));
            return Err(StorageError::RemoteUnavailable("server availability probe failed".into()));
        }
    }

    selector.set_mode(target)?;
    info!(mode = %target, "storage mode switched");
    notifier.notify(Notice::success(format!("Storage mode set to {target}. Existing data was not moved.")));
    Ok(target)
}

#[cfg(test)]
#[path = "mode_test.rs"]
mod tests;
