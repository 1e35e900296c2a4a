//! User-facing notices (the toasts a UI would show).
//!
//! The storage layer decides *what* to tell the user; rendering is the
//! embedder's job. `LogNotifier` routes notices into tracing, and
//! `RecordingNotifier` keeps them for callers that display them later.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info, warn};

pub const SAVED_TO_CLOUD: &str = "Saved to cloud";
pub const SAVED_LOCALLY: &str = "Saved locally, will sync when online";
pub const NETWORK_ERROR: &str = "Network error. Please check your connection.";
pub const SIGN_IN_AGAIN: &str = "Please sign in again to continue.";
pub const NO_PERMISSION: &str = "You don't have permission to perform this action.";
pub const SERVER_ERROR: &str = "Server error. Please try again later.";
pub const REQUEST_FAILED: &str = "Request failed. Please try again.";
pub const SERVER_MODE_UNAVAILABLE: &str = "Server mode is not available right now. Staying in local mode.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    /// Notice for a non-success HTTP status.
    #[must_use]
    pub fn for_status(status: u16) -> Self {
        let message = match status {
            401 => SIGN_IN_AGAIN,
            403 => NO_PERMISSION,
            500..=599 => SERVER_ERROR,
            _ => REQUEST_FAILED,
        };
        Self::error(message)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Emits every notice as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success | NoticeLevel::Info => info!(notice = %notice.message, "notice"),
            NoticeLevel::Warning => warn!(notice = %notice.message, "notice"),
            NoticeLevel::Error => error!(notice = %notice.message, "notice"),
        }
    }
}

/// Keeps notices in memory until drained.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    #[must_use]
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes_map_to_messages() {
        assert_eq!(Notice::for_status(401).message, SIGN_IN_AGAIN);
        assert_eq!(Notice::for_status(403).message, NO_PERMISSION);
        assert_eq!(Notice::for_status(500).message, SERVER_ERROR);
        assert_eq!(Notice::for_status(503).message, SERVER_ERROR);
        assert_eq!(Notice::for_status(404).message, REQUEST_FAILED);
        assert_eq!(Notice::for_status(422).level, NoticeLevel::Error);
    }

    #[test]
    fn recording_notifier_drains() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notice::success(SAVED_TO_CLOUD));
        notifier.notify(Notice::warning(SAVED_LOCALLY));

        assert_eq!(notifier.messages(), vec![SAVED_TO_CLOUD.to_owned(), SAVED_LOCALLY.to_owned()]);
        assert_eq!(notifier.take().len(), 2);
        assert!(notifier.take().is_empty());
    }

    #[test]
    fn clones_share_the_buffer() {
        let notifier = RecordingNotifier::new();
        let clone = notifier.clone();
        clone.notify(Notice::info("hello"));
        assert_eq!(notifier.messages(), vec!["hello".to_owned()]);
    }
}
