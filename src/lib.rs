//! Storage layer for the ClarityOS money manager.
//!
//! ARCHITECTURE
//! ============
//! Records live in a local key-value store (one JSON document per key) and
//! may be mirrored to a remote REST API for signed-in users. `MoneyStore`
//! is the entry point: it consults the persisted storage mode and the
//! session, tries the remote leg when both allow it, and falls back to the
//! local store when the remote leg fails. A durable outbox remembers what
//! still has to reach the remote so `sync_local_data` can deliver it later
//! without creating duplicates.

pub mod categories;
pub mod config;
pub mod error;
pub mod export;
pub mod local;
pub mod mode;
pub mod models;
pub mod notify;
pub mod outbox;
pub mod remote;
pub mod services;
pub mod session;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::StoreConfig;
pub use error::StorageError;
pub use local::LocalStore;
pub use mode::StorageMode;
pub use services::sync::SyncReport;
pub use services::{Location, MoneyStore, Stored};
