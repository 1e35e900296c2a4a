//! Fallback orchestrator: every read and write for expenses and budgets.
//!
//! DESIGN
//! ======
//! `MoneyStore` routes each operation by two facts read fresh on every
//! call: the persisted storage mode and whether a user profile is stored.
//! Server mode plus a session tries the remote first; anything else goes
//! straight to the local store without touching the network.
//!
//! A record's `userId` names the account that holds it remotely, so it is
//! set only on the copy sent to the server or by a sync that delivered it.
//! Local-only writes never claim an owner. Local edits and deletes of a
//! record that already has an owner (or already has an outbox entry) are
//! queued so the next sync carries them.
//!
//! ERROR HANDLING
//! ==============
//! Remote-class failures (`StorageError::is_remote`) are absorbed: the
//! local equivalent runs, a pending outbox entry is recorded for
//! mutations, and the caller sees `Location::Local`. Local failures after a
//! remote failure are returned, since at that point the data landed nowhere.
//! Validation failures are returned before either backend is touched.

pub mod budgets;
pub mod expenses;
pub mod sync;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StorageError;
use crate::local::LocalStore;
use crate::mode::{self, ModeSelector, StorageMode};
use crate::models::{Record, UserProfile, next_id, now_iso};
use crate::notify::{Notice, Notifier, SAVED_LOCALLY, SAVED_TO_CLOUD};
use crate::outbox::{Outbox, OutboxOp};
use crate::remote::RemoteBackend;

// =============================================================================
// TYPES
// =============================================================================

/// Backend that ended up serving an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Remote,
    Local,
}

/// Result of every orchestrated operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    pub record: T,
    pub location: Location,
}

impl<T> Stored<T> {
    fn remote(record: T) -> Self {
        Self { record, location: Location::Remote }
    }

    fn local(record: T) -> Self {
        Self { record, location: Location::Local }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.location == Location::Local
    }
}

#[derive(Clone)]
pub struct MoneyStore {
    store: LocalStore,
    remote: Arc<dyn RemoteBackend>,
    notifier: Arc<dyn Notifier>,
    outbox: Outbox,
    modes: ModeSelector,
}

impl MoneyStore {
    #[must_use]
    pub fn new(store: LocalStore, remote: Arc<dyn RemoteBackend>, notifier: Arc<dyn Notifier>) -> Self {
        let outbox = Outbox::new(store.clone());
        let modes = ModeSelector::new(store.clone());
        Self { store, remote, notifier, outbox, modes }
    }

    #[must_use]
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    #[must_use]
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    #[must_use]
    pub fn mode(&self) -> StorageMode {
        self.modes.get_mode()
    }

    /// Guarded mode switch; see [`mode::switch_mode`].
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` or `RemoteUnavailable` when server mode is refused.
    pub async fn switch_mode(&self, target: StorageMode) -> Result<StorageMode, StorageError> {
        let signed_in = self.store.load_profile().is_some();
        mode::switch_mode(&self.modes, target, signed_in, self.remote.as_ref(), self.notifier.as_ref()).await
    }

    /// The session to use for a remote attempt, or `None` to stay local.
    fn remote_session(&self) -> Option<UserProfile> {
        if self.modes.get_mode() != StorageMode::Server {
            return None;
        }
        self.store.load_profile()
    }

    fn fell_back(&self, op: &'static str, entity: &'static str, error: &StorageError) {
        warn!(op, entity, error = %error, code = error.error_code(), "remote failed; using local storage");
        self.notifier.notify(Notice::warning(SAVED_LOCALLY));
    }

    fn saved_to_cloud(&self) {
        self.notifier.notify(Notice::success(SAVED_TO_CLOUD));
    }

    // =========================================================================
    // GENERIC CORE
    // =========================================================================

    async fn list_records<R: Record>(&self) -> Result<Stored<Vec<R>>, StorageError> {
        let entity = R::ENTITY;
        if self.remote_session().is_some() {
            match self.fetch_remote::<R>().await {
                Ok(records) => return Ok(Stored::remote(records)),
                Err(e) if e.is_remote() => {
                    warn!(entity = entity.name(), error = %e, "remote list failed; reading local storage");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Stored::local(self.store.load_records()))
    }

    async fn fetch_remote<R: Record>(&self) -> Result<Vec<R>, StorageError> {
        let items = self.remote.list(R::ENTITY).await?;
        serde_json::from_value(Value::Array(items)).map_err(|e| StorageError::MalformedResponse(e.to_string()))
    }

    /// Persist a freshly built record. Unowned local records are picked up
    /// by the next sync without an outbox entry.
    async fn insert_record<R: Record>(&self, mut record: R) -> Result<Stored<R>, StorageError> {
        let entity = R::ENTITY;
        let key = record.ensure_client_key();

        if let Some(session) = self.remote_session() {
            let sent = owned_by(&record, &session.id);
            let body = serde_json::to_value(&sent)?;
            match self.remote.create(entity, key, body).await {
                Ok(echo) => {
                    self.saved_to_cloud();
                    return Ok(Stored::remote(decode_echo(echo, sent)));
                }
                Err(e) if e.is_remote() => {
                    self.fell_back("create", entity.name(), &e);
                    let stored = self.local_insert(record)?;
                    self.outbox
                        .enqueue(entity, key, stored.id(), OutboxOp::Create)?;
                    return Ok(Stored::local(stored));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Stored::local(self.local_insert(record)?))
    }

    /// Patch the record addressed by `id` (local id or client key).
    async fn replace_record<R, F>(&self, id: &str, patch: F) -> Result<Stored<R>, StorageError>
    where
        R: Record,
        F: FnOnce(&mut R) -> Result<(), StorageError>,
    {
        let entity = R::ENTITY;
        let local = self.find_local::<R>(id);

        if let Some(session) = self.remote_session() {
            let base = match local.clone() {
                Some(record) => Some(record),
                None => self.find_remote::<R>(id).await,
            };
            let Some(mut record) = base else {
                return Err(not_found::<R>(id));
            };
            patch(&mut record)?;
            stamp_updated(&mut record);
            let key = record.ensure_client_key();
            let sent = owned_by(&record, &session.id);
            let body = serde_json::to_value(&sent)?;

            return match self.remote.update(entity, &record.remote_key(), body).await {
                Ok(echo) => {
                    if local.is_some() {
                        self.local_upsert(sent.clone())?;
                    }
                    self.saved_to_cloud();
                    Ok(Stored::remote(decode_echo(echo, sent)))
                }
                Err(e) if e.is_remote() => {
                    self.fell_back("update", entity.name(), &e);
                    let stored = self.local_upsert(record)?;
                    self.outbox
                        .enqueue(entity, key, stored.id(), OutboxOp::Update)?;
                    Ok(Stored::local(stored))
                }
                Err(e) => Err(e),
            };
        }

        let Some(mut record) = local else {
            return Err(not_found::<R>(id));
        };
        patch(&mut record)?;
        stamp_updated(&mut record);
        let stored = self.local_upsert(record)?;
        self.queue_local_change(&stored, OutboxOp::Update)?;
        Ok(Stored::local(stored))
    }

    /// Delete the record addressed by `id`; returns the id that was asked for.
    async fn remove_record<R: Record>(&self, id: &str) -> Result<Stored<String>, StorageError> {
        let entity = R::ENTITY;
        let local = self.find_local::<R>(id);

        if self.remote_session().is_some() {
            let remote_key = local.as_ref().map_or_else(|| id.to_owned(), Record::remote_key);
            match self.remote.delete(entity, &remote_key).await {
                Ok(()) => {
                    self.local_remove::<R>(id)?;
                    if let Some(key) = local.as_ref().and_then(Record::client_key) {
                        self.outbox.remove(entity, key)?;
                    }
                    self.saved_to_cloud();
                    return Ok(Stored::remote(id.to_owned()));
                }
                Err(e) if e.is_remote() => {
                    self.fell_back("delete", entity.name(), &e);
                    self.local_remove::<R>(id)?;
                    let key = local
                        .as_ref()
                        .and_then(Record::client_key)
                        .or_else(|| Uuid::parse_str(id).ok());
                    match key {
                        Some(key) => {
                            self.outbox.enqueue(entity, key, id, OutboxOp::Delete)?;
                        }
                        None => debug!(entity = entity.name(), id, "no client key; delete not queued"),
                    }
                    return Ok(Stored::local(id.to_owned()));
                }
                Err(e) => return Err(e),
            }
        }

        self.local_remove::<R>(id)?;
        if let Some(record) = &local {
            self.queue_local_change(record, OutboxOp::Delete)?;
        }
        Ok(Stored::local(id.to_owned()))
    }

    /// Queue a local-only update or delete when the server may already hold
    /// the record: it has an owner, or an earlier push for it is on record.
    fn queue_local_change<R: Record>(&self, record: &R, op: OutboxOp) -> Result<(), StorageError> {
        let entity = R::ENTITY;
        let Some(key) = record.client_key() else {
            return Ok(());
        };
        if record.user_id().is_none() && self.outbox.get(entity, key).is_none() {
            return Ok(());
        }
        self.outbox.enqueue(entity, key, record.id(), op)?;
        Ok(())
    }

    // =========================================================================
    // LOCAL HELPERS
    // =========================================================================

    fn find_local<R: Record>(&self, id: &str) -> Option<R> {
        self.store
            .load_records::<R>()
            .into_iter()
            .find(|r| r.matches_key(id))
    }

    async fn find_remote<R: Record>(&self, id: &str) -> Option<R> {
        match self.fetch_remote::<R>().await {
            Ok(records) => records.into_iter().find(|r| r.matches_key(id)),
            Err(e) => {
                debug!(entity = R::ENTITY.name(), id, error = %e, "remote lookup failed");
                None
            }
        }
    }

    /// Replace the stored copy of `record` (same client key, else same id),
    /// or append it.
    fn local_upsert<R: Record>(&self, record: R) -> Result<R, StorageError> {
        self.store.update_records::<R, _, _>(|records| {
            match records.iter_mut().find(|r| same_record(&**r, &record)) {
                Some(slot) => *slot = record.clone(),
                None => records.push(record.clone()),
            }
            Ok(record)
        })
    }

    /// Append a new record. The id is re-picked under the store lock when
    /// another record took it since the caller generated it.
    fn local_insert<R: Record>(&self, mut record: R) -> Result<R, StorageError> {
        self.store.update_records::<R, _, _>(|records| {
            let key = record.client_key();
            if let Some(slot) = records.iter_mut().find(|r| key.is_some() && r.client_key() == key) {
                *slot = record.clone();
                return Ok(record);
            }
            if records.iter().any(|r| r.id() == record.id()) {
                let fresh = next_id(records.iter().map(Record::id));
                debug!(entity = R::ENTITY.name(), taken = record.id(), id = %fresh, "id collision; re-picked");
                record.set_id(fresh);
            }
            records.push(record.clone());
            Ok(record)
        })
    }

    /// Filter out every record matching `id`. Missing ids are not an error.
    fn local_remove<R: Record>(&self, id: &str) -> Result<(), StorageError> {
        self.store.update_records::<R, _, _>(|records| {
            records.retain(|r| !r.matches_key(id));
            Ok(())
        })
    }
}

/// The server's copy when it parses as `R`, otherwise what was sent.
fn decode_echo<R: Record>(echo: Value, sent: R) -> R {
    if echo.is_null() {
        return sent;
    }
    serde_json::from_value(echo).unwrap_or_else(|e| {
        debug!(entity = R::ENTITY.name(), error = %e, "remote echo not a full record; keeping sent copy");
        sent
    })
}

/// Copy of `record` as the server should hold it for `user_id`.
fn owned_by<R: Record>(record: &R, user_id: &str) -> R {
    let mut owned = record.clone();
    owned.set_user_id(Some(user_id.to_owned()));
    owned
}

fn same_record<R: Record>(stored: &R, record: &R) -> bool {
    match (stored.client_key(), record.client_key()) {
        (Some(a), Some(b)) => a == b,
        _ => stored.id() == record.id(),
    }
}

fn stamp_updated<R: Record>(record: &mut R) {
    record.set_updated_at(now_iso());
}

fn not_found<R: Record>(id: &str) -> StorageError {
    StorageError::NotFound { entity: R::ENTITY.name(), id: id.to_owned() }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
