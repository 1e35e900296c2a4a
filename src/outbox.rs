//! Durable record of local mutations that still have to reach the server.
//!
//! DESIGN
//! ======
//! One entry per `(entity, clientKey)`. A new mutation for a key folds into
//! the existing entry instead of appending: a pending create absorbs later
//! updates (the push reads the current local record anyway), and a delete
//! supersedes everything before it. Entries move `pending -> synced` on a
//! successful push or `pending -> failed` when the server rejects the
//! record; failed entries are retried by the next sync.
//!
//! A synced entry remembers the user it was delivered to. Delivery to one
//! account says nothing about another, so a sync for a different user
//! queues the record again. Once a run has stamped its records with the
//! owner, `prune_synced` drops that user's synced entries; the owner stamp
//! is what keeps later runs from pushing them twice.
//!
//! The whole outbox is a single JSON document under `money_manager_outbox`,
//! rewritten through `LocalStore::update` so concurrent enqueues in one
//! process cannot drop each other.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::StorageError;
use crate::local::{LocalStore, OUTBOX_KEY};
use crate::models::{Entity, now_iso};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxOp {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Synced,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    pub entity: Entity,
    pub client_key: Uuid,
    /// Local id at enqueue time, for display and for legacy lookups.
    pub record_id: String,
    pub op: OutboxOp,
    pub status: OutboxStatus,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// User whose account received the last successful push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_for: Option<String>,
    pub updated_at: String,
}

impl OutboxEntry {
    /// True when the next sync should push this entry.
    #[must_use]
    pub fn is_due(&self) -> bool {
        matches!(self.status, OutboxStatus::Pending | OutboxStatus::Failed)
    }

    #[must_use]
    pub fn is_synced_for(&self, user_id: &str) -> bool {
        self.status == OutboxStatus::Synced && self.synced_for.as_deref() == Some(user_id)
    }

    fn is_for(&self, entity: Entity, key: Uuid) -> bool {
        self.entity == entity && self.client_key == key
    }
}

#[derive(Clone)]
pub struct Outbox {
    store: LocalStore,
}

impl Outbox {
    #[must_use]
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn entries(&self) -> Vec<OutboxEntry> {
        self.store.get_or(OUTBOX_KEY, Vec::new())
    }

    /// Entries still waiting for a successful push, in enqueue order.
    #[must_use]
    pub fn due(&self) -> Vec<OutboxEntry> {
        self.entries()
            .into_iter()
            .filter(OutboxEntry::is_due)
            .collect()
    }

    #[must_use]
    pub fn get(&self, entity: Entity, key: Uuid) -> Option<OutboxEntry> {
        self.entries()
            .into_iter()
            .find(|e| e.is_for(entity, key))
    }

    /// Record a mutation as pending, folding it into any existing entry.
    ///
    /// # Errors
    ///
    /// Returns the store's write error.
    pub fn enqueue(&self, entity: Entity, key: Uuid, record_id: &str, op: OutboxOp) -> Result<OutboxEntry, StorageError> {
        let entry = self.store.update(OUTBOX_KEY, Vec::<OutboxEntry>::new(), |entries| {
            let now = now_iso();
            if let Some(existing) = entries.iter_mut().find(|e| e.is_for(entity, key)) {
                existing.op = merge_op(existing, op);
                existing.status = OutboxStatus::Pending;
                existing.record_id = record_id.to_owned();
                existing.updated_at = now;
                return Ok(existing.clone());
            }
            let entry = OutboxEntry {
                entity,
                client_key: key,
                record_id: record_id.to_owned(),
                op,
                status: OutboxStatus::Pending,
                attempts: 0,
                last_error: None,
                synced_for: None,
                updated_at: now,
            };
            entries.push(entry.clone());
            Ok(entry)
        })?;
        debug!(entity = entity.name(), %key, op = ?entry.op, "outbox entry pending");
        Ok(entry)
    }

    /// # Errors
    ///
    /// Returns the store's write error.
    pub fn mark_synced(&self, entity: Entity, key: Uuid, user_id: &str) -> Result<(), StorageError> {
        self.modify(entity, key, |entry| {
            entry.status = OutboxStatus::Synced;
            entry.attempts += 1;
            entry.last_error = None;
            entry.synced_for = Some(user_id.to_owned());
        })
    }

    /// The server rejected the record; keep it for a later retry.
    ///
    /// # Errors
    ///
    /// Returns the store's write error.
    pub fn mark_failed(&self, entity: Entity, key: Uuid, error: &str) -> Result<(), StorageError> {
        self.modify(entity, key, |entry| {
            entry.status = OutboxStatus::Failed;
            entry.attempts += 1;
            entry.last_error = Some(error.to_owned());
        })
    }

    /// The push never got an answer; the entry stays pending.
    ///
    /// # Errors
    ///
    /// Returns the store's write error.
    pub fn mark_attempted(&self, entity: Entity, key: Uuid, error: &str) -> Result<(), StorageError> {
        self.modify(entity, key, |entry| {
            entry.status = OutboxStatus::Pending;
            entry.attempts += 1;
            entry.last_error = Some(error.to_owned());
        })
    }

    /// # Errors
    ///
    /// Returns the store's write error.
    pub fn remove(&self, entity: Entity, key: Uuid) -> Result<(), StorageError> {
        self.store.update(OUTBOX_KEY, Vec::<OutboxEntry>::new(), |entries| {
            entries.retain(|e| !e.is_for(entity, key));
            Ok(())
        })
    }

    /// Drop every entry already delivered to `user_id`; returns how many.
    ///
    /// # Errors
    ///
    /// Returns the store's write error.
    pub fn prune_synced(&self, user_id: &str) -> Result<usize, StorageError> {
        let pruned = self.store.update(OUTBOX_KEY, Vec::<OutboxEntry>::new(), |entries| {
            let before = entries.len();
            entries.retain(|e| !e.is_synced_for(user_id));
            Ok(before - entries.len())
        })?;
        if pruned > 0 {
            debug!(user_id, pruned, "synced outbox entries pruned");
        }
        Ok(pruned)
    }

    fn modify(&self, entity: Entity, key: Uuid, f: impl FnOnce(&mut OutboxEntry)) -> Result<(), StorageError> {
        self.store.update(OUTBOX_KEY, Vec::<OutboxEntry>::new(), |entries| {
            if let Some(entry) = entries.iter_mut().find(|e| e.is_for(entity, key)) {
                f(entry);
                entry.updated_at = now_iso();
            }
            Ok(())
        })
    }
}

fn merge_op(existing: &OutboxEntry, incoming: OutboxOp) -> OutboxOp {
    match (existing.status, existing.op, incoming) {
        // Never reached the server: the create still has to happen and will
        // carry the latest local fields.
        (OutboxStatus::Pending | OutboxStatus::Failed, OutboxOp::Create, OutboxOp::Update) => OutboxOp::Create,
        (_, _, incoming) => incoming,
    }
}

#[cfg(test)]
#[path = "outbox_test.rs"]
mod tests;
