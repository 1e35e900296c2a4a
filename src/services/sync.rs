//! Push locally stored records to the server for a signed-in user.
//!
//! DESIGN
//! ======
//! Sync runs in three passes. The first walks both local collections and
//! queues a create for every record not yet owned by the target user and
//! not already delivered to that user. The second drains the outbox in
//! enqueue order, pushing each due entry with its client key, so replaying
//! a run (or a run that overlaps an earlier fallback) never creates a
//! second remote record. The third prunes the entries this user now owns.
//!
//! ERROR HANDLING
//! ==============
//! A retryable failure (unreachable server, rate limit, 5xx) ends the run:
//! the entry stays pending and later entries are not attempted. Any other
//! rejection marks that entry failed and the run continues. Nothing already
//! pushed is rolled back.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::MoneyStore;
use crate::error::StorageError;
use crate::models::{Budget, Entity, Expense, Record};
use crate::outbox::{OutboxEntry, OutboxOp};

/// Outcome of one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Entries delivered in this run.
    pub pushed: usize,
    /// Records already delivered, or queued entries with nothing left to send.
    pub skipped: usize,
    /// Entries the server rejected in this run.
    pub failed: usize,
    /// True when a retryable failure stopped the run early.
    pub aborted: bool,
}

enum PushOutcome {
    Pushed,
    Gone,
}

impl MoneyStore {
    /// Deliver every local record not yet owned by `user_id`, plus anything
    /// left pending by earlier fallbacks.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a stored profile; local read/write errors.
    /// Remote failures are reported in the `SyncReport`, not as errors.
    pub async fn sync_local_data(&self, user_id: &str) -> Result<SyncReport, StorageError> {
        if self.store.load_profile().is_none() {
            return Err(StorageError::NotAuthenticated);
        }

        let mut report = SyncReport::default();
        report.skipped += self.queue_unowned::<Expense>(user_id)?;
        report.skipped += self.queue_unowned::<Budget>(user_id)?;

        for entry in self.outbox.due() {
            match self.push_entry(&entry, user_id).await {
                Ok(outcome) => {
                    self.outbox
                        .mark_synced(entry.entity, entry.client_key, user_id)?;
                    match outcome {
                        PushOutcome::Pushed => report.pushed += 1,
                        PushOutcome::Gone => report.skipped += 1,
                    }
                }
                Err(e) if e.retryable() => {
                    warn!(entity = entry.entity.name(), key = %entry.client_key, error = %e, "sync aborted; server unreachable");
                    self.outbox
                        .mark_attempted(entry.entity, entry.client_key, &e.to_string())?;
                    report.aborted = true;
                    break;
                }
                Err(e) if e.is_remote() => {
                    warn!(entity = entry.entity.name(), key = %entry.client_key, error = %e, "sync entry rejected");
                    self.outbox
                        .mark_failed(entry.entity, entry.client_key, &e.to_string())?;
                    report.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.outbox.prune_synced(user_id)?;

        info!(
            user_id,
            pushed = report.pushed,
            skipped = report.skipped,
            failed = report.failed,
            aborted = report.aborted,
            "sync finished"
        );
        Ok(report)
    }

    /// Queue a create for each record whose owner differs from `user_id`.
    /// Returns how many such records were already delivered to `user_id`.
    fn queue_unowned<R: Record>(&self, user_id: &str) -> Result<usize, StorageError> {
        let entity = R::ENTITY;

        // Legacy records get their idempotency key persisted before anything
        // is queued under it.
        let unowned: Vec<R> = self.store.update_records::<R, _, _>(|records| {
            Ok(records
                .iter_mut()
                .filter(|r| r.user_id() != Some(user_id))
                .map(|r| {
                    r.ensure_client_key();
                    r.clone()
                })
                .collect())
        })?;

        let mut skipped = 0;
        for record in unowned {
            let Some(key) = record.client_key() else {
                continue;
            };
            match self.outbox.get(entity, key) {
                Some(entry) if entry.is_due() => {}
                Some(entry) if entry.is_synced_for(user_id) => skipped += 1,
                _ => {
                    self.outbox
                        .enqueue(entity, key, record.id(), OutboxOp::Create)?;
                }
            }
        }
        Ok(skipped)
    }

    async fn push_entry(&self, entry: &OutboxEntry, user_id: &str) -> Result<PushOutcome, StorageError> {
        match entry.entity {
            Entity::Expense => self.push_record::<Expense>(entry, user_id).await,
            Entity::Budget => self.push_record::<Budget>(entry, user_id).await,
        }
    }

    async fn push_record<R: Record>(&self, entry: &OutboxEntry, user_id: &str) -> Result<PushOutcome, StorageError> {
        let entity = R::ENTITY;
        let key = entry.client_key;

        if entry.op == OutboxOp::Delete {
            return match self.remote.delete(entity, &key.to_string()).await {
                Ok(()) => Ok(PushOutcome::Pushed),
                Err(StorageError::Remote { status: 404, .. }) => Ok(PushOutcome::Gone),
                Err(e) => Err(e),
            };
        }

        let Some(mut record) = self
            .store
            .load_records::<R>()
            .into_iter()
            .find(|r| r.client_key() == Some(key))
        else {
            // Deleted locally after it was queued; nothing left to send.
            return Ok(PushOutcome::Gone);
        };
        record.set_user_id(Some(user_id.to_owned()));
        let body = serde_json::to_value(&record)?;

        match entry.op {
            OutboxOp::Update => match self.remote.update(entity, &key.to_string(), body.clone()).await {
                Ok(_) => {}
                Err(StorageError::Remote { status: 404, .. }) => {
                    self.remote.create(entity, key, body).await?;
                }
                Err(e) => return Err(e),
            },
            _ => {
                self.remote.create(entity, key, body).await?;
            }
        }

        self.stamp_owner::<R>(key, user_id)?;
        Ok(PushOutcome::Pushed)
    }

    fn stamp_owner<R: Record>(&self, key: Uuid, user_id: &str) -> Result<(), StorageError> {
        self.store.update_records::<R, _, _>(|records| {
            for record in records.iter_mut().filter(|r| r.client_key() == Some(key)) {
                record.set_user_id(Some(user_id.to_owned()));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
