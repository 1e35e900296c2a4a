//! Expense operations.

use tracing::info;

use super::{MoneyStore, Stored};
use crate::error::StorageError;
use crate::models::{Expense, ExpensePatch, NewExpense, Record, next_id, now_iso};
use crate::validation::{coerce_amount, required, required_date};

impl MoneyStore {
    /// # Errors
    ///
    /// Remote failures fall back to local storage, whose reads do not fail;
    /// the signature leaves room for non-recoverable errors.
    pub async fn get_expenses(&self) -> Result<Stored<Vec<Expense>>, StorageError> {
        self.list_records().await
    }

    /// Validate `input`, build the record, and persist it.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` for a blank description or category, a bad date,
    /// or an amount that is not a positive number up to the maximum; local
    /// write errors otherwise.
    pub async fn add_expense(&self, input: NewExpense) -> Result<Stored<Expense>, StorageError> {
        let description = required("description", &input.description)?;
        let category_id = required("category", &input.category_id)?;
        let date = required_date(&input.date)?;
        let amount = coerce_amount(&input.amount)?;

        let existing = self.store.load_expenses();
        let mut expense = Expense {
            id: next_id(existing.iter().map(Record::id)),
            description,
            amount,
            category_id,
            date,
            notes: input.notes.trim().to_owned(),
            user_id: None,
            created_at: now_iso(),
            updated_at: None,
            client_key: None,
        };
        expense.ensure_client_key();

        let stored = self.insert_record(expense).await?;
        info!(id = %stored.record.id, location = ?stored.location, "expense added");
        Ok(stored)
    }

    /// Apply `patch` to the expense addressed by `id`.
    ///
    /// # Errors
    ///
    /// `NotFound` when no backend has the record, `ValidationFailed` for a
    /// bad patched field, local write errors otherwise.
    pub async fn update_expense(&self, id: &str, patch: ExpensePatch) -> Result<Stored<Expense>, StorageError> {
        let stored = self
            .replace_record(id, |expense: &mut Expense| apply_patch(expense, patch))
            .await?;
        info!(id, location = ?stored.location, "expense updated");
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns local write errors; a missing id is not an error.
    pub async fn delete_expense(&self, id: &str) -> Result<Stored<String>, StorageError> {
        let stored = self.remove_record::<Expense>(id).await?;
        info!(id, location = ?stored.location, "expense deleted");
        Ok(stored)
    }
}

fn apply_patch(expense: &mut Expense, patch: ExpensePatch) -> Result<(), StorageError> {
    if let Some(description) = patch.description {
        expense.description = required("description", &description)?;
    }
    if let Some(amount) = patch.amount {
        expense.amount = coerce_amount(&amount)?;
    }
    if let Some(category_id) = patch.category_id {
        expense.category_id = required("category", &category_id)?;
    }
    if let Some(date) = patch.date {
        expense.date = required_date(&date)?;
    }
    if let Some(notes) = patch.notes {
        expense.notes = notes.trim().to_owned();
    }
    Ok(())
}

#[cfg(test)]
#[path = "expenses_test.rs"]
mod tests;
