//! Budget operations. Storage allows several budgets per category; callers
//! that want one per category use `budget_for_category`.

use tracing::info;

use super::{MoneyStore, Stored};
use crate::error::StorageError;
use crate::models::{Budget, BudgetPatch, NewBudget, Record, next_id, now_iso};
use crate::validation::{coerce_amount, required};

impl MoneyStore {
    /// # Errors
    ///
    /// Local read path never fails; remote failures fall back to it.
    pub async fn get_budgets(&self) -> Result<Stored<Vec<Budget>>, StorageError> {
        self.list_records().await
    }

    /// # Errors
    ///
    /// `ValidationFailed` for a blank category or a bad amount; local write
    /// errors otherwise.
    pub async fn add_budget(&self, input: NewBudget) -> Result<Stored<Budget>, StorageError> {
        let category_id = required("category", &input.category_id)?;
        let amount = coerce_amount(&input.amount)?;

        let existing = self.store.load_budgets();
        let mut budget = Budget {
            id: next_id(existing.iter().map(Record::id)),
            category_id,
            amount,
            period: input.period,
            user_id: None,
            created_at: now_iso(),
            updated_at: None,
            client_key: None,
        };
        budget.ensure_client_key();

        let stored = self.insert_record(budget).await?;
        info!(id = %stored.record.id, category = %stored.record.category_id, location = ?stored.location, "budget added");
        Ok(stored)
    }

    /// # Errors
    ///
    /// `NotFound`, `ValidationFailed`, or local write errors.
    pub async fn update_budget(&self, id: &str, patch: BudgetPatch) -> Result<Stored<Budget>, StorageError> {
        let stored = self
            .replace_record(id, |budget: &mut Budget| {
                if let Some(category_id) = patch.category_id {
                    budget.category_id = required("category", &category_id)?;
                }
                if let Some(amount) = patch.amount {
                    budget.amount = coerce_amount(&amount)?;
                }
                if let Some(period) = patch.period {
                    budget.period = period;
                }
                Ok(())
            })
            .await?;
        info!(id, location = ?stored.location, "budget updated");
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns local write errors; a missing id is not an error.
    pub async fn delete_budget(&self, id: &str) -> Result<Stored<String>, StorageError> {
        let stored = self.remove_record::<Budget>(id).await?;
        info!(id, location = ?stored.location, "budget deleted");
        Ok(stored)
    }

    /// First budget for `category_id` from whichever backend serves reads.
    ///
    /// # Errors
    ///
    /// Same as `get_budgets`.
    pub async fn budget_for_category(&self, category_id: &str) -> Result<Option<Budget>, StorageError> {
        let budgets = self.get_budgets().await?;
        Ok(budgets
            .record
            .into_iter()
            .find(|b| b.category_id == category_id))
    }
}
