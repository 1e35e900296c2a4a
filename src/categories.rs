//! Expense categories: a fixed default set plus user-created entries.
//!
//! Custom entries go immediately before the `other` sentinel so the
//! catch-all stays last in every picker. Categories are local-only; they
//! are never sent to the remote API.

use tracing::info;

use crate::error::StorageError;
use crate::local::LocalStore;
use crate::models::Category;
use crate::validation::{is_valid_hex_color, required};

/// Id of the catch-all entry that always stays last.
pub const OTHER_ID: &str = "other";

const DEFAULTS: &[(&str, &str, &str, &str)] = &[
    ("food", "Food & Dining", "🍔", "#ef4444"),
    ("transport", "Transportation", "🚗", "#f59e0b"),
    ("shopping", "Shopping", "🛍️", "#ec4899"),
    ("entertainment", "Entertainment", "🎬", "#8b5cf6"),
    ("bills", "Bills & Utilities", "💡", "#3b82f6"),
    ("health", "Health & Fitness", "💊", "#10b981"),
    ("education", "Education", "📚", "#6366f1"),
    ("travel", "Travel", "✈️", "#14b8a6"),
    (OTHER_ID, "Other", "📦", "#6b7280"),
];

#[must_use]
pub fn default_categories() -> Vec<Category> {
    DEFAULTS
        .iter()
        .map(|(id, name, icon, color)| Category {
            id: (*id).to_owned(),
            name: (*name).to_owned(),
            icon: (*icon).to_owned(),
            color: (*color).to_owned(),
        })
        .collect()
}

#[must_use]
pub fn is_default_category(id: &str) -> bool {
    DEFAULTS.iter().any(|(default_id, ..)| *default_id == id)
}

#[must_use]
pub fn get_categories(store: &LocalStore) -> Vec<Category> {
    store.load_categories()
}

/// Add a custom category before `other`.
///
/// # Errors
///
/// `ValidationFailed` for a blank or duplicate name (case-insensitive) or a
/// color that is not `#rgb`/`#rrggbb`; the store's write error otherwise.
pub fn add_category(store: &LocalStore, name: &str, icon: &str, color: &str) -> Result<Category, StorageError> {
    let name = required("name", name)?;
    if !is_valid_hex_color(color) {
        return Err(StorageError::ValidationFailed(format!("color '{color}' is not a hex color")));
    }

    let mut categories = store.load_categories();
    if categories.iter().any(|c| c.name.eq_ignore_ascii_case(&name)) {
        return Err(StorageError::ValidationFailed(format!("category '{name}' already exists")));
    }

    let category = Category {
        id: unique_slug(&name, &categories),
        name,
        icon: icon.trim().to_owned(),
        color: color.to_owned(),
    };
    let at = categories
        .iter()
        .position(|c| c.id == OTHER_ID)
        .unwrap_or(categories.len());
    categories.insert(at, category.clone());
    store.save_categories(&categories)?;

    info!(id = %category.id, name = %category.name, "category added");
    Ok(category)
}

/// Remove a custom category. Expenses and budgets that reference it keep
/// the dangling id.
///
/// # Errors
///
/// `ValidationFailed` for a default category, `NotFound` for an unknown id.
pub fn delete_category(store: &LocalStore, id: &str) -> Result<(), StorageError> {
    if is_default_category(id) {
        return Err(StorageError::ValidationFailed(format!("default category '{id}' cannot be deleted")));
    }
    let mut categories = store.load_categories();
    let before = categories.len();
    categories.retain(|c| c.id != id);
    if categories.len() == before {
        return Err(StorageError::NotFound { entity: "category", id: id.to_owned() });
    }
    store.save_categories(&categories)?;
    info!(id, "category deleted");
    Ok(())
}

/// Resolve a category id to its display name, falling back to the id.
#[must_use]
pub fn category_name<'a>(categories: &'a [Category], id: &'a str) -> &'a str {
    categories
        .iter()
        .find(|c| c.id == id)
        .map_or(id, |c| c.name.as_str())
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() { "custom".to_owned() } else { slug.to_owned() }
}

fn unique_slug(name: &str, existing: &[Category]) -> String {
    let base = slugify(name);
    let taken = |id: &str| existing.iter().any(|c| c.id == id);
    if !taken(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers;

    #[test]
    fn defaults_end_with_other() {
        let defaults = default_categories();
        assert_eq!(defaults.last().map(|c| c.id.as_str()), Some(OTHER_ID));
        assert!(defaults.iter().all(|c| is_valid_hex_color(&c.color)));
    }

    #[test]
    fn custom_category_lands_before_other() {
        let store = test_helpers::memory_store();

        let added = add_category(&store, "  Pet Care ", "🐶", "#aabbcc").unwrap();

        assert_eq!(added.id, "pet-care");
        assert_eq!(added.name, "Pet Care");
        let ids: Vec<String> = get_categories(&store).into_iter().map(|c| c.id).collect();
        assert_eq!(ids[ids.len() - 2], "pet-care");
        assert_eq!(ids.last().map(String::as_str), Some(OTHER_ID));
    }

    #[test]
    fn appends_when_other_is_missing() {
        let store = test_helpers::memory_store();
        let mut cats = default_categories();
        cats.retain(|c| c.id != OTHER_ID);
        store.save_categories(&cats).unwrap();

        add_category(&store, "Gifts", "🎁", "#fff").unwrap();

        assert_eq!(get_categories(&store).last().map(|c| c.id.as_str()), Some("gifts"));
    }

    #[test]
    fn duplicate_names_rejected_case_insensitively() {
        let store = test_helpers::memory_store();
        let err = add_category(&store, "travel", "🧳", "#123456").unwrap_err();
        assert!(matches!(err, StorageError::ValidationFailed(_)));
    }

    #[test]
    fn bad_color_and_blank_name_rejected() {
        let store = test_helpers::memory_store();
        assert!(add_category(&store, "Gifts", "🎁", "red").is_err());
        assert!(add_category(&store, "   ", "🎁", "#fff").is_err());
        assert_eq!(get_categories(&store), default_categories());
    }

    #[test]
    fn colliding_slug_gets_suffix() {
        let store = test_helpers::memory_store();
        add_category(&store, "Pet Care", "🐶", "#aabbcc").unwrap();
        let second = add_category(&store, "Pet-Care!", "🐱", "#aabbcc").unwrap();
        assert_eq!(second.id, "pet-care-2");
    }

    #[test]
    fn delete_custom_but_not_default() {
        let store = test_helpers::memory_store();
        add_category(&store, "Gifts", "🎁", "#fff").unwrap();

        delete_category(&store, "gifts").unwrap();
        assert!(get_categories(&store).iter().all(|c| c.id != "gifts"));

        assert!(matches!(delete_category(&store, "food"), Err(StorageError::ValidationFailed(_))));
        assert!(matches!(delete_category(&store, "gifts"), Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn name_lookup_falls_back_to_id() {
        let cats = default_categories();
        assert_eq!(category_name(&cats, "food"), "Food & Dining");
        assert_eq!(category_name(&cats, "mystery"), "mystery");
    }
}
