//! Signed-in user profile.
//!
//! The profile is the session: its presence decides whether the
//! orchestrator tries the remote, and its token feeds every request's auth
//! headers. Token exchange happens elsewhere; this module only stores the
//! result.

use tracing::info;

use crate::error::StorageError;
use crate::local::LocalStore;
use crate::models::{UserProfile, now_iso};

/// Store `profile` as the current session, stamping `loginTime` when absent.
///
/// # Errors
///
/// Returns `ValidationFailed` for an empty user id, or the store's write error.
pub fn login(store: &LocalStore, mut profile: UserProfile) -> Result<UserProfile, StorageError> {
    if profile.id.trim().is_empty() {
        return Err(StorageError::ValidationFailed("user id is required".into()));
    }
    if profile.login_time.is_none() {
        profile.login_time = Some(now_iso());
    }
    store.save_profile(&profile)?;
    info!(user_id = %profile.id, provider = profile.provider.as_deref().unwrap_or("unknown"), "user signed in");
    Ok(profile)
}

#[must_use]
pub fn current_user(store: &LocalStore) -> Option<UserProfile> {
    store.load_profile()
}

/// Clear the stored profile wholesale. Local records and the storage mode
/// flag are left as they are.
///
/// # Errors
///
/// Returns `Io` if the stored profile cannot be removed.
pub fn logout(store: &LocalStore) -> Result<(), StorageError> {
    let previous = store.load_profile();
    store.clear_profile()?;
    if let Some(profile) = previous {
        info!(user_id = %profile.id, "user signed out");
    }
    Ok(())
}
