use super::*;
use crate::notify::RecordingNotifier;
use crate::test_helpers::{self, MockRemote};

#[test]
fn mode_defaults_to_local() {
    let selector = ModeSelector::new(test_helpers::memory_store());
    assert_eq!(selector.get_mode(), StorageMode::Local);
}

#[test]
fn mode_round_trips_as_bare_word() {
    let store = test_helpers::memory_store();
    let selector = ModeSelector::new(store.clone());

    selector.set_mode(StorageMode::Server).unwrap();
    assert_eq!(selector.get_mode(), StorageMode::Server);
    assert_eq!(store.get_raw(STORAGE_MODE_KEY).as_deref(), Some("server"));
}

#[test]
fn unknown_stored_value_reads_as_local() {
    let store = test_helpers::memory_store();
    store.set_raw(STORAGE_MODE_KEY, "cloud".into()).unwrap();
    assert_eq!(ModeSelector::new(store).get_mode(), StorageMode::Local);
}

#[test]
fn parse_and_display() {
    assert_eq!("server".parse::<StorageMode>().unwrap(), StorageMode::Server);
    assert!("hybrid".parse::<StorageMode>().is_err());
    assert_eq!(StorageMode::Local.to_string(), "local");
}

#[tokio::test]
async fn probe_reflects_remote_reachability() {
    let remote = MockRemote::new();
    assert!(is_server_mode_available(&remote).await);
    remote.set_offline(true);
    assert!(!is_server_mode_available(&remote).await);
}

#[tokio::test]
async fn switch_to_server_rejected_when_unavailable() {
    let selector = ModeSelector::new(test_helpers::memory_store());
    let remote = MockRemote::new();
    remote.set_offline(true);
    let notifier = RecordingNotifier::new();

    let err = switch_mode(&selector, StorageMode::Server, true, &remote, &notifier)
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::RemoteUnavailable(_)));
    assert_eq!(selector.get_mode(), StorageMode::Local);
    assert_eq!(notifier.messages(), vec![SERVER_MODE_UNAVAILABLE.to_owned()]);
}

#[tokio::test]
async fn switch_to_server_requires_sign_in() {
    let selector = ModeSelector::new(test_helpers::memory_store());
    let remote = MockRemote::new();
    let notifier = RecordingNotifier::new();

    let err = switch_mode(&selector, StorageMode::Server, false, &remote, &notifier)
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::NotAuthenticated));
    assert_eq!(selector.get_mode(), StorageMode::Local);
    assert_eq!(remote.calls(), 0);
}

#[tokio::test]
async fn switch_to_server_persists_when_available() {
    let selector = ModeSelector::new(test_helpers::memory_store());
    let remote = MockRemote::new();
    let notifier = RecordingNotifier::new();

    let mode = switch_mode(&selector, StorageMode::Server, true, &remote, &notifier)
        .await
        .unwrap();

    assert_eq!(mode, StorageMode::Server);
    assert_eq!(selector.get_mode(), StorageMode::Server);
}

#[tokio::test]
async fn switch_to_local_never_probes() {
    let store = test_helpers::memory_store();
    let selector = ModeSelector::new(store);
    selector.set_mode(StorageMode::Server).unwrap();
    let remote = MockRemote::new();
    remote.set_offline(true);

    switch_mode(&selector, StorageMode::Local, false, &remote, &RecordingNotifier::new())
        .await
        .unwrap();

    assert_eq!(selector.get_mode(), StorageMode::Local);
    assert_eq!(remote.calls(), 0);
}
