//! Tests for the TOML secrets store: save/load round trips, wholesale
//! replacement on key collision, and byte-for-byte private-key
//! preservation

use proptest::prelude::*;
use snowlens_core::{
    Account, AuthMethod, ConnectionProfile, ProfileStore, StoreError, TomlFileStore,
};
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> TomlFileStore {
    TomlFileStore::with_path(dir.path().join("connections.toml"))
}

fn password_profile() -> ConnectionProfile {
    ConnectionProfile::new(
        Account::parse("xy12345").unwrap(),
        "alice",
        AuthMethod::password("hunter2"),
    )
    .with_role("ANALYST")
    .with_warehouse("COMPUTE_WH")
}

#[tokio::test]
async fn save_then_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let profile = password_profile();

    store.put(&profile.storage_key(), &profile).await.unwrap();
    let loaded = store
        .get("Default_xy12345_alice")
        .await
        .unwrap()
        .expect("entry should exist under the composite key");
    assert_eq!(loaded, profile);
}

#[tokio::test]
async fn missing_key_is_none() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    assert!(store.get("Default_none_nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn put_replaces_existing_entry_wholesale() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let first = password_profile();
    let second = ConnectionProfile::new(
        Account::parse("xy12345").unwrap(),
        "alice",
        AuthMethod::password("rotated"),
    );

    let key = first.storage_key();
    store.put(&key, &first).await.unwrap();
    store.put(&key, &second).await.unwrap();

    let loaded = store.get(&key).await.unwrap().unwrap();
    assert_eq!(loaded, second);
    // The old role/warehouse context must not survive the replace.
    assert_eq!(loaded.role, None);
    assert_eq!(loaded.warehouse, None);
}

#[tokio::test]
async fn list_reflects_saved_keys() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    assert!(store.list().await.unwrap().is_empty());

    let password = password_profile();
    let sso = ConnectionProfile::new(
        Account::parse("xy12345").unwrap(),
        "bob",
        AuthMethod::ExternalBrowser,
    );
    store.put(&password.storage_key(), &password).await.unwrap();
    store.put(&sso.storage_key(), &sso).await.unwrap();

    let mut keys = store.list().await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["Default_xy12345_alice", "SSO_xy12345_bob"]);
}

#[tokio::test]
async fn delete_removes_only_the_named_entry() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let profile = password_profile();
    store.put(&profile.storage_key(), &profile).await.unwrap();

    store.delete(&profile.storage_key()).await.unwrap();
    assert!(store.get(&profile.storage_key()).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_missing_key_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let err = store.delete("KPA_gone_nobody").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn secrets_file_is_human_editable_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("connections.toml");
    std::fs::write(
        &path,
        r#"
[SSO_xy12345_carol]
account = "xy12345"
user = "carol"
authenticator = "externalbrowser"
warehouse = "REPORTING_WH"
"#,
    )
    .unwrap();

    let store = TomlFileStore::with_path(path);
    let loaded = store.get("SSO_xy12345_carol").await.unwrap().unwrap();
    assert_eq!(loaded.auth, AuthMethod::ExternalBrowser);
    assert_eq!(loaded.warehouse.as_deref(), Some("REPORTING_WH"));
}

proptest! {
    // Private-key bytes survive the TOML byte-sequence representation
    // byte-for-byte
    #[test]
    fn private_key_bytes_preserved(der in prop::collection::vec(any::<u8>(), 1..256)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let dir = TempDir::new().unwrap();
            let store = store_in(&dir);
            let profile = ConnectionProfile::new(
                Account::parse("xy12345").unwrap(),
                "alice",
                AuthMethod::KeyPair { der: der.clone() },
            );
            store.put(&profile.storage_key(), &profile).await.unwrap();
            let loaded = store.get(&profile.storage_key()).await.unwrap().unwrap();
            assert_eq!(loaded.auth.private_key(), Some(der.as_slice()));
        });
    }
}
