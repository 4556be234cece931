// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn missing_file_starts_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::open(dir.path().join("tokens.json"))?;
    assert_eq!(store.get(StorageKey::AuthorizedState), None);
    Ok(())
}

#[test]
fn values_survive_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");

    let store = FileStore::open(&path)?;
    store.set(StorageKey::AccessToken, "AT%201");
    store.set(StorageKey::SessionState, "abc.123");
    drop(store);

    let reopened = FileStore::open(&path)?;
    assert_eq!(reopened.get(StorageKey::AccessToken).as_deref(), Some("AT%201"));
    assert_eq!(reopened.get(StorageKey::SessionState).as_deref(), Some("abc.123"));

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(raw["accessToken"], "AT%201");
    Ok(())
}

#[test]
fn reset_is_persisted() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");

    let store = FileStore::open(&path)?;
    store.set(StorageKey::AuthorizedState, "Authorized");
    store.set(StorageKey::IdToken, "IT1");
    store.reset_auth_state();

    let reopened = FileStore::open(&path)?;
    assert_eq!(reopened.get(StorageKey::AuthorizedState), None);
    assert_eq!(reopened.get(StorageKey::IdToken), None);
    Ok(())
}

#[test]
fn corrupt_file_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");
    std::fs::write(&path, "not json")?;
    assert!(FileStore::open(&path).is_err());
    Ok(())
}

#[test]
fn concurrent_stores_on_one_path_stay_readable() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");
    let a = FileStore::open(&path)?;
    let b = FileStore::open(&path)?;

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..200 {
                a.set(StorageKey::AccessToken, &"a".repeat(1 + i % 50));
            }
        });
        s.spawn(|| {
            for i in 0..200 {
                b.set(StorageKey::IdToken, &"b".repeat(1 + i % 7));
            }
        });
    });

    let reopened = FileStore::open(&path)?;
    assert!(
        reopened.get(StorageKey::AccessToken).is_some()
            || reopened.get(StorageKey::IdToken).is_some()
    );
    let leftovers = std::fs::read_dir(dir.path())?
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
    Ok(())
}
