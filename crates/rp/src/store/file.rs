// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed store: JSON object persisted with atomic writes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use super::{StorageKey, TokenStore};

/// Token store that survives process restarts.
///
/// The whole map is rewritten on every mutation (write tmp + rename), so a
/// crash mid-write leaves the previous contents intact. Write failures are
/// logged and otherwise ignored; the in-memory view stays authoritative for
/// the running process.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<StorageKey, String>>,
}

impl FileStore {
    /// Open a store at `path`. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values: Mutex::new(values) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<StorageKey, String>) {
        if let Err(e) = save(&self.path, values) {
            tracing::warn!(path = %self.path.display(), err = %e, "failed to persist token store");
        }
    }
}

impl TokenStore for FileStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        self.values.lock().get(&key).cloned()
    }

    fn set(&self, key: StorageKey, value: &str) {
        let mut values = self.values.lock();
        values.insert(key, value.to_owned());
        self.persist(&values);
    }

    fn reset_auth_state(&self) {
        let mut values = self.values.lock();
        for key in StorageKey::AUTH_STATE {
            values.remove(&key);
        }
        self.persist(&values);
    }
}

/// Write the map atomically (write tmp + rename).
///
/// The temp name carries the PID and a per-process counter, so concurrent
/// saves to one path, from any number of stores, never share a temp file.
fn save(path: &Path, values: &HashMap<StorageKey, String>) -> anyhow::Result<()> {
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string_pretty(values)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
