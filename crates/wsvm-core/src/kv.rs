//! Durable key/value storage behind `ws_set_db` / `ws_get_db`.

use crate::error::{CollabResult, CollaboratorError};
use std::collections::HashMap;
use std::sync::RwLock;

/// Process-wide key/value store. Lifetime is owned by the embedder, not the run.
pub trait KvStore: Send + Sync {
    fn set(&self, key: &str, value: &str) -> CollabResult<()>;
    fn get(&self, key: &str) -> CollabResult<Option<String>>;
}

/// In-memory store, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> CollaboratorError {
    CollaboratorError::Storage("kv lock poisoned".to_string())
}

impl KvStore for MemoryKv {
    fn set(&self, key: &str, value: &str) -> CollabResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> CollabResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }
}
