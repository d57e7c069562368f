//! [`MemoryStore`]: process-local backend used in tests and ephemeral setups.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{KvError, KvService};

/// In-memory key-value backend.
///
/// Wraps a `RwLock<HashMap<_, _>>` so concurrent readers never block each
/// other and writers replace single entries.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new, empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of stored entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Return `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl KvService for MemoryStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, KvError> {
        self.inner
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| KvError::NotFound(key.to_owned()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.inner
            .write()
            .await
            .insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    async fn test(&self, _key: &str) -> Result<(), KvError> {
        Ok(())
    }
}
