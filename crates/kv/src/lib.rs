//! Key-value storage capability shared by backends and encrypting decorators.
//!
//! Every backend implements [`KvService`]. Decorators (such as the AWS KMS
//! encrypting store) implement the same trait on top of another
//! [`KvService`], so they can be stacked in any order.

pub mod error;
pub mod file;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::{BoxError, KvError};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Byte-oriented storage addressed by string keys.
///
/// Implementations must be safe to share across tasks; callers hold them
/// behind `Arc` or `Box<dyn KvService>`.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait KvService: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::NotFound`] if nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, KvError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Check that the store is reachable and writable for `key`.
    async fn test(&self, key: &str) -> Result<(), KvError>;
}

#[async_trait]
impl<T: KvService + ?Sized> KvService for Arc<T> {
    async fn get(&self, key: &str) -> Result<Vec<u8>, KvError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        (**self).set(key, value).await
    }

    async fn test(&self, key: &str) -> Result<(), KvError> {
        (**self).test(key).await
    }
}

#[async_trait]
impl<T: KvService + ?Sized> KvService for Box<T> {
    async fn get(&self, key: &str) -> Result<Vec<u8>, KvError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        (**self).set(key, value).await
    }

    async fn test(&self, key: &str) -> Result<(), KvError> {
        (**self).test(key).await
    }
}
