//! Key-management service capability consumed by the encrypting store.
//!
//! [`KmsClient`] is the seam between the decorator and a concrete service:
//! - [`AwsKms`]: AWS KMS through the official SDK.
//! - [`LocalKms`]: in-process master keys for development and tests.
//!
//! # Encryption context
//!
//! Every call carries the same non-secret context, built by [`tool_context`].
//! KMS binds it to the ciphertext as authenticated data, so changing
//! [`TOOL_CONTEXT_VALUE`] makes every previously written value undecryptable.

pub mod aws;
pub mod local;

pub use aws::AwsKms;
pub use local::LocalKms;

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

/// Context key sent on every encrypt and decrypt call.
pub const TOOL_CONTEXT_KEY: &str = "Tool";

/// Context value identifying the calling system.
pub const TOOL_CONTEXT_VALUE: &str = "bank-vaults";

/// Non-secret key/value pairs bound to a ciphertext.
///
/// Ordered so that its canonical encoding does not depend on insertion order.
pub type EncryptionContext = BTreeMap<String, String>;

/// Build the fixed `{"Tool": "bank-vaults"}` encryption context.
pub fn tool_context() -> EncryptionContext {
    BTreeMap::from([(TOOL_CONTEXT_KEY.to_owned(), TOOL_CONTEXT_VALUE.to_owned())])
}

/// Errors reported by [`KmsClient`] implementations.
#[derive(Debug, Error)]
pub enum KmsError {
    /// The AWS SDK call failed (auth, throttling, network, missing key, ...).
    #[error("kms request failed: {0}")]
    Sdk(String),

    /// An encrypt response carried no ciphertext blob.
    #[error("kms encrypt response contained no ciphertext")]
    MissingCiphertext,

    /// A decrypt response carried no plaintext.
    #[error("kms decrypt response contained no plaintext")]
    MissingPlaintext,

    /// No master key is registered under the requested ID.
    #[error("unknown master key: {0}")]
    UnknownKey(String),

    /// A master key ID cannot be used (empty or too long to embed).
    #[error("invalid master key id: {0}")]
    InvalidKeyId(String),

    /// Master key material has the wrong length.
    #[error("invalid master key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required length in bytes.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// The ciphertext blob is truncated or has an unknown version.
    #[error("malformed ciphertext blob")]
    InvalidCiphertext,

    /// Authenticated decryption failed: wrong key, wrong context or tampering.
    #[error("ciphertext authentication failed")]
    Authentication,

    /// The AEAD cipher refused to encrypt the plaintext.
    #[error("aead encryption failed")]
    Seal,
}

/// Encrypt and decrypt arbitrary blobs under a named master key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KmsClient: Send + Sync {
    /// Encrypt `plaintext` under the master key `key_id`, binding `context`.
    ///
    /// The returned blob is self-describing: it embeds everything the service
    /// needs to decrypt it, including the key reference.
    async fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, KmsError>;

    /// Decrypt a blob produced by [`KmsClient::encrypt`].
    ///
    /// No key ID is passed; the service resolves it from the blob. `context`
    /// must equal the one used at encryption time.
    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, KmsError>;
}

#[async_trait]
impl<T: KmsClient + ?Sized> KmsClient for Arc<T> {
    async fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, KmsError> {
        (**self).encrypt(key_id, plaintext, context).await
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, KmsError> {
        (**self).decrypt(ciphertext, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_context_is_fixed() {
        let ctx = tool_context();
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.get("Tool").map(String::as_str), Some("bank-vaults"));
    }

    #[test]
    fn seal_failure_not_reported_as_authentication() {
        assert_eq!(KmsError::Seal.to_string(), "aead encryption failed");
        assert_ne!(KmsError::Seal.to_string(), KmsError::Authentication.to_string());
    }
}
