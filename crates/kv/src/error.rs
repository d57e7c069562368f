//! Error taxonomy shared by every [`KvService`](crate::KvService) implementation.

use thiserror::Error;

/// Boxed cause carried by the encryption and decryption variants.
///
/// Decorators wrap whatever their KMS client reports without classifying it.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by key-value backends and the decorators stacked on them.
///
/// Variants fall into three groups:
/// - backend failures: [`KvError::NotFound`], [`KvError::Io`], [`KvError::Backend`]
/// - construction failures: [`KvError::InvalidConfiguration`], [`KvError::Session`]
/// - encryption-layer failures: the remaining variants
#[derive(Debug, Error)]
pub enum KvError {
    /// No value is stored under the requested key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// A file-system backend failed to read or write.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// A store was constructed with invalid arguments.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No usable session could be established with the key-management service.
    #[error("session establishment failed: {0}")]
    Session(String),

    /// The key-management service refused or failed to encrypt a value.
    #[error("encryption failed: {0}")]
    Encryption(#[source] BoxError),

    /// The key-management service refused or failed to decrypt a value.
    #[error("decryption failed: {0}")]
    Decryption(#[source] BoxError),

    /// The wrapped store's own self-test failed.
    #[error("test of backend store failed: {0}")]
    BackendTest(#[source] Box<KvError>),

    /// An encrypt/decrypt round trip did not reproduce its input.
    #[error("encrypted and decrypted text doesn't match: exp: '{expected}', act: '{actual}'")]
    RoundTripMismatch {
        /// The literal that was encrypted.
        expected: String,
        /// What came back from decryption (lossily rendered as UTF-8).
        actual: String,
    },
}

impl KvError {
    /// Returns `true` if this error reports a missing key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::NotFound(_))
    }

    /// Wrap a KMS encryption failure.
    pub fn encryption<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        KvError::Encryption(err.into())
    }

    /// Wrap a KMS decryption failure.
    pub fn decryption<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        KvError::Decryption(err.into())
    }
}
