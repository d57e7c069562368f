//! Key-value store decorator that encrypts values with AWS KMS.
//!
//! [`AwsKmsStore`] wraps any [`kv::KvService`] and exposes the same trait:
//! values are encrypted by the KMS before they reach the wrapped store and
//! decrypted after they are read back. Trust is rooted entirely in the KMS
//! master key; no data keys are handled locally.
//!
//! ```no_run
//! # async fn demo() -> Result<(), kv::KvError> {
//! use kv::{FileStore, KvService};
//!
//! let store = awskms::AwsKmsStore::new(FileStore::new("/var/lib/vault-keys"), "alias/vault").await?;
//! store.set("vault-root", b"s.abcdef").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Invariants
//!
//! - The wrapped store only ever receives KMS ciphertext blobs.
//! - Every KMS call carries the `{"Tool": "bank-vaults"}` encryption context.
//! - No retries, caching or background work; each call is a fixed sequence of
//!   at most one store call and two KMS calls.

pub mod kms;
pub mod session;
pub mod store;

pub use kms::{AwsKms, EncryptionContext, KmsClient, KmsError, LocalKms};
pub use store::AwsKmsStore;
