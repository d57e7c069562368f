//! [`AwsKmsStore`]: a [`KvService`] that encrypts values through a KMS.

use async_trait::async_trait;
use aws_config::SdkConfig;
use kv::{KvError, KvService};
use tracing::{debug, instrument, warn};

use crate::kms::{tool_context, AwsKms, EncryptionContext, KmsClient};
use crate::session;

/// Literal encrypted and decrypted by [`KvService::test`].
const TEST_PLAINTEXT: &str = "test";

/// Envelope-encrypting decorator over another key-value store.
///
/// Values are encrypted under `key_id` before being handed to the wrapped
/// store and decrypted after being read back. The wrapped store only ever
/// sees KMS ciphertext blobs.
///
/// The decorator holds no mutable state; it is `Send + Sync` whenever the
/// store and client are.
#[derive(Debug)]
pub struct AwsKmsStore<S, K = AwsKms> {
    store: S,
    kms: K,
    key_id: String,
    context: EncryptionContext,
}

impl<S: KvService> AwsKmsStore<S, AwsKms> {
    /// Wrap `store`, discovering the AWS session from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::InvalidConfiguration`] if `key_id` is empty (before
    /// any discovery happens) and [`KvError::Session`] if the discovered
    /// session lacks a region or credentials.
    pub async fn new(store: S, key_id: impl Into<String>) -> Result<Self, KvError> {
        let key_id = validate_key_id(key_id.into())?;
        let session = session::load_default().await;
        Self::with_session(&session, store, key_id)
    }

    /// Wrap `store` using an existing AWS session.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::InvalidConfiguration`] if `key_id` is empty and
    /// [`KvError::Session`] if `session` lacks a region or credentials.
    pub fn with_session(
        session: &SdkConfig,
        store: S,
        key_id: impl Into<String>,
    ) -> Result<Self, KvError> {
        let key_id = validate_key_id(key_id.into())?;
        session::validate(session)?;
        Self::with_client(AwsKms::from_session(session), store, key_id)
    }
}

impl<S: KvService, K: KmsClient> AwsKmsStore<S, K> {
    /// Wrap `store` using an explicit KMS client.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::InvalidConfiguration`] if `key_id` is empty.
    pub fn with_client(kms: K, store: S, key_id: impl Into<String>) -> Result<Self, KvError> {
        let key_id = validate_key_id(key_id.into())?;
        Ok(Self {
            store,
            kms,
            key_id,
            context: tool_context(),
        })
    }

    /// Master key ID values are encrypted under.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.store
    }

    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KvError> {
        self.kms
            .encrypt(&self.key_id, plaintext, &self.context)
            .await
            .map_err(|e| {
                warn!(key_id = %self.key_id, error = %e, "kms encrypt failed");
                KvError::encryption(e)
            })
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KvError> {
        self.kms.decrypt(ciphertext, &self.context).await.map_err(|e| {
            warn!(error = %e, "kms decrypt failed");
            KvError::decryption(e)
        })
    }
}

fn validate_key_id(key_id: String) -> Result<String, KvError> {
    if key_id.is_empty() {
        return Err(KvError::InvalidConfiguration(
            "KMS key id must not be empty".into(),
        ));
    }
    Ok(key_id)
}

#[async_trait]
impl<S: KvService, K: KmsClient> KvService for AwsKmsStore<S, K> {
    #[instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &str) -> Result<Vec<u8>, KvError> {
        let ciphertext = self.store.get(key).await?;
        let plaintext = self.decrypt(&ciphertext).await?;
        debug!("value decrypted");
        Ok(plaintext)
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let ciphertext = self.encrypt(value).await?;
        self.store.set(key, &ciphertext).await?;
        debug!(ciphertext_len = ciphertext.len(), "value encrypted and stored");
        Ok(())
    }

    /// Checks the wrapped store, then round-trips a fixed literal through the
    /// KMS. The test ciphertext is not written to the wrapped store.
    #[instrument(skip_all, fields(key = %key))]
    async fn test(&self, key: &str) -> Result<(), KvError> {
        self.store
            .test(key)
            .await
            .map_err(|e| KvError::BackendTest(Box::new(e)))?;

        let ciphertext = self.encrypt(TEST_PLAINTEXT.as_bytes()).await?;
        let plaintext = self.decrypt(&ciphertext).await?;

        if plaintext != TEST_PLAINTEXT.as_bytes() {
            return Err(KvError::RoundTripMismatch {
                expected: TEST_PLAINTEXT.to_owned(),
                actual: String::from_utf8_lossy(&plaintext).into_owned(),
            });
        }

        debug!("kms round trip verified");
        Ok(())
    }
}
