//! [`AwsKms`]: [`KmsClient`] backed by the AWS SDK.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_kms::{error::DisplayErrorContext, primitives::Blob};

use super::{EncryptionContext, KmsClient, KmsError};

/// AWS KMS client.
///
/// Sends the encryption context verbatim and an empty grant token list on
/// every call. SDK failures are reported as [`KmsError::Sdk`] without further
/// classification.
#[derive(Clone, Debug)]
pub struct AwsKms {
    client: aws_sdk_kms::Client,
}

impl AwsKms {
    /// Wrap an already configured SDK client.
    pub fn new(client: aws_sdk_kms::Client) -> Self {
        Self { client }
    }

    /// Build a client from a resolved session.
    ///
    /// Credentials are resolved lazily by the SDK; no request is made here.
    pub fn from_session(session: &SdkConfig) -> Self {
        let conf = aws_sdk_kms::config::Builder::from(session).build();
        Self::new(aws_sdk_kms::Client::from_conf(conf))
    }
}

fn to_sdk_context(context: &EncryptionContext) -> HashMap<String, String> {
    context
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[async_trait]
impl KmsClient for AwsKms {
    async fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, KmsError> {
        let out = self
            .client
            .encrypt()
            .key_id(key_id)
            .plaintext(Blob::new(plaintext))
            .set_encryption_context(Some(to_sdk_context(context)))
            .set_grant_tokens(Some(Vec::new()))
            .send()
            .await
            .map_err(|e| KmsError::Sdk(DisplayErrorContext(&e).to_string()))?;

        out.ciphertext_blob()
            .map(|b| b.as_ref().to_vec())
            .ok_or(KmsError::MissingCiphertext)
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, KmsError> {
        let out = self
            .client
            .decrypt()
            .ciphertext_blob(Blob::new(ciphertext))
            .set_encryption_context(Some(to_sdk_context(context)))
            .set_grant_tokens(Some(Vec::new()))
            .send()
            .await
            .map_err(|e| KmsError::Sdk(DisplayErrorContext(&e).to_string()))?;

        out.plaintext()
            .map(|b| b.as_ref().to_vec())
            .ok_or(KmsError::MissingPlaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kms::tool_context;

    #[test]
    fn sdk_context_mirrors_tool_context() {
        let ctx = to_sdk_context(&tool_context());
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx["Tool"], "bank-vaults");
    }
}
