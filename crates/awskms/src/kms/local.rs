//! [`LocalKms`]: in-process key-management service.
//!
//! Holds named 256-bit master keys and encrypts with AES-256-GCM-SIV, binding
//! the encryption context as associated data. Intended for development and
//! tests; it never talks to the network.
//!
//! # Ciphertext format
//!
//! ```text
//! 0x01 | u16-be key id length | key id | 12-byte nonce | ciphertext+tag
//! ```
//!
//! Like a hosted KMS, the blob names its own key, so decryption needs no key ID.

use std::collections::HashMap;

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    Aes256GcmSiv, Nonce,
};
use async_trait::async_trait;

use super::{EncryptionContext, KmsClient, KmsError};

/// Byte length of a master key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

const BLOB_VERSION: u8 = 1;

/// Master key material, zeroed on drop.
struct MasterKey(Box<[u8; KEY_LEN]>);

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// In-process KMS holding master keys by ID.
#[derive(Debug, Default)]
pub struct LocalKms {
    keys: HashMap<String, MasterKey>,
}

impl LocalKms {
    /// Create a KMS with no master keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key_bytes` as the master key named `key_id`.
    ///
    /// # Errors
    ///
    /// Returns [`KmsError::InvalidKeyId`] if `key_id` is empty or longer than
    /// the blob header can describe, and [`KmsError::InvalidKeyLength`] if
    /// `key_bytes` is not [`KEY_LEN`] bytes.
    pub fn with_key(mut self, key_id: impl Into<String>, key_bytes: &[u8]) -> Result<Self, KmsError> {
        let key_id = key_id.into();
        if key_id.is_empty() || key_id.len() > usize::from(u16::MAX) {
            return Err(KmsError::InvalidKeyId(key_id));
        }
        if key_bytes.len() != KEY_LEN {
            return Err(KmsError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: key_bytes.len(),
            });
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(key_bytes);
        self.keys.insert(key_id, MasterKey(buf));
        Ok(self)
    }

    /// Register a freshly generated random master key named `key_id`.
    ///
    /// # Errors
    ///
    /// Returns [`KmsError::InvalidKeyId`] under the same rules as [`LocalKms::with_key`].
    pub fn with_generated_key(self, key_id: impl Into<String>) -> Result<Self, KmsError> {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        let res = self.with_key(key_id, &key);
        key.iter_mut().for_each(|b| *b = 0);
        res
    }

    fn cipher(&self, key_id: &str) -> Result<Aes256GcmSiv, KmsError> {
        let key = self
            .keys
            .get(key_id)
            .ok_or_else(|| KmsError::UnknownKey(key_id.to_owned()))?;
        Aes256GcmSiv::new_from_slice(&key.0[..]).map_err(|_| KmsError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: key.0.len(),
        })
    }
}

/// Canonical, unambiguous encoding of the context used as associated data.
fn encode_context(context: &EncryptionContext) -> Vec<u8> {
    let mut out = Vec::new();
    for (k, v) in context {
        for part in [k, v] {
            out.extend_from_slice(&(part.len() as u32).to_be_bytes());
            out.extend_from_slice(part.as_bytes());
        }
    }
    out
}

/// Split a blob into `(key_id, nonce, ciphertext)`.
fn parse_blob(blob: &[u8]) -> Result<(&str, &[u8], &[u8]), KmsError> {
    let (&version, rest) = blob.split_first().ok_or(KmsError::InvalidCiphertext)?;
    if version != BLOB_VERSION || rest.len() < 2 {
        return Err(KmsError::InvalidCiphertext);
    }
    let id_len = usize::from(u16::from_be_bytes([rest[0], rest[1]]));
    let rest = &rest[2..];
    if rest.len() < id_len + NONCE_LEN {
        return Err(KmsError::InvalidCiphertext);
    }
    let (id, rest) = rest.split_at(id_len);
    let key_id = std::str::from_utf8(id).map_err(|_| KmsError::InvalidCiphertext)?;
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    Ok((key_id, nonce, ciphertext))
}

#[async_trait]
impl KmsClient for LocalKms {
    async fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, KmsError> {
        let cipher = self.cipher(key_id)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let aad = encode_context(context);
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| KmsError::Seal)?;

        // key ids are bounded to u16::MAX by `with_key`
        let id_len = key_id.len() as u16;
        let mut blob = Vec::with_capacity(3 + key_id.len() + NONCE_LEN + ciphertext.len());
        blob.push(BLOB_VERSION);
        blob.extend_from_slice(&id_len.to_be_bytes());
        blob.extend_from_slice(key_id.as_bytes());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, KmsError> {
        let (key_id, nonce, sealed) = parse_blob(ciphertext)?;
        let cipher = self.cipher(key_id)?;
        let aad = encode_context(context);
        cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: &aad,
                },
            )
            .map_err(|_| KmsError::Authentication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kms::tool_context;

    fn kms() -> LocalKms {
        LocalKms::new()
            .with_generated_key("alias/vault")
            .unwrap()
            .with_generated_key("alias/other")
            .unwrap()
    }

    #[tokio::test]
    async fn encrypt_decrypt_round_trip() {
        let kms = kms();
        let ctx = tool_context();
        let blob = kms.encrypt("alias/vault", b"unseal-key-1", &ctx).await.unwrap();
        assert_ne!(blob, b"unseal-key-1");
        assert_eq!(kms.decrypt(&blob, &ctx).await.unwrap(), b"unseal-key-1");
    }

    #[tokio::test]
    async fn blob_names_its_key() {
        let kms = kms();
        let blob = kms.encrypt("alias/other", b"x", &tool_context()).await.unwrap();
        let (key_id, _, _) = parse_blob(&blob).unwrap();
        assert_eq!(key_id, "alias/other");
    }

    #[tokio::test]
    async fn unknown_key_rejected() {
        let err = kms()
            .encrypt("alias/missing", b"x", &tool_context())
            .await
            .unwrap_err();
        assert!(matches!(err, KmsError::UnknownKey(id) if id == "alias/missing"));
    }

    #[tokio::test]
    async fn different_context_fails_authentication() {
        let kms = kms();
        let blob = kms.encrypt("alias/vault", b"x", &tool_context()).await.unwrap();

        let mut other = tool_context();
        other.insert("Tool".into(), "someone-else".into());
        let err = kms.decrypt(&blob, &other).await.unwrap_err();
        assert!(matches!(err, KmsError::Authentication));
    }

    #[tokio::test]
    async fn tampered_ciphertext_fails_authentication() {
        let kms = kms();
        let ctx = tool_context();
        let mut blob = kms.encrypt("alias/vault", b"tamper me", &ctx).await.unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert!(matches!(
            kms.decrypt(&blob, &ctx).await.unwrap_err(),
            KmsError::Authentication
        ));
    }

    #[tokio::test]
    async fn truncated_blob_is_malformed() {
        let kms = kms();
        assert!(matches!(
            kms.decrypt(&[BLOB_VERSION, 0, 40, b'a'], &tool_context()).await.unwrap_err(),
            KmsError::InvalidCiphertext
        ));
        assert!(matches!(
            kms.decrypt(&[], &tool_context()).await.unwrap_err(),
            KmsError::InvalidCiphertext
        ));
    }

    #[test]
    fn invalid_key_material_rejected() {
        assert!(matches!(
            LocalKms::new().with_key("k", &[0u8; 16]).unwrap_err(),
            KmsError::InvalidKeyLength { expected: KEY_LEN, actual: 16 }
        ));
        assert!(matches!(
            LocalKms::new().with_key("", &[0u8; KEY_LEN]).unwrap_err(),
            KmsError::InvalidKeyId(_)
        ));
    }

    #[test]
    fn key_material_redacted_in_debug() {
        let kms = LocalKms::new().with_key("k", &[0xAB; KEY_LEN]).unwrap();
        let dbg = format!("{kms:?}");
        assert!(dbg.contains("REDACTED"), "{dbg}");
        assert!(!dbg.contains("171"), "{dbg}");
    }

    #[test]
    fn context_encoding_is_unambiguous() {
        let a = EncryptionContext::from([("ab".to_owned(), "c".to_owned())]);
        let b = EncryptionContext::from([("a".to_owned(), "bc".to_owned())]);
        assert_ne!(encode_context(&a), encode_context(&b));
    }
}
