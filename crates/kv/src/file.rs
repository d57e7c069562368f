//! [`FileStore`]: one file per key under a root directory.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::{KvError, KvService};

/// Longest base64url file name accepted for a key. Leaves room under the
/// usual 255-byte file name limit for the scratch file `test` writes.
const MAX_ENCODED_KEY_LEN: usize = 240;

/// File-system backend.
///
/// Key names are base64url-encoded into file names so arbitrary keys never
/// escape the root directory. Writes go through a temporary file that is
/// renamed into place, so readers never observe a partial value.
///
/// Keys must be non-empty and at most 180 bytes long (240 encoded
/// characters). Other keys are rejected with [`KvError::Backend`] by every
/// operation.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory holding one file per key.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, KvError> {
        Ok(self.root.join(file_name(key)?))
    }
}

fn file_name(key: &str) -> Result<String, KvError> {
    if key.is_empty() {
        return Err(KvError::Backend("empty key".into()));
    }
    let encoded = URL_SAFE_NO_PAD.encode(key);
    if encoded.len() > MAX_ENCODED_KEY_LEN {
        return Err(KvError::Backend(format!(
            "key too long: {} bytes (max {})",
            key.len(),
            MAX_ENCODED_KEY_LEN / 4 * 3
        )));
    }
    Ok(encoded)
}

#[async_trait]
impl KvService for FileStore {
    #[instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &str) -> Result<Vec<u8>, KvError> {
        match tokio::fs::read(self.path_for(key)?).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(KvError::NotFound(key.to_owned()))
            }
            Err(err) => Err(KvError::Io(err)),
        }
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let root = self.root.clone();
        let path = self.path_for(key)?;
        let value = value.to_vec();
        let bytes = value.len();
        tokio::task::spawn_blocking(move || write_atomic(&root, &path, &value))
            .await
            .map_err(|e| KvError::Backend(format!("write task failed: {e}")))??;
        debug!(bytes, "value written");
        Ok(())
    }

    /// Verifies the root directory exists (creating it if needed) and accepts
    /// a new file named after `key`. The scratch file is removed before
    /// returning.
    #[instrument(skip_all, fields(key = %key))]
    async fn test(&self, key: &str) -> Result<(), KvError> {
        let root = self.root.clone();
        let prefix = format!(".{}.", file_name(key)?);
        tokio::task::spawn_blocking(move || -> Result<(), KvError> {
            std::fs::create_dir_all(&root)?;
            let mut scratch = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(".chk")
                .tempfile_in(&root)?;
            scratch.write_all(b"test")?;
            scratch.flush()?;
            scratch.close()?;
            Ok(())
        })
        .await
        .map_err(|e| KvError::Backend(format!("test task failed: {e}")))?
    }
}

fn write_atomic(root: &Path, path: &Path, value: &[u8]) -> Result<(), KvError> {
    std::fs::create_dir_all(root)?;
    let mut tmp = NamedTempFile::new_in(root)?;
    tmp.write_all(value)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| KvError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());

        store.set("vault-root", b"s3cr3t").await.expect("set");
        assert_eq!(store.get("vault-root").await.expect("get"), b"s3cr3t");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        let err = store.get("nope").await.unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[test]
    fn keys_cannot_escape_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        let path = store.path_for("../../etc/passwd").unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_creates_root_and_leaves_no_scratch_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("nested/store");
        let store = FileStore::new(&root);

        store.test("unseal-keys").await.expect("test");
        assert!(root.is_dir());
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, b"x").unwrap();

        let store = FileStore::new(&root);
        assert!(store.test("k").await.is_err());
    }

    #[tokio::test]
    async fn empty_key_rejected_by_every_operation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("store"));

        let tested = store.test("").await.unwrap_err();
        let written = store.set("", b"v").await.unwrap_err();
        let read = store.get("").await.unwrap_err();

        for err in [&tested, &written, &read] {
            assert!(matches!(err, KvError::Backend(msg) if msg == "empty key"), "{err}");
        }
        assert!(!dir.path().join("store").exists());
    }

    #[tokio::test]
    async fn longest_key_round_trips_and_tests() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        let key = "k".repeat(180);

        store.test(&key).await.expect("test");
        store.set(&key, b"v").await.expect("set");
        assert_eq!(store.get(&key).await.expect("get"), b"v");
    }

    #[tokio::test]
    async fn overlong_key_rejected_consistently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        let key = "k".repeat(200);

        for err in [
            store.test(&key).await.unwrap_err(),
            store.set(&key, b"v").await.unwrap_err(),
            store.get(&key).await.unwrap_err(),
        ] {
            assert!(
                matches!(&err, KvError::Backend(msg) if msg.starts_with("key too long")),
                "{err}"
            );
        }
    }
}
