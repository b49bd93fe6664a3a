//! Content-addressed cache for downloaded bill documents (PDFs and other
//! published formats), keyed by the source URL.

use std::path::{Path, PathBuf};

use anyhow::Context;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Cache keys use the first 32 hex chars of the URL hash, enough to avoid
/// collisions while keeping filenames short.
const KEY_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct DocumentCache {
    root: PathBuf,
}

impl DocumentCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let mut key = hex::encode(hasher.finalize());
        key.truncate(KEY_LEN);
        key
    }

    fn path_for(&self, url: &str, extension: &str) -> PathBuf {
        let ext = extension.trim_start_matches('.').trim();
        let ext = if ext.is_empty() { "bin" } else { ext };
        self.root.join(format!("{}.{ext}", Self::cache_key(url)))
    }

    pub async fn load(&self, url: &str, extension: &str) -> Option<Vec<u8>> {
        fs::read(self.path_for(url, extension)).await.ok()
    }

    /// Store a document under its URL hash using an atomic temp-file
    /// rename. A concurrent writer landing first is treated as a hit.
    pub async fn store(
        &self,
        url: &str,
        extension: &str,
        bytes: &[u8],
    ) -> anyhow::Result<PathBuf> {
        let target = self.path_for(url, extension);
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating cache directory {}", self.root.display()))?;

        if fs::try_exists(&target)
            .await
            .with_context(|| format!("checking cache path {}", target.display()))?
        {
            return Ok(target);
        }

        let temp_path = self
            .root
            .join(format!(".{}.{}.tmp", Uuid::new_v4(), bytes.len()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("opening temp cache file {}", temp_path.display()))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("writing temp cache file {}", temp_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing temp cache file {}", temp_path.display()))?;
        drop(file);

        match fs::rename(&temp_path, &target).await {
            Ok(()) => Ok(target),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                let _ = fs::remove_file(&temp_path).await;
                Ok(target)
            }
            Err(err) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(err).with_context(|| {
                    format!(
                        "atomically renaming {} -> {}",
                        temp_path.display(),
                        target.display()
                    )
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cache_keys_are_stable_and_truncated() {
        let key = DocumentCache::cache_key("https://www.congress.gov/119/bills/hr4820.pdf");
        assert_eq!(key.len(), KEY_LEN);
        assert_eq!(
            key,
            DocumentCache::cache_key("https://www.congress.gov/119/bills/hr4820.pdf")
        );
        assert_ne!(key, DocumentCache::cache_key("https://example.test/other.pdf"));
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let dir = tempdir().expect("tempdir");
        let cache = DocumentCache::new(dir.path());
        let url = "https://www.congress.gov/119/bills/hr4820.pdf";

        assert!(cache.load(url, "pdf").await.is_none());
        cache.store(url, "pdf", b"%PDF-1.7 fake").await.expect("store");
        assert_eq!(
            cache.load(url, "pdf").await.expect("hit"),
            b"%PDF-1.7 fake".to_vec()
        );

        // Second store of the same URL is a no-op hit.
        let path = cache.store(url, "pdf", b"%PDF-1.7 fake").await.expect("restore");
        assert!(path.exists());
    }
}
