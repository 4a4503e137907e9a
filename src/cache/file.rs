// 文件缓存适配器
// 每个键一个文件，内容为带过期时间的 JSON 包装

use super::CacheAdapter;
use crate::config::factory_config::default_cache_dir;
use crate::errors::{FactoryError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct CachedBlob {
    expires_at: u64,
    data: Vec<u8>,
}

impl CachedBlob {
    fn is_expired(&self) -> bool {
        unix_now() >= self.expires_at
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct FileCacheAdapter {
    dir: PathBuf,
}

impl FileCacheAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn safe_name(key: &str) -> String {
        key.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect()
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::safe_name(key)))
    }

    /// 同目录下的临时文件，写完后 rename 到位
    fn temp_path(&self, key: &str) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{seq}.tmp",
            Self::safe_name(key),
            std::process::id()
        ))
    }
}

impl Default for FileCacheAdapter {
    fn default() -> Self {
        Self::new(default_cache_dir())
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> FactoryError {
    FactoryError::Cache(format!("failed to {action} {}: {e}", path.display()))
}

#[async_trait]
impl CacheAdapter for FileCacheAdapter {
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", &path, e)),
        };

        let blob: CachedBlob = serde_json::from_slice(&content)
            .map_err(|e| FactoryError::Cache(format!("corrupt cache file {}: {e}", path.display())))?;

        if blob.is_expired() {
            log::debug!("removing expired cache file {}", path.display());
            let _ = tokio::fs::remove_file(&path).await;
            return Ok(None);
        }

        Ok(Some(blob.data))
    }

    async fn store(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error("create", &self.dir, e))?;

        let blob = CachedBlob {
            expires_at: unix_now().saturating_add(ttl.as_secs()),
            data: value,
        };
        let content = serde_json::to_vec(&blob)
            .map_err(|e| FactoryError::Cache(format!("failed to encode cache entry: {e}")))?;

        // 读者只会看到旧文件或完整的新文件
        let temp = self.temp_path(key);
        tokio::fs::write(&temp, content)
            .await
            .map_err(|e| io_error("write", &temp, e))?;

        let path = self.entry_path(key);
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(io_error("rename", &path, e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCacheAdapter::new(dir.path().join("nested"));

        assert_eq!(cache.fetch("key").await.unwrap(), None);
        cache
            .store("key", b"payload".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.fetch("key").await.unwrap(), Some(b"payload".to_vec()));
    }

    #[tokio::test]
    async fn expired_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCacheAdapter::new(dir.path());
        cache.store("key", b"v".to_vec(), Duration::ZERO).await.unwrap();

        assert_eq!(cache.fetch("key").await.unwrap(), None);
        assert!(!cache.entry_path("key").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCacheAdapter::new(dir.path());
        std::fs::write(cache.entry_path("key"), b"garbage").unwrap();

        assert!(matches!(cache.fetch("key").await, Err(FactoryError::Cache(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_fetches_never_see_partial_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCacheAdapter::new(dir.path());
        let ttl = Duration::from_secs(60);
        let payload = vec![7u8; 256 * 1024];
        cache.store("key", payload.clone(), ttl).await.unwrap();

        let writer = {
            let cache = cache.clone();
            let payload = payload.clone();
            tokio::spawn(async move {
                for _ in 0..20 {
                    cache.store("key", payload.clone(), ttl).await.unwrap();
                }
            })
        };
        for _ in 0..20 {
            assert_eq!(cache.fetch("key").await.unwrap(), Some(payload.clone()));
        }
        writer.await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn huge_ttl_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCacheAdapter::new(dir.path());
        cache
            .store("key", b"v".to_vec(), Duration::from_secs(u64::MAX))
            .await
            .unwrap();
        assert_eq!(cache.fetch("key").await.unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn keys_are_sanitized() {
        let cache = FileCacheAdapter::new("/tmp/c");
        let path = cache.entry_path("../etc/passwd");
        assert_eq!(path, PathBuf::from("/tmp/c/___etc_passwd.json"));
    }
}
