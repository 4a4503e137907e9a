// 进程内缓存适配器
// 使用 LRU 策略，条目按 TTL 过期

use super::CacheAdapter;
use crate::errors::Result;
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_CAPACITY: usize = 64;

/// 缓存项
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<u8>,
    /// None 表示永不过期（TTL 超出 Instant 表示范围）
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

/// 缓存统计信息
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
}

/// 内存缓存适配器，克隆后共享同一存储
#[derive(Clone)]
pub struct MemoryCacheAdapter {
    entries: Arc<Mutex<LruCache<String, CacheEntry>>>,
    stats: Arc<Mutex<MemoryCacheStats>>,
}

impl MemoryCacheAdapter {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            stats: Arc::new(Mutex::new(MemoryCacheStats::default())),
        }
    }

    pub fn stats(&self) -> MemoryCacheStats {
        self.stats.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for MemoryCacheAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CacheAdapter for MemoryCacheAdapter {
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.lock();
        let mut stats = self.stats.lock();

        let live = entries
            .get(key)
            .map(|entry| (!entry.is_expired()).then(|| entry.data.clone()));

        match live {
            Some(Some(data)) => {
                stats.hits += 1;
                Ok(Some(data))
            }
            Some(None) => {
                entries.pop(key);
                stats.expirations += 1;
                stats.misses += 1;
                Ok(None)
            }
            None => {
                stats.misses += 1;
                Ok(None)
            }
        }
    }

    async fn store(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            data: value,
            expires_at: Instant::now().checked_add(ttl),
        };
        if let Some((evicted, _)) = self.entries.lock().push(key.to_string(), entry) {
            if evicted != key {
                self.stats.lock().evictions += 1;
            }
        }
        Ok(())
    }
}
