//! 定义表缓存
//!
//! 缓存适配器只存取不透明字节；命中与未命中对调用方必须不可区分。
//! 适配器故障不影响工厂：读取失败视为未命中，写入失败忽略。

#[cfg(feature = "file-cache")]
pub mod file;
pub mod memory;

#[cfg(feature = "file-cache")]
pub use file::FileCacheAdapter;
pub use memory::MemoryCacheAdapter;

use crate::definition::DefinitionTable;
use crate::errors::Result;
use async_trait::async_trait;
use std::time::Duration;

/// 缓存适配器接口
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    /// 获取缓存值，过期或不存在时返回 None
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 写入缓存值，过期由适配器负责
    async fn store(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
}

/// 定义表的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// 未配置缓存
    Disabled,
    /// 从缓存加载
    Hit,
    /// 直接构建并写入缓存
    Miss,
    /// 适配器故障或缓存内容损坏，直接构建
    Bypassed,
}

/// 根据来源标识和TTL生成缓存键
pub fn cache_key(source_id: &str, ttl: Duration) -> String {
    let payload = serde_json::json!({
        "source": source_id,
        "ttl": ttl.as_secs(),
    });
    format!(
        "svc_factory_{:x}",
        md5::compute(payload.to_string().as_bytes())
    )
}

/// 先查缓存，未命中时构建定义表并回写
pub async fn load_or_build<F>(
    source_id: &str,
    ttl: Duration,
    adapter: Option<&dyn CacheAdapter>,
    build: F,
) -> Result<(DefinitionTable, CacheStatus)>
where
    F: FnOnce() -> Result<DefinitionTable>,
{
    let Some(adapter) = adapter else {
        return Ok((build()?, CacheStatus::Disabled));
    };

    let key = cache_key(source_id, ttl);
    let mut status = CacheStatus::Miss;

    match adapter.fetch(&key).await {
        Ok(Some(bytes)) => match DefinitionTable::from_bytes(&bytes) {
            Ok(table) => {
                log::debug!("definition cache hit: {key} ({} services)", table.len());
                return Ok((table, CacheStatus::Hit));
            }
            Err(e) => {
                log::warn!("discarding unreadable cache entry {key}: {e}");
                status = CacheStatus::Bypassed;
            }
        },
        Ok(None) => log::debug!("definition cache miss: {key}"),
        Err(e) => {
            log::warn!("cache fetch failed for {key}, building directly: {e}");
            status = CacheStatus::Bypassed;
        }
    }

    let table = build()?;

    match table.to_bytes() {
        Ok(bytes) => {
            if let Err(e) = adapter.store(&key, bytes, ttl).await {
                log::warn!("cache store failed for {key}: {e}");
            }
        }
        Err(e) => log::warn!("skipping cache store for {key}: {e}"),
    }

    Ok((table, status))
}
