//! 实例注册表
//!
//! 每个服务名最多持有一个记忆化实例。并发的首次获取通过 OnceCell
//! 串行化：只构造一次，所有调用方得到同一个实例。

use super::constructor::Instance;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub(crate) type Slot = Arc<OnceCell<Instance>>;

/// 内部统计信息（原子计数器）
#[derive(Default)]
struct InnerStats {
    lookups: AtomicUsize,
    memo_hits: AtomicUsize,
    constructions: AtomicUsize,
    throwaway_constructions: AtomicUsize,
}

/// 工厂统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactoryStats {
    pub lookups: usize,
    pub memo_hits: usize,
    pub constructions: usize,
    pub throwaway_constructions: usize,
}

impl FactoryStats {
    /// 记忆化命中率
    pub fn hit_rate(&self) -> f64 {
        let memoized = self.memo_hits + self.constructions;
        if memoized == 0 {
            0.0
        } else {
            self.memo_hits as f64 / memoized as f64
        }
    }
}

#[derive(Default)]
pub(crate) struct InstanceRegistry {
    slots: DashMap<String, Slot>,
    stats: InnerStats,
}

impl InstanceRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 获取或创建名称对应的槽位
    pub(crate) fn slot(&self, name: &str) -> Slot {
        if let Some(slot) = self.slots.get(name) {
            return slot.clone();
        }
        self.slots
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// 在槽位中构造（至多一次）并返回实例
    pub(crate) async fn get_or_create<E, F>(&self, slot: Slot, create: F) -> Result<Instance, E>
    where
        F: FnOnce() -> Result<Instance, E>,
    {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);

        if let Some(instance) = slot.get() {
            self.stats.memo_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(instance.clone());
        }

        // 构造失败时槽位保持未初始化并留在表中，等待者与后续调用继续共用它
        let instance = slot
            .get_or_try_init(|| async move {
                create().map(|instance| {
                    self.stats.constructions.fetch_add(1, Ordering::Relaxed);
                    instance
                })
            })
            .await?;
        Ok(instance.clone())
    }

    /// 记录一次一次性构造
    pub(crate) fn record_throwaway(&self) {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);
        self.stats
            .throwaway_constructions
            .fetch_add(1, Ordering::Relaxed);
    }

    /// 直接放入实例，替换已有实例
    pub(crate) fn insert(&self, name: &str, instance: Instance) {
        let cell = OnceCell::new_with(Some(instance));
        self.slots.insert(name.to_string(), Arc::new(cell));
    }

    pub(crate) fn remove(&self, name: &str) -> Option<Instance> {
        self.slots
            .remove(name)
            .and_then(|(_, slot)| slot.get().cloned())
    }

    /// 已构造的实例（不触发构造）
    pub(crate) fn peek(&self, name: &str) -> Option<Instance> {
        self.slots.get(name).and_then(|slot| slot.get().cloned())
    }

    pub(crate) fn built_names(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub(crate) fn stats(&self) -> FactoryStats {
        FactoryStats {
            lookups: self.stats.lookups.load(Ordering::Relaxed),
            memo_hits: self.stats.memo_hits.load(Ordering::Relaxed),
            constructions: self.stats.constructions.load(Ordering::Relaxed),
            throwaway_constructions: self.stats.throwaway_constructions.load(Ordering::Relaxed),
        }
    }
}
