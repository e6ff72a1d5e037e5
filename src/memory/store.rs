/// 记忆列表存储
///
/// 追加是一次完整的读改写：读取列表 → 头部插入 → 截断到容量 → 一次性写回。
/// 读写之间没有加锁，两个并发追加可能互相覆盖，后写入者胜出。

use log::{debug, info};
use std::sync::Arc;

use crate::capture::CapturedPage;
use crate::error::AppResult;
use crate::storage::{read_typed, write_typed, KeyValueStore};

use super::{Memory, MEMORIES_KEY};

/// 默认最多保留的记忆条数
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct MemoryStore {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_capacity(store, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self { store, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 追加一条记忆，返回刚写入的记录
    ///
    /// 读取或写入失败时返回错误，已持久化的列表保持原样
    pub async fn append(
        &self,
        page: &CapturedPage,
        summary: String,
        tags: Vec<String>,
    ) -> AppResult<Memory> {
        let memory = Memory::from_page(page, summary, tags);

        let mut memories = self.list().await?;
        memories.insert(0, memory.clone());

        if memories.len() > self.capacity {
            debug!("Evicting {} oldest memories", memories.len() - self.capacity);
            memories.truncate(self.capacity);
        }

        write_typed(self.store.as_ref(), MEMORIES_KEY, &memories).await?;

        info!("Memory for \"{}\" saved ({} total)", memory.title, memories.len());
        Ok(memory)
    }

    /// 全部记忆，最新的在前
    pub async fn list(&self) -> AppResult<Vec<Memory>> {
        Ok(read_typed(self.store.as_ref(), MEMORIES_KEY)
            .await?
            .unwrap_or_default())
    }

    /// 按标题和摘要搜索，空关键词返回全部
    ///
    /// 关键词原样参与匹配，不去除首尾空白
    pub async fn search(&self, query: &str) -> AppResult<Vec<Memory>> {
        let memories = self.list().await?;

        if query.is_empty() {
            return Ok(memories);
        }

        Ok(memories.into_iter().filter(|m| m.matches(query)).collect())
    }

    pub async fn get(&self, id: &str) -> AppResult<Option<Memory>> {
        Ok(self.list().await?.into_iter().find(|m| m.id == id))
    }
}
