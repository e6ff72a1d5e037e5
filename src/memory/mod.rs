/// 记忆管理模块
///
/// 页面内容经 AI 摘要后保存为一条记忆，记忆列表按插入顺序倒序存放在
/// local 作用域的 `memories` 键下，超出容量的旧记录直接淘汰

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::CapturedPage;

pub mod service;
pub mod store;

pub use service::{BackgroundService, ProcessOutcome};
pub use store::{MemoryStore, DEFAULT_CAPACITY};

/// memories 列表所在的键
pub const MEMORIES_KEY: &str = "memories";

/// 一条记忆，创建后不再修改
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: String,
    pub url: String,
    pub title: String,
    pub summary: String,
    /// 提取到的页面原文
    pub content: String,
    /// 页面被捕获的时间（毫秒）
    pub timestamp: i64,
    pub tags: Vec<String>,
}

impl Memory {
    /// 由捕获的页面和摘要结果创建记忆（生成新的 UUID）
    pub fn from_page(page: &CapturedPage, summary: String, tags: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: page.url.clone(),
            title: page.title.clone(),
            summary,
            content: page.content.clone(),
            timestamp: page.timestamp,
            tags,
        }
    }

    /// 标题或摘要包含关键词（不区分大小写）
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query) || self.summary.to_lowercase().contains(&query)
    }
}
