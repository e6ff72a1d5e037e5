/// 页面捕获模块
///
/// 负责监听页面活动、提取可读正文，并把结果交给后台通道

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

pub mod debounce;
pub mod extractor;
pub mod monitor;

pub use extractor::ContentExtractor;
pub use monitor::{Activatable, ActivityMonitor, CaptureOutcome, ClickTarget, MonitorConfig};

/// 当前页面的只读快照
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    /// 页面地址
    pub url: String,
    /// 完整 HTML
    pub html: String,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

/// 页面来源
///
/// 由宿主实现，每次捕获都会重新获取一份快照
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn snapshot(&self) -> AppResult<PageSnapshot>;
}

#[async_trait]
impl PageSource for PageSnapshot {
    async fn snapshot(&self) -> AppResult<PageSnapshot> {
        Ok(self.clone())
    }
}

/// 提取成功后的页面内容（不持久化）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapturedPage {
    pub title: String,
    /// 清洗后的纯文本
    pub content: String,
    pub url: String,
    /// 捕获时间（毫秒时间戳）
    pub timestamp: i64,
}

/// 当前毫秒时间戳
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
