use async_trait::async_trait;

use crate::ai::prompt::page_summary_prompt;
use crate::ai::provider::AIProviderConfig;
use crate::error::AppResult;

/// 文本模型客户端
///
/// 一次调用只发送一条 prompt，等待完整响应（不支持流式）
#[async_trait]
pub trait AIProvider: Send + Sync {
    async fn send_text(&self, prompt: &str) -> AppResult<String>;

    fn config(&self) -> &AIProviderConfig;

    /// 摘要一个页面，返回模型的原始文本
    async fn summarize_page(&self, title: &str, content: &str) -> AppResult<String> {
        self.send_text(&page_summary_prompt(title, content)).await
    }
}
