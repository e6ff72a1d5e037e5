/// 页面 → 后台消息通道
///
/// 单向、即发即弃、最多一次投递：发送方不等待确认，也不重试。
/// 后台不可达时这次捕获直接丢失。

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::capture::CapturedPage;
use crate::error::{AppError, AppResult};

/// 页面内容消息的类型标记
pub const PAGE_CONTENT: &str = "PAGE_CONTENT";

/// 跨上下文消息信封：`{ "type": "PAGE_CONTENT", "payload": {...} }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum Message {
    #[serde(rename = "PAGE_CONTENT")]
    PageContent(CapturedPage),
}

impl Message {
    pub fn page_content(page: CapturedPage) -> Self {
        Self::PageContent(page)
    }

    /// 解析宿主传来的原始 JSON 消息
    ///
    /// 非 PAGE_CONTENT 类型的消息返回 None（后台只处理页面内容）
    pub fn from_json(raw: &str) -> AppResult<Option<Self>> {
        let value: Value = serde_json::from_str(raw)?;

        match value.get("type").and_then(Value::as_str) {
            Some(PAGE_CONTENT) => Ok(Some(serde_json::from_value(value)?)),
            Some(other) => {
                debug!("Ignoring message of type {}", other);
                Ok(None)
            }
            None => Err(AppError::transport(2, "消息缺少 type 字段")),
        }
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// 消息发送端
pub trait Transport: Send + Sync {
    /// 发送消息，不等待任何响应
    fn send(&self, message: Message) -> AppResult<()>;
}

/// 后台接收端
pub type MessageReceiver = mpsc::UnboundedReceiver<Message>;

/// 基于无界通道的发送端
#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Message>,
}

impl ChannelTransport {
    /// 后台是否仍在监听
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl Transport for ChannelTransport {
    fn send(&self, message: Message) -> AppResult<()> {
        self.tx
            .send(message)
            .map_err(|_| AppError::transport(1, "后台通道不可用"))
    }
}

/// 创建一对发送端/接收端
pub fn channel() -> (ChannelTransport, MessageReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelTransport { tx }, rx)
}
