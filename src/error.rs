/// 统一错误处理系统
///
/// 捕获链路上每一类失败都对应一个带编码的错误变体，
/// 所有错误只终止当前这一次捕获，不向宿主传播

use thiserror::Error;

/// 捕获链路错误
#[derive(Error, Debug)]
pub enum AppError {
    /// 页面快照或正文提取失败
    #[error("[ERR_EXTRACTION_{0:03}] {1}")]
    Extraction(u16, String),

    /// 页面到后台的通道不可用
    #[error("[ERR_TRANSPORT_{0:03}] {1}")]
    Transport(u16, String),

    /// 没有可用的 API Key
    #[error("[ERR_CREDENTIAL_{0:03}] {1}")]
    Credential(u16, String),

    /// 模型返回错误或无法解析的响应
    #[error("[ERR_AI_{0:03}] {1}")]
    AI(u16, String),

    /// 用户设置记录不合法
    #[error("[ERR_SETTINGS_{0:03}] {1}")]
    Settings(u16, String),

    /// 键值存储读写失败
    #[error("[ERR_STORAGE_{0:03}] {1}")]
    Storage(u16, String),

    /// SQLite 读写失败
    #[error("[ERR_DATABASE_{0:03}] {1}")]
    Database(u16, String),

    /// 模型请求未送达（超时、连接失败）
    #[error("[ERR_NETWORK_{0:03}] {1}")]
    Network(u16, String),

    #[error("[ERR_IO_{0:03}] {1}")]
    IO(u16, String),

    /// 记录编码/解码失败
    #[error("[ERR_SERDE_{0:03}] {1}")]
    Serde(u16, String),

    /// 运行配置不合法
    #[error("[ERR_VALIDATION_{0:03}] {1}")]
    Validation(u16, String),

    #[error("[ERR_UNKNOWN] {0}")]
    Unknown(String),
}

impl AppError {
    pub fn extraction(code: u16, msg: impl Into<String>) -> Self {
        Self::Extraction(code, msg.into())
    }

    pub fn transport(code: u16, msg: impl Into<String>) -> Self {
        Self::Transport(code, msg.into())
    }

    pub fn credential(code: u16, msg: impl Into<String>) -> Self {
        Self::Credential(code, msg.into())
    }

    pub fn ai(code: u16, msg: impl Into<String>) -> Self {
        Self::AI(code, msg.into())
    }

    pub fn settings(code: u16, msg: impl Into<String>) -> Self {
        Self::Settings(code, msg.into())
    }

    pub fn storage(code: u16, msg: impl Into<String>) -> Self {
        Self::Storage(code, msg.into())
    }

    pub fn database(code: u16, msg: impl Into<String>) -> Self {
        Self::Database(code, msg.into())
    }

    pub fn network(code: u16, msg: impl Into<String>) -> Self {
        Self::Network(code, msg.into())
    }

    pub fn io(code: u16, msg: impl Into<String>) -> Self {
        Self::IO(code, msg.into())
    }

    pub fn serde(code: u16, msg: impl Into<String>) -> Self {
        Self::Serde(code, msg.into())
    }

    pub fn validation(code: u16, msg: impl Into<String>) -> Self {
        Self::Validation(code, msg.into())
    }

    /// 是否属于持久化失败（失败的写入不会改动已保存的数据）
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Storage(..) | Self::Database(..) | Self::IO(..) | Self::Serde(..)
        )
    }

    /// 是否属于远程摘要调用失败
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::AI(..) | Self::Network(..))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::NotFound => Self::io(1, format!("路径不存在: {}", err)),
            ErrorKind::AlreadyExists => Self::io(2, format!("路径已存在: {}", err)),
            ErrorKind::PermissionDenied => Self::io(3, format!("没有访问权限: {}", err)),
            _ => Self::io(999, err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::serde(1, format!("JSON 编解码失败: {}", err))
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serde(2, format!("YAML 解析失败: {}", err))
    }
}

/// 只区分请求是否送达，HTTP 状态码由各 provider 自行映射
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(1, "请求超时")
        } else if err.is_connect() {
            Self::network(2, "网络连接失败")
        } else {
            Self::network(999, format!("请求失败: {}", err))
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Unknown(format!("{:#}", err))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => Self::database(1, msg),
            rusqlite::Error::QueryReturnedNoRows => Self::database(2, "记录不存在"),
            other => Self::database(999, other.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
