/// 运行时配置
///
/// 从 YAML 文件加载，所有字段都有默认值，文件不存在时直接使用默认配置

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// 运行时配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// 数据目录（SQLite 与 sync 存储文件所在位置）
    pub data_dir: PathBuf,

    /// Gemini API 基础地址
    pub api_base_url: String,

    /// 摘要使用的模型
    pub model: String,

    /// HTTP 请求超时（秒）
    pub request_timeout_secs: u64,

    /// 滚动触发阈值（距离单位）
    pub scroll_threshold: f64,

    /// 滚动防抖静默窗口（毫秒）
    pub debounce_ms: u64,

    /// memories 列表容量
    pub memory_capacity: usize,

    /// 正文最少字符数，低于此值视为无内容
    pub min_content_chars: usize,

    /// 日志级别
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("neuropilot"),
            api_base_url: String::from("https://generativelanguage.googleapis.com"),
            model: String::from("gemini-1.5-flash"),
            request_timeout_secs: 120,
            scroll_threshold: 100.0,
            debounce_ms: 200,
            memory_capacity: 100,
            min_content_chars: 25,
            log_level: String::from("info"),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置（文件不存在时返回默认配置）
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(&self) -> AppResult<()> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(AppError::validation(1, "API 地址必须以 http:// 或 https:// 开头"));
        }

        if self.model.trim().is_empty() {
            return Err(AppError::validation(2, "模型名称不能为空"));
        }

        if self.memory_capacity == 0 {
            return Err(AppError::validation(3, "memories 容量必须大于 0"));
        }

        if self.debounce_ms == 0 {
            return Err(AppError::validation(4, "防抖窗口必须大于 0"));
        }

        if !self.scroll_threshold.is_finite() || self.scroll_threshold < 0.0 {
            return Err(AppError::validation(5, "滚动阈值不能为负数"));
        }

        if self.request_timeout_secs == 0 {
            return Err(AppError::validation(6, "请求超时必须大于 0"));
        }

        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// local 作用域 SQLite 文件
    pub fn local_store_path(&self) -> PathBuf {
        self.data_dir.join("local.db")
    }

    /// sync 作用域 JSON 文件
    pub fn sync_store_path(&self) -> PathBuf {
        self.data_dir.join("sync.json")
    }
}
