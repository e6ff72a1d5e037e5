/// AI 提供商配置模块
///
/// 描述一次摘要调用所需的地址、模型与密钥

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// AI 提供商配置
#[derive(Debug, Clone)]
pub struct AIProviderConfig {
    /// API 基础地址
    pub api_base_url: String,

    /// API Key
    pub api_key: SecretString,

    /// 当前选择的模型
    pub model: String,

    /// 请求超时
    pub timeout: Duration,
}

impl AIProviderConfig {
    /// 创建新的提供商配置
    pub fn new(
        api_base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            api_key,
            model: model.into(),
            timeout: Duration::from_secs(120),
        }
    }

    /// 设置超时（builder 模式）
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// 验证配置
    pub fn validate(&self) -> AppResult<()> {
        if self.api_base_url.is_empty() {
            return Err(AppError::validation(12, "API 地址不能为空"));
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(AppError::validation(13, "API 地址必须以 http:// 或 https:// 开头"));
        }

        if self.api_key.expose_secret().trim().is_empty() {
            return Err(AppError::validation(14, "API Key 不能为空"));
        }

        if self.model.is_empty() {
            return Err(AppError::validation(15, "模型名称不能为空"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AIProviderConfig {
        AIProviderConfig::new(
            "https://generativelanguage.googleapis.com",
            SecretString::new("test-key".to_string()),
            "gemini-1.5-flash",
        )
    }

    #[test]
    fn test_provider_validation() {
        assert!(config().validate().is_ok());

        let mut invalid = config();
        invalid.api_base_url = "generativelanguage.googleapis.com".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = config();
        invalid.api_key = SecretString::new(String::new());
        assert!(invalid.validate().is_err());

        let mut invalid = config();
        invalid.model = String::new();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_key_is_redacted_in_debug() {
        let debug = format!("{:?}", config());
        assert!(!debug.contains("test-key"));
    }

    #[test]
    fn test_with_timeout() {
        let config = config().with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
