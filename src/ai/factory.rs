use secrecy::SecretString;
use std::time::Duration;

use crate::ai::credential::ApiKey;
use crate::ai::provider::AIProviderConfig;
use crate::ai::providers::*;
use crate::ai::traits::AIProvider;
use crate::config::AppConfig;
use crate::error::AppResult;

pub fn create_provider(config: AIProviderConfig) -> AppResult<Box<dyn AIProvider>> {
    config.validate()?;
    Ok(Box::new(GeminiProvider::new(config)?))
}

/// 按凭证构造模型客户端
///
/// 每次处理都会用最新读取的 key 重新构造，不复用旧客户端
pub trait ModelFactory: Send + Sync {
    fn create(&self, api_key: &ApiKey) -> AppResult<Box<dyn AIProvider>>;
}

/// Gemini 客户端工厂
#[derive(Debug, Clone)]
pub struct GeminiFactory {
    api_base_url: String,
    model: String,
    timeout: Duration,
}

impl GeminiFactory {
    pub fn new(api_base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            model: model.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_base_url: config.api_base_url.clone(),
            model: config.model.clone(),
            timeout: config.request_timeout(),
        }
    }
}

impl ModelFactory for GeminiFactory {
    fn create(&self, api_key: &ApiKey) -> AppResult<Box<dyn AIProvider>> {
        let config = AIProviderConfig::new(
            self.api_base_url.clone(),
            SecretString::new(api_key.expose().to_string()),
            self.model.clone(),
        )
        .with_timeout(self.timeout);

        create_provider(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_binds_key_and_model() {
        let factory = GeminiFactory::new("https://generativelanguage.googleapis.com", "gemini-1.5-flash");
        let provider = factory.create(&ApiKey::new("abc")).unwrap();

        assert_eq!(provider.config().model, "gemini-1.5-flash");
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        let factory = GeminiFactory::new("not-a-url", "gemini-1.5-flash");
        assert!(factory.create(&ApiKey::new("abc")).is_err());
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig {
            model: "gemini-custom".to_string(),
            request_timeout_secs: 7,
            ..Default::default()
        };
        let factory = GeminiFactory::from_config(&config);

        assert_eq!(factory.model, "gemini-custom");
        assert_eq!(factory.timeout, Duration::from_secs(7));
    }
}
