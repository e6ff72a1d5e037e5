/// 用户设置管理模块
///
/// 设置记录保存在 sync 作用域的 `settings` 键下，
/// 每次读取都直接访问存储，不做缓存

use log::warn;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::storage::{read_typed, write_typed, KeyValueStore};

pub mod config;
pub use config::{Settings, SummaryLength, Theme};

/// settings 记录所在的键
pub const SETTINGS_KEY: &str = "settings";

/// 设置管理器
#[derive(Clone)]
pub struct SettingsManager {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsManager {
    /// 创建新的设置管理器
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// 读取设置记录（不存在时返回 None）
    pub async fn load(&self) -> AppResult<Option<Settings>> {
        read_typed(self.store.as_ref(), SETTINGS_KEY).await
    }

    /// 读取设置，失败或缺失时回退到默认值
    pub async fn load_or_default(&self) -> Settings {
        match self.load().await {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                Settings::default()
            }
        }
    }

    /// 保存设置
    pub async fn save(&self, settings: &Settings) -> AppResult<()> {
        self.validate_settings(settings)?;
        write_typed(self.store.as_ref(), SETTINGS_KEY, settings).await
    }

    /// 验证设置
    fn validate_settings(&self, settings: &Settings) -> AppResult<()> {
        if settings.api_key.len() != settings.api_key.trim().len() {
            return Err(AppError::settings(1, "API Key 首尾不能包含空白字符"));
        }

        if settings.api_key.chars().any(char::is_control) {
            return Err(AppError::settings(2, "API Key 包含非法字符"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use serde_json::json;

    fn manager() -> (Arc<InMemoryStore>, SettingsManager) {
        let store = Arc::new(InMemoryStore::new());
        let manager = SettingsManager::new(store.clone());
        (store, manager)
    }

    #[tokio::test]
    async fn test_load_missing() {
        let (_, manager) = manager();
        assert!(manager.load().await.unwrap().is_none());
        assert_eq!(manager.load_or_default().await, Settings::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, manager) = manager();
        let settings = Settings {
            api_key: "abc".to_string(),
            theme: Theme::Dark,
            ..Default::default()
        };

        manager.save(&settings).await.unwrap();

        assert_eq!(manager.load().await.unwrap(), Some(settings));
        assert_eq!(store.get(SETTINGS_KEY).await.unwrap().unwrap()["theme"], "dark");
    }

    #[tokio::test]
    async fn test_save_rejects_padded_key() {
        let (_, manager) = manager();
        let settings = Settings {
            api_key: " abc ".to_string(),
            ..Default::default()
        };

        assert!(manager.save(&settings).await.is_err());
        // 原设置应该保持不变
        assert!(manager.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_falls_back_to_default() {
        let (store, manager) = manager();
        store.set(SETTINGS_KEY, json!("not an object")).await.unwrap();

        assert!(manager.load().await.is_err());
        assert_eq!(manager.load_or_default().await, Settings::default());
    }
}
