// 模块声明
pub mod ai;
pub mod capture;
pub mod config;
pub mod db;
mod error;
pub mod memory;
pub mod settings;
pub mod storage;
pub mod transport;

// 导出错误类型供其他模块使用
pub use error::{AppError, AppResult};

use log::{error, info};
use std::fs;
use std::sync::Arc;
use tokio::task::JoinHandle;

use ai::{GeminiFactory, ModelFactory};
use capture::{ActivityMonitor, ContentExtractor, MonitorConfig, PageSource};
use config::AppConfig;
use db::{Database, SqliteStore};
use memory::{BackgroundService, MemoryStore};
use settings::SettingsManager;
use storage::{JsonFileStore, KeyValueStore};
use transport::ChannelTransport;

/// 初始化日志（重复调用无副作用）
pub fn init_logging(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .try_init();
}

/// 运行中的捕获核心
///
/// 持有页面侧的发送端和后台监听任务。所有发送端（包括交给监听器的副本）
/// 释放后监听任务自行结束。
pub struct NeuroPilot {
    config: AppConfig,
    transport: ChannelTransport,
    settings: SettingsManager,
    memories: MemoryStore,
    listener: JoinHandle<()>,
}

impl NeuroPilot {
    /// 打开 data_dir 下的两个存储并启动后台监听
    pub async fn start(config: AppConfig) -> AppResult<Self> {
        let factory = Arc::new(GeminiFactory::from_config(&config));
        Self::start_with_factory(config, factory).await
    }

    /// 同 `start`，但使用指定的模型工厂
    pub async fn start_with_factory(config: AppConfig, factory: Arc<dyn ModelFactory>) -> AppResult<Self> {
        init_logging(&config.log_level);
        config.validate()?;

        fs::create_dir_all(&config.data_dir)
            .map_err(|e| AppError::io(1, format!("创建数据目录失败 {}: {}", config.data_dir.display(), e)))?;

        let db = Database::new(config.local_store_path())
            .and_then(|db| db.initialize().map(|_| db))
            .map_err(|e| AppError::database(1, format!("打开本地数据库失败: {:#}", e)))?;
        let local: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(Arc::new(db)));
        let sync: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(config.sync_store_path())?);

        let settings = SettingsManager::new(sync);
        let memories = MemoryStore::with_capacity(local, config.memory_capacity);

        let service = Arc::new(BackgroundService::new(settings.clone(), memories.clone(), factory));
        let (transport, rx) = transport::channel();
        let listener = service.spawn(rx);

        info!(
            "NeuroPilot started (data dir: {}, model: {})",
            config.data_dir.display(),
            config.model
        );

        Ok(Self {
            config,
            transport,
            settings,
            memories,
            listener,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 页面侧发送端
    pub fn transport(&self) -> ChannelTransport {
        self.transport.clone()
    }

    pub fn memories(&self) -> &MemoryStore {
        &self.memories
    }

    pub fn settings(&self) -> &SettingsManager {
        &self.settings
    }

    /// 为一个页面创建活动监听器
    ///
    /// 读取当前设置的 autoTrack，关闭时监听器忽略所有事件
    pub async fn monitor(&self, source: Arc<dyn PageSource>) -> Arc<ActivityMonitor> {
        let settings = self.settings.load_or_default().await;
        ActivityMonitor::new(
            source,
            Arc::new(self.transport()),
            ContentExtractor::new(self.config.min_content_chars),
            MonitorConfig::from_app(&self.config, settings.auto_track),
        )
    }

    /// 释放自身的发送端并等待后台监听结束
    ///
    /// 返回时已发出的消息都已处理完毕。仍有监听器持有发送端时会一直等待
    pub async fn shutdown(self) {
        let Self { transport, listener, .. } = self;
        drop(transport);

        if let Err(e) = listener.await {
            error!("Background listener ended abnormally: {}", e);
        }
    }
}
