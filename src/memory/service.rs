/// 后台摘要服务
///
/// 监听页面发来的 PAGE_CONTENT 消息，对每条消息：
/// 1. 重新读取设置并得出凭证状态（不缓存）
/// 2. 用当前 key 构造模型客户端，发送摘要 prompt
/// 3. 从摘要中提取标签，追加到记忆列表
///
/// 每条消息在独立任务中处理，任何失败只影响这一次，记录日志后放弃，不重试。
/// 所有发送端关闭后，监听会等到已派发的处理全部结束才返回。

use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::ai::{extract_tags, CredentialState, ModelFactory};
use crate::capture::CapturedPage;
use crate::error::AppError;
use crate::settings::SettingsManager;
use crate::transport::{Message, MessageReceiver};

use super::{Memory, MemoryStore};

/// 一次处理的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// 已保存为新记忆
    Stored(Memory),
    /// 没有可用的 API Key，未调用模型
    NoCredential,
    /// 模型调用或存储失败
    Failed,
}

impl ProcessOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessOutcome::Stored(_) => "stored",
            ProcessOutcome::NoCredential => "no-credential",
            ProcessOutcome::Failed => "failed",
        }
    }
}

pub struct BackgroundService {
    settings: SettingsManager,
    memories: MemoryStore,
    factory: Arc<dyn ModelFactory>,
}

impl BackgroundService {
    pub fn new(settings: SettingsManager, memories: MemoryStore, factory: Arc<dyn ModelFactory>) -> Self {
        Self {
            settings,
            memories,
            factory,
        }
    }

    pub fn memories(&self) -> &MemoryStore {
        &self.memories
    }

    /// 处理一条消息（目前只有页面内容一种）
    pub async fn handle_message(&self, message: Message) -> ProcessOutcome {
        match message {
            Message::PageContent(page) => self.process_content(page).await,
        }
    }

    /// 摘要并保存一个页面，永不返回错误
    pub async fn process_content(&self, page: CapturedPage) -> ProcessOutcome {
        info!("Processing content from {}", page.url);

        let loaded = match self.settings.load().await {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to load settings: {}", e);
                None
            }
        };

        let state = CredentialState::transition(CredentialState::Unloaded, loaded.as_ref());
        let Some(api_key) = state.api_key() else {
            let err = AppError::credential(1, "未配置 API Key，跳过摘要");
            warn!("{} ({})", err, page.url);
            return ProcessOutcome::NoCredential;
        };

        if let Some(settings) = &loaded {
            debug!(
                "Summary length preference {:?} is stored but not applied to the prompt",
                settings.summary_length
            );
        }

        let provider = match self.factory.create(api_key) {
            Ok(provider) => provider,
            Err(e) => {
                error!("Failed to create model client: {}", e);
                return ProcessOutcome::Failed;
            }
        };

        let summary = match provider.summarize_page(&page.title, &page.content).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Summarization failed for {}: {}", page.url, e);
                return ProcessOutcome::Failed;
            }
        };
        debug!("Received summary ({} chars)", summary.chars().count());

        let tags = extract_tags(&summary);

        match self.memories.append(&page, summary, tags).await {
            Ok(memory) => ProcessOutcome::Stored(memory),
            Err(e) => {
                error!("Failed to store memory for {}: {}", page.url, e);
                ProcessOutcome::Failed
            }
        }
    }

    /// 监听消息直到所有发送端关闭，然后等待进行中的处理完成
    ///
    /// 每条消息单独起任务，处理之间互不等待
    pub async fn run(self: Arc<Self>, mut rx: MessageReceiver) {
        info!("Background service listening");
        let mut tasks = JoinSet::new();

        while let Some(message) = rx.recv().await {
            let service = Arc::clone(&self);
            tasks.spawn(async move { service.handle_message(message).await });

            // 顺手回收已经结束的任务
            while let Some(result) = tasks.try_join_next() {
                log_task_result(result);
            }
        }

        if !tasks.is_empty() {
            info!("All senders closed, waiting for {} in-flight messages", tasks.len());
        }
        while let Some(result) = tasks.join_next().await {
            log_task_result(result);
        }

        info!("Background service stopped");
    }

    /// 在后台任务中启动监听
    pub fn spawn(self: Arc<Self>, rx: MessageReceiver) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }
}

fn log_task_result(result: Result<ProcessOutcome, JoinError>) {
    match result {
        Ok(outcome) => debug!("Message processed: {}", outcome.name()),
        Err(e) => error!("Message task ended abnormally: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AIProvider, AIProviderConfig, ApiKey};
    use crate::error::AppResult;
    use crate::settings::{Settings, SETTINGS_KEY};
    use crate::storage::{InMemoryStore, KeyValueStore};
    use crate::transport::{self, Transport};
    use async_trait::async_trait;
    use secrecy::SecretString;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    const SUMMARY: &str = "This article discusses lorem ipsum placeholder text examples";

    struct FakeProvider {
        config: AIProviderConfig,
        reply: Result<String, String>,
        delay: Duration,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AIProvider for FakeProvider {
        async fn send_text(&self, prompt: &str) -> AppResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.reply.clone().map_err(|e| AppError::ai(500, e))
        }

        fn config(&self) -> &AIProviderConfig {
            &self.config
        }
    }

    /// 记录收到的 key，返回固定回复的模型工厂
    struct FakeFactory {
        reply: Result<String, String>,
        delay: Duration,
        keys: Mutex<Vec<String>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl FakeFactory {
        fn new(reply: Result<String, String>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply,
                delay,
                keys: Mutex::default(),
                prompts: Arc::default(),
            })
        }

        fn replying(reply: &str) -> Arc<Self> {
            Self::new(Ok(reply.to_string()), Duration::ZERO)
        }

        fn failing() -> Arc<Self> {
            Self::new(Err("服务器错误".to_string()), Duration::ZERO)
        }

        fn created(&self) -> usize {
            self.keys.lock().unwrap().len()
        }
    }

    impl ModelFactory for FakeFactory {
        fn create(&self, api_key: &ApiKey) -> AppResult<Box<dyn AIProvider>> {
            self.keys.lock().unwrap().push(api_key.expose().to_string());
            Ok(Box::new(FakeProvider {
                config: AIProviderConfig::new(
                    "https://example.com",
                    SecretString::new(api_key.expose().to_string()),
                    "fake",
                ),
                reply: self.reply.clone(),
                delay: self.delay,
                prompts: self.prompts.clone(),
            }))
        }
    }

    struct Fixture {
        sync: Arc<InMemoryStore>,
        settings: SettingsManager,
        service: Arc<BackgroundService>,
    }

    fn fixture(factory: Arc<FakeFactory>) -> Fixture {
        let sync = Arc::new(InMemoryStore::new());
        let local: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        let settings = SettingsManager::new(sync.clone());
        let service = Arc::new(BackgroundService::new(
            settings.clone(),
            MemoryStore::new(local),
            factory,
        ));
        Fixture {
            sync,
            settings,
            service,
        }
    }

    fn example_page() -> CapturedPage {
        CapturedPage {
            title: "Example".to_string(),
            content: "Lorem ipsum dolor sit amet".to_string(),
            url: "https://example.com".to_string(),
            timestamp: 1_700_000_000_000,
        }
    }

    async fn save_key(settings: &SettingsManager, key: &str) {
        settings
            .save(&Settings {
                api_key: key.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_end_to_end_summary_is_stored() {
        let factory = FakeFactory::replying(SUMMARY);
        let fx = fixture(factory.clone());
        save_key(&fx.settings, "abc").await;

        let outcome = fx.service.process_content(example_page()).await;

        let ProcessOutcome::Stored(memory) = outcome else {
            panic!("expected a stored memory, got {:?}", outcome);
        };
        assert_eq!(memory.title, "Example");
        assert_eq!(memory.summary, SUMMARY);
        assert_eq!(memory.tags, vec!["this", "article", "discusses", "lorem", "ipsum"]);

        let memories = fx.service.memories().list().await.unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0], memory);

        assert_eq!(*factory.keys.lock().unwrap(), vec!["abc".to_string()]);
        let prompts = factory.prompts.lock().unwrap();
        assert!(prompts[0].contains("Title: Example"));
        assert!(prompts[0].contains("Content: Lorem ipsum dolor sit amet"));
    }

    #[tokio::test]
    async fn test_unrecognised_settings_fields_keep_the_key() {
        let records = [
            json!({"apiKey": "abc", "theme": "system"}),
            json!({"apiKey": "abc", "autoTrack": null}),
            json!({"apiKey": "abc", "summaryLength": "huge", "extra": [1, 2]}),
        ];

        for record in records {
            let factory = FakeFactory::replying(SUMMARY);
            let fx = fixture(factory.clone());
            fx.sync.set(SETTINGS_KEY, record.clone()).await.unwrap();

            let outcome = fx.service.process_content(example_page()).await;
            assert!(matches!(outcome, ProcessOutcome::Stored(_)), "{} -> {:?}", record, outcome);
            assert_eq!(*factory.keys.lock().unwrap(), vec!["abc".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_no_credential_is_idempotent() {
        let factory = FakeFactory::replying(SUMMARY);
        let fx = fixture(factory.clone());

        for _ in 0..3 {
            assert_eq!(fx.service.process_content(example_page()).await, ProcessOutcome::NoCredential);
        }
        save_key(&fx.settings, "").await;
        assert_eq!(fx.service.process_content(example_page()).await, ProcessOutcome::NoCredential);

        assert_eq!(factory.created(), 0);
        assert!(fx.service.memories().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_settings_means_no_credential() {
        let factory = FakeFactory::replying(SUMMARY);
        let fx = fixture(factory.clone());
        fx.sync.set(SETTINGS_KEY, json!("not an object")).await.unwrap();

        assert_eq!(fx.service.process_content(example_page()).await, ProcessOutcome::NoCredential);
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn test_key_change_applies_to_next_message() {
        let factory = FakeFactory::replying(SUMMARY);
        let fx = fixture(factory.clone());

        assert_eq!(fx.service.process_content(example_page()).await, ProcessOutcome::NoCredential);

        save_key(&fx.settings, "first").await;
        assert!(matches!(fx.service.process_content(example_page()).await, ProcessOutcome::Stored(_)));

        save_key(&fx.settings, "second").await;
        assert!(matches!(fx.service.process_content(example_page()).await, ProcessOutcome::Stored(_)));

        assert_eq!(*factory.keys.lock().unwrap(), vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn test_remote_failure_stores_nothing() {
        let factory = FakeFactory::failing();
        let fx = fixture(factory.clone());
        save_key(&fx.settings, "abc").await;

        assert_eq!(fx.service.process_content(example_page()).await, ProcessOutcome::Failed);
        assert_eq!(factory.created(), 1);
        assert!(fx.service.memories().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listener_drains_in_flight_messages() {
        let factory = FakeFactory::new(Ok(SUMMARY.to_string()), Duration::from_millis(50));
        let fx = fixture(factory);
        save_key(&fx.settings, "abc").await;

        let (transport, rx) = transport::channel();
        let handle = fx.service.clone().spawn(rx);

        transport.send(Message::page_content(example_page())).unwrap();
        transport.send(Message::page_content(example_page())).unwrap();
        drop(transport);

        // 监听结束时两条消息都已经处理完
        handle.await.unwrap();
        assert_eq!(fx.service.memories().list().await.unwrap().len(), 2);
    }
}
