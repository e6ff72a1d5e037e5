/// AI 集成模块
///
/// 负责凭证状态、模型客户端构造、摘要 prompt 和标签提取

pub mod credential;
pub mod factory;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod tags;
pub mod traits;

// 重新导出常用类型
pub use credential::{ApiKey, CredentialState};
pub use factory::{create_provider, GeminiFactory, ModelFactory};
pub use prompt::page_summary_prompt;
pub use provider::AIProviderConfig;
pub use tags::extract_tags;
pub use traits::AIProvider;
