/// API Key 生命周期
///
/// 每次处理都从 Unloaded 出发，根据刚读取的设置转移到 Ready 或 Disabled。
/// 状态不跨调用缓存，用户在选项页改 key 后下一次处理立即生效。

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use crate::settings::Settings;

/// API Key（Debug 输出会被隐藏）
#[derive(Debug, Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::new(key.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// 凭证状态
#[derive(Debug, Clone, Default)]
pub enum CredentialState {
    /// 尚未读取设置
    #[default]
    Unloaded,
    /// 已读到 key，可以构造模型客户端
    Ready(ApiKey),
    /// 没有 key
    Disabled,
}

impl CredentialState {
    /// 状态转移：只由本次读到的设置决定
    pub fn transition(current: CredentialState, loaded: Option<&Settings>) -> CredentialState {
        let next = match loaded {
            Some(settings) if settings.has_api_key() => {
                CredentialState::Ready(ApiKey::new(settings.api_key.trim()))
            }
            _ => CredentialState::Disabled,
        };

        debug!("Credential state: {} -> {}", current.name(), next.name());
        next
    }

    pub fn api_key(&self) -> Option<&ApiKey> {
        match self {
            CredentialState::Ready(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, CredentialState::Ready(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            CredentialState::Unloaded => "unloaded",
            CredentialState::Ready(_) => "ready",
            CredentialState::Disabled => "disabled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_key(key: &str) -> Settings {
        Settings {
            api_key: key.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_initial_state_is_unloaded() {
        assert!(matches!(CredentialState::default(), CredentialState::Unloaded));
    }

    #[test]
    fn test_key_present_becomes_ready() {
        let settings = settings_with_key(" abc ");
        let state = CredentialState::transition(CredentialState::Unloaded, Some(&settings));

        assert!(state.is_ready());
        assert_eq!(state.api_key().unwrap().expose(), "abc");
    }

    #[test]
    fn test_missing_settings_disables() {
        let state = CredentialState::transition(CredentialState::Unloaded, None);
        assert!(matches!(state, CredentialState::Disabled));
        assert!(state.api_key().is_none());
    }

    #[test]
    fn test_empty_key_disables() {
        for key in ["", "   "] {
            let settings = settings_with_key(key);
            let state = CredentialState::transition(CredentialState::Unloaded, Some(&settings));
            assert!(matches!(state, CredentialState::Disabled));
        }
    }

    #[test]
    fn test_transition_ignores_previous_state() {
        let ready = CredentialState::Ready(ApiKey::new("old"));
        let state = CredentialState::transition(ready, Some(&settings_with_key("")));
        assert!(matches!(state, CredentialState::Disabled));

        let state = CredentialState::transition(CredentialState::Disabled, Some(&settings_with_key("new")));
        assert_eq!(state.api_key().unwrap().expose(), "new");
    }

    #[test]
    fn test_key_not_in_debug_output() {
        let debug = format!("{:?}", CredentialState::Ready(ApiKey::new("super-secret")));
        assert!(!debug.contains("super-secret"));
    }
}
