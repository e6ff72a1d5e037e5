/// 用户设置定义
///
/// 由外部的选项页写入 sync 作用域，核心只读取 `api_key`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 选项页的默认值：开启自动记录
const DEFAULT_AUTO_TRACK: bool = true;

/// 摘要长度偏好
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

/// 界面主题
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// 用户设置
///
/// 记录由选项页维护，字段缺失或取值无法识别时回退到默认值，
/// 不会因为无关字段而读不到 `api_key`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Google API Key（空字符串表示未设置）
    #[serde(deserialize_with = "or_default")]
    pub api_key: String,

    /// 是否自动记录页面访问
    #[serde(deserialize_with = "auto_track_or_default")]
    pub auto_track: bool,

    /// 摘要长度（目前不影响 prompt）
    #[serde(deserialize_with = "or_default")]
    pub summary_length: SummaryLength,

    /// 界面主题
    #[serde(deserialize_with = "or_default")]
    pub theme: Theme,
}

/// 先读成任意 JSON 值，无法转换成目标类型时取默认值
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn auto_track_or_default<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(DEFAULT_AUTO_TRACK))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            auto_track: DEFAULT_AUTO_TRACK,
            summary_length: SummaryLength::Medium,
            theme: Theme::Light,
        }
    }
}

impl Settings {
    /// 是否配置了可用的 API Key
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert!(settings.api_key.is_empty());
        assert!(settings.auto_track);
        assert_eq!(settings.summary_length, SummaryLength::Medium);
        assert_eq!(settings.theme, Theme::Light);
        assert!(!settings.has_api_key());
    }

    #[test]
    fn test_wire_format() {
        let settings = Settings {
            api_key: "key".to_string(),
            auto_track: false,
            summary_length: SummaryLength::Long,
            theme: Theme::Dark,
        };
        let json = serde_json::to_value(&settings).unwrap();

        assert_eq!(json["apiKey"], "key");
        assert_eq!(json["autoTrack"], false);
        assert_eq!(json["summaryLength"], "long");
        assert_eq!(json["theme"], "dark");
    }

    #[test]
    fn test_partial_record_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"apiKey": "abc"}"#).unwrap();

        assert_eq!(settings.api_key, "abc");
        assert!(settings.auto_track);
        assert_eq!(settings.summary_length, SummaryLength::Medium);
    }

    #[test]
    fn test_unrecognised_values_fall_back() {
        let settings: Settings = serde_json::from_str(
            r#"{"apiKey": "abc", "theme": "system", "autoTrack": null, "summaryLength": 3}"#,
        )
        .unwrap();

        assert_eq!(settings.api_key, "abc");
        assert!(settings.auto_track);
        assert_eq!(settings.summary_length, SummaryLength::Medium);
        assert_eq!(settings.theme, Theme::Light);
    }

    #[test]
    fn test_non_string_key_is_unset() {
        let settings: Settings = serde_json::from_str(r#"{"apiKey": 42, "theme": "dark"}"#).unwrap();

        assert!(!settings.has_api_key());
        assert_eq!(settings.theme, Theme::Dark);
    }

    #[test]
    fn test_whitespace_key_is_unset() {
        let settings = Settings {
            api_key: "   ".to_string(),
            ..Default::default()
        };
        assert!(!settings.has_api_key());
    }
}
