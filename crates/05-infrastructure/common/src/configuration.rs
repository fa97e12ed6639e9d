//! 配置相关的基础接口定义

use crate::binding::LenientValue;
use crate::errors::{ConfigError, ValidationError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 可配置类型 trait
///
/// 绑定到某个配置节的强类型设置必须实现此 trait
pub trait Configurable: DeserializeOwned + Clone + Send + Sync + 'static {
    /// 配置节名称，例如 `AppSettings`
    fn section_name() -> &'static str;

    /// 验证绑定后的配置
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// 配置节
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSection {
    /// 配置数据
    pub data: HashMap<String, serde_json::Value>,
}

impl ConfigSection {
    /// 创建新的配置节
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// 插入配置项
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// 获取配置项，先精确匹配再忽略大小写匹配
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key).or_else(|| {
            self.data
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    /// 是否包含配置项（忽略大小写）
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 配置节是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 合并另一个配置节，已有键（忽略大小写）不被覆盖
    pub fn merge_missing(&mut self, other: ConfigSection) {
        for (key, value) in other.data {
            if !self.contains_key(&key) {
                self.data.insert(key, value);
            }
        }
    }

    /// 转换为 JSON 对象
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// 绑定到具体类型，字符串形式的布尔和数字按字段类型转换
    pub fn bind<T>(&self) -> Result<T, ConfigError>
    where
        T: for<'de> Deserialize<'de>,
    {
        T::deserialize(LenientValue(self.to_value()))
            .map_err(|e| ConfigError::SerializationError { source: e })
    }

    /// 绑定到可配置类型并执行验证
    pub fn bind_validated<T: Configurable>(&self) -> Result<T, ConfigError> {
        let settings: T = self.bind()?;
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Sample {
        name: String,
        #[serde(default)]
        enabled: bool,
    }

    impl Configurable for Sample {
        fn section_name() -> &'static str {
            "Sample"
        }

        fn validate(&self) -> Result<(), ValidationError> {
            if self.name.is_empty() {
                return Err(ValidationError::required_field_missing("Name"));
            }
            Ok(())
        }
    }

    #[test]
    fn bind_section_to_type() {
        let mut section = ConfigSection::new();
        section.insert("Name", json!("demo"));
        section.insert("Enabled", json!(true));

        let sample: Sample = section.bind().unwrap();
        assert_eq!(sample.name, "demo");
        assert!(sample.enabled);
    }

    #[test]
    fn bind_converts_string_values() {
        let mut section = ConfigSection::new();
        section.insert("Name", json!("2.0"));
        section.insert("Enabled", json!("true"));

        let sample: Sample = section.bind_validated().unwrap();
        assert_eq!(sample.name, "2.0");
        assert!(sample.enabled);
    }

    #[test]
    fn get_ignores_case() {
        let mut section = ConfigSection::new();
        section.insert("Version", json!("1.0"));
        assert_eq!(section.get("version"), Some(&json!("1.0")));
    }

    #[test]
    fn merge_keeps_existing_keys() {
        let mut primary = ConfigSection::new();
        primary.insert("Name", json!("primary"));

        let mut fallback = ConfigSection::new();
        fallback.insert("name", json!("fallback"));
        fallback.insert("Enabled", json!(true));

        primary.merge_missing(fallback);
        assert_eq!(primary.get("Name"), Some(&json!("primary")));
        assert_eq!(primary.data.len(), 2);
    }

    #[test]
    fn bind_validated_rejects_invalid_settings() {
        let mut section = ConfigSection::new();
        section.insert("Name", json!(""));

        let result = section.bind_validated::<Sample>();
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }
}
