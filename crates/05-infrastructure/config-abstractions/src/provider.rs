//! 配置提供者抽象接口

use async_trait::async_trait;
use infrastructure_common::{ConfigError, ConfigSection};
use serde_json::Value;
use std::path::PathBuf;

/// 配置提供者 trait
///
/// 定义从不同数据源获取配置的统一接口。键使用 `:` 分隔层级，例如 `Jwt:Issuer`。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// 获取配置值
    async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError>;

    /// 获取配置节，节名不区分大小写
    async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError>;

    /// 重新加载配置
    async fn reload(&mut self) -> Result<(), ConfigError>;

    /// 检查配置键是否存在
    async fn contains_key(&self, key: &str) -> Result<bool, ConfigError>;

    /// 获取所有配置键
    async fn get_all_keys(&self) -> Result<Vec<String>, ConfigError>;

    /// 获取提供者名称
    fn name(&self) -> &str;

    /// 获取提供者优先级，数值越大越先被查询
    fn priority(&self) -> i32 {
        0
    }

    /// 是否支持热重载
    fn supports_hot_reload(&self) -> bool {
        false
    }

    /// 热重载时需要监控的文件
    fn watch_path(&self) -> Option<PathBuf> {
        None
    }
}

/// 按 `:` 分隔的路径在 JSON 树中查找，每一级都不区分大小写
pub fn lookup_path<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split(':')
        .filter(|part| !part.is_empty())
        .try_fold(root, |current, part| {
            let object = current.as_object()?;
            object.get(part).or_else(|| {
                object
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(part))
                    .map(|(_, value)| value)
            })
        })
}

/// 列出 JSON 树中所有叶子与中间节点的键
pub fn collect_keys(root: &Value) -> Vec<String> {
    fn walk(prefix: Option<&str>, value: &Value, keys: &mut Vec<String>) {
        if let Value::Object(object) = value {
            for (name, child) in object {
                let key = match prefix {
                    Some(prefix) => format!("{prefix}:{name}"),
                    None => name.clone(),
                };
                walk(Some(&key), child, keys);
                keys.push(key);
            }
        }
    }

    let mut keys = Vec::new();
    walk(None, root, &mut keys);
    keys.sort();
    keys
}

/// 把 JSON 对象转为配置节，非对象返回 `None`
pub fn section_from_value(value: &Value) -> Option<ConfigSection> {
    let object = value.as_object()?;
    let mut section = ConfigSection::new();
    for (key, value) in object {
        section.insert(key.clone(), value.clone());
    }
    Some(section)
}
