//! 配置提供者实现
//!
//! 所有提供者都把数据源整理成一棵 JSON 树，键路径使用 `:` 分隔，查找时每一级都不区分大小写。

use async_trait::async_trait;
use config_abstractions::{collect_keys, lookup_path, section_from_value, ConfigProvider};
use infrastructure_common::{ConfigError, ConfigSection};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// 在树中查找配置节
fn section_of(root: &Value, section_name: &str) -> Result<ConfigSection, ConfigError> {
    match lookup_path(root, section_name) {
        Some(value) => section_from_value(value).ok_or_else(|| ConfigError::TypeConversionError {
            message: format!("配置节 {} 不是对象类型", section_name),
        }),
        None => Err(ConfigError::KeyNotFound {
            key: section_name.to_string(),
        }),
    }
}

fn value_of(root: &Value, key: &str) -> Result<Value, ConfigError> {
    lookup_path(root, key)
        .cloned()
        .ok_or_else(|| ConfigError::KeyNotFound {
            key: key.to_string(),
        })
}

/// 将 TOML 值转换为 JSON 值
fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number(serde_json::Number::from(*i)),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Array(arr) => Value::Array(arr.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
    }
}

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    fn parse(self, content: &str) -> Result<Value, ConfigError> {
        match self {
            Self::Json => Ok(serde_json::from_str(content)?),
            Self::Toml => {
                let table: toml::Value =
                    toml::from_str(content).map_err(|e| ConfigError::ParseError {
                        source: Box::new(e),
                    })?;
                Ok(toml_to_json(&table))
            }
        }
    }
}

/// 文件配置源，JSON 与 TOML 提供者共用
#[derive(Debug)]
struct FileSource {
    file_path: PathBuf,
    format: FileFormat,
    optional: bool,
    root: Value,
    last_modified: Option<SystemTime>,
}

impl FileSource {
    fn open(file_path: PathBuf, format: FileFormat, optional: bool) -> Result<Self, ConfigError> {
        let mut source = Self {
            file_path,
            format,
            optional,
            root: Value::Object(Map::new()),
            last_modified: None,
        };
        source.load()?;
        Ok(source)
    }

    /// 加载配置文件，失败时保留已加载的内容
    fn load(&mut self) -> Result<(), ConfigError> {
        debug!("加载配置文件: {}", self.file_path.display());

        if !self.file_path.exists() {
            if self.optional {
                debug!("可选配置文件不存在，跳过: {}", self.file_path.display());
                self.root = Value::Object(Map::new());
                self.last_modified = None;
                return Ok(());
            }
            return Err(ConfigError::FileNotFound {
                path: self.file_path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(&self.file_path)?;
        let root = self.format.parse(&content)?;
        if !root.is_object() {
            return Err(ConfigError::TypeConversionError {
                message: format!("配置文件 {} 的根节点必须是对象", self.file_path.display()),
            });
        }

        self.root = root;
        self.last_modified = std::fs::metadata(&self.file_path)
            .and_then(|m| m.modified())
            .ok();

        debug!("配置文件加载完成: {}", self.file_path.display());
        Ok(())
    }
}

/// JSON 配置提供者
#[derive(Debug)]
pub struct JsonConfigProvider {
    source: FileSource,
    priority: i32,
}

impl JsonConfigProvider {
    /// 创建新的 JSON 配置提供者，文件必须存在
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(Self {
            source: FileSource::open(path.as_ref().to_path_buf(), FileFormat::Json, false)?,
            priority: 100,
        })
    }

    /// 文件不存在时视为空配置
    pub fn optional<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(Self {
            source: FileSource::open(path.as_ref().to_path_buf(), FileFormat::Json, true)?,
            priority: 100,
        })
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.source.file_path
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.source.last_modified
    }
}

#[async_trait]
impl ConfigProvider for JsonConfigProvider {
    async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError> {
        value_of(&self.source.root, key)
    }

    async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError> {
        section_of(&self.source.root, section_name)
    }

    async fn reload(&mut self) -> Result<(), ConfigError> {
        self.source.load()
    }

    async fn contains_key(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(lookup_path(&self.source.root, key).is_some())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, ConfigError> {
        Ok(collect_keys(&self.source.root))
    }

    fn name(&self) -> &str {
        "JsonConfigProvider"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supports_hot_reload(&self) -> bool {
        true
    }

    fn watch_path(&self) -> Option<PathBuf> {
        Some(self.source.file_path.clone())
    }
}

/// TOML 配置提供者
#[derive(Debug)]
pub struct TomlConfigProvider {
    source: FileSource,
    priority: i32,
}

impl TomlConfigProvider {
    /// 创建新的 TOML 配置提供者，文件必须存在
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(Self {
            source: FileSource::open(path.as_ref().to_path_buf(), FileFormat::Toml, false)?,
            priority: 90,
        })
    }

    /// 文件不存在时视为空配置
    pub fn optional<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(Self {
            source: FileSource::open(path.as_ref().to_path_buf(), FileFormat::Toml, true)?,
            priority: 90,
        })
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.source.file_path
    }
}

#[async_trait]
impl ConfigProvider for TomlConfigProvider {
    async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError> {
        value_of(&self.source.root, key)
    }

    async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError> {
        section_of(&self.source.root, section_name)
    }

    async fn reload(&mut self) -> Result<(), ConfigError> {
        self.source.load()
    }

    async fn contains_key(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(lookup_path(&self.source.root, key).is_some())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, ConfigError> {
        Ok(collect_keys(&self.source.root))
    }

    fn name(&self) -> &str {
        "TomlConfigProvider"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supports_hot_reload(&self) -> bool {
        true
    }

    fn watch_path(&self) -> Option<PathBuf> {
        Some(self.source.file_path.clone())
    }
}

/// 环境变量配置提供者
///
/// `LORN_Jwt__Issuer=x` 在前缀为 `LORN_` 时映射为键 `Jwt:Issuer`，键名保留原大小写。
/// 值一律保存为字符串，由配置节绑定时按字段类型转换。
#[derive(Debug)]
pub struct EnvironmentConfigProvider {
    prefix: String,
    separator: String,
    priority: i32,
    root: Value,
}

impl EnvironmentConfigProvider {
    /// 从当前进程环境变量创建
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut provider = Self {
            prefix: prefix.into(),
            separator: "__".to_string(),
            priority: 200,
            root: Value::Object(Map::new()),
        };
        provider.load_env_vars(std::env::vars());
        provider
    }

    /// 从给定的变量集合创建
    pub fn from_vars<I>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut provider = Self {
            prefix: prefix.into(),
            separator: "__".to_string(),
            priority: 200,
            root: Value::Object(Map::new()),
        };
        provider.load_env_vars(vars);
        provider
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 加载环境变量
    fn load_env_vars<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        debug!("加载环境变量，前缀: {}", self.prefix);

        let mut root = Map::new();
        let mut count = 0usize;
        for (key, value) in vars {
            let Some(stripped) = key.strip_prefix(&self.prefix) else {
                continue;
            };
            let path: Vec<&str> = stripped
                .split(self.separator.as_str())
                .filter(|part| !part.is_empty())
                .collect();
            if path.is_empty() {
                continue;
            }
            if insert_path(&mut root, &path, Value::String(value)) {
                count += 1;
            } else {
                warn!("环境变量 {} 与已有配置节冲突，已忽略", key);
            }
        }

        debug!("加载了 {} 个环境变量", count);
        self.root = Value::Object(root);
    }
}

/// 按路径写入值，中间节点已是叶子时返回 false
fn insert_path(root: &mut Map<String, Value>, path: &[&str], value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };

    let mut current = root;
    for part in parents {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match entry {
            Value::Object(object) => current = object,
            _ => return false,
        }
    }
    current.insert(last.to_string(), value);
    true
}

#[async_trait]
impl ConfigProvider for EnvironmentConfigProvider {
    async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError> {
        value_of(&self.root, key)
    }

    async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError> {
        section_of(&self.root, section_name)
    }

    async fn reload(&mut self) -> Result<(), ConfigError> {
        self.load_env_vars(std::env::vars());
        Ok(())
    }

    async fn contains_key(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(lookup_path(&self.root, key).is_some())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, ConfigError> {
        Ok(collect_keys(&self.root))
    }

    fn name(&self) -> &str {
        "EnvironmentConfigProvider"
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置提供者
///
/// 用于测试和以代码方式提供默认值。
#[derive(Debug, Clone)]
pub struct InMemoryConfigProvider {
    name: String,
    priority: i32,
    root: Value,
}

impl InMemoryConfigProvider {
    /// 以 JSON 对象创建，非对象的值视为空配置
    pub fn new(root: Value) -> Self {
        let root = if root.is_object() {
            root
        } else {
            Value::Object(Map::new())
        };
        Self {
            name: "InMemoryConfigProvider".to_string(),
            priority: 0,
            root,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 写入单个键，路径使用 `:` 分隔
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), ConfigError> {
        let path: Vec<&str> = key.split(':').filter(|part| !part.is_empty()).collect();
        let Value::Object(root) = &mut self.root else {
            return Err(ConfigError::TypeConversionError {
                message: "内存配置的根节点必须是对象".to_string(),
            });
        };
        if insert_path(root, &path, value) {
            Ok(())
        } else {
            Err(ConfigError::TypeConversionError {
                message: format!("配置键 {} 的上级节点不是对象", key),
            })
        }
    }
}

#[async_trait]
impl ConfigProvider for InMemoryConfigProvider {
    async fn get_configuration(&self, key: &str) -> Result<Value, ConfigError> {
        value_of(&self.root, key)
    }

    async fn get_section(&self, section_name: &str) -> Result<ConfigSection, ConfigError> {
        section_of(&self.root, section_name)
    }

    async fn reload(&mut self) -> Result<(), ConfigError> {
        Ok(())
    }

    async fn contains_key(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(lookup_path(&self.root, key).is_some())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, ConfigError> {
        Ok(collect_keys(&self.root))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
