//! 强类型应用设置

use config_abstractions::{Options, OptionsMonitor};
use di_abstractions::Capability;
use infrastructure_common::{Configurable, ValidationError};
use request_pipeline::JwtValidationParameters;
use serde::{Deserialize, Serialize};

/// HS256 对称密钥的最小长度（字节）
pub const MIN_SECRET_KEY_BYTES: usize = 32;

/// 应用设置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AppSettings {
    pub application_name: String,
    pub version: String,
    pub enable_feature_x: bool,
}

impl Configurable for AppSettings {
    fn section_name() -> &'static str {
        "AppSettings"
    }
}

/// JWT 设置
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwtSettings {
    pub secret_key: String,
    pub issuer: String,
    pub audience: String,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret_key", &"***")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl JwtSettings {
    /// 转换为令牌验证参数
    pub fn validation_parameters(&self) -> JwtValidationParameters {
        JwtValidationParameters::new(&self.issuer, &self.audience, &self.secret_key)
    }
}

impl Configurable for JwtSettings {
    fn section_name() -> &'static str {
        "JwtSettings"
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.issuer.trim().is_empty() {
            return Err(ValidationError::required_field_missing("Issuer"));
        }
        if self.audience.trim().is_empty() {
            return Err(ValidationError::required_field_missing("Audience"));
        }
        if self.secret_key.is_empty() {
            return Err(ValidationError::required_field_missing("SecretKey"));
        }
        if self.secret_key.len() < MIN_SECRET_KEY_BYTES {
            return Err(ValidationError::invalid_field_value(
                "SecretKey",
                format!("至少需要 {} 字节", MIN_SECRET_KEY_BYTES),
            ));
        }
        Ok(())
    }
}

/// 启动时绑定的应用设置快照
pub const APP_SETTINGS: Capability<Options<AppSettings>> = Capability::new("AppSettings");
/// 随配置重载更新的应用设置
pub const APP_SETTINGS_MONITOR: Capability<dyn OptionsMonitor<AppSettings>> =
    Capability::new("AppSettingsMonitor");
pub const JWT_SETTINGS: Capability<Options<JwtSettings>> = Capability::new("JwtSettings");
pub const JWT_SETTINGS_MONITOR: Capability<dyn OptionsMonitor<JwtSettings>> =
    Capability::new("JwtSettingsMonitor");
