//! 认证配置

use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{errors::AuthError, ACCESS_TOKEN_EXPIRATION_MINUTES};

/// 未设置 `AUTH_CONFIG_PATH` 时读取的配置文件
pub const DEFAULT_CONFIG_PATH: &str = "auth.toml";

/// 认证配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Access token有效期（分钟）
    pub access_token_valid_minutes: i64,

    /// 认证providers（按显示顺序）
    pub providers: Vec<ProviderConfig>,
}

/// 单个provider的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// provider类型，用于在注册表中选择factory
    #[serde(rename = "type")]
    pub provider_type: String,

    /// 显示名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 同一类型配置两次时才需要
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// provider专有配置
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProviderConfig {
    pub fn new(provider_type: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            name: None,
            id: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 将专有配置解析为provider自己的结构
    pub fn parse_extra<T: DeserializeOwned>(&self) -> Result<T, AuthError> {
        serde_json::from_value(serde_json::Value::Object(self.extra.clone())).map_err(|e| {
            AuthError::InvalidConfig(format!(
                "auth provider {}: {}",
                self.provider_type, e
            ))
        })
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_valid_minutes: ACCESS_TOKEN_EXPIRATION_MINUTES,
            providers: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// 解析TOML
    pub fn from_toml_str(content: &str) -> Result<Self, AuthError> {
        let config: Self =
            toml::from_str(content).map_err(|e| AuthError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 读取并解析TOML文件
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuthError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// 从 `AUTH_CONFIG_PATH`（或 [`DEFAULT_CONFIG_PATH`]）加载，再应用环境变量覆盖。
    /// 文件不存在时使用默认值。
    pub fn load() -> Result<Self, AuthError> {
        let path =
            std::env::var("AUTH_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            info!(path = %path, "loading auth config");
            Self::from_file(&path)?
        } else {
            warn!(path = %path, "auth config not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// `ACCESS_TOKEN_EXPIRY_MINUTES` 覆盖token有效期
    pub fn apply_env_overrides(&mut self) -> Result<(), AuthError> {
        if let Ok(value) = std::env::var("ACCESS_TOKEN_EXPIRY_MINUTES") {
            self.access_token_valid_minutes = value.trim().parse().map_err(|_| {
                AuthError::InvalidConfig(format!(
                    "ACCESS_TOKEN_EXPIRY_MINUTES is not a number: {value}"
                ))
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.access_token_valid_minutes <= 0 {
            return Err(AuthError::InvalidConfig(
                "access_token_valid_minutes must be positive".to_string(),
            ));
        }
        if let Some(p) = self.providers.iter().find(|p| p.provider_type.is_empty()) {
            return Err(AuthError::InvalidConfig(format!(
                "auth provider with empty type (name: {:?})",
                p.name
            )));
        }
        Ok(())
    }

    pub fn access_token_valid(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_valid_minutes)
    }
}
