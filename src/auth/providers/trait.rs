//! 认证provider trait定义

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::{
    config::ProviderConfig,
    errors::AuthError,
    flow::LoginFlow,
    store::AuthStore,
    types::{Credentials, ProviderInfo, ProviderKey, UserMeta},
};

/// config中没有 `name` 时使用的标题
pub const DEFAULT_TITLE: &str = "Unnamed auth provider";

/// 每个provider共享的状态：config与存储句柄
pub struct ProviderBase {
    store: Arc<AuthStore>,
    config: ProviderConfig,
}

impl ProviderBase {
    pub fn new(store: Arc<AuthStore>, config: ProviderConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<AuthStore> {
        &self.store
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn key(&self) -> ProviderKey {
        ProviderKey::new(&self.config.provider_type, self.config.id.as_deref())
    }

    /// 该provider签发过的全部credentials
    pub async fn credentials(&self) -> Result<Vec<Credentials>, AuthError> {
        self.store
            .credentials_for_provider(&self.config.provider_type, self.config.id.as_deref())
            .await
    }

    /// 创建带有本provider key的新credentials（未链接）
    pub fn create_credentials(&self, data: serde_json::Value) -> Credentials {
        Credentials::new(
            self.config.provider_type.clone(),
            self.config.id.clone(),
            data,
        )
    }
}

/// 认证provider trait
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// 共享状态
    fn base(&self) -> &ProviderBase;

    /// 提供商类型
    fn provider_type(&self) -> &str {
        &self.base().config().provider_type
    }

    /// 可选ID（同一类型配置多次时需要）
    fn id(&self) -> Option<&str> {
        self.base().config().id.as_deref()
    }

    /// 显示名称
    fn name(&self) -> &str {
        self.base().config().name.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    fn key(&self) -> ProviderKey {
        self.base().key()
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name().to_string(),
            id: self.id().map(str::to_string),
            provider_type: self.provider_type().to_string(),
        }
    }

    /// 一次性初始化，在首个login flow之前懒执行
    async fn initialize(&self) -> Result<(), AuthError> {
        Ok(())
    }

    /// 由外部flow engine驱动的登录流程
    async fn credential_flow(&self) -> Result<Box<dyn LoginFlow>, AuthError>;

    /// 将完成的flow数据转换为credentials
    async fn get_or_create_credentials(
        &self,
        flow_result: &serde_json::Value,
    ) -> Result<Credentials, AuthError>;

    /// 仅在创建新user时使用的附加信息
    async fn user_meta_for_credentials(
        &self,
        _credentials: &Credentials,
    ) -> Result<UserMeta, AuthError> {
        Ok(UserMeta::default())
    }
}
