//! 认证服务（整合层）
//!
//! 应用其余部分的唯一入口：隐藏store和providers，并实现flow engine的login flow hooks。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use subtle::{Choice, ConditionallySelectable};
use tracing::{error, info, warn};

use crate::auth::{
    config::{AuthConfig, ProviderConfig},
    crypto::ct_eq_hashed,
    errors::AuthError,
    flow::{FlowResult, LoginFlow, LoginFlowHandler},
    providers::{AuthProvider, ProviderHandle, ProviderRegistry},
    storage::AuthPersistence,
    store::AuthStore,
    types::{AuthToken, Client, Credentials, ProviderInfo, ProviderKey, User},
};

/// 认证服务（门面模式）
pub struct AuthManager {
    store: Arc<AuthStore>,
    providers: Vec<ProviderHandle>,
    index: HashMap<ProviderKey, usize>,
}

impl AuthManager {
    /// 创建新的认证服务
    ///
    /// providers保持给定顺序；(type, id) 重复的provider记录error后丢弃，先到者保留。
    pub fn new(store: Arc<AuthStore>, providers: Vec<Arc<dyn AuthProvider>>) -> Self {
        let mut handles = Vec::with_capacity(providers.len());
        let mut index = HashMap::with_capacity(providers.len());

        for provider in providers {
            let key = provider.key();
            if index.contains_key(&key) {
                error!(
                    provider = %key,
                    "Found duplicate provider. Please add unique IDs if you want to have the same provider twice."
                );
                continue;
            }
            index.insert(key, handles.len());
            handles.push(ProviderHandle::new(provider));
        }

        Self {
            store,
            providers: handles,
            index,
        }
    }

    pub fn store(&self) -> &Arc<AuthStore> {
        &self.store
    }

    /// 可用的providers（用于显示）
    pub fn auth_providers(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|handle| handle.provider().info())
            .collect()
    }

    /// 通过key查找provider
    pub fn provider(&self, key: &ProviderKey) -> Result<&ProviderHandle, AuthError> {
        self.index
            .get(key)
            .map(|&i| &self.providers[i])
            .ok_or_else(|| AuthError::ProviderNotFound(key.clone()))
    }

    /// 通过ID获取user
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        self.store.get_user(user_id).await
    }

    /// 查找或创建user
    pub async fn get_or_create_user(
        &self,
        credentials: &mut Credentials,
    ) -> Result<User, AuthError> {
        let handle = self.provider(&credentials.provider_key())?;
        self.store
            .get_or_create_user(credentials, handle.provider().as_ref())
            .await
    }

    /// 将credentials链接到已存在的user
    pub async fn link_user(
        &self,
        user_id: &str,
        credentials: &mut Credentials,
    ) -> Result<(), AuthError> {
        self.store.link_user(user_id, credentials).await
    }

    /// 删除user
    pub async fn remove_user(&self, user_id: &str) -> Result<(), AuthError> {
        self.store.remove_user(user_id).await
    }

    /// 为user创建新token
    pub async fn create_token(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<AuthToken, AuthError> {
        self.store.create_token(user_id, client_id).await
    }

    /// 创建新client
    pub async fn create_client(&self, name: &str) -> Result<Client, AuthError> {
        self.store.create_client(name).await
    }

    /// 通过ID获取client
    ///
    /// 每个client都做常量时间比较，扫描不会提前结束，耗时只取决于client数量。
    pub async fn secure_get_client(&self, client_id: &str) -> Result<Option<Client>, AuthError> {
        let mut clients = self.store.get_clients().await?;

        let mut found = Choice::from(0);
        let mut found_index = 0u64;
        for (i, client) in clients.iter().enumerate() {
            let matches = ct_eq_hashed(client_id.as_bytes(), client.id.as_bytes());
            found_index.conditional_assign(&(i as u64), matches);
            found |= matches;
        }

        if bool::from(found) {
            Ok(Some(clients.swap_remove(found_index as usize)))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl LoginFlowHandler for AuthManager {
    async fn create_login_flow(
        &self,
        handler: &ProviderKey,
    ) -> Result<Box<dyn LoginFlow>, AuthError> {
        let handle = self.provider(handler)?;
        handle.ensure_initialized().await?;
        handle.provider().credential_flow().await
    }

    async fn finish_login_flow(&self, result: FlowResult) -> Result<Credentials, AuthError> {
        let handle = self.provider(&result.handler)?;
        handle
            .provider()
            .get_or_create_credentials(&result.data)
            .await
    }
}

/// 从config构造provider（未知类型与无效配置跳过）
async fn provider_from_config(
    store: Arc<AuthStore>,
    registry: &ProviderRegistry,
    config: ProviderConfig,
) -> Option<Arc<dyn AuthProvider>> {
    let Some(factory) = registry.get(&config.provider_type) else {
        warn!(provider_type = %config.provider_type, "Unable to find auth provider");
        return None;
    };

    let provider_type = config.provider_type.clone();
    match factory(store, config) {
        Ok(provider) => Some(provider),
        Err(e) => {
            error!(provider_type = %provider_type, error = %e, "Invalid configuration for auth provider");
            None
        }
    }
}

/// 从config初始化认证服务
pub async fn auth_manager_from_config(
    config: &AuthConfig,
    registry: &ProviderRegistry,
    persistence: Arc<dyn AuthPersistence>,
) -> Result<AuthManager, AuthError> {
    config.validate()?;
    let store = Arc::new(AuthStore::new(persistence).with_access_token_valid(config.access_token_valid()));

    let providers = join_all(
        config
            .providers
            .iter()
            .cloned()
            .map(|provider_config| provider_from_config(store.clone(), registry, provider_config)),
    )
    .await;

    let manager = AuthManager::new(store, providers.into_iter().flatten().collect());
    info!(providers = manager.providers.len(), "auth manager ready");
    Ok(manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::flow::FlowStep;
    use crate::auth::providers::{InsecureExampleProvider, Readiness};
    use crate::auth::storage::MemoryStorage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn example_config(id: Option<&str>) -> ProviderConfig {
        let mut config = match id {
            Some(id) => ProviderConfig::new(InsecureExampleProvider::TYPE).with_id(id),
            None => ProviderConfig::new(InsecureExampleProvider::TYPE),
        };
        config.extra.insert(
            "users".into(),
            json!([{ "username": "test-user", "password": "test-pass" }]),
        );
        config
    }

    async fn manager(providers: Vec<ProviderConfig>) -> AuthManager {
        let config = AuthConfig {
            providers,
            ..AuthConfig::default()
        };
        auth_manager_from_config(&config, &ProviderRegistry::default(), Arc::new(MemoryStorage))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_and_unknown_providers_are_skipped() {
        let mut broken = example_config(Some("broken"));
        broken.extra.insert("users".into(), json!(42));

        let manager = manager(vec![
            example_config(None).with_name("First"),
            example_config(None).with_name("Duplicate"),
            ProviderConfig::new("does_not_exist"),
            broken,
            example_config(Some("second")),
        ])
        .await;

        assert_eq!(
            manager.auth_providers(),
            vec![
                ProviderInfo {
                    name: "First".into(),
                    id: None,
                    provider_type: "insecure_example".into(),
                },
                ProviderInfo {
                    name: "Unnamed auth provider".into(),
                    id: Some("second".into()),
                    provider_type: "insecure_example".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_provider_key_is_fatal() {
        let manager = manager(vec![example_config(None)]).await;

        let key = ProviderKey::new("insecure_example", Some("missing"));
        assert!(matches!(
            manager.create_login_flow(&key).await,
            Err(AuthError::ProviderNotFound(k)) if k == key
        ));

        let mut creds = Credentials::new("insecure_example", Some("missing".into()), json!({}));
        assert!(matches!(
            manager.get_or_create_user(&mut creds).await,
            Err(AuthError::ProviderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_login_flow_initializes_provider() {
        let manager = manager(vec![example_config(None)]).await;
        let key = ProviderKey::new("insecure_example", None);
        assert_eq!(manager.provider(&key).unwrap().readiness(), Readiness::Uninitialized);

        let mut flow = manager.create_login_flow(&key).await.unwrap();
        assert_eq!(manager.provider(&key).unwrap().readiness(), Readiness::Ready);
        assert_eq!(flow.step("init", None).await.unwrap(), FlowStep::form("init"));
    }

    #[tokio::test]
    async fn test_secure_get_client() {
        let manager = manager(vec![]).await;
        assert!(manager.secure_get_client("anything").await.unwrap().is_none());

        let first = manager.create_client("first").await.unwrap();
        let _middle = manager.create_client("middle").await.unwrap();
        let last = manager.create_client("last").await.unwrap();

        let found = manager.secure_get_client(&first.id).await.unwrap().unwrap();
        assert_eq!(found.name, "first");
        let found = manager.secure_get_client(&last.id).await.unwrap().unwrap();
        assert_eq!(found.name, "last");
        assert_eq!(found.secret, last.secret);

        assert!(manager.secure_get_client("nonexistent").await.unwrap().is_none());
        assert!(manager
            .secure_get_client(&first.id[..16])
            .await
            .unwrap()
            .is_none());
    }
}
