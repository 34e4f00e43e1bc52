//! 认证存储：users与clients的唯一来源（懒加载）
//!
//! 所有身份状态的变更都经过 [`AuthStore`]。首次需要数据时才从持久化后端
//! load，首次load由gate串行化，并发调用方只会触发一次后端load。
//!
//! 变更在整个 mutate → save 过程中持有集合写锁；save失败时回滚内存中的变更。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::auth::{
    errors::AuthError,
    providers::AuthProvider,
    storage::{AuthPersistence, MemoryStorage},
    types::{AuthData, AuthToken, Client, Credentials, ProviderKey, User},
    ACCESS_TOKEN_EXPIRATION_MINUTES,
};

/// 认证信息存储
pub struct AuthStore {
    persistence: Arc<dyn AuthPersistence>,
    load_lock: Mutex<()>,
    loaded: AtomicBool,
    data: RwLock<AuthData>,
    access_token_valid: Duration,
}

/// 持有某个credentials id的user
fn holder_of<'a>(data: &'a AuthData, credentials_id: &str) -> Option<&'a User> {
    data.users
        .iter()
        .find(|user| user.credentials.iter().any(|creds| creds.id == credentials_id))
}

impl AuthStore {
    /// 创建存储（此时不load任何数据）
    pub fn new(persistence: Arc<dyn AuthPersistence>) -> Self {
        Self {
            persistence,
            load_lock: Mutex::new(()),
            loaded: AtomicBool::new(false),
            data: RwLock::new(AuthData::default()),
            access_token_valid: Duration::minutes(ACCESS_TOKEN_EXPIRATION_MINUTES),
        }
    }

    /// 使用内存后端的存储
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// 新建access token的有效期
    pub fn with_access_token_valid(mut self, valid: Duration) -> Self {
        self.access_token_valid = valid;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// 如果尚未load，则load users和clients
    pub async fn load(&self) -> Result<(), AuthError> {
        if self.is_loaded() {
            return Ok(());
        }

        let _gate = self.load_lock.lock().await;
        if self.is_loaded() {
            return Ok(());
        }

        let loaded = self.persistence.load().await?;
        info!(
            users = loaded.users.len(),
            clients = loaded.clients.len(),
            "auth store loaded"
        );
        *self.data.write().await = loaded;
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    /// 持久化当前状态
    ///
    /// 调用方已持有写锁，这里只接收被锁住的数据。
    async fn save(&self, data: &AuthData) -> Result<(), AuthError> {
        self.persistence.save(data).await.map_err(|e| {
            warn!(error = %e, "failed to persist auth data, rolling back");
            e
        })
    }

    /// 某个provider实例签发的全部credentials
    pub async fn credentials_for_provider(
        &self,
        provider_type: &str,
        provider_id: Option<&str>,
    ) -> Result<Vec<Credentials>, AuthError> {
        self.load().await?;
        let key = ProviderKey::new(provider_type, provider_id);

        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .flat_map(|user| user.credentials.iter())
            .filter(|creds| creds.belongs_to(&key))
            .cloned()
            .collect())
    }

    /// 通过ID查找user
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        self.load().await?;
        let data = self.data.read().await;
        Ok(data.users.iter().find(|user| user.id == user_id).cloned())
    }

    /// 全部user的快照
    pub async fn get_users(&self) -> Result<Vec<User>, AuthError> {
        self.load().await?;
        Ok(self.data.read().await.users.clone())
    }

    /// 查找持有 `credentials` 的user；新credentials则创建user。
    ///
    /// 空存储中创建的第一个user成为active owner。非新credentials必须已属于
    /// 某个user，否则引用已损坏，返回 `CredentialsWithoutUser`。
    /// 一份credentials只会链接到一个user：仍标记为新、但已被链接的副本
    /// 解析到原来的user。
    pub async fn get_or_create_user(
        &self,
        credentials: &mut Credentials,
        provider: &dyn AuthProvider,
    ) -> Result<User, AuthError> {
        self.load().await?;

        if !credentials.is_new {
            let key = credentials.provider_key();
            let data = self.data.read().await;
            return data
                .users
                .iter()
                .find(|user| {
                    user.credentials
                        .iter()
                        .any(|creds| creds.belongs_to(&key) && creds.id == credentials.id)
                })
                .cloned()
                .ok_or_else(|| AuthError::CredentialsWithoutUser(credentials.id.clone()));
        }

        // provider可能读取存储，先于写锁获取
        let meta = provider.user_meta_for_credentials(credentials).await?;

        let mut data = self.data.write().await;
        if let Some(holder) = holder_of(&data, &credentials.id) {
            let key = credentials.provider_key();
            let same_provider = holder
                .credentials
                .iter()
                .any(|creds| creds.id == credentials.id && creds.belongs_to(&key));
            if !same_provider {
                return Err(AuthError::CredentialsAlreadyLinked(credentials.id.clone()));
            }
            debug!(user_id = %holder.id, credentials_id = %credentials.id, "credentials already linked");
            credentials.is_new = false;
            return Ok(holder.clone());
        }

        let first_user = data.users.is_empty();
        let mut user = User::new(first_user, first_user, meta.name);
        let mut linked = credentials.clone();
        linked.is_new = false;
        user.credentials.push(linked);
        data.users.push(user.clone());

        if let Err(e) = self.save(&data).await {
            data.users.pop();
            return Err(e);
        }
        credentials.is_new = false;
        info!(user_id = %user.id, is_owner = first_user, provider = %credentials.provider_key(), "created user");
        Ok(user)
    }

    /// 为已存在的user添加credentials
    pub async fn link_user(
        &self,
        user_id: &str,
        credentials: &mut Credentials,
    ) -> Result<(), AuthError> {
        self.load().await?;
        let mut data = self.data.write().await;

        if let Some(holder) = holder_of(&data, &credentials.id) {
            if holder.id != user_id {
                return Err(AuthError::CredentialsAlreadyLinked(credentials.id.clone()));
            }
            debug!(user_id = %user_id, credentials_id = %credentials.id, "credentials already linked");
            credentials.is_new = false;
            return Ok(());
        }

        let index = data
            .users
            .iter()
            .position(|user| user.id == user_id)
            .ok_or_else(|| AuthError::UserNotFound(user_id.to_string()))?;

        let mut linked = credentials.clone();
        linked.is_new = false;
        data.users[index].credentials.push(linked);

        if let Err(e) = self.save(&data).await {
            data.users[index].credentials.pop();
            return Err(e);
        }
        credentials.is_new = false;
        debug!(user_id = %user_id, provider = %credentials.provider_key(), "linked credentials");
        Ok(())
    }

    /// 删除user
    pub async fn remove_user(&self, user_id: &str) -> Result<(), AuthError> {
        self.load().await?;
        let mut data = self.data.write().await;

        let Some(index) = data.users.iter().position(|user| user.id == user_id) else {
            warn!(user_id = %user_id, "attempted to remove unknown user");
            return Err(AuthError::UserNotFound(user_id.to_string()));
        };
        let removed = data.users.remove(index);

        if let Err(e) = self.save(&data).await {
            data.users.insert(index, removed);
            return Err(e);
        }
        info!(user_id = %user_id, "removed user");
        Ok(())
    }

    /// 为user创建新token
    pub async fn create_token(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<AuthToken, AuthError> {
        self.load().await?;
        let mut data = self.data.write().await;

        let index = data
            .users
            .iter()
            .position(|user| user.id == user_id)
            .ok_or_else(|| AuthError::UserNotFound(user_id.to_string()))?;
        let token = AuthToken::with_validity(user_id, client_id, self.access_token_valid);
        data.users[index].tokens.push(token.clone());

        if let Err(e) = self.save(&data).await {
            data.users[index].tokens.pop();
            return Err(e);
        }
        info!(user_id = %user_id, client_id = %client_id, token_id = %token.id, "issued token");
        Ok(token)
    }

    /// 注册新的API client
    pub async fn create_client(&self, name: &str) -> Result<Client, AuthError> {
        self.load().await?;
        let mut data = self.data.write().await;

        let client = Client::new(name);
        data.clients.push(client.clone());

        if let Err(e) = self.save(&data).await {
            data.clients.pop();
            return Err(e);
        }
        info!(client_id = %client.id, name = %name, "registered client");
        Ok(client)
    }

    /// 全部clients
    pub async fn get_clients(&self) -> Result<Vec<Client>, AuthError> {
        self.load().await?;
        Ok(self.data.read().await.clients.clone())
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
