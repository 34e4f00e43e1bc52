//! 存储层trait定义

use async_trait::async_trait;

use crate::auth::{errors::AuthError, types::AuthData};

/// 认证存储的持久化后端
///
/// store最多调用一次 `load`，每次变更后调用 `save`。
#[async_trait]
pub trait AuthPersistence: Send + Sync {
    /// load持久化的users和clients
    async fn load(&self) -> Result<AuthData, AuthError>;

    /// 保存完整的当前状态
    async fn save(&self, data: &AuthData) -> Result<(), AuthError>;
}
