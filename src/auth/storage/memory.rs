//! 内存存储实现（启动为空，save时丢弃）

use async_trait::async_trait;
use tracing::debug;

use super::r#trait::AuthPersistence;
use crate::auth::{errors::AuthError, types::AuthData};

/// 内存存储（进程退出即丢失）
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryStorage;

impl MemoryStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthPersistence for MemoryStorage {
    async fn load(&self) -> Result<AuthData, AuthError> {
        Ok(AuthData::default())
    }

    async fn save(&self, data: &AuthData) -> Result<(), AuthError> {
        debug!(
            users = data.users.len(),
            clients = data.clients.len(),
            "memory storage discarding save"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::{Client, User};

    #[tokio::test]
    async fn test_memory_storage_starts_empty_and_discards() {
        let storage = MemoryStorage::new();

        let mut data = storage.load().await.unwrap();
        assert!(data.users.is_empty());
        assert!(data.clients.is_empty());

        data.users.push(User::new(true, true, None));
        data.clients.push(Client::new("dash"));
        storage.save(&data).await.unwrap();

        let reloaded = storage.load().await.unwrap();
        assert!(reloaded.users.is_empty());
        assert!(reloaded.clients.is_empty());
    }
}
