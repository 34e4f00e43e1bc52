//! Provider注册表：type名称 → 构造函数

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{insecure_example::InsecureExampleProvider, r#trait::AuthProvider};
use crate::auth::{config::ProviderConfig, errors::AuthError, store::AuthStore};

/// 从config构造provider，并validate其专有配置
pub type ProviderFactory =
    fn(Arc<AuthStore>, ProviderConfig) -> Result<Arc<dyn AuthProvider>, AuthError>;

/// 已知的provider类型
pub struct ProviderRegistry {
    factories: RwLock<HashMap<String, ProviderFactory>>,
}

impl ProviderRegistry {
    /// 空注册表
    pub fn empty() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// 包含内置provider类型的注册表
    pub fn with_builtin() -> Self {
        let registry = Self::empty();
        registry.register(InsecureExampleProvider::TYPE, InsecureExampleProvider::from_config);
        registry
    }

    /// 注册（或替换）`provider_type` 的factory
    pub fn register(&self, provider_type: &str, factory: ProviderFactory) {
        let previous = self
            .factories
            .write()
            .insert(provider_type.to_string(), factory);
        if previous.is_some() {
            warn!(provider_type = %provider_type, "replaced auth provider factory");
        } else {
            debug!(provider_type = %provider_type, "registered auth provider factory");
        }
    }

    pub fn get(&self, provider_type: &str) -> Option<ProviderFactory> {
        self.factories.read().get(provider_type).copied()
    }

    pub fn contains(&self, provider_type: &str) -> bool {
        self.factories.read().contains_key(provider_type)
    }

    /// 已注册的type名称（排序后）
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<_> = self.factories.read().keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
