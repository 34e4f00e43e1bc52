//! 已注册的provider及其懒初始化状态（只执行一次）

use std::sync::Arc;

use parking_lot::Mutex as StateLock;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::r#trait::AuthProvider;
use crate::auth::errors::AuthError;

/// provider初始化状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Uninitialized,
    Initializing,
    Ready,
}

/// manager持有的provider
pub struct ProviderHandle {
    provider: Arc<dyn AuthProvider>,
    state: StateLock<Readiness>,
    init_gate: Mutex<()>,
}

impl ProviderHandle {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            state: StateLock::new(Readiness::Uninitialized),
            init_gate: Mutex::new(()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn AuthProvider> {
        &self.provider
    }

    pub fn readiness(&self) -> Readiness {
        *self.state.lock()
    }

    /// 执行provider的 `initialize` hook（除非已成功）
    ///
    /// 并发调用方在gate上等待，只有一个执行hook。
    /// 失败后回到 `Uninitialized`，之后的flow可以重试。
    pub async fn ensure_initialized(&self) -> Result<(), AuthError> {
        if self.readiness() == Readiness::Ready {
            return Ok(());
        }

        let _gate = self.init_gate.lock().await;
        if self.readiness() == Readiness::Ready {
            return Ok(());
        }

        *self.state.lock() = Readiness::Initializing;
        match self.provider.initialize().await {
            Ok(()) => {
                *self.state.lock() = Readiness::Ready;
                info!(provider = %self.provider.key(), "auth provider initialized");
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = Readiness::Uninitialized;
                warn!(provider = %self.provider.key(), error = %e, "auth provider failed to initialize");
                Err(e)
            }
        }
    }
}
