//! 认证与会话管理模块
//!
//! ## 模块结构
//!
//! ```text
//! auth/
//! ├── types.rs          # 类型定义
//! ├── errors.rs         # error类型
//! ├── config.rs         # 配置
//! ├── crypto.rs         # 常量时间比较
//! ├── store.rs          # 懒加载存储
//! ├── service.rs        # 认证服务（门面）
//! ├── flow.rs           # login flow hooks
//! ├── providers/        # provider插件
//! │   ├── trait.rs
//! │   ├── handle.rs
//! │   ├── registry.rs
//! │   └── insecure_example.rs
//! └── storage/          # 持久化后端
//!     ├── trait.rs
//!     └── memory.rs
//! ```
//!
//! 分层：manager → store → persistence。provider只通过store查询自己的credentials。

pub mod types;
pub mod errors;
pub mod config;
pub mod crypto;
pub mod store;
pub mod service;
pub mod flow;
pub mod providers;
pub mod storage;

pub use types::{AuthToken, Client, Credentials, ProviderInfo, ProviderKey, User, UserMeta, UserView};
pub use errors::AuthError;
pub use config::{AuthConfig, ProviderConfig};
pub use store::AuthStore;
pub use service::{auth_manager_from_config, AuthManager};
pub use flow::{FlowResult, FlowStep, LoginFlow, LoginFlowHandler};
pub use providers::{AuthProvider, ProviderBase, ProviderRegistry};
pub use storage::{AuthPersistence, MemoryStorage};

/// 默认access token有效期（分钟）
pub const ACCESS_TOKEN_EXPIRATION_MINUTES: i64 = 30;
