// src/lib.rs
//! 身份与会话管理核心
//!
//! 可插拔的认证providers、user解析、session token签发、API client管理，
//! 以及供login flow engine调用的hooks。

pub mod auth;

pub use auth::{
    auth_manager_from_config, AuthConfig, AuthError, AuthManager, AuthStore, ProviderRegistry,
};
