//! 示例provider：users以明文写在config中
//!
//! 仅用于演示和测试。
//!
//! ```toml
//! [[providers]]
//! type = "insecure_example"
//!
//! [[providers.users]]
//! username = "test-user"
//! password = "test-pass"
//! name = "Test Name"
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::r#trait::{AuthProvider, ProviderBase};
use crate::auth::{
    config::ProviderConfig,
    crypto::constant_time_eq_hash,
    errors::AuthError,
    flow::{FlowStep, LoginFlow},
    store::AuthStore,
    types::{Credentials, UserMeta},
};

#[derive(Debug, Clone, Deserialize)]
struct ExampleUser {
    username: String,
    password: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExampleConfig {
    #[serde(default)]
    users: Vec<ExampleUser>,
}

/// 基于硬编码username/password的示例provider
pub struct InsecureExampleProvider {
    base: ProviderBase,
    users: Arc<Vec<ExampleUser>>,
}

impl InsecureExampleProvider {
    pub const TYPE: &'static str = "insecure_example";

    pub fn from_config(
        store: Arc<AuthStore>,
        config: ProviderConfig,
    ) -> Result<Arc<dyn AuthProvider>, AuthError> {
        let parsed: ExampleConfig = config.parse_extra()?;
        Ok(Arc::new(Self {
            base: ProviderBase::new(store, config),
            users: Arc::new(parsed.users),
        }))
    }
}

/// validate username/password（常量时间比较Password）
fn validate_login(users: &[ExampleUser], username: &str, password: &str) -> Result<(), AuthError> {
    let user = users
        .iter()
        .find(|user| user.username == username)
        .ok_or(AuthError::InvalidUser)?;

    if !constant_time_eq_hash(user.password.as_bytes(), password.as_bytes()) {
        return Err(AuthError::InvalidPassword);
    }
    Ok(())
}

#[async_trait]
impl AuthProvider for InsecureExampleProvider {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    async fn credential_flow(&self) -> Result<Box<dyn LoginFlow>, AuthError> {
        Ok(Box::new(UsernamePasswordFlow {
            users: self.users.clone(),
        }))
    }

    async fn get_or_create_credentials(
        &self,
        flow_result: &serde_json::Value,
    ) -> Result<Credentials, AuthError> {
        let username = flow_result["username"]
            .as_str()
            .ok_or_else(|| AuthError::FlowError("flow result has no username".to_string()))?;

        for credentials in self.base.credentials().await? {
            if credentials.data["username"].as_str() == Some(username) {
                return Ok(credentials);
            }
        }

        Ok(self.base.create_credentials(json!({ "username": username })))
    }

    async fn user_meta_for_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<UserMeta, AuthError> {
        let username = credentials.data["username"].as_str();
        let name = self
            .users
            .iter()
            .find(|user| Some(user.username.as_str()) == username)
            .and_then(|user| user.name.clone());
        Ok(UserMeta { name })
    }
}

/// 单步username/password表单
struct UsernamePasswordFlow {
    users: Arc<Vec<ExampleUser>>,
}

#[async_trait]
impl LoginFlow for UsernamePasswordFlow {
    async fn step(
        &mut self,
        step_id: &str,
        user_input: Option<serde_json::Value>,
    ) -> Result<FlowStep, AuthError> {
        if step_id != "init" {
            return Err(AuthError::FlowError(format!("unknown step: {step_id}")));
        }
        let Some(input) = user_input else {
            return Ok(FlowStep::form("init"));
        };

        let username = input["username"].as_str().unwrap_or_default();
        let password = input["password"].as_str().unwrap_or_default();

        match validate_login(&self.users, username, password) {
            Ok(()) => Ok(FlowStep::CreateEntry {
                data: json!({ "username": username }),
            }),
            Err(e) if e.is_auth_failure() => {
                debug!(error_code = e.error_code(), "login attempt rejected");
                Ok(FlowStep::Form {
                    step_id: "init".to_string(),
                    errors: BTreeMap::from([("base".to_string(), "invalid_auth".to_string())]),
                })
            }
            Err(e) => Err(e),
        }
    }
}
