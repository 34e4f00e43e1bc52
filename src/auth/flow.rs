//! manager与外部flow engine之间的login flow契约
//!
//! flow engine负责多步交互：通过 [`LoginFlowHandler`] 获取provider的flow，
//! 用user输入逐步推进，直到得到 [`FlowStep::CreateEntry`]，
//! 再经 [`LoginFlowHandler::finish_login_flow`] 换取credentials。

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::{
    errors::AuthError,
    types::{Credentials, ProviderKey},
};

/// 单步结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowStep {
    /// 显示 `step_id` 表单；`errors`：字段（或 `base`）→ error key
    Form {
        step_id: String,
        errors: BTreeMap<String, String>,
    },
    /// flow成功完成
    CreateEntry { data: serde_json::Value },
    /// flow中止
    Abort { reason: String },
}

impl FlowStep {
    pub fn form(step_id: impl Into<String>) -> Self {
        Self::Form {
            step_id: step_id.into(),
            errors: BTreeMap::new(),
        }
    }
}

/// provider专有的credential flow
#[async_trait]
pub trait LoginFlow: Send {
    /// 推进flow（首次显示该步时 `user_input` 为 `None`）
    async fn step(
        &mut self,
        step_id: &str,
        user_input: Option<serde_json::Value>,
    ) -> Result<FlowStep, AuthError>;
}

/// flow完成时flow engine传回的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowResult {
    /// 创建该flow的provider
    pub handler: ProviderKey,
    pub data: serde_json::Value,
}

/// flow engine调用的两个hook
#[async_trait]
pub trait LoginFlowHandler: Send + Sync {
    /// 为provider `handler` 创建login flow
    async fn create_login_flow(
        &self,
        handler: &ProviderKey,
    ) -> Result<Box<dyn LoginFlow>, AuthError>;

    /// 将完成的flow转换为credentials
    async fn finish_login_flow(&self, result: FlowResult) -> Result<Credentials, AuthError>;
}
