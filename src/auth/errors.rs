//! 认证error类型定义

use thiserror::Error;

use crate::auth::types::ProviderKey;

/// 认证error
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid user")]
    InvalidUser,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Unknown authentication error: {0}")]
    Unknown(String),

    /// 声称已链接的credentials找不到对应user（数据一致性error）
    #[error("Credentials with id {0} are not linked to any user")]
    CredentialsWithoutUser(String),

    #[error("Credentials {0} are already linked to another user")]
    CredentialsAlreadyLinked(String),

    #[error("Auth provider not found: {0}")]
    ProviderNotFound(ProviderKey),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Login flow error: {0}")]
    FlowError(String),
}

impl AuthError {
    /// 是否为通用认证失败（而非配置或一致性问题）
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidUser | Self::InvalidPassword | Self::Unknown(_)
        )
    }

    /// 稳定的error code（机器可读）
    pub fn error_code(&self) -> &str {
        match self {
            Self::InvalidUser => "invalid_user",
            Self::InvalidPassword => "invalid_password",
            Self::Unknown(_) => "unknown_error",
            Self::CredentialsWithoutUser(_) => "credentials_without_user",
            Self::CredentialsAlreadyLinked(_) => "credentials_already_linked",
            Self::ProviderNotFound(_) => "provider_not_found",
            Self::UserNotFound(_) => "user_not_found",
            Self::InvalidConfig(_) => "invalid_config",
            Self::StorageError(_) => "storage_error",
            Self::FlowError(_) => "flow_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(AuthError::InvalidUser, "invalid_user", true)]
    #[test_case(AuthError::InvalidPassword, "invalid_password", true)]
    #[test_case(AuthError::Unknown("boom".into()), "unknown_error", true)]
    #[test_case(AuthError::CredentialsWithoutUser("abc".into()), "credentials_without_user", false)]
    #[test_case(AuthError::UserNotFound("u1".into()), "user_not_found", false)]
    #[test_case(AuthError::StorageError("disk".into()), "storage_error", false)]
    fn test_error_codes(err: AuthError, code: &str, auth_failure: bool) {
        assert_eq!(err.error_code(), code);
        assert_eq!(err.is_auth_failure(), auth_failure);
    }

    #[test]
    fn test_provider_not_found_message() {
        let err = AuthError::ProviderNotFound(ProviderKey::new("demo", Some("second")));
        assert_eq!(err.to_string(), "Auth provider not found: demo/second");
    }
}
