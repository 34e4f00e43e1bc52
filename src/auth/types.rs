//! 认证相关类型定义

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::auth::ACCESS_TOKEN_EXPIRATION_MINUTES;

/// client secret的熵（字节数，hex编码后长度翻倍）
pub const CLIENT_SECRET_ENTROPY: usize = 64;

/// 生成ID：v4 UUID，32位小写hex
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// 从OS CSPRNG生成hex编码的secret
pub fn generate_secret() -> String {
    let mut buf = [0u8; CLIENT_SECRET_ENTROPY];
    OsRng.fill_bytes(&mut buf);
    let secret = hex::encode(buf);
    buf.zeroize();
    secret
}

/// provider实例标识
///
/// 同一provider类型配置多次时才需要 `id`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderKey {
    #[serde(rename = "type")]
    pub provider_type: String,
    pub id: Option<String>,
}

impl ProviderKey {
    pub fn new(provider_type: impl Into<String>, id: Option<&str>) -> Self {
        Self {
            provider_type: provider_type.into(),
            id: id.map(str::to_string),
        }
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}/{}", self.provider_type, id),
            None => f.write_str(&self.provider_type),
        }
    }
}

/// user信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// userID
    pub id: String,
    /// 是否为owner（第一个创建的user）
    pub is_owner: bool,
    pub is_active: bool,
    /// 显示名称
    pub name: Option<String>,
    /// 已链接的credentials
    pub credentials: Vec<Credentials>,
    /// 已签发的tokens
    pub tokens: Vec<AuthToken>,
}

impl User {
    /// 创建新user（新ID，无credentials和tokens）
    pub fn new(is_owner: bool, is_active: bool, name: Option<String>) -> Self {
        Self {
            id: generate_id(),
            is_owner,
            is_active,
            name,
            credentials: Vec::new(),
            tokens: Vec::new(),
        }
    }

    /// 公开视图（不含credentials和tokens）
    pub fn as_view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            is_owner: self.is_owner,
            is_active: self.is_active,
            name: self.name.clone(),
        }
    }
}

/// user公开视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub is_owner: bool,
    pub is_active: bool,
    pub name: Option<String>,
}

/// user在某个provider上的credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub auth_provider_type: String,
    pub auth_provider_id: Option<String>,
    /// provider自定义数据
    pub data: serde_json::Value,
    pub id: String,
    /// 链接到user之前为true
    pub is_new: bool,
}

impl Credentials {
    pub fn new(
        auth_provider_type: impl Into<String>,
        auth_provider_id: Option<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            auth_provider_type: auth_provider_type.into(),
            auth_provider_id,
            data,
            id: generate_id(),
            is_new: true,
        }
    }

    pub fn provider_key(&self) -> ProviderKey {
        ProviderKey {
            provider_type: self.auth_provider_type.clone(),
            id: self.auth_provider_id.clone(),
        }
    }

    /// 是否由provider实例 `key` 签发
    pub fn belongs_to(&self, key: &ProviderKey) -> bool {
        self.auth_provider_type == key.provider_type && self.auth_provider_id == key.id
    }
}

/// user登录用的session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    /// 所属userID（通过存储解析）
    pub user_id: String,
    pub client_id: String,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_refreshed: Option<DateTime<Utc>>,
    #[serde(with = "duration_secs")]
    pub access_token_valid: Duration,
}

impl AuthToken {
    pub fn new(user_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self::with_validity(
            user_id,
            client_id,
            Duration::minutes(ACCESS_TOKEN_EXPIRATION_MINUTES),
        )
    }

    pub fn with_validity(
        user_id: impl Into<String>,
        client_id: impl Into<String>,
        access_token_valid: Duration,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            client_id: client_id.into(),
            id: generate_id(),
            created_at: Utc::now(),
            last_refreshed: None,
            access_token_valid,
        }
    }

    /// 过期时间：上次刷新（或创建）时间 + 有效期
    /// 是否强制执行由调用方决定。
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.last_refreshed.unwrap_or(self.created_at) + self.access_token_valid
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// 代表user行事的client
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Client {
    pub name: String,
    pub id: String,
    /// Bearer secret（只生成一次）
    pub secret: String,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: generate_id(),
            secret: generate_secret(),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// provider显示信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub provider_type: String,
}

/// 创建新user时provider可提供的附加信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMeta {
    pub name: Option<String>,
}

/// 存储的完整持久化状态
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthData {
    pub users: Vec<User>,
    pub clients: Vec<Client>,
}

mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        i64::deserialize(d).map(Duration::seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generated_ids_are_hex_and_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_client_secret_length() {
        let client = Client::new("dash");
        assert_eq!(client.secret.len(), CLIENT_SECRET_ENTROPY * 2);
        assert!(client.secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(client.secret, Client::new("dash").secret);
    }

    #[test]
    fn test_client_debug_hides_secret() {
        let client = Client::new("dash");
        let printed = format!("{:?}", client);
        assert!(!printed.contains(&client.secret));
    }

    #[test]
    fn test_user_view_excludes_credentials() {
        let mut user = User::new(true, true, Some("Paulus".to_string()));
        user.credentials.push(Credentials::new(
            "demo",
            None,
            serde_json::json!({ "username": "paulus" }),
        ));

        let json = serde_json::to_value(user.as_view()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": user.id,
                "is_owner": true,
                "is_active": true,
                "name": "Paulus",
            })
        );
    }

    #[test]
    fn test_token_expiry_is_derived() {
        let mut token = AuthToken::new("user-1", "client-1");
        assert_eq!(token.access_token_valid, Duration::minutes(30));
        assert_eq!(token.expires_at(), token.created_at + Duration::minutes(30));
        assert!(!token.is_expired(token.created_at));

        let refreshed = token.created_at + Duration::minutes(20);
        token.last_refreshed = Some(refreshed);
        assert!(!token.is_expired(token.created_at + Duration::minutes(45)));
        assert!(token.is_expired(refreshed + Duration::minutes(30)));
    }

    #[test]
    fn test_credentials_belong_to_provider() {
        let creds = Credentials::new("demo", Some("second".into()), serde_json::Value::Null);
        assert!(creds.is_new);
        assert!(creds.belongs_to(&ProviderKey::new("demo", Some("second"))));
        assert!(!creds.belongs_to(&ProviderKey::new("demo", None)));
        assert_eq!(creds.provider_key().to_string(), "demo/second");
    }
}
