use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{HttpApi, Reply};
use crate::error::ApiError;
use crate::models::session::Role;

/// `data` of a successful `auth/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifiedUser {
    #[serde(alias = "_id")]
    pub id: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GoogleLoginRequest<'a> {
    pub token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Session lookup used by the verifier and route guard.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn verify(&self) -> Result<VerifiedUser, ApiError>;
}

impl HttpApi {
    /// Log in; the session cookie is kept in the client's cookie store.
    pub async fn login(&self, email: &str, password: &str) -> Result<Reply<()>, ApiError> {
        self.ack(Method::POST, "auth/login", &LoginRequest { email, password })
            .await
    }

    /// Exchange a Google ID token for the same session cookie.
    pub async fn google_login(&self, token: &str) -> Result<Reply<()>, ApiError> {
        self.ack(Method::POST, "auth/google", &GoogleLoginRequest { token })
            .await
    }

    pub async fn logout(&self) -> Result<Reply<()>, ApiError> {
        self.ack(Method::POST, "auth/logout", &serde_json::json!({}))
            .await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Reply<()>, ApiError> {
        self.ack(
            Method::POST,
            "auth/register",
            &RegisterRequest { name, email, password },
        )
        .await
    }
}

#[async_trait]
impl SessionApi for HttpApi {
    async fn verify(&self) -> Result<VerifiedUser, ApiError> {
        Ok(self.get::<VerifiedUser>("auth/verify").await?.data)
    }
}
