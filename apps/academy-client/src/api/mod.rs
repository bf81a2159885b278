//! REST boundary: typed request/response shapes for every backend endpoint.
//!
//! Every response body is the envelope `{ success, message?, error?, data? }`.
//! Anything that does not decode into the expected type fails with
//! [`ErrorKind::Decode`](crate::error::ErrorKind::Decode) instead of being
//! rendered half-populated.

pub mod admin;
pub mod auth;
pub mod courses;
pub mod notifications;
pub mod profile;
pub mod student;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::ApiError;

pub use auth::{SessionApi, VerifiedUser};
pub use notifications::NotificationApi;

/// A decoded success response together with the server's message, if any.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    pub message: Option<String>,
    pub data: T,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    data: Option<T>,
}

/// HTTP client for the backend. Cookies set by `auth/login` are replayed on
/// every later call, so the session travels with each request.
#[derive(Clone)]
pub struct HttpApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            base_url: config.endpoint(""),
            http,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path.trim_start_matches('/'));
        tracing::debug!(%method, %url, "api request");
        self.http.request(method, url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Reply<T>, ApiError> {
        self.send_data(self.request(Method::GET, path)).await
    }

    async fn get_with<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Reply<T>, ApiError> {
        self.send_data(self.request(Method::GET, path).query(query)).await
    }

    async fn call<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Reply<T>, ApiError> {
        self.send_data(self.request(method, path).json(body)).await
    }

    /// A mutating call whose response carries no data worth decoding.
    async fn ack<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Reply<()>, ApiError> {
        let reply = self.call_optional::<IgnoredAny, B>(method, path, body).await?;
        Ok(Reply {
            message: reply.message,
            data: (),
        })
    }

    /// Like [`call`](Self::call) for responses where `data` may be absent.
    async fn call_optional<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Reply<Option<T>>, ApiError> {
        let envelope: Envelope<T> = self.send(self.request(method, path).json(body)).await?;
        Ok(Reply {
            message: envelope.message,
            data: envelope.data,
        })
    }

    async fn send_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Reply<T>, ApiError> {
        let envelope: Envelope<T> = self.send(request).await?;
        let data = envelope
            .data
            .ok_or_else(|| ApiError::decode("response is missing `data`"))?;
        Ok(Reply {
            message: envelope.message,
            data,
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Envelope<T>, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| server_message(&v));
            tracing::debug!(%status, ?message, "api call failed");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::unauthorized(status, message),
                _ => ApiError::rejected(Some(status), message),
            });
        }

        let envelope: Envelope<T> = serde_json::from_slice(&body)?;
        if !envelope.success {
            let message = envelope
                .message
                .clone()
                .or_else(|| envelope.error.as_ref().and_then(error_text));
            return Err(ApiError::rejected(Some(status), message));
        }
        Ok(envelope)
    }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{ message }`, `{ error: "..." }` and `{ error: { message } }`.
fn server_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| body.get("error").and_then(error_text))
}

fn error_text(error: &Value) -> Option<String> {
    match error {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("message").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
