use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::models::session::Role;
use crate::storage::{LocalStorage, StorageError, StorageEvent};

const STATUS_SUFFIX: &str = "_auth_status";
const EVENT_SUFFIX: &str = "_auth_event";

/// Coarse "logged in" flag for one role. A UI hint only; authorization is
/// always decided by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub is_authenticated: bool,
    /// Unix milliseconds of the write.
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthEventKind {
    Login,
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    #[serde(rename = "type")]
    pub kind: AuthEventKind,
    pub role: Role,
    pub timestamp: i64,
}

fn status_key(role: Role) -> String {
    format!("{role}{STATUS_SUFFIX}")
}

fn event_key(role: Role) -> String {
    format!("{role}{EVENT_SUFFIX}")
}

/// Per-role auth flags on top of [`LocalStorage`], plus login/logout
/// broadcasts to every other client sharing the storage.
#[derive(Clone)]
pub struct AuthStatusStore {
    storage: Arc<dyn LocalStorage>,
}

impl AuthStatusStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    pub async fn set_status(&self, role: Role, is_authenticated: bool) -> Result<(), StorageError> {
        let status = AuthStatus {
            is_authenticated,
            timestamp: Some(Utc::now().timestamp_millis()),
        };
        let value = serde_json::to_string(&status).unwrap_or_default();
        self.storage.set_item(&status_key(role), &value).await
    }

    /// Absent or unreadable flags count as "not authenticated".
    pub async fn status(&self, role: Role) -> AuthStatus {
        let raw = match self.storage.get_item(&status_key(role)).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(%role, ?err, "failed to read auth status");
                None
            }
        };
        raw.and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub async fn clear(&self, role: Role) -> Result<(), StorageError> {
        self.storage.remove_item(&status_key(role)).await
    }

    pub async fn broadcast(&self, kind: AuthEventKind, role: Role) -> Result<(), StorageError> {
        let event = AuthEvent {
            kind,
            role,
            timestamp: Utc::now().timestamp_millis(),
        };
        let value = serde_json::to_string(&event).unwrap_or_default();
        self.storage.set_item(&event_key(role), &value).await
    }

    pub fn subscribe(&self) -> AuthEvents {
        AuthEvents {
            rx: self.storage.subscribe(),
        }
    }
}

/// Login/logout broadcasts seen after subscribing.
pub struct AuthEvents {
    rx: broadcast::Receiver<StorageEvent>,
}

impl AuthEvents {
    /// Next parsed auth event; `None` once the storage is gone.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.recv().await {
                Ok(StorageEvent {
                    key,
                    new_value: Some(value),
                }) if key.ends_with(EVENT_SUFFIX) => match serde_json::from_str(&value) {
                    Ok(event) => return Some(event),
                    Err(err) => tracing::warn!(%key, ?err, "ignoring malformed auth event"),
                },
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "auth event receiver lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
