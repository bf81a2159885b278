use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::HttpApi;
use crate::error::ApiError;
use crate::models::notification::{Notification, NotificationKind, NotificationPayload};

/// A persisted notification as returned by `GET notifications`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: NotificationPayload,
    #[serde(default)]
    pub read: bool,
}

impl From<NotificationRecord> for Notification {
    fn from(record: NotificationRecord) -> Self {
        Notification {
            id: record.id,
            message: record.message,
            kind: record.kind,
            timestamp: record.created_at,
            payload: record.payload,
            read: record.read,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ForUser<'a> {
    user_id: &'a str,
}

/// Persisted notification history, consumed by the reconciliation store.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn fetch_notifications(&self, user_id: &str) -> Result<Vec<Notification>, ApiError>;

    async fn mark_all_read(&self, user_id: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl NotificationApi for HttpApi {
    async fn fetch_notifications(&self, user_id: &str) -> Result<Vec<Notification>, ApiError> {
        let records = self
            .get_with::<Vec<NotificationRecord>, _>("notifications", &ForUser { user_id })
            .await?
            .data;
        Ok(records.into_iter().map(Notification::from).collect())
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<(), ApiError> {
        self.ack(Method::PUT, "notifications/read", &ForUser { user_id })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_maps_to_notification() {
        let record: NotificationRecord = serde_json::from_value(json!({
            "_id": "66a1",
            "message": "Physics 101 assigned",
            "type": "COURSE_ASSIGNED",
            "createdAt": "2024-05-01T10:00:00Z",
            "payload": { "courses": [{ "_id": "c1", "title": "Physics 101" }] },
            "read": true
        }))
        .unwrap();
        let n = Notification::from(record);
        assert_eq!(n.id, "66a1");
        assert_eq!(n.kind, NotificationKind::CourseAssigned);
        assert_eq!(n.payload.courses[0].id, "c1");
        assert!(n.read);
    }

    #[test]
    fn unknown_type_is_a_decode_error() {
        let result = serde_json::from_value::<NotificationRecord>(json!({
            "_id": "66a1",
            "message": "?",
            "type": "SOMETHING_ELSE",
            "createdAt": "2024-05-01T10:00:00Z"
        }));
        assert!(result.is_err());
    }
}
