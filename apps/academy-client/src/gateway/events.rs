//! Channel opcodes and wire-format frames.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::course::CourseRef;
use crate::models::notification::{LiveNotification, NotificationKind};

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

pub const OP_DISPATCH: u8 = 0;
pub const OP_AUTHENTICATE: u8 = 2;

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticatePayload {
    pub user_id: String,
}

/// A frame sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientFrame {
    pub op: u8,
    pub d: AuthenticatePayload,
}

impl ClientFrame {
    pub fn authenticate(user_id: &str) -> Self {
        Self {
            op: OP_AUTHENTICATE,
            d: AuthenticatePayload {
                user_id: user_id.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFrame {
    pub op: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default)]
    pub d: Value,
}

impl ServerFrame {
    pub fn dispatch(event: &str, seq: u64, data: Value) -> Self {
        Self {
            op: OP_DISPATCH,
            t: Some(event.to_string()),
            s: Some(seq),
            d: data,
        }
    }
}

/// `d` of a course notification dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchPayload {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub courses: Option<Vec<CourseRef>>,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{event} dispatch without a courses array")]
    MissingCourses { event: String },
}

/// Decode one text frame.
///
/// `Ok(None)` for frames this client does not handle (other ops, unknown
/// event names).
pub fn parse_frame(text: &str) -> Result<Option<LiveNotification>, FrameError> {
    let frame: ServerFrame = serde_json::from_str(text)?;
    if frame.op != OP_DISPATCH {
        return Ok(None);
    }
    let Some(kind) = frame.t.as_deref().and_then(NotificationKind::from_event_name) else {
        return Ok(None);
    };
    let payload: DispatchPayload = serde_json::from_value(frame.d)?;
    let courses = payload.courses.ok_or_else(|| FrameError::MissingCourses {
        event: kind.event_name().to_string(),
    })?;

    Ok(Some(LiveNotification {
        kind,
        id: payload.id,
        message: payload.message,
        timestamp: payload.timestamp,
        courses,
    }))
}

/// Accepts RFC 3339 strings or Unix milliseconds.
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(DateTime<Utc>),
        Millis(i64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(ts)) => Some(ts),
        Some(Raw::Millis(ms)) => Utc.timestamp_millis_opt(ms).single(),
        None => None,
    })
}
