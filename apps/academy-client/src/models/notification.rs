use academy_common::id::prefix;
use academy_common::PrefixedId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::course::CourseRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    CourseAssigned,
    CourseUnassigned,
}

impl NotificationKind {
    /// Canonical channel event name for this kind.
    pub fn event_name(self) -> &'static str {
        match self {
            NotificationKind::CourseAssigned => "course_assigned",
            NotificationKind::CourseUnassigned => "course_unassigned",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "course_assigned" => Some(NotificationKind::CourseAssigned),
            "course_unassigned" => Some(NotificationKind::CourseUnassigned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub courses: Vec<CourseRef>,
}

/// One entry of the notification panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Server id, or a local `ntf_` id when the event carried none.
    pub id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub timestamp: DateTime<Utc>,
    pub payload: NotificationPayload,
    pub read: bool,
}

impl PrefixedId for Notification {
    const PREFIX: &'static str = prefix::NOTIFICATION;
}

impl Notification {
    pub fn has_server_id(&self) -> bool {
        !academy_common::id::is_local(&self.id, Self::PREFIX)
    }
}

/// An event pushed over the channel, before it is placed in the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveNotification {
    pub kind: NotificationKind,
    pub id: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub courses: Vec<CourseRef>,
}

impl LiveNotification {
    pub fn new(kind: NotificationKind, courses: Vec<CourseRef>) -> Self {
        Self {
            kind,
            id: None,
            message: None,
            timestamp: None,
            courses,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The text shown for the event, falling back to a course count.
    pub fn display_message(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }
        let n = self.courses.len();
        match self.kind {
            NotificationKind::CourseAssigned => format!("{n} new course(s) assigned"),
            NotificationKind::CourseUnassigned => format!("{n} course(s) unassigned"),
        }
    }

    /// Live events always start unread.
    pub fn into_notification(self) -> Notification {
        let message = self.display_message();
        Notification {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(Notification::generate),
            message,
            kind: self.kind,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            payload: NotificationPayload {
                courses: self.courses,
            },
            read: false,
        }
    }
}
