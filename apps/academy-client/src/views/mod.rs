//! View-models behind each screen: they call the API, keep the screen's
//! state and report outcomes through toasts or inline form errors.

pub mod admin_dashboard;
pub mod course_management;
pub mod login;
pub mod paging;
pub mod profile;
pub mod student_dashboard;
pub mod student_details;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ApiError;

pub use admin_dashboard::AdminDashboard;
pub use course_management::CourseManagement;
pub use login::AuthFlow;
pub use paging::{paginate, Page};
pub use profile::ProfileView;
pub use student_dashboard::StudentDashboard;
pub use student_details::StudentDetails;

/// A failure rendered next to the form that caused it.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct FormError {
    pub message: String,
    #[source]
    pub source: ApiError,
}

impl FormError {
    pub fn new(source: ApiError, fallback: &str) -> Self {
        Self {
            message: source.user_message(fallback).to_string(),
            source,
        }
    }
}

impl From<ApiError> for FormError {
    fn from(source: ApiError) -> Self {
        Self {
            message: source.message.clone(),
            source,
        }
    }
}

/// Outcome of an action that may be refused before any request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Done,
    Failed,
    /// The user declined the confirmation prompt.
    Cancelled,
    /// The same action is still in flight.
    Busy,
}

/// Asks the user before destructive actions.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Answers every prompt the same way.
pub struct Preset(pub bool);

#[async_trait]
impl Confirm for Preset {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Keys of actions currently in flight.
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while an action with the same key is outstanding.
    pub fn begin(&self, key: impl Into<String>) -> Option<InFlightGuard> {
        let key = key.into();
        if !self.keys.lock().insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            keys: self.keys.clone(),
            key,
        })
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.keys.lock().contains(key)
    }
}

/// Releases its key on drop.
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys.lock().remove(&self.key);
    }
}
