use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::course::Course;

/// A student's relationship to a course, with progress and completion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(alias = "_id", default)]
    pub id: Option<String>,
    /// Missing when the course was deleted after enrollment.
    #[serde(default)]
    pub course: Option<Course>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub is_suspended: bool,
    #[serde(default)]
    pub enrolled_courses: Vec<Enrollment>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
}

impl Student {
    /// Drop enrollments whose course no longer resolves.
    pub fn prune_enrollments(mut self) -> Self {
        self.enrolled_courses
            .retain(|e| e.course.as_ref().is_some_and(|c| !c.id.is_empty()));
        self
    }

    pub fn is_enrolled_in(&self, course_id: &str) -> bool {
        self.enrolled_courses
            .iter()
            .any(|e| e.course.as_ref().is_some_and(|c| c.id == course_id))
    }

    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self.email.to_lowercase().contains(&term)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
