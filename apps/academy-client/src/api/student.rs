use reqwest::Method;
use serde::Deserialize;

use super::{HttpApi, Reply};
use crate::error::ApiError;
use crate::models::student::Enrollment;

/// `data` of `student/courses`: the caller's own enrollments.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCourses {
    #[serde(default)]
    pub enrolled_courses: Vec<Enrollment>,
}

impl HttpApi {
    pub async fn student_courses(&self) -> Result<Vec<Enrollment>, ApiError> {
        Ok(self.get::<StudentCourses>("student/courses").await?.data.enrolled_courses)
    }

    pub async fn toggle_completion(&self, course_id: &str) -> Result<Reply<()>, ApiError> {
        self.ack(
            Method::PATCH,
            &format!("student/toggle-completion/{course_id}"),
            &serde_json::json!({}),
        )
        .await
    }
}
