use reqwest::Method;
use serde::Serialize;

use super::{HttpApi, Reply};
use crate::error::ApiError;
use crate::models::course::{CourseForm, CoursePage};

/// Query string for `GET courses`. Empty filters are left out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CourseQuery {
    pub page: usize,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl CourseQuery {
    pub fn page(page: usize, limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit,
            ..Default::default()
        }
    }

    pub fn search(mut self, term: &str) -> Self {
        let term = term.trim();
        self.search = (!term.is_empty()).then(|| term.to_string());
        self
    }

    pub fn subject(mut self, subject: Option<&str>) -> Self {
        self.subject = subject.filter(|s| !s.is_empty()).map(str::to_string);
        self
    }
}

impl HttpApi {
    pub async fn courses(&self, query: &CourseQuery) -> Result<CoursePage, ApiError> {
        Ok(self.get_with::<CoursePage, _>("courses", query).await?.data)
    }

    pub async fn create_course(&self, form: &CourseForm) -> Result<Reply<()>, ApiError> {
        self.ack(Method::POST, "courses", form).await
    }

    pub async fn update_course(&self, id: &str, form: &CourseForm) -> Result<Reply<()>, ApiError> {
        self.ack(Method::PUT, &format!("courses/{id}"), form).await
    }

    pub async fn delete_course(&self, id: &str) -> Result<Reply<()>, ApiError> {
        self.ack(Method::DELETE, &format!("courses/{id}"), &serde_json::json!({}))
            .await
    }

    pub async fn toggle_course_suspended(&self, id: &str) -> Result<Reply<()>, ApiError> {
        self.ack(
            Method::PATCH,
            &format!("courses/{id}/toggle-suspended"),
            &serde_json::json!({}),
        )
        .await
    }
}
