use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{HttpApi, Reply};
use crate::error::ApiError;
use crate::models::stats::AdminStats;
use crate::models::student::Student;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Enrollments<'a> {
    student_ids: &'a [String],
    course_ids: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspensionState {
    pub is_suspended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeletedStudent {
    pub name: String,
}

/// Per-student outcome of an assign or unassign call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResult {
    #[serde(default, alias = "studentId")]
    pub student_id: Option<String>,
    #[serde(default)]
    pub already_assigned: usize,
    #[serde(default)]
    pub not_enrolled: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnrollmentResults {
    #[serde(default)]
    pub results: Vec<EnrollmentResult>,
}

impl HttpApi {
    pub async fn students(&self) -> Result<Vec<Student>, ApiError> {
        Ok(self.get::<Vec<Student>>("admin/students").await?.data)
    }

    pub async fn student(&self, id: &str) -> Result<Student, ApiError> {
        Ok(self.get::<Student>(&format!("admin/students/{id}")).await?.data)
    }

    pub async fn delete_student(&self, id: &str) -> Result<Reply<DeletedStudent>, ApiError> {
        self.call(
            Method::DELETE,
            &format!("admin/students/{id}"),
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn toggle_student_suspension(&self, id: &str) -> Result<Reply<SuspensionState>, ApiError> {
        self.call(
            Method::PUT,
            &format!("admin/students/toggleSuspension/{id}"),
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn assign_courses(
        &self,
        student_ids: &[String],
        course_ids: &[String],
    ) -> Result<Reply<EnrollmentResults>, ApiError> {
        self.enrollment_call("admin/assign-courses", student_ids, course_ids)
            .await
    }

    pub async fn unassign_courses(
        &self,
        student_ids: &[String],
        course_ids: &[String],
    ) -> Result<Reply<EnrollmentResults>, ApiError> {
        self.enrollment_call("admin/unassign-courses", student_ids, course_ids)
            .await
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
        Ok(self.get::<AdminStats>("admin/stats").await?.data)
    }

    async fn enrollment_call(
        &self,
        path: &str,
        student_ids: &[String],
        course_ids: &[String],
    ) -> Result<Reply<EnrollmentResults>, ApiError> {
        let body = Enrollments {
            student_ids,
            course_ids,
        };
        // Detailed results are optional in the response.
        let reply = self
            .call_optional::<EnrollmentResults, _>(Method::POST, path, &body)
            .await?;
        Ok(Reply {
            message: reply.message,
            data: reply.data.unwrap_or_default(),
        })
    }
}
