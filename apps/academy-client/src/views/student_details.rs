use parking_lot::Mutex;

use crate::error::ApiError;
use crate::models::student::Student;
use crate::toast::{self, Toast};
use crate::AppContext;

use super::{Action, InFlight};

/// One student's profile and enrollments, with per-course removal.
pub struct StudentDetails {
    ctx: AppContext,
    student_id: String,
    in_flight: InFlight,
    student: Mutex<Option<Student>>,
}

impl StudentDetails {
    pub fn new(ctx: AppContext, student_id: impl Into<String>) -> Self {
        Self {
            ctx,
            student_id: student_id.into(),
            in_flight: InFlight::new(),
            student: Mutex::new(None),
        }
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub async fn load(&self) -> Result<Student, ApiError> {
        match self.ctx.api.student(&self.student_id).await {
            Ok(student) => {
                let student = student.prune_enrollments();
                *self.student.lock() = Some(student.clone());
                Ok(student)
            }
            Err(err) => {
                tracing::warn!(student_id = %self.student_id, %err, "failed to load student");
                toast::show(self.ctx.toasts.as_ref(), Toast::error("Error fetching student details"));
                Err(err)
            }
        }
    }

    pub fn student(&self) -> Option<Student> {
        self.student.lock().clone()
    }

    pub fn is_removing(&self, course_id: &str) -> bool {
        self.in_flight.is_pending(course_id)
    }

    /// Unassign one course after confirmation. On failure the student is
    /// reloaded so the list reflects the server.
    pub async fn remove_course(&self, course_id: &str) -> Action {
        let title = {
            let student = self.student.lock();
            let Some(student) = student.as_ref() else {
                toast::show(self.ctx.toasts.as_ref(), Toast::error("Student details are not loaded"));
                return Action::Failed;
            };
            student
                .enrolled_courses
                .iter()
                .filter_map(|e| e.course.as_ref())
                .find(|c| c.id == course_id)
                .map(|c| c.title.clone())
        };
        let Some(title) = title else {
            toast::show(
                self.ctx.toasts.as_ref(),
                Toast::error("Student is not enrolled in this course"),
            );
            return Action::Failed;
        };

        let Some(_guard) = self.in_flight.begin(course_id) else {
            return Action::Busy;
        };
        let label = if title.is_empty() { "this course" } else { title.as_str() };
        if !self.ctx.confirm.confirm(&format!("Are you sure you want to remove \"{label}\"?")).await {
            return Action::Cancelled;
        }

        let result = self
            .ctx
            .api
            .unassign_courses(&[self.student_id.clone()], &[course_id.to_string()])
            .await;
        match result {
            Ok(reply) => {
                if let Some(student) = self.student.lock().as_mut() {
                    student
                        .enrolled_courses
                        .retain(|e| !e.course.as_ref().is_some_and(|c| c.id == course_id));
                }
                let message = reply
                    .message
                    .unwrap_or_else(|| "Course removed successfully".to_string());
                toast::show(self.ctx.toasts.as_ref(), Toast::success(message));
                if reply.data.results.first().is_some_and(|r| r.not_enrolled > 0) {
                    toast::show(
                        self.ctx.toasts.as_ref(),
                        Toast::info("Student was not enrolled in this course"),
                    );
                }
                Action::Done
            }
            Err(err) => {
                toast::show(
                    self.ctx.toasts.as_ref(),
                    Toast::error(err.user_message("Error removing course")),
                );
                let _ = self.load().await;
                Action::Failed
            }
        }
    }
}
