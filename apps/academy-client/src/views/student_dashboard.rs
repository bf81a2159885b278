use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::error::ApiError;
use crate::models::course::Course;
use crate::models::student::Enrollment;
use crate::toast::{self, Toast};
use crate::AppContext;

use super::{Action, InFlight};

/// An enrolled course as shown on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseCard {
    pub course: Course,
    pub completed: bool,
    pub progress: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub total_courses: usize,
    pub completed_courses: usize,
    /// Mean progress over every enrollment, 0 when there are none.
    pub average_progress: f64,
}

/// Enrolled courses grouped by subject, plus summary counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentDashboardState {
    pub by_subject: BTreeMap<String, Vec<CourseCard>>,
    pub stats: DashboardStats,
}

impl StudentDashboardState {
    pub fn from_enrollments(enrollments: &[Enrollment]) -> Self {
        let mut by_subject: BTreeMap<String, Vec<CourseCard>> = BTreeMap::new();
        for enrollment in enrollments {
            let Some(course) = &enrollment.course else {
                continue;
            };
            let subject = course
                .subject
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("Other")
                .to_string();
            by_subject.entry(subject).or_default().push(CourseCard {
                course: course.clone(),
                completed: enrollment.completed,
                progress: enrollment.progress,
            });
        }

        let total = enrollments.len();
        let completed = enrollments.iter().filter(|e| e.completed).count();
        let progress_sum: f64 = enrollments.iter().map(|e| e.progress).sum();

        Self {
            by_subject,
            stats: DashboardStats {
                total_courses: total,
                completed_courses: completed,
                average_progress: progress_sum / total.max(1) as f64,
            },
        }
    }

    fn card_mut(&mut self, course_id: &str) -> Option<&mut CourseCard> {
        self.by_subject
            .values_mut()
            .flatten()
            .find(|card| card.course.id == course_id)
    }
}

pub struct StudentDashboard {
    ctx: AppContext,
    in_flight: InFlight,
    enrollments: Mutex<Vec<Enrollment>>,
    state: Mutex<StudentDashboardState>,
}

impl StudentDashboard {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            in_flight: InFlight::new(),
            enrollments: Mutex::new(Vec::new()),
            state: Mutex::new(StudentDashboardState::default()),
        }
    }

    pub async fn load(&self) -> Result<StudentDashboardState, ApiError> {
        match self.ctx.api.student_courses().await {
            Ok(enrollments) => {
                let state = StudentDashboardState::from_enrollments(&enrollments);
                *self.enrollments.lock() = enrollments;
                *self.state.lock() = state.clone();
                Ok(state)
            }
            Err(err) => {
                toast::show(self.ctx.toasts.as_ref(), Toast::error("Error fetching your courses"));
                Err(err)
            }
        }
    }

    pub fn state(&self) -> StudentDashboardState {
        self.state.lock().clone()
    }

    pub fn is_toggling(&self, course_id: &str) -> bool {
        self.in_flight.is_pending(&toggle_key(course_id))
    }

    /// Flip a course between completed (100%) and not started (0%).
    pub async fn toggle_completion(&self, course_id: &str) -> Action {
        let Some(_guard) = self.in_flight.begin(toggle_key(course_id)) else {
            return Action::Busy;
        };

        if let Err(err) = self.ctx.api.toggle_completion(course_id).await {
            tracing::warn!(course_id, %err, "toggle completion failed");
            toast::show(self.ctx.toasts.as_ref(), Toast::error("Failed to update course status"));
            return Action::Failed;
        }

        let stats = {
            let mut enrollments = self.enrollments.lock();
            for enrollment in enrollments.iter_mut() {
                if enrollment.course.as_ref().is_some_and(|c| c.id == course_id) {
                    enrollment.completed = !enrollment.completed;
                    enrollment.progress = if enrollment.completed { 100.0 } else { 0.0 };
                }
            }
            StudentDashboardState::from_enrollments(&enrollments).stats
        };
        {
            let mut state = self.state.lock();
            if let Some(card) = state.card_mut(course_id) {
                card.completed = !card.completed;
                card.progress = if card.completed { 100.0 } else { 0.0 };
            }
            state.stats = stats;
        }

        toast::show(self.ctx.toasts.as_ref(), Toast::success("Course status updated"));
        Action::Done
    }
}

fn toggle_key(course_id: &str) -> String {
    format!("toggle-completion:{course_id}")
}
