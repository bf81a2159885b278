use parking_lot::Mutex;

use crate::api::courses::CourseQuery;
use crate::error::{ApiError, FieldError};
use crate::models::course::{Course, CourseForm, LEVELS, SUBJECTS};
use crate::toast::{self, Toast};
use crate::AppContext;

use super::{paginate, Action, InFlight};

pub const COURSES_PER_PAGE: usize = 9;
/// Every course is fetched at once and filtered locally.
const FETCH_ALL_LIMIT: usize = 1000;

const DELETE_COURSE_PROMPT: &str = "Are you sure you want to delete this course?";

/// Client-side checks run before a create or update is sent.
pub fn validate_form(form: &CourseForm) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if form.title.trim().is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    }
    if form.description.trim().is_empty() {
        errors.push(FieldError::new("description", "Description is required"));
    }
    if !SUBJECTS.contains(&form.subject.as_str()) {
        errors.push(FieldError::new("subject", "Please choose a subject from the list"));
    }
    if !LEVELS.contains(&form.level.as_str()) {
        errors.push(FieldError::new("level", "Level must be Beginner, Intermediate or Advanced"));
    }
    for (field, value) in [("videoUrl", &form.video_url), ("thumbnail", &form.thumbnail)] {
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            errors.push(FieldError::new(field, "Please enter a valid URL"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(errors))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseListPage {
    pub courses: Vec<Course>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

#[derive(Default)]
struct State {
    courses: Vec<Course>,
    search: String,
}

impl State {
    fn filtered(&self) -> Vec<Course> {
        self.courses
            .iter()
            .filter(|c| c.matches(&self.search))
            .cloned()
            .collect()
    }
}

/// The admin course catalogue: search, create, edit, delete and suspend.
pub struct CourseManagement {
    ctx: AppContext,
    in_flight: InFlight,
    state: Mutex<State>,
}

impl CourseManagement {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            in_flight: InFlight::new(),
            state: Mutex::new(State::default()),
        }
    }

    pub async fn load(&self) -> Result<(), ApiError> {
        match self.ctx.api.courses(&CourseQuery::page(1, FETCH_ALL_LIMIT)).await {
            Ok(page) => {
                self.state.lock().courses = page.courses;
                Ok(())
            }
            Err(err) => {
                toast::show(self.ctx.toasts.as_ref(), Toast::error("Failed to fetch courses"));
                Err(err)
            }
        }
    }

    pub fn set_search(&self, term: &str) {
        self.state.lock().search = term.to_string();
    }

    pub fn filtered(&self) -> Vec<Course> {
        self.state.lock().filtered()
    }

    pub fn page(&self, page: usize) -> CourseListPage {
        let filtered = self.filtered();
        let page = paginate(&filtered, page, COURSES_PER_PAGE);
        CourseListPage {
            courses: page.items.to_vec(),
            page: page.page,
            total_pages: page.total_pages,
            total: page.total,
        }
    }

    pub fn course(&self, id: &str) -> Option<Course> {
        self.state.lock().courses.iter().find(|c| c.id == id).cloned()
    }

    /// Validation failures are returned for inline display and nothing is sent.
    pub async fn create(&self, form: &CourseForm) -> Result<Action, ApiError> {
        validate_form(form)?;
        let Some(_guard) = self.in_flight.begin("course:create") else {
            return Ok(Action::Busy);
        };

        match self.ctx.api.create_course(form).await {
            Ok(_) => {
                toast::show(self.ctx.toasts.as_ref(), Toast::success("Course added successfully"));
                let _ = self.load().await;
                Ok(Action::Done)
            }
            Err(err) => {
                toast::show(self.ctx.toasts.as_ref(), Toast::error(err.user_message("Failed to add course")));
                Ok(Action::Failed)
            }
        }
    }

    pub async fn update(&self, id: &str, form: &CourseForm) -> Result<Action, ApiError> {
        validate_form(form)?;
        let Some(_guard) = self.in_flight.begin(format!("course:{id}")) else {
            return Ok(Action::Busy);
        };

        match self.ctx.api.update_course(id, form).await {
            Ok(_) => {
                toast::show(self.ctx.toasts.as_ref(), Toast::success("Course updated successfully"));
                let _ = self.load().await;
                Ok(Action::Done)
            }
            Err(err) => {
                toast::show(
                    self.ctx.toasts.as_ref(),
                    Toast::error(err.user_message("Failed to update course")),
                );
                Ok(Action::Failed)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Action {
        if !self.ctx.confirm.confirm(DELETE_COURSE_PROMPT).await {
            return Action::Cancelled;
        }
        let Some(_guard) = self.in_flight.begin(format!("course:{id}")) else {
            return Action::Busy;
        };

        match self.ctx.api.delete_course(id).await {
            Ok(_) => {
                toast::show(self.ctx.toasts.as_ref(), Toast::success("Course deleted successfully"));
                let _ = self.load().await;
                Action::Done
            }
            Err(err) => {
                toast::show(
                    self.ctx.toasts.as_ref(),
                    Toast::error(err.user_message("Failed to delete course")),
                );
                Action::Failed
            }
        }
    }

    /// Flip suspension locally once the server accepts it; no refetch.
    pub async fn toggle_suspended(&self, id: &str) -> Action {
        let Some(_guard) = self.in_flight.begin(format!("course-suspend:{id}")) else {
            return Action::Busy;
        };

        match self.ctx.api.toggle_course_suspended(id).await {
            Ok(reply) => {
                let suspended = {
                    let mut state = self.state.lock();
                    state.courses.iter_mut().find(|c| c.id == id).map(|course| {
                        course.is_suspended = !course.is_suspended;
                        course.is_suspended
                    })
                };
                let message = reply.message.unwrap_or_else(|| match suspended {
                    Some(true) => "Course suspended".to_string(),
                    _ => "Course reactivated".to_string(),
                });
                toast::show(self.ctx.toasts.as_ref(), Toast::success(message));
                Action::Done
            }
            Err(err) => {
                tracing::warn!(course_id = id, %err, "toggle course suspension failed");
                toast::show(self.ctx.toasts.as_ref(), Toast::error("Failed to toggle course status"));
                Action::Failed
            }
        }
    }
}
