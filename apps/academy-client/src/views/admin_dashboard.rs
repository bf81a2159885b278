use parking_lot::Mutex;

use crate::api::admin::EnrollmentResults;
use crate::api::courses::CourseQuery;
use crate::error::ApiError;
use crate::models::course::CoursePage;
use crate::models::stats::AdminStats;
use crate::models::student::Student;
use crate::toast::{self, Toast};
use crate::AppContext;

use super::{paginate, Action, InFlight};

pub const STUDENTS_PER_PAGE: usize = 12;
pub const COURSES_PER_PAGE: usize = 9;

const SELECT_BOTH: &str = "Please select both courses and students";
const DELETE_STUDENT_PROMPT: &str = "Are you sure you want to delete this student? This action cannot be undone.";

/// One page of the filtered student list.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentPage {
    pub students: Vec<Student>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnrollmentOp {
    Assign,
    Unassign,
}

#[derive(Default)]
struct State {
    students: Vec<Student>,
    student_search: String,
    subject_filter: Option<String>,
    courses: Option<CoursePage>,
    course_search: String,
    course_page: usize,
    selected_students: Vec<String>,
    selected_courses: Vec<String>,
    stats: AdminStats,
}

impl State {
    fn filtered_students(&self) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|s| s.matches(&self.student_search))
            .filter(|s| match &self.subject_filter {
                Some(subject) => s.subject.as_deref() == Some(subject.as_str()),
                None => true,
            })
            .collect()
    }

    fn clear_selection(&mut self) {
        self.selected_students.clear();
        self.selected_courses.clear();
    }
}

/// Students, courses, selection and enrollment actions for administrators.
pub struct AdminDashboard {
    ctx: AppContext,
    in_flight: InFlight,
    state: Mutex<State>,
}

impl AdminDashboard {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            in_flight: InFlight::new(),
            state: Mutex::new(State {
                course_page: 1,
                ..Default::default()
            }),
        }
    }

    /// Students, the first course page and stats.
    pub async fn load(&self) -> Result<(), ApiError> {
        self.load_students().await?;
        self.load_courses().await?;
        // Stats are decorative; a failure is only logged.
        let _ = self.load_stats().await;
        Ok(())
    }

    pub async fn load_students(&self) -> Result<(), ApiError> {
        match self.ctx.api.students().await {
            Ok(students) => {
                let students = students.into_iter().map(Student::prune_enrollments).collect();
                self.state.lock().students = students;
                Ok(())
            }
            Err(err) => {
                toast::show(self.ctx.toasts.as_ref(), Toast::error("Error fetching students"));
                Err(err)
            }
        }
    }

    pub async fn load_courses(&self) -> Result<(), ApiError> {
        let query = {
            let state = self.state.lock();
            CourseQuery::page(state.course_page, COURSES_PER_PAGE)
                .search(&state.course_search)
                .subject(state.subject_filter.as_deref())
        };
        match self.ctx.api.courses(&query).await {
            Ok(page) => {
                let mut state = self.state.lock();
                state.course_page = page.current_page;
                state.courses = Some(page);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "failed to fetch courses");
                Err(err)
            }
        }
    }

    pub async fn load_stats(&self) -> Result<AdminStats, ApiError> {
        match self.ctx.api.admin_stats().await {
            Ok(stats) => {
                self.state.lock().stats = stats.clone();
                Ok(stats)
            }
            Err(err) => {
                tracing::warn!(%err, "failed to fetch admin stats");
                Err(err)
            }
        }
    }

    pub fn stats(&self) -> AdminStats {
        self.state.lock().stats.clone()
    }

    // -- students -----------------------------------------------------------

    pub fn set_student_search(&self, term: &str) {
        self.state.lock().student_search = term.to_string();
    }

    /// Filter students and courses by subject. Choosing a subject selects
    /// every matching student; clearing the filter clears the selection.
    pub async fn set_subject_filter(&self, subject: Option<&str>) -> Result<(), ApiError> {
        {
            let mut state = self.state.lock();
            state.subject_filter = subject.filter(|s| !s.is_empty()).map(str::to_string);
            state.clear_selection();
            state.course_page = 1;
            if state.subject_filter.is_some() {
                let ids = state.filtered_students().iter().map(|s| s.id.clone()).collect();
                state.selected_students = ids;
            }
        }
        if let Err(err) = self.load_courses().await {
            toast::show(self.ctx.toasts.as_ref(), Toast::error("Error fetching courses"));
            return Err(err);
        }
        Ok(())
    }

    pub async fn reset_filters(&self) -> Result<(), ApiError> {
        {
            let mut state = self.state.lock();
            state.student_search.clear();
            state.course_search.clear();
        }
        self.set_subject_filter(None).await
    }

    pub fn subject_filter(&self) -> Option<String> {
        self.state.lock().subject_filter.clone()
    }

    pub fn filtered_students(&self) -> Vec<Student> {
        self.state.lock().filtered_students().into_iter().cloned().collect()
    }

    pub fn student_page(&self, page: usize) -> StudentPage {
        let filtered = self.filtered_students();
        let page = paginate(&filtered, page, STUDENTS_PER_PAGE);
        StudentPage {
            students: page.items.to_vec(),
            page: page.page,
            total_pages: page.total_pages,
            total: page.total,
        }
    }

    // -- courses ------------------------------------------------------------

    pub async fn search_courses(&self, term: &str) -> Result<(), ApiError> {
        {
            let mut state = self.state.lock();
            state.course_search = term.to_string();
            state.course_page = 1;
        }
        self.load_courses().await
    }

    pub async fn goto_course_page(&self, page: usize) -> Result<(), ApiError> {
        self.state.lock().course_page = page.max(1);
        self.load_courses().await
    }

    pub fn courses(&self) -> Option<CoursePage> {
        self.state.lock().courses.clone()
    }

    // -- selection ----------------------------------------------------------

    pub fn toggle_student(&self, student_id: &str) {
        toggle(&mut self.state.lock().selected_students, student_id);
    }

    pub fn toggle_course(&self, course_id: &str) {
        toggle(&mut self.state.lock().selected_courses, course_id);
    }

    /// Select or clear every student passing the current filters.
    pub fn select_all_students(&self, checked: bool) {
        let mut state = self.state.lock();
        let ids = if checked {
            state.filtered_students().iter().map(|s| s.id.clone()).collect()
        } else {
            Vec::new()
        };
        state.selected_students = ids;
    }

    /// Select or clear every course on the current page.
    pub fn select_all_courses(&self, checked: bool) {
        let mut state = self.state.lock();
        let ids = match (&state.courses, checked) {
            (Some(page), true) => page.courses.iter().map(|c| c.id.clone()).collect(),
            _ => Vec::new(),
        };
        state.selected_courses = ids;
    }

    pub fn all_students_selected(&self) -> bool {
        let state = self.state.lock();
        let filtered = state.filtered_students();
        !filtered.is_empty()
            && filtered
                .iter()
                .all(|s| state.selected_students.contains(&s.id))
    }

    pub fn selected_students(&self) -> Vec<String> {
        self.state.lock().selected_students.clone()
    }

    pub fn selected_courses(&self) -> Vec<String> {
        self.state.lock().selected_courses.clone()
    }

    /// Whether every selected student is enrolled in `course_id`.
    pub fn is_common_course(&self, course_id: &str) -> bool {
        let state = self.state.lock();
        !course_id.is_empty()
            && !state.selected_students.is_empty()
            && state.selected_students.iter().all(|id| {
                state
                    .students
                    .iter()
                    .find(|s| &s.id == id)
                    .is_some_and(|s| s.is_enrolled_in(course_id))
            })
    }

    // -- actions ------------------------------------------------------------

    pub async fn assign_selected(&self) -> Action {
        self.change_enrollments(EnrollmentOp::Assign).await
    }

    pub async fn unassign_selected(&self) -> Action {
        self.change_enrollments(EnrollmentOp::Unassign).await
    }

    async fn change_enrollments(&self, op: EnrollmentOp) -> Action {
        let (students, courses) = {
            let state = self.state.lock();
            (state.selected_students.clone(), state.selected_courses.clone())
        };
        if students.is_empty() || courses.is_empty() {
            toast::show(self.ctx.toasts.as_ref(), Toast::error(SELECT_BOTH));
            return Action::Failed;
        }
        let Some(_guard) = self.in_flight.begin("enrollments") else {
            return Action::Busy;
        };

        let result = match op {
            EnrollmentOp::Assign => self.ctx.api.assign_courses(&students, &courses).await,
            EnrollmentOp::Unassign => self.ctx.api.unassign_courses(&students, &courses).await,
        };
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                let fallback = match op {
                    EnrollmentOp::Assign => "Failed to assign courses",
                    EnrollmentOp::Unassign => "Failed to remove courses",
                };
                tracing::warn!(?op, %err, "enrollment change failed");
                toast::show(self.ctx.toasts.as_ref(), Toast::error(err.user_message(fallback)));
                return Action::Failed;
            }
        };

        let success = reply.message.unwrap_or_else(|| match op {
            EnrollmentOp::Assign => "Courses assigned successfully".to_string(),
            EnrollmentOp::Unassign => "Courses removed successfully".to_string(),
        });
        toast::show(self.ctx.toasts.as_ref(), Toast::success(success));
        if let Some(info) = enrollment_info(op, &reply.data, courses.len()) {
            toast::show(self.ctx.toasts.as_ref(), Toast::info(info));
        }

        self.state.lock().clear_selection();
        let _ = self.load_students().await;
        Action::Done
    }

    pub async fn toggle_suspension(&self, student_id: &str) -> Action {
        let Some(_guard) = self.in_flight.begin(format!("suspend:{student_id}")) else {
            return Action::Busy;
        };
        let was_suspended = self
            .state
            .lock()
            .students
            .iter()
            .find(|s| s.id == student_id)
            .is_some_and(|s| s.is_suspended);

        let reply = match self.ctx.api.toggle_student_suspension(student_id).await {
            Ok(reply) => reply,
            Err(err) => {
                let fallback = if was_suspended {
                    "Failed to unsuspend student"
                } else {
                    "Failed to suspend student"
                };
                toast::show(self.ctx.toasts.as_ref(), Toast::error(err.user_message(fallback)));
                return Action::Failed;
            }
        };

        let suspended = reply.data.is_suspended;
        if let Some(student) = self.state.lock().students.iter_mut().find(|s| s.id == student_id) {
            student.is_suspended = suspended;
        }

        let success = reply.message.unwrap_or_else(|| {
            if suspended {
                "Student suspended".to_string()
            } else {
                "Student unsuspended".to_string()
            }
        });
        toast::show(self.ctx.toasts.as_ref(), Toast::success(success));
        toast::show(
            self.ctx.toasts.as_ref(),
            Toast::info(if suspended {
                "Student will not be able to login while suspended"
            } else {
                "Student can now login again"
            }),
        );
        let _ = self.load_stats().await;
        Action::Done
    }

    pub async fn delete_student(&self, student_id: &str) -> Action {
        if !self.ctx.confirm.confirm(DELETE_STUDENT_PROMPT).await {
            return Action::Cancelled;
        }
        let Some(_guard) = self.in_flight.begin(format!("delete:{student_id}")) else {
            return Action::Busy;
        };

        match self.ctx.api.delete_student(student_id).await {
            Ok(reply) => {
                {
                    let mut state = self.state.lock();
                    state.students.retain(|s| s.id != student_id);
                    state.selected_students.retain(|id| id != student_id);
                }
                toast::show(
                    self.ctx.toasts.as_ref(),
                    Toast::success(format!("Student {} has been permanently removed", reply.data.name)),
                );
                let _ = self.load_stats().await;
                Action::Done
            }
            Err(err) => {
                toast::show(
                    self.ctx.toasts.as_ref(),
                    Toast::error(err.user_message("Failed to delete student")),
                );
                Action::Failed
            }
        }
    }
}

fn toggle(selection: &mut Vec<String>, id: &str) {
    if let Some(pos) = selection.iter().position(|s| s == id) {
        selection.remove(pos);
    } else {
        selection.push(id.to_string());
    }
}

/// Extra info toast for students that were already (un)enrolled.
fn enrollment_info(op: EnrollmentOp, results: &EnrollmentResults, course_count: usize) -> Option<String> {
    let skipped = |r: &crate::api::admin::EnrollmentResult| match op {
        EnrollmentOp::Assign => r.already_assigned,
        EnrollmentOp::Unassign => r.not_enrolled,
    };

    match results.results.as_slice() {
        [] => None,
        [single] => {
            let n = skipped(single);
            (n > 0).then(|| match op {
                EnrollmentOp::Assign => format!("{n} course(s) were already assigned"),
                EnrollmentOp::Unassign => format!("{n} course(s) were not enrolled"),
            })
        }
        many => {
            let n = many.iter().filter(|r| skipped(r) == course_count).count();
            (n > 0).then(|| match op {
                EnrollmentOp::Assign => format!("{n} student(s) already had all courses"),
                EnrollmentOp::Unassign => {
                    format!("{n} student(s) were not enrolled in any of the selected courses")
                }
            })
        }
    }
}
