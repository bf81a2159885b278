use serde::{Deserialize, Serialize};

/// Subjects offered by the catalogue.
pub const SUBJECTS: &[&str] = &[
    "physics",
    "mathematics",
    "chemistry",
    "biology",
    "computer science",
    "literature",
    "history",
    "economics",
    "environmental science",
    "psychology",
];

pub const LEVELS: &[&str] = &["Beginner", "Intermediate", "Advanced"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub is_suspended: bool,
}

impl Course {
    /// Case-insensitive match over title, description, subject and level.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        [
            Some(self.title.as_str()),
            Some(self.description.as_str()),
            self.subject.as_deref(),
            self.level.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Course snapshot attached to a notification when it was emitted.
/// Not kept in sync with later edits to the course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRef {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

/// Editable course fields, as submitted on create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseForm {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub level: String,
    pub video_url: String,
    pub thumbnail: String,
}

impl CourseForm {
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            description: course.description.clone(),
            subject: course.subject.clone().unwrap_or_default(),
            level: course.level.clone().unwrap_or_default(),
            video_url: course.video_url.clone().unwrap_or_default(),
            thumbnail: course.thumbnail.clone().unwrap_or_default(),
        }
    }
}

/// One page of the server-side course listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePage {
    pub courses: Vec<Course>,
    #[serde(default = "first_page")]
    pub current_page: usize,
    #[serde(default = "first_page")]
    pub total_pages: usize,
    #[serde(default)]
    pub total: usize,
}

fn first_page() -> usize {
    1
}
