use serde::Deserialize;

/// Aggregate counters shown on the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    #[serde(default)]
    pub total_students: u64,
    #[serde(default)]
    pub suspended_students: u64,
    #[serde(default)]
    pub total_courses: u64,
    #[serde(default)]
    pub suspended_courses: u64,
}
