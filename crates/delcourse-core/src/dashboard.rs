//! Platform-wide counts and the most recently created courses.

use futures::future::try_join;
use tracing::debug;

use crate::api::{ApiClient, ApiError, CourseScope};
use crate::models::{Course, User};

/// Number of courses listed under "recent"
pub const RECENT_COURSES: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct DashboardSummary {
    pub user_count: usize,
    pub course_count: usize,
    /// Sum of enrolled students across all courses
    pub total_students: usize,
    pub recent_courses: Vec<Course>,
}

impl DashboardSummary {
    pub fn build(users: &[User], courses: &[Course]) -> Self {
        let total_students = courses.iter().map(Course::student_count).sum();

        let mut recent: Vec<&Course> = courses.iter().collect();
        // Newest first; undated courses sort last
        recent.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        Self {
            user_count: users.len(),
            course_count: courses.len(),
            total_students,
            recent_courses: recent.into_iter().take(RECENT_COURSES).cloned().collect(),
        }
    }

    /// Fetch users and courses concurrently and summarize them.
    pub async fn load(api: &ApiClient) -> Result<Self, ApiError> {
        let (users, courses) =
            try_join(api.list_users(), api.list_courses(CourseScope::All)).await?;
        debug!(users = users.len(), courses = courses.len(), "Dashboard data loaded");
        Ok(Self::build(&users, &courses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn course(value: serde_json::Value) -> Course {
        Course::from_value(value).expect("test course must be an object")
    }

    #[test]
    fn test_counts() {
        let users = vec![User::provisional(), User::provisional()];
        let courses = vec![
            course(json!({"id": 1, "students": [{"id": 1}, {"id": 2}], "students_count": 9})),
            course(json!({"id": 2, "students_count": "4"})),
            course(json!({"id": 3, "students": [], "enrollments_count": 1})),
            course(json!({"id": 4})),
        ];
        let summary = DashboardSummary::build(&users, &courses);
        assert_eq!(summary.user_count, 2);
        assert_eq!(summary.course_count, 4);
        assert_eq!(summary.total_students, 7);
    }

    #[test]
    fn test_recent_courses_order() {
        let courses: Vec<Course> = vec![
            course(json!({"id": 1, "created_at": "2024-01-01 00:00:00"})),
            course(json!({"id": 2, "created_at": "2024-03-01T00:00:00Z"})),
            course(json!({"id": 3})),
            course(json!({"id": 4, "created_at": "2024-03-01 00:00:00"})),
            course(json!({"id": 5, "created_at": "2023-12-31"})),
            course(json!({"id": 6, "created_at": "2024-02-01 00:00:00"})),
            course(json!({"id": 7, "created_at": "2024-02-15 00:00:00"})),
        ];
        let summary = DashboardSummary::build(&[], &courses);
        let ids: Vec<_> = summary.recent_courses.iter().filter_map(Course::id).collect();
        assert_eq!(ids, [4, 2, 7, 6, 1, 5]);
    }

    #[test]
    fn test_empty() {
        let summary = DashboardSummary::build(&[], &[]);
        assert_eq!(summary.course_count, 0);
        assert_eq!(summary.total_students, 0);
        assert!(summary.recent_courses.is_empty());
    }
}
