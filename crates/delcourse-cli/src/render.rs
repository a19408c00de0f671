//! Plain-text rendering of courses, users and the dashboard.

use delcourse_core::directory::{joined_display, user_initials};
use delcourse_core::models::{Content, Course, User, MAX_RATING, MAX_REVIEWS_SHOWN};
use delcourse_core::utils::{format_date, truncate_string};
use delcourse_core::{DashboardSummary, EnrollmentState};

/// Width of the progress bar in characters
const PROGRESS_BAR_WIDTH: usize = 20;

/// Max title width in course lists
const TITLE_WIDTH: usize = 40;

/// Star string for an average rating, e.g. `★★★★☆`.
pub fn stars(average: f64) -> String {
    let filled = average.round().clamp(0.0, MAX_RATING as f64) as usize;
    let empty = MAX_RATING as usize - filled;
    format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
}

pub fn progress_bar(percentage: f64) -> String {
    let filled = ((percentage / 100.0) * PROGRESS_BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(PROGRESS_BAR_WIDTH);
    format!(
        "[{}{}] {}%",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled),
        percentage.round()
    )
}

/// One line of a course list.
pub fn course_line(course: &Course) -> String {
    let id = course.id().map(|id| id.to_string()).unwrap_or_else(|| "?".to_string());
    let rating = course.average_rating().unwrap_or(0.0);
    format!(
        "#{:<5} {:<width$} {} {:.1}  {} students",
        id,
        truncate_string(course.title(), TITLE_WIDTH),
        stars(rating),
        rating,
        course.student_count(),
        width = TITLE_WIDTH
    )
}

pub fn print_courses(courses: &[Course]) {
    if courses.is_empty() {
        println!("No courses found.");
        return;
    }
    for course in courses {
        println!("{}", course_line(course));
    }
}

pub fn content_line(content: &Content) -> String {
    let mut line = format!("  #{:<5} {}  [{}]", content.id, content.title, content.status_display());
    if let Some(link) = content.youtube.as_deref().filter(|l| !l.is_empty()) {
        line.push_str(&format!("\n         {}", link));
    }
    line
}

pub fn print_course_detail(course: &Course, state: &EnrollmentState, asset_origin: &str) {
    println!("{}", course.title());
    println!("Author: {}", course.author_name().unwrap_or("-"));
    if let Some(description) = course.description() {
        println!("\n{}\n", description);
    }
    if let Some(cover) = course.cover_url(asset_origin) {
        println!("Cover: {}", cover);
    }
    println!("Created: {}", format_date(course.raw().get("created_at").and_then(|v| v.as_str())));
    println!("Students: {}", course.student_count());

    let joined = if state.effective_joined() { "joined" } else { "not joined" };
    println!("Enrollment: {}", joined);
    if let Some(percentage) = course.percentage_finished() {
        println!("Progress: {}", progress_bar(percentage));
    }

    let rating = course.average_rating().unwrap_or(0.0);
    println!("Rating: {} {:.1} / {}", stars(rating), rating, MAX_RATING);

    let contents = course.contents();
    println!("\nLessons ({}):", contents.len());
    if contents.is_empty() {
        println!("  No lessons yet.");
    }
    for content in &contents {
        println!("{}", content_line(content));
    }

    let reviews = course.reviews();
    println!("\nReviews ({}):", reviews.len());
    if reviews.is_empty() {
        println!("  No reviews yet.");
    }
    for review in reviews.iter().take(MAX_REVIEWS_SHOWN) {
        let score = review.rating.map(stars).unwrap_or_default();
        println!("  {} {}", review.name, score);
        if let Some(comment) = review.comment.as_deref().filter(|c| !c.trim().is_empty()) {
            println!("    {}", comment);
        }
    }
    if !state.can_rate() {
        println!("\nJoin this course to rate it.");
    }
}

pub fn user_line(user: &User) -> String {
    format!(
        "{:<3} {:<30} {:<32} {}",
        user_initials(user),
        truncate_string(user.display_name(), 30),
        truncate_string(&user.email, 32),
        joined_display(user)
    )
}

pub fn print_users(users: &[&User]) {
    if users.is_empty() {
        println!("No users found.");
        return;
    }
    for user in users {
        println!("{}", user_line(user));
    }
}

pub fn print_dashboard(summary: &DashboardSummary) {
    println!("Users:    {}", summary.user_count);
    println!("Courses:  {}", summary.course_count);
    println!("Students: {}", summary.total_students);
    println!("\nRecent courses:");
    if summary.recent_courses.is_empty() {
        println!("  No courses yet.");
    }
    for course in &summary.recent_courses {
        println!("  {}", course_line(course));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stars() {
        assert_eq!(stars(0.0), "☆☆☆☆☆");
        assert_eq!(stars(3.6), "★★★★☆");
        assert_eq!(stars(5.0), "★★★★★");
        assert_eq!(stars(9.0), "★★★★★");
        assert_eq!(stars(-1.0), "☆☆☆☆☆");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0), format!("[{}] 0%", "-".repeat(20)));
        assert_eq!(progress_bar(50.0), format!("[{}{}] 50%", "#".repeat(10), "-".repeat(10)));
        assert_eq!(progress_bar(100.0), format!("[{}] 100%", "#".repeat(20)));
    }

    #[test]
    fn test_course_line() {
        let course = Course::from_value(json!({
            "id": 7,
            "title": "Dasar Rust",
            "avg_ratings": "4.2",
            "students_count": 3
        }))
        .expect("object");
        let line = course_line(&course);
        assert!(line.starts_with("#7"));
        assert!(line.contains("Dasar Rust"));
        assert!(line.contains("★★★★☆ 4.2"));
        assert!(line.ends_with("3 students"));
    }

    #[test]
    fn test_user_line() {
        let user = User {
            id: 1,
            name: "Sari Wulan".to_string(),
            email: "sari@example.com".to_string(),
            created_at: Some("2024-05-10".to_string()),
            photo: None,
        };
        let line = user_line(&user);
        assert!(line.starts_with("SW"));
        assert!(line.contains("sari@example.com"));
        assert!(line.ends_with("May 10, 2024"));
    }
}
