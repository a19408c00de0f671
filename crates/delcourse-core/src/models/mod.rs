//! Data models for the DelCourse API.
//!
//! - `User`, `Registration`: accounts and sign-up fields
//! - `Course`, `Content`, `Review`: course records and their nested items
//! - `fields`: candidate key lists for concepts the API names inconsistently

pub mod course;
pub mod fields;
pub mod user;

pub use course::{
    resolve_asset_url, Content, ContentDraft, ContentId, Course, CourseDraft, CourseId, Created,
    Rating, RatingReceipt, Review, MAX_RATING, MAX_REVIEWS_SHOWN, MIN_RATING,
};
pub use user::{Registration, User};
