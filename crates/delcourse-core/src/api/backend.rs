//! Collaborator interfaces the session store and enrollment reconciler
//! depend on. `ApiClient` implements both against the REST API; tests swap
//! in in-memory fakes.

use async_trait::async_trait;

use super::ApiError;
use crate::auth::{BearerToken, LoginResponse};
use crate::models::{Course, CourseId, Rating, RatingReceipt, Registration, User};

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Identity lookup for an explicit credential.
    async fn current_user(&self, token: &BearerToken) -> Result<User, ApiError>;

    async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;

    /// Create an account. Returns the server's message, if any.
    async fn register(&self, registration: &Registration) -> Result<Option<String>, ApiError>;
}

#[async_trait]
pub trait CourseBackend: Send + Sync {
    async fn fetch_course(&self, id: CourseId) -> Result<Course, ApiError>;

    /// Enroll the current user. Returns the server's message, if any.
    async fn join_course(&self, id: CourseId) -> Result<Option<String>, ApiError>;

    /// Unenroll the current user. Returns the server's message, if any.
    async fn leave_course(&self, id: CourseId) -> Result<Option<String>, ApiError>;

    async fn rate_course(&self, id: CourseId, rating: &Rating) -> Result<RatingReceipt, ApiError>;
}
