//! delcourse-core - client library for the DelCourse learning platform.
//!
//! Provides the REST client, the session store with credential persistence,
//! and reconciliation of per-course enrollment state.

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod directory;
pub mod enrollment;
pub mod models;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError, AuthBackend, CourseBackend, CourseScope, CoverImage, Operation};
pub use auth::{
    CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore, Session,
    SessionHandle, SessionStatus, SessionStore,
};
pub use config::Config;
pub use dashboard::DashboardSummary;
pub use directory::{SortOrder, UserDirectory};
pub use enrollment::{EnrollmentBook, EnrollmentError, EnrollmentState};
