//! REST API client module for the DelCourse service.
//!
//! This module provides the `ApiClient` for communicating with the course
//! platform API, the collaborator traits the core logic is written against,
//! and the error taxonomy shared by every request.
//!
//! The API uses bearer token authentication obtained from `/auth/login`.

pub mod backend;
pub mod client;
pub mod envelope;
pub mod error;

pub use backend::{AuthBackend, CourseBackend};
pub use client::{ApiClient, CourseScope, CoverImage};
pub use envelope::Envelope;
pub use error::{ApiError, Operation};
