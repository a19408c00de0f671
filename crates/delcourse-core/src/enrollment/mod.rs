//! Enrollment reconciliation.
//!
//! Course records from the API do not always carry the "joined" flag, and
//! join/leave must render before the server confirms them. This module keeps
//! one reconciled flag per course:
//!
//! - `EnrollmentState`: the policy (optimistic local flag OR last explicit
//!   server flag; a missing flag never downgrades)
//! - `EnrollmentBook`: per-course state channels plus the join/leave/rate
//!   actions with their in-flight guard

pub mod book;
pub mod error;
pub mod state;

pub use book::EnrollmentBook;
pub use error::EnrollmentError;
pub use state::EnrollmentState;
