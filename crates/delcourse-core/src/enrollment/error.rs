use thiserror::Error;

use crate::api::ApiError;
use crate::models::CourseId;

#[derive(Error, Debug, Clone)]
pub enum EnrollmentError {
    #[error("A request for course {0} is already in progress")]
    Busy(CourseId),

    #[error("You must join this course before you can rate it.")]
    NotJoined,

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ApiError,
    },
}

impl EnrollmentError {
    /// The underlying API error, when the request reached the server.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            EnrollmentError::Failed { source, .. } => Some(source),
            _ => None,
        }
    }
}
