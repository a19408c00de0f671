use thiserror::Error;

use super::envelope::message_from_body;

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Malformed authentication response: {0}")]
    AuthProtocol(String),

    #[error("Invalid credentials{}", suffix(.message))]
    InvalidCredentials { message: Option<String> },

    #[error("Validation failed{}", suffix(.message))]
    Validation { message: Option<String> },

    #[error("Conflict{}", suffix(.message))]
    Conflict { message: Option<String> },

    #[error("Unauthorized - token may be expired{}", suffix(.message))]
    Unauthorized { message: Option<String> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}){}", suffix(.message))]
    Server { status: u16, message: Option<String> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn suffix(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {}", m),
        None => String::new(),
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Shown for a 403 on rating when the server gives no reason.
const RATE_FORBIDDEN_MESSAGE: &str =
    "Not allowed to rate: make sure you have joined this course.";

/// User-facing operations, each with a default failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Register,
    LoadCourses,
    LoadCourse,
    SaveCourse,
    DeleteCourse,
    Join,
    Leave,
    Rate,
    LoadContent,
    SaveContent,
    DeleteContent,
    ContentStatus,
    LoadUsers,
    LoadDashboard,
}

impl Operation {
    pub fn default_message(&self) -> &'static str {
        match self {
            Operation::Login => "Login failed. Check your email and password.",
            Operation::Register => "Registration failed. Please try again.",
            Operation::LoadCourses => "Failed to load courses.",
            Operation::LoadCourse => "Failed to load the course.",
            Operation::SaveCourse => "Failed to save the course. Make sure all fields are valid.",
            Operation::DeleteCourse => "Failed to delete the course.",
            Operation::Join => "Failed to join the course.",
            Operation::Leave => "Failed to leave the course.",
            Operation::Rate => "Failed to submit rating.",
            Operation::LoadContent => "Failed to load the content.",
            Operation::SaveContent => "Failed to save the content.",
            Operation::DeleteContent => "Failed to delete the content.",
            Operation::ContentStatus => "Failed to change the content status.",
            Operation::LoadUsers => "Failed to load users.",
            Operation::LoadDashboard => "Failed to load dashboard data.",
        }
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = message_from_body(body);
        match status.as_u16() {
            400 | 422 => ApiError::Validation { message },
            401 => ApiError::Unauthorized { message },
            409 => ApiError::Conflict { message },
            403 | 404 | 500..=599 => ApiError::Server {
                status: status.as_u16(),
                message,
            },
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// Message text supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::InvalidCredentials { message }
            | ApiError::Validation { message }
            | ApiError::Conflict { message }
            | ApiError::Unauthorized { message }
            | ApiError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::InvalidCredentials { .. } | ApiError::Unauthorized { .. } => Some(401),
            ApiError::Validation { .. } => Some(400),
            ApiError::Conflict { .. } => Some(409),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Message to show the user: the server's text when it sent one,
    /// otherwise the default for the operation.
    pub fn user_message(&self, operation: Operation) -> String {
        if let Some(message) = self.server_message().filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }
        match (operation, self) {
            (Operation::Rate, ApiError::Server { status: 403, .. }) => {
                RATE_FORBIDDEN_MESSAGE.to_string()
            }
            _ => operation.default_message().to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
