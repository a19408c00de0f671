use serde::{Deserialize, Serialize};

/// A platform account as returned by `/users` and `/users/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

impl User {
    /// Placeholder profile for a logged-in session whose identity lookup failed.
    pub fn provisional() -> Self {
        Self {
            id: 0,
            name: String::new(),
            email: String::new(),
            created_at: None,
            photo: None,
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.id == 0 && self.email.is_empty()
    }

    /// Name for display, falling back to the email address.
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            &self.name
        } else if !self.email.is_empty() {
            &self.email
        } else {
            "(unknown user)"
        }
    }
}

/// Fields submitted to `/auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        missing
    }
}
