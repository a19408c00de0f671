use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiError;
use crate::models::{fields, User};

const BEARER_PREFIX: &str = "Bearer ";

/// A bearer credential, always held in the canonical `Bearer <value>` form.
///
/// Normalization is idempotent: `abc`, `Bearer abc` and ` Bearer abc ` all
/// produce the header value `Bearer abc`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(raw: &str) -> Option<Self> {
        let value = strip_scheme(raw.trim()).trim();
        if value.is_empty() {
            None
        } else {
            Some(Self(format!("{}{}", BEARER_PREFIX, value)))
        }
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> &str {
        &self.0
    }

    /// The credential without its scheme prefix.
    pub fn secret(&self) -> &str {
        &self.0[BEARER_PREFIX.len()..]
    }
}

/// Drop a leading `Bearer` scheme word, in any case, when it stands alone or
/// is followed by whitespace.
fn strip_scheme(raw: &str) -> &str {
    let scheme = BEARER_PREFIX.trim_end();
    match raw.get(..scheme.len()) {
        Some(head) if head.eq_ignore_ascii_case(scheme) => {
            let rest = &raw[scheme.len()..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest
            } else {
                raw
            }
        }
        _ => raw,
    }
}

impl TryFrom<String> for BearerToken {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(&raw).ok_or_else(|| "empty bearer token".to_string())
    }
}

impl From<BearerToken> for String {
    fn from(token: BearerToken) -> Self {
        token.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// Payload of a successful `/auth/login` response.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    payload: Value,
}

impl LoginResponse {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// The bearer token under any of the accepted keys.
    pub fn token(&self) -> Result<BearerToken, ApiError> {
        self.payload
            .as_object()
            .and_then(fields::token)
            .and_then(BearerToken::new)
            .ok_or_else(|| {
                ApiError::AuthProtocol("no token found in login response".to_string())
            })
    }

    /// Inline user profile, when the server included one.
    pub fn user(&self) -> Option<User> {
        self.payload
            .get("user")
            .filter(|u| u.is_object())
            .and_then(|u| serde_json::from_value(u.clone()).ok())
    }
}
