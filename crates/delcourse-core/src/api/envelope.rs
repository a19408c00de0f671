//! The `{ success, message, data }` envelope wrapped around every response.

use serde_json::Value;

use super::ApiError;

#[derive(Debug, Clone, Default)]
pub struct Envelope {
    body: Value,
}

impl Envelope {
    /// Parse a response body. An empty body (e.g. 204) is an empty envelope.
    pub fn from_body(body: &str) -> Result<Self, ApiError> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        let body = serde_json::from_str(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Response is not JSON: {}", e)))?;
        Ok(Self { body })
    }

    pub fn from_value(body: Value) -> Self {
        Self { body }
    }

    pub fn success(&self) -> Option<bool> {
        self.body.get("success").and_then(Value::as_bool)
    }

    pub fn message(&self) -> Option<&str> {
        self.body
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
    }

    pub fn data(&self) -> Option<&Value> {
        self.body.get("data").filter(|d| !d.is_null())
    }

    /// `data` when present, otherwise the whole body.
    pub fn payload(&self) -> &Value {
        self.data().unwrap_or(&self.body)
    }

    /// `data.<key>` when present, otherwise `data` itself.
    pub fn member(&self, key: &str) -> Option<&Value> {
        let data = self.data()?;
        data.get(key).filter(|v| !v.is_null()).or(Some(data))
    }

    /// `data.<key>` only, without falling back to `data`.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data()?.get(key).filter(|v| !v.is_null())
    }

    /// Items of a list member, accepting either a bare array or `{ items: [...] }`.
    pub fn list(&self, key: &str) -> Vec<Value> {
        match self.member(key) {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => other
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    pub fn into_message(self) -> Option<String> {
        self.message().map(str::to_string)
    }
}

/// The `message` field of an error body, if the body is a JSON envelope.
pub fn message_from_body(body: &str) -> Option<String> {
    Envelope::from_body(body)
        .ok()
        .and_then(|envelope| envelope.into_message())
}
