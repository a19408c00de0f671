//! Course records and the content/review items nested in them.
//!
//! Course records are kept as the raw JSON object the API returned. The set
//! of fields varies between endpoints, so accessors search the object instead
//! of a fixed struct failing to deserialize or silently defaulting a flag to
//! false.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::fields;
use crate::utils::parse_timestamp;

pub type CourseId = i64;
pub type ContentId = i64;

/// Lowest and highest accepted star rating.
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Reviews shown on a course page.
pub const MAX_REVIEWS_SHOWN: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Course {
    fields: Map<String, Value>,
}

impl Course {
    /// Wrap a JSON value; anything but an object yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn id(&self) -> Option<CourseId> {
        self.fields.get("id").and_then(fields::integer)
    }

    pub fn title(&self) -> &str {
        self.str_field("title").unwrap_or("")
    }

    pub fn description(&self) -> Option<&str> {
        self.str_field("description").filter(|d| !d.trim().is_empty())
    }

    pub fn author_name(&self) -> Option<&str> {
        self.fields
            .get("author")
            .and_then(|a| a.get("name"))
            .and_then(Value::as_str)
    }

    /// Explicit enrollment flag of the current user, `None` when absent.
    pub fn joined_signal(&self) -> Option<bool> {
        fields::joined_signal(&self.fields)
    }

    pub fn average_rating(&self) -> Option<f64> {
        fields::average_rating(&self.fields)
    }

    /// Completion percentage of the current user, clamped to 0..=100.
    pub fn percentage_finished(&self) -> Option<f64> {
        self.fields
            .get("my_percentage_finished")
            .and_then(Value::as_f64)
            .map(|p| p.clamp(0.0, 100.0))
    }

    pub fn student_count(&self) -> usize {
        fields::student_count(&self.fields)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.str_field("created_at").and_then(parse_timestamp)
    }

    /// Absolute cover URL; relative paths are resolved against `asset_origin`.
    pub fn cover_url(&self, asset_origin: &str) -> Option<String> {
        fields::cover(&self.fields).map(|path| resolve_asset_url(asset_origin, path))
    }

    pub fn contents(&self) -> Vec<Content> {
        self.fields
            .get("contents")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn reviews(&self) -> Vec<Review> {
        self.fields
            .get("ratings")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Review::from_value).collect())
            .unwrap_or_default()
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Turn a possibly relative asset path into an absolute URL.
pub fn resolve_asset_url(asset_origin: &str, path: &str) -> String {
    let path = path.trim();
    let lower = path.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        asset_origin.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// A video lesson inside a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: ContentId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub youtube: Option<String>,
    #[serde(
        default,
        rename = "my_status_finished",
        deserialize_with = "deserialize_flag"
    )]
    pub finished: bool,
}

impl Content {
    pub fn status_display(&self) -> &'static str {
        if self.finished {
            "Finished"
        } else {
            "Not finished"
        }
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(fields::truthy(&value))
}

/// A learner's review of a course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub name: String,
    pub comment: Option<String>,
    pub rating: Option<f64>,
}

impl Review {
    fn from_value(value: &Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .or_else(|| value.pointer("/user/name").and_then(Value::as_str))
            .unwrap_or("User")
            .to_string();
        let comment = value
            .get("comment")
            .and_then(Value::as_str)
            .filter(|c| !c.trim().is_empty())
            .map(str::to_string);
        let rating = ["ratings", "rating"]
            .iter()
            .filter_map(|key| value.get(*key))
            .find(|v| !v.is_null())
            .and_then(fields::number);
        Self {
            name,
            comment,
            rating,
        }
    }
}

/// Title and description of a course being created or edited.
#[derive(Debug, Clone, Serialize)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
}

/// Title and YouTube link of a lesson being created or edited.
#[derive(Debug, Clone, Serialize)]
pub struct ContentDraft {
    pub title: String,
    pub youtube: String,
}

/// A validated star rating with its optional comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    stars: u8,
    comment: String,
}

impl Rating {
    pub fn new(stars: u8, comment: Option<&str>) -> Option<Self> {
        if !(MIN_RATING..=MAX_RATING).contains(&stars) {
            return None;
        }
        Some(Self {
            stars,
            comment: comment.map(str::trim).unwrap_or_default().to_string(),
        })
    }

    pub fn stars(&self) -> u8 {
        self.stars
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }
}

/// Server acknowledgement of a rating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingReceipt {
    pub message: Option<String>,
    pub average_rating: Option<f64>,
}

/// Id and message returned by create endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Created {
    pub id: Option<i64>,
    pub message: Option<String>,
}
