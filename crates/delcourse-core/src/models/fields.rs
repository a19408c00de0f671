//! Candidate field names for server concepts.
//!
//! The API has exposed several of its concepts under more than one key over
//! time (the login token, the "am I enrolled" flag, the rating average, the
//! cover image). Each concept gets one ordered list of keys here and one
//! extraction function; callers never look keys up themselves.

use serde_json::{Map, Value};

/// Keys a login response may carry the bearer token under.
pub const TOKEN_KEYS: &[&str] = &["token", "access_token", "tokenValue", "token_raw"];

/// Keys a course record may carry the current user's enrollment flag under.
pub const JOINED_KEYS: &[&str] = &[
    "my_status_student",
    "my_status_join",
    "is_joined",
    "joined",
    "me_is_student",
    "student_of",
];

/// Keys a course record may carry its rating average under.
pub const RATING_AVERAGE_KEYS: &[&str] =
    &["avg_ratings", "avg_rating", "average_rating", "averageRating"];

/// Keys a course record may carry its cover image under.
pub const COVER_KEYS: &[&str] = &[
    "cover_url",
    "coverUrl",
    "cover",
    "image_url",
    "thumbnail",
    "image",
];

/// Counter keys used when a course record has no `students` array.
pub const STUDENT_COUNT_KEYS: &[&str] = &["students_count", "enrollments_count"];

/// Return the first candidate key whose value is present and not null.
pub fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

/// Loose truthiness for flags the server sends as bools, 0/1 or strings.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Interpret a JSON number or numeric string as f64.
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Interpret a JSON number or numeric string as an integer id.
pub fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The enrollment flag of a course record.
///
/// `None` means the record says nothing about enrollment, which is not the
/// same thing as "not enrolled".
pub fn joined_signal(object: &Map<String, Value>) -> Option<bool> {
    first_present(object, JOINED_KEYS).map(truthy)
}

pub fn average_rating(object: &Map<String, Value>) -> Option<f64> {
    first_present(object, RATING_AVERAGE_KEYS).and_then(number)
}

/// The raw bearer token of a login payload, if any key carries a non-empty string.
pub fn token(object: &Map<String, Value>) -> Option<&str> {
    first_present(object, TOKEN_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn cover(object: &Map<String, Value>) -> Option<&str> {
    first_present(object, COVER_KEYS)
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())
}

/// Number of students enrolled in a course record.
///
/// A non-empty `students` array wins; otherwise the first counter field.
pub fn student_count(object: &Map<String, Value>) -> usize {
    let by_array = object
        .get("students")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);
    if by_array > 0 {
        return by_array;
    }
    first_present(object, STUDENT_COUNT_KEYS)
        .and_then(number)
        .filter(|n| *n > 0.0)
        .map(|n| n as usize)
        .unwrap_or(0)
}
