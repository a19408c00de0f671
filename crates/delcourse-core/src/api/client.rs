//! API client for communicating with the DelCourse REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! API requests for accounts, courses, lesson contents and enrollment.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, multipart, Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ApiError, AuthBackend, CourseBackend, Envelope};
use crate::auth::{BearerToken, LoginResponse, SessionHandle};
use crate::models::{
    fields, Content, ContentDraft, ContentId, Course, CourseDraft, CourseId, Created, Rating,
    RatingReceipt, Registration, User,
};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path segment the API uses for "any course" in content URLs.
const ANY_COURSE: &str = "-";

/// Which course list to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseScope {
    All,
    /// Courses the current user is enrolled in
    Mine,
}

/// A cover image read from disk for upload.
#[derive(Debug, Clone)]
pub struct CoverImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl CoverImage {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read cover image {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cover".to_string());
        Ok(Self { file_name, bytes })
    }

    fn mime_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
    }

    fn into_part(self) -> Result<multipart::Part, ApiError> {
        let mime = self.mime_type();
        multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(mime)
            .map_err(ApiError::from)
    }
}

/// How a request is authorized.
enum Auth<'a> {
    /// Current session token; a 401 ends the session
    Session,
    /// A specific token, e.g. one being validated; a 401 is returned as-is
    Token(&'a BearerToken),
    None,
}

/// API client for the DelCourse platform.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionHandle,
}

impl ApiClient {
    /// Create a new API client reading its credential from `session`
    pub fn new(base_url: &str, session: SessionHandle) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json")
    }

    /// Send a request and unwrap the response envelope.
    ///
    /// Non-2xx statuses and `success: false` bodies become errors. When the
    /// session's own token is rejected with 401 the session is ended here, so
    /// every caller gets the same logout behavior.
    async fn send(&self, request: RequestBuilder, auth: Auth<'_>) -> Result<Envelope, ApiError> {
        let session_token = match auth {
            Auth::Session => self.session.token(),
            _ => None,
        };
        let token = match auth {
            Auth::Session => session_token.as_ref(),
            Auth::Token(token) => Some(token),
            Auth::None => None,
        };
        let request = match token {
            Some(token) => request.header(header::AUTHORIZATION, token.header_value()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "Response received");

        if !status.is_success() {
            let err = ApiError::from_status(status, &body);
            if let Some(sent) = session_token.as_ref().filter(|_| err.is_unauthorized()) {
                warn!("Session token rejected by server");
                self.session.invalidate_if(sent);
            }
            return Err(err);
        }

        let envelope = Envelope::from_body(&body)?;
        if envelope.success() == Some(false) {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: envelope.into_message(),
            });
        }
        Ok(envelope)
    }

    async fn get(&self, path: &str) -> Result<Envelope, ApiError> {
        self.send(self.request(Method::GET, path), Auth::Session).await
    }

    async fn delete(&self, path: &str) -> Result<Envelope, ApiError> {
        self.send(self.request(Method::DELETE, path), Auth::Session).await
    }

    async fn form<F: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        form: &F,
    ) -> Result<Envelope, ApiError> {
        self.send(self.request(method, path).form(form), Auth::Session)
            .await
    }

    // ===== Accounts =====

    /// Fetch every user on the platform
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let envelope = self.get("/users").await?;
        Ok(parse_items(envelope.list("users"), "user"))
    }

    // ===== Courses =====

    /// Fetch courses, optionally only those the user is enrolled in
    pub async fn list_courses(&self, scope: CourseScope) -> Result<Vec<Course>, ApiError> {
        let path = match scope {
            CourseScope::All => "/courses",
            CourseScope::Mine => "/courses?is_me=1",
        };
        let envelope = self.get(path).await?;
        Ok(envelope
            .list("courses")
            .into_iter()
            .filter_map(Course::from_value)
            .collect())
    }

    /// Fetch a single course with its contents and reviews
    pub async fn get_course(&self, id: CourseId) -> Result<Course, ApiError> {
        let envelope = self.get(&format!("/courses/{}", id)).await?;
        envelope
            .member("course")
            .cloned()
            .and_then(Course::from_value)
            .ok_or_else(|| ApiError::InvalidResponse(format!("No course in response for {}", id)))
    }

    /// Create a course, uploading the cover if one is given
    pub async fn create_course(
        &self,
        draft: &CourseDraft,
        cover: Option<CoverImage>,
    ) -> Result<Created, ApiError> {
        let mut form = multipart::Form::new()
            .text("title", draft.title.clone())
            .text("description", draft.description.clone());
        if let Some(cover) = cover {
            form = form.part("cover", cover.into_part()?);
        }
        let request = self.request(Method::POST, "/courses").multipart(form);
        let envelope = self.send(request, Auth::Session).await?;
        Ok(created(&envelope, "course_id"))
    }

    pub async fn change_cover(
        &self,
        id: CourseId,
        cover: CoverImage,
    ) -> Result<Option<String>, ApiError> {
        let form = multipart::Form::new().part("cover", cover.into_part()?);
        let request = self
            .request(Method::POST, &format!("/courses/{}/cover", id))
            .multipart(form);
        Ok(self.send(request, Auth::Session).await?.into_message())
    }

    pub async fn update_course(
        &self,
        id: CourseId,
        draft: &CourseDraft,
    ) -> Result<Option<String>, ApiError> {
        let envelope = self
            .form(Method::PUT, &format!("/courses/{}", id), draft)
            .await?;
        Ok(envelope.into_message())
    }

    pub async fn delete_course(&self, id: CourseId) -> Result<Option<String>, ApiError> {
        Ok(self.delete(&format!("/courses/{}", id)).await?.into_message())
    }

    // ===== Contents =====

    pub async fn add_content(
        &self,
        course_id: CourseId,
        draft: &ContentDraft,
    ) -> Result<Created, ApiError> {
        let envelope = self
            .form(Method::POST, &format!("/courses/{}/contents", course_id), draft)
            .await?;
        Ok(created(&envelope, "content_id"))
    }

    pub async fn get_content(&self, id: ContentId) -> Result<Content, ApiError> {
        let envelope = self
            .get(&format!("/courses/{}/contents/{}", ANY_COURSE, id))
            .await?;
        let value = envelope
            .member("course_content")
            .cloned()
            .ok_or_else(|| ApiError::InvalidResponse(format!("No content in response for {}", id)))?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse content: {}", e)))
    }

    pub async fn update_content(
        &self,
        id: ContentId,
        draft: &ContentDraft,
    ) -> Result<Option<String>, ApiError> {
        let envelope = self
            .form(
                Method::PUT,
                &format!("/courses/{}/contents/{}", ANY_COURSE, id),
                draft,
            )
            .await?;
        Ok(envelope.into_message())
    }

    pub async fn delete_content(&self, id: ContentId) -> Result<Option<String>, ApiError> {
        Ok(self
            .delete(&format!("/courses/{}/contents/{}", ANY_COURSE, id))
            .await?
            .into_message())
    }

    /// Mark a lesson as finished or not finished for the current user
    pub async fn set_content_finished(
        &self,
        id: ContentId,
        finished: bool,
    ) -> Result<Option<String>, ApiError> {
        let status = if finished { "1" } else { "0" };
        let envelope = self
            .form(
                Method::POST,
                &format!("/courses/{}/contents/{}/learns", ANY_COURSE, id),
                &[("status", status)],
            )
            .await?;
        Ok(envelope.into_message())
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn current_user(&self, token: &BearerToken) -> Result<User, ApiError> {
        let envelope = self
            .send(self.request(Method::GET, "/users/me"), Auth::Token(token))
            .await?;
        let value = envelope
            .member("user")
            .or_else(|| envelope.payload().get("user"))
            .cloned()
            .ok_or_else(|| ApiError::InvalidResponse("No user in identity response".to_string()))?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse user: {}", e)))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let request = self.request(Method::POST, "/auth/login").json(&body);
        let envelope = self.send(request, Auth::None).await?;
        Ok(LoginResponse::new(envelope.payload().clone()))
    }

    async fn register(&self, registration: &Registration) -> Result<Option<String>, ApiError> {
        let request = self
            .request(Method::POST, "/auth/register")
            .json(registration);
        Ok(self.send(request, Auth::None).await?.into_message())
    }
}

#[async_trait]
impl CourseBackend for ApiClient {
    async fn fetch_course(&self, id: CourseId) -> Result<Course, ApiError> {
        self.get_course(id).await
    }

    async fn join_course(&self, id: CourseId) -> Result<Option<String>, ApiError> {
        let envelope = self
            .form(
                Method::POST,
                &format!("/courses/{}/students", id),
                &[] as &[(&str, &str)],
            )
            .await?;
        Ok(envelope.into_message())
    }

    async fn leave_course(&self, id: CourseId) -> Result<Option<String>, ApiError> {
        Ok(self
            .delete(&format!("/courses/{}/students", id))
            .await?
            .into_message())
    }

    async fn rate_course(&self, id: CourseId, rating: &Rating) -> Result<RatingReceipt, ApiError> {
        let stars = rating.stars().to_string();
        let envelope = self
            .form(
                Method::PUT,
                &format!("/courses/{}/students/ratings", id),
                &[("ratings", stars.as_str()), ("comment", rating.comment())],
            )
            .await?;
        let average_rating = envelope
            .data()
            .and_then(Value::as_object)
            .and_then(fields::average_rating);
        Ok(RatingReceipt {
            message: envelope.into_message(),
            average_rating,
        })
    }
}

/// Deserialize list items, skipping (and logging) malformed ones.
fn parse_items<T: serde::de::DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, kind = what, "Skipping malformed list item");
                None
            }
        })
        .collect()
}

fn created(envelope: &Envelope, id_key: &str) -> Created {
    Created {
        id: envelope.field(id_key).and_then(fields::integer),
        message: envelope.message().map(str::to_string),
    }
}
