//! REST half of the transport: listing, read mutations and course broadcasts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{NotifyError, Result};
use crate::models::notification::{NotificationId, NotificationRecord, Scope};

/// Backend operations a session needs. Implemented by [`RestClient`];
/// tests can substitute their own.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Full current list for `scope`.
    async fn fetch_list(&self, token: &str, scope: Scope) -> Result<Vec<NotificationRecord>>;

    async fn mark_read(&self, token: &str, id: &NotificationId) -> Result<()>;

    async fn mark_all_read(&self, token: &str) -> Result<()>;

    /// Broadcast a message to everyone enrolled in a course.
    async fn send_course(&self, token: &str, message: &CourseMessage) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseMessage {
    pub course_id: String,
    pub title: String,
    pub message: String,
}

impl CourseMessage {
    /// Trims the text fields and rejects an empty course or message before
    /// anything goes over the wire.
    pub fn new(
        course_id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self> {
        let course_id = course_id.into().trim().to_string();
        let title = title.into().trim().to_string();
        let message = message.into().trim().to_string();

        if course_id.is_empty() {
            return Err(NotifyError::InvalidInput("course_id is required".into()));
        }
        if message.is_empty() {
            return Err(NotifyError::InvalidInput("message is required".into()));
        }

        Ok(Self {
            course_id,
            title,
            message,
        })
    }
}

#[derive(Serialize)]
struct MarkAllBody {
    mark_all: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// HTTP client for the backend's notification endpoints.
///
/// No retries: every failure is surfaced once to the caller.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base: String,
}

impl RestClient {
    /// `api_url` is the API root, e.g. `http://localhost:8000/api`.
    pub fn new(api_url: &Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("rollcall/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifyError::Internal(anyhow::anyhow!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base: format!("{}/notifications/", api_url.as_str().trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(&self, req: RequestBuilder, token: &str, what: &'static str) -> Result<Response> {
        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, what, "notification request failed");
                NotifyError::from(e)
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(what, "backend rejected credential");
            return Err(NotifyError::Unauthorized);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail)
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    trimmed.chars().take(200).collect()
                }
            });

        tracing::warn!(what, status = %status, detail = %message, "notification request returned error");
        Err(NotifyError::Transport {
            status: Some(status.as_u16()),
            message,
        })
    }
}

#[async_trait]
impl NotificationApi for RestClient {
    async fn fetch_list(&self, token: &str, scope: Scope) -> Result<Vec<NotificationRecord>> {
        let url = self.endpoint(scope.list_path());
        let resp = self.send(self.http.get(&url), token, "fetch_list").await?;
        let status = resp.status().as_u16();
        let records: Vec<NotificationRecord> = resp.json().await.map_err(|e| {
            tracing::warn!(scope = %scope, status, error = %e, "notification list did not parse");
            NotifyError::Transport {
                status: Some(status),
                message: "the server returned an invalid notification list".to_string(),
            }
        })?;

        tracing::debug!(scope = %scope, count = records.len(), "fetched notifications");
        Ok(records)
    }

    async fn mark_read(&self, token: &str, id: &NotificationId) -> Result<()> {
        let url = self.endpoint(&format!("{}/mark-read/", urlencoding::encode(id.as_str())));
        self.send(self.http.post(&url), token, "mark_read").await?;
        tracing::debug!(id = %id, "marked notification read");
        Ok(())
    }

    async fn mark_all_read(&self, token: &str) -> Result<()> {
        let url = self.endpoint("mark-all-read/");
        self.send(
            self.http.post(&url).json(&MarkAllBody { mark_all: true }),
            token,
            "mark_all_read",
        )
        .await?;
        tracing::debug!("marked all notifications read");
        Ok(())
    }

    async fn send_course(&self, token: &str, message: &CourseMessage) -> Result<()> {
        let url = self.endpoint("send-course/");
        self.send(self.http.post(&url).json(message), token, "send_course").await?;
        tracing::info!(course_id = %message.course_id, "course notification sent");
        Ok(())
    }
}
