//! REST client for the project-management API.
//!
//! Every authenticated request takes its bearer token from the
//! [`IdentityResolver`]. A 401 answer ends the session before the error is
//! returned, so the next command starts signed out.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use taskboard_proto::codec::{CodecError, decode_identity, decode_task, decode_tasks};
use taskboard_proto::identity::Identity;
use taskboard_proto::task::{StatusPatch, Task, TaskId};
use url::Url;

use crate::auth::{IdentityResolver, TokenStore, parse_login_response, resolve_identity};

use super::{ApiError, TaskMutations, TaskScope, TaskSource};

/// Longest server error detail kept in [`ApiError::Status`].
const MAX_DETAIL_LEN: usize = 200;

/// Task service backed by the REST API.
pub struct HttpTaskService<S: TokenStore> {
    client: Client,
    base_url: Url,
    resolver: Arc<IdentityResolver<S>>,
}

impl<S: TokenStore> HttpTaskService<S> {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` is not an absolute
    /// http(s) URL, or [`ApiError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        resolver: Arc<IdentityResolver<S>>,
    ) -> Result<Self, ApiError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "unsupported scheme {}",
                base_url.scheme()
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            resolver,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    /// `tasks/{task_id}` with the id percent-encoded as one path segment.
    fn task_url(&self, task_id: &TaskId) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push("tasks")
            .push(task_id.as_str());
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self
            .resolver
            .bearer_token()
            .ok_or(ApiError::NotAuthenticated)?;
        Ok(request.bearer_auth(token))
    }

    /// Sends a request and returns the body of a successful response.
    async fn execute(&self, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("server rejected session, signing out");
            self.resolver.end_session();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = error_detail(&body);
            tracing::debug!(status = status.as_u16(), %message, "request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body.to_vec())
    }

    async fn put_status(&self, task_id: &TaskId, patch: &StatusPatch) -> Result<Task, ApiError> {
        let url = self.task_url(task_id)?;
        let request = self.authorized(self.client.put(url).json(patch))?;
        let body = self.execute(request).await.map_err(|e| not_found(e, task_id))?;
        Ok(decode_task(&body)?)
    }

    /// Signs in and persists the session.
    ///
    /// The identity comes from `GET /users/get-user`; when that call fails,
    /// it is resolved from the token with `email` as the fallback.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for rejected credentials,
    /// [`ApiError::Auth`] if the response carries no usable token or the
    /// session cannot be stored, and transport or status errors otherwise.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, ApiError> {
        self.resolver.end_session();

        let url = self.url("auth/login")?;
        let body = serde_json::json!({ "email": email, "password": password });
        let raw = self.execute(self.client.post(url).json(&body)).await?;
        let value = login_body(&raw)?;
        let token = parse_login_response(&value).map_err(crate::auth::AuthError::from)?;

        let identity = match self.fetch_user(&token).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, "could not fetch user profile, deriving from token");
                resolve_identity(&token, email)
            }
        };
        self.resolver.begin_session(&token, &identity)?;
        Ok(identity)
    }

    async fn fetch_user(&self, token: &str) -> Result<Identity, ApiError> {
        let url = self.url("users/get-user")?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_detail(&body),
            });
        }
        let identity = decode_identity(&body)?;
        if identity.id.is_empty() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: "user profile has no id".to_string(),
            });
        }
        Ok(identity)
    }
}

impl<S: TokenStore> TaskSource for HttpTaskService<S> {
    async fn fetch_tasks(&self, scope: &TaskScope) -> Result<Vec<Task>, ApiError> {
        let path = match scope {
            TaskScope::All | TaskScope::Project(_) => "tasks/",
            TaskScope::Assigned => "users/tasks/assigned",
            TaskScope::Created => "users/tasks/created",
        };
        let request = self.authorized(self.client.get(self.url(path)?))?;
        let body = self.execute(request).await?;
        let mut tasks = decode_tasks(&body)?;
        if let TaskScope::Project(project) = scope {
            tasks.retain(|t| t.project_id.as_deref() == Some(project.as_str()));
        }
        tracing::debug!(%scope, count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }
}

impl<S: TokenStore> TaskMutations for HttpTaskService<S> {
    async fn mark_complete(&self, task_id: &TaskId) -> Result<Task, ApiError> {
        self.put_status(task_id, &StatusPatch::completion()).await
    }

    async fn update_status(&self, task_id: &TaskId, patch: &StatusPatch) -> Result<Task, ApiError> {
        self.put_status(task_id, patch).await
    }

    async fn delete_task(&self, task_id: &TaskId) -> Result<(), ApiError> {
        let url = self.task_url(task_id)?;
        let request = self.authorized(self.client.delete(url))?;
        self.execute(request)
            .await
            .map_err(|e| not_found(e, task_id))?;
        Ok(())
    }
}

/// Parses the raw login response as JSON.
fn login_body(raw: &[u8]) -> Result<Value, CodecError> {
    serde_json::from_slice(raw).map_err(|e| CodecError::InvalidPayload {
        what: "login response",
        reason: e.to_string(),
    })
}

/// Maps a 404 status error onto [`ApiError::NotFound`].
fn not_found(error: ApiError, task_id: &TaskId) -> ApiError {
    match error {
        ApiError::Status { status: 404, .. } => ApiError::NotFound(task_id.clone()),
        other => other,
    }
}

/// Extracts a readable message from an error body: the `detail` member of a
/// JSON object when present, otherwise the (truncated) text.
fn error_detail(body: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        match map.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "no detail".to_string();
    }
    text.chars().take(MAX_DETAIL_LEN).collect()
}
