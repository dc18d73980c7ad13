//! HTTP client for the Zuno task/grading service.
//!
//! Every call resolves the current credential from the [`SessionStore`] and
//! attaches it as a bearer token. A missing credential is logged but does not
//! block the call: access control belongs to the session gate, and the
//! server is left to reject the request.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::auth::SessionStore;
use crate::models::*;

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response, with the raw body text.
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }

    /// The expected empty state of an account that has not set up goals yet.
    pub fn is_no_goals(&self) -> bool {
        match self {
            Self::Status { status, body } => {
                *status == StatusCode::BAD_REQUEST.as_u16()
                    || body.to_lowercase().contains("no goals")
            }
            Self::Http(_) => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

/// HTTP client for the task/grading service.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    session: SessionStore,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Build a request carrying the current credential, if there is one.
    async fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .client
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        match self.session.access_token().await {
            Some(token) => req = req.bearer_auth(token),
            None => tracing::warn!("No auth token available for {} {}", method, path),
        }
        req
    }

    /// Handle response, converting non-2xx statuses to [`ApiError::Status`].
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path).await.send().await?;
        self.handle_response(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, path)
            .await
            .json(body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Revoke the session at the provider. Callers owning cached state
    /// (registry, snapshot, chat) must clear it as well.
    pub async fn logout(&self) {
        self.session.sign_out().await;
    }

    // ============================================================
    // Endpoints
    // ============================================================

    /// Today's tasks, in planner order. An empty body means no tasks yet.
    pub async fn daily_plan(&self) -> Result<Vec<DailyTask>, ApiError> {
        let plan: Option<DailyPlan> = self.get("/daily-plan").await?;
        Ok(plan.map(Vec::from).unwrap_or_default())
    }

    pub async fn progress(&self) -> Result<ProgressSnapshot, ApiError> {
        self.get("/progress").await
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.post("/chat", request).await
    }

    pub async fn submit_task(&self, input: &SubmitTaskInput) -> Result<Feedback, ApiError> {
        self.post("/submit-task", input).await
    }

    pub async fn weekly_summary(&self) -> Result<WeeklySummary, ApiError> {
        self.get("/weekly-summary").await
    }
}
