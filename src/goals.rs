//! Goal storage collaborator.
//!
//! Goals bypass the task service and go straight to the identity provider's
//! table API, scoped to the signed-in identity.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::auth::AuthError;
use crate::config::Config;
use crate::models::{Goal, NewGoal, Session};

#[derive(Debug, Error)]
pub enum GoalStoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Goal storage failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The batch was accepted with a success status but not echoed back in
    /// full. The rows are stored.
    #[error("Goal storage returned {returned} of {submitted} goals")]
    Partial { submitted: usize, returned: usize },
}

/// Persistence for [`Goal`] records.
#[async_trait]
pub trait GoalStore: Send + Sync {
    /// Whether at least one goal exists for the session's identity.
    async fn has_goals(&self, session: &Session) -> Result<bool, GoalStoreError>;

    /// Create all goals in one request. Either every goal is created or none.
    async fn insert_goals(
        &self,
        session: &Session,
        goals: &[NewGoal],
    ) -> Result<Vec<Goal>, GoalStoreError>;
}

/// Table API client for `/rest/v1/goals`.
#[derive(Debug, Clone)]
pub struct RestGoalStore {
    base_url: String,
    anon_key: Option<String>,
    client: Client,
}

impl RestGoalStore {
    pub fn new(base_url: impl Into<String>, anon_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key,
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        let base_url = config.auth_url.clone().ok_or(AuthError::NotConfigured)?;
        Ok(Self::new(base_url, config.anon_key.clone()))
    }

    fn request(&self, method: reqwest::Method, session: &Session) -> reqwest::RequestBuilder {
        let url = format!("{}/rest/v1/goals", self.base_url);
        let mut req = self
            .client
            .request(method, &url)
            .bearer_auth(&session.access_token);
        if let Some(ref key) = self.anon_key {
            req = req.header("apikey", key);
        }
        req
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GoalStoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(GoalStoreError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl GoalStore for RestGoalStore {
    async fn has_goals(&self, session: &Session) -> Result<bool, GoalStoreError> {
        let user_filter = format!("eq.{}", session.user_id);
        let response = self
            .request(reqwest::Method::GET, session)
            .query(&[("select", "id"), ("user_id", user_filter.as_str()), ("limit", "1")])
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = Self::check_status(response).await?.json().await?;
        Ok(!rows.is_empty())
    }

    async fn insert_goals(
        &self,
        session: &Session,
        goals: &[NewGoal],
    ) -> Result<Vec<Goal>, GoalStoreError> {
        let response = self
            .request(reqwest::Method::POST, session)
            .header("Prefer", "return=representation")
            .json(goals)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Err(GoalStoreError::Partial {
                submitted: goals.len(),
                returned: 0,
            });
        }
        let created: Vec<Goal> = response.json().await?;
        if created.len() != goals.len() {
            return Err(GoalStoreError::Partial {
                submitted: goals.len(),
                returned: created.len(),
            });
        }
        Ok(created)
    }
}
