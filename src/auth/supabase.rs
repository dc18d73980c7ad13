//! Identity provider adapter for a Supabase-compatible auth service.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{AuthError, IdentityProvider};
use crate::config::Config;
use crate::models::Session;

/// REST client for the `/auth/v1` endpoints.
#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    base_url: String,
    anon_key: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    user: UserRef,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    id: Uuid,
}

fn default_expires_in() -> i64 {
    3600
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Session {
            user_id: token.user.id,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        }
    }
}

impl SupabaseAuth {
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

    /// Build a request with the project key header.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/auth/v1{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref key) = self.anon_key {
            req = req.header("apikey", key);
        }
        req
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AuthError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AuthError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            })
        }
    }
}

/// Pull the human-readable message out of a provider error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .request(Method::POST, "/token?grant_type=password")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = self.handle_response(response).await?;
        Ok(token.into())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError> {
        let response = self
            .request(Method::POST, "/signup")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: Value = self.handle_response(response).await?;
        // Without auto-confirm the provider returns only the user record.
        Ok(serde_json::from_value::<TokenResponse>(body)
            .ok()
            .map(Session::from))
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or(AuthError::NoRefreshToken)?;
        let response = self
            .request(Method::POST, "/token?grant_type=refresh_token")
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let token: TokenResponse = self.handle_response(response).await?;
        Ok(token.into())
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let response = self
            .request(Method::POST, "/logout")
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AuthError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            })
        }
    }
}
