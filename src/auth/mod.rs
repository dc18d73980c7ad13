//! Session ownership: the identity provider seam, the process-wide session
//! store and the gate that protects views.
//!
//! Consumers hold a [`SessionStore`] handle, never the provider itself. The
//! store resolves once on first use, publishes every later transition on a
//! watch channel and keeps at most one live [`Session`].

mod gate;
mod supabase;

pub use gate::*;
pub use supabase::SupabaseAuth;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{watch, OnceCell};

use crate::models::Session;

/// Identity and session errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Session has no refresh token")]
    NoRefreshToken,

    #[error("Identity provider is not configured (set ZUNO_AUTH_URL)")]
    NotConfigured,

    #[error("Session storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Stored session is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The external identity provider. Issues, rotates and revokes sessions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Returns `None` when the provider wants the address confirmed first.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError>;

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

/// What the store currently knows about the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// First resolution has not finished yet.
    Resolving,
    Resolved(Option<Session>),
}

impl SessionState {
    /// The session, if one is resolved and not expired.
    pub fn live(&self) -> Option<&Session> {
        match self {
            Self::Resolved(Some(session)) if !session.is_expired() => Some(session),
            _ => None,
        }
    }
}

/// Process-wide session store. Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<SessionState>,
    resolved: OnceCell<()>,
    session_file: Option<PathBuf>,
}

impl SessionStore {
    /// Create a store. With a `session_file`, the session survives restarts.
    pub fn new(provider: Arc<dyn IdentityProvider>, session_file: Option<PathBuf>) -> Self {
        let (state, _) = watch::channel(SessionState::Resolving);
        Self {
            inner: Arc::new(StoreInner {
                provider,
                state,
                resolved: OnceCell::new(),
                session_file,
            }),
        }
    }

    /// Resolve the session once. Later calls return the current session
    /// without touching the provider. Any failure resolves to signed out.
    pub async fn initialize(&self) -> Option<Session> {
        self.inner
            .resolved
            .get_or_init(|| async {
                if matches!(*self.inner.state.borrow(), SessionState::Resolved(_)) {
                    return;
                }
                let session = match self.resolve_stored().await {
                    Ok(session) => session,
                    Err(e) => {
                        tracing::warn!("Session resolution failed, treating as signed out: {}", e);
                        None
                    }
                };
                self.publish(session);
            })
            .await;
        self.current_session()
    }

    async fn resolve_stored(&self) -> Result<Option<Session>, AuthError> {
        let Some(path) = self.inner.session_file.as_deref() else {
            return Ok(None);
        };
        let Some(session) = load_session(path)? else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }

        tracing::debug!("Stored session expired, rotating credential");
        let rotated = self.inner.provider.refresh(&session).await?;
        save_session(path, &rotated)?;
        Ok(Some(rotated))
    }

    /// The live session, if any. Does not wait for resolution.
    pub fn current_session(&self) -> Option<Session> {
        self.inner.state.borrow().live().cloned()
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.inner.state.borrow(), SessionState::Resolved(_))
    }

    /// Subscribe to every subsequent transition, including sign-out.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// The live session, rotating an expired credential first. A failed
    /// rotation ends the session.
    pub async fn live_session(&self) -> Option<Session> {
        self.initialize().await;

        let session = match &*self.inner.state.borrow() {
            SessionState::Resolved(Some(session)) => session.clone(),
            _ => return None,
        };
        if !session.is_expired() {
            return Some(session);
        }

        match self.rotate(&session).await {
            Ok(rotated) => Some(rotated),
            Err(e) => {
                tracing::warn!("Credential rotation failed, ending session: {}", e);
                self.forget();
                None
            }
        }
    }

    /// Current bearer credential. See [`live_session`](Self::live_session).
    pub async fn access_token(&self) -> Option<String> {
        self.live_session().await.map(|session| session.access_token)
    }

    async fn rotate(&self, session: &Session) -> Result<Session, AuthError> {
        let rotated = self.inner.provider.refresh(session).await?;
        self.store(rotated.clone())?;
        Ok(rotated)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.inner.provider.sign_in(email, password).await?;
        tracing::info!(user_id = %session.user_id, "Signed in");
        self.store(session.clone())?;
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError> {
        let session = self.inner.provider.sign_up(email, password).await?;
        match &session {
            Some(session) => {
                tracing::info!(user_id = %session.user_id, "Signed up");
                self.store(session.clone())?;
            }
            None => tracing::info!("Signed up, confirmation pending"),
        }
        Ok(session)
    }

    /// Revoke the session at the provider and forget it locally. Provider
    /// failures are logged; the local session is dropped regardless.
    pub async fn sign_out(&self) {
        self.initialize().await;
        let session = match &*self.inner.state.borrow() {
            SessionState::Resolved(Some(session)) => Some(session.clone()),
            _ => None,
        };
        if let Some(session) = session {
            if let Err(e) = self.inner.provider.sign_out(&session).await {
                tracing::warn!("Provider sign-out failed: {}", e);
            }
        }
        self.forget();
    }

    /// Replace the live session, persisting it first.
    fn store(&self, session: Session) -> Result<(), AuthError> {
        if let Some(path) = self.inner.session_file.as_deref() {
            save_session(path, &session)?;
        }
        self.publish(Some(session));
        Ok(())
    }

    fn forget(&self) {
        if let Some(path) = self.inner.session_file.as_deref() {
            if let Err(e) = clear_session(path) {
                tracing::warn!("Failed to remove stored session: {}", e);
            }
        }
        self.publish(None);
    }

    fn publish(&self, session: Option<Session>) {
        let _ = self.inner.resolved.set(());
        self.inner.state.send_replace(SessionState::Resolved(session));
    }
}

fn load_session(path: &Path) -> Result<Option<Session>, AuthError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn save_session(path: &Path, session: &Session) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(session)?)?;
    Ok(())
}

fn clear_session(path: &Path) -> Result<(), AuthError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
