use std::fmt;

use tokio::sync::watch;

use super::{SessionState, SessionStore};
use crate::models::TaskId;

/// Every navigable view of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Entry,
    Login,
    Signup,
    /// `force` skips the "goals already exist" redirect (adding a new topic).
    Onboarding { force: bool },
    Dashboard,
    Task(TaskId),
    Feedback(TaskId),
    Progress,
    WeeklySummary,
}

impl Route {
    pub fn requires_session(&self) -> bool {
        !matches!(self, Self::Entry | Self::Login | Self::Signup)
    }

    pub fn path(&self) -> String {
        match self {
            Self::Entry => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::Signup => "/signup".to_string(),
            Self::Onboarding { force: false } => "/onboarding".to_string(),
            Self::Onboarding { force: true } => "/onboarding?force=true".to_string(),
            Self::Dashboard => "/dashboard".to_string(),
            Self::Task(id) => format!("/task/{}", id),
            Self::Feedback(id) => format!("/feedback/{}", id),
            Self::Progress => "/progress".to_string(),
            Self::WeeklySummary => "/weekly-summary".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Outcome of evaluating access to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    Redirect(Route),
}

fn decide(route: Route, has_session: bool) -> GateDecision {
    if route == Route::Entry {
        return GateDecision::Redirect(Route::Login);
    }
    if !route.requires_session() || has_session {
        GateDecision::Render
    } else {
        GateDecision::Redirect(Route::Login)
    }
}

/// Decides whether a caller may see a view. Owns no business data.
#[derive(Clone)]
pub struct SessionGate {
    store: SessionStore,
}

impl SessionGate {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Wait for the first session resolution, then evaluate `route`. An
    /// expired credential is rotated first; resolution and rotation errors
    /// count as "no session".
    pub async fn check(&self, route: Route) -> GateDecision {
        if !route.requires_session() {
            return decide(route, false);
        }
        let session = self.store.live_session().await;
        let decision = decide(route, session.is_some());
        if let GateDecision::Redirect(target) = decision {
            tracing::debug!("Redirecting {} to {}", route, target);
        }
        decision
    }

    /// Mount a view. The returned handle keeps watching the session so a
    /// sign-out while mounted can redirect immediately.
    pub async fn mount(&self, route: Route) -> Result<MountedView, Route> {
        match self.check(route).await {
            GateDecision::Render => Ok(MountedView {
                route,
                session: self.store.subscribe(),
            }),
            GateDecision::Redirect(target) => Err(target),
        }
    }
}

/// A view that passed the gate and still listens for session changes.
pub struct MountedView {
    route: Route,
    session: watch::Receiver<SessionState>,
}

impl MountedView {
    pub fn route(&self) -> Route {
        self.route
    }

    /// Wait for the next session transition and re-evaluate access.
    pub async fn changed(&mut self) -> GateDecision {
        if self.session.changed().await.is_err() {
            return GateDecision::Redirect(Route::Login);
        }
        let live = self.session.borrow_and_update().live().is_some();
        decide(self.route, live)
    }
}
