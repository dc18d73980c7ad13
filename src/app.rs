//! Composition root: wires the session store, remote access layer and the
//! core components together, and exposes one entry point per view.
//!
//! Every protected entry point passes the session gate before it touches the
//! network, so a signed-out caller gets a redirect and no request is issued.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::auth::{
    AuthError, GateDecision, IdentityProvider, Route, SessionGate, SessionStore, SupabaseAuth,
};
use crate::chat::{ChatError, ChatReply, MentorChat};
use crate::client::{ApiClient, ApiError};
use crate::config::{self, Config};
use crate::feedback::{FeedbackSlot, FeedbackView, ImagePayload, SubmissionPipeline, SubmitError};
use crate::goals::{GoalStore, RestGoalStore};
use crate::models::*;
use crate::onboarding::{OnboardingWizard, WizardEntry, WizardError};
use crate::progress::{percent_label, ProgressAggregator, WeeklyReport};
use crate::registry::DailyTaskRegistry;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("Task {0} is not on today's plan")]
    TaskNotFound(TaskId),
}

/// A view is either rendered or the caller is sent somewhere else.
#[derive(Debug)]
pub enum View<T> {
    Ready(T),
    Redirect(Route),
}

impl<T> View<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Redirect(_) => None,
        }
    }
}

/// Today's tasks next to the latest progress snapshot.
///
/// The two are fetched together but come from independent services, so they
/// can briefly disagree (a task marked done before the streak catches up).
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub tasks: Vec<DailyTask>,
    pub progress: Option<ProgressSnapshot>,
}

impl Dashboard {
    /// No learning paths yet: either no goals or no tasks planned.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn all_completed(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| t.completed)
    }

    pub fn mentor_note(&self) -> &'static str {
        if self.all_completed() {
            "Absolute legend! You finished everything for today."
        } else {
            "You've got a busy day ahead. Click the chat icon below if you have any doubts!"
        }
    }

    pub fn streak(&self) -> u32 {
        self.progress.as_ref().map_or(0, |p| p.current_streak)
    }

    pub fn completion_label(&self) -> String {
        percent_label(self.progress.as_ref().map_or(0.0, |p| p.completion_percentage))
    }
}

pub struct LearningApp {
    session: SessionStore,
    gate: SessionGate,
    client: ApiClient,
    goals: Arc<dyn GoalStore>,
    registry: Arc<DailyTaskRegistry>,
    progress: Arc<ProgressAggregator>,
    slot: Arc<FeedbackSlot>,
    pipeline: SubmissionPipeline,
    chat: MentorChat,
}

impl LearningApp {
    pub fn new(
        config: &Config,
        provider: Arc<dyn IdentityProvider>,
        goals: Arc<dyn GoalStore>,
        session_file: Option<PathBuf>,
    ) -> Self {
        let session = SessionStore::new(provider, session_file);
        let client = ApiClient::new(config.api_url.clone(), session.clone());
        let registry = Arc::new(DailyTaskRegistry::new(client.clone()));
        let progress = Arc::new(ProgressAggregator::new(client.clone()));
        let slot = Arc::new(FeedbackSlot::new(config.feedback_ttl()));
        let pipeline = SubmissionPipeline::new(client.clone(), registry.clone(), slot.clone());
        let chat = MentorChat::new(client.clone(), registry.clone(), progress.clone());

        Self {
            gate: SessionGate::new(session.clone()),
            session,
            client,
            goals,
            registry,
            progress,
            slot,
            pipeline,
            chat,
        }
    }

    /// Build against the configured identity provider, persisting the
    /// session in the user's data directory.
    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        let provider = Arc::new(SupabaseAuth::from_config(config)?);
        let goals = Arc::new(RestGoalStore::from_config(config)?);
        let session_file = match config::default_session_path() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Session will not be persisted: {:#}", e);
                None
            }
        };
        Ok(Self::new(config, provider, goals, session_file))
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn registry(&self) -> &DailyTaskRegistry {
        &self.registry
    }

    pub fn progress(&self) -> &ProgressAggregator {
        &self.progress
    }

    pub fn feedback_slot(&self) -> &FeedbackSlot {
        &self.slot
    }

    pub fn chat(&self) -> &MentorChat {
        &self.chat
    }

    async fn guard(&self, route: Route) -> Option<Route> {
        match self.gate.check(route).await {
            GateDecision::Render => None,
            GateDecision::Redirect(target) => Some(target),
        }
    }

    // ============================================================
    // Identity
    // ============================================================

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        Ok(self.session.sign_in(email, password).await?)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AppError> {
        Ok(self.session.sign_up(email, password).await?)
    }

    /// Hard reset: revoke the session and drop every locally held projection.
    pub async fn logout(&self) {
        self.client.logout().await;
        self.registry.clear();
        self.progress.clear();
        self.chat.clear();
        self.slot.clear();
        tracing::info!("Logged out, local state cleared");
    }

    // ============================================================
    // Views
    // ============================================================

    pub async fn onboarding(&self, force: bool) -> Result<View<OnboardingWizard>, AppError> {
        if let Some(target) = self.guard(Route::Onboarding { force }).await {
            return Ok(View::Redirect(target));
        }
        let Some(session) = self.session.current_session() else {
            return Ok(View::Redirect(Route::Login));
        };
        Ok(
            match OnboardingWizard::enter(self.goals.clone(), session, force).await {
                WizardEntry::Redirect(target) => View::Redirect(target),
                WizardEntry::Start(wizard) => View::Ready(wizard),
            },
        )
    }

    /// Load tasks and progress together. An account without goals gets the
    /// empty dashboard, not an error.
    pub async fn dashboard(&self) -> Result<View<Dashboard>, AppError> {
        if let Some(target) = self.guard(Route::Dashboard).await {
            return Ok(View::Redirect(target));
        }

        let (tasks, progress) = tokio::join!(self.registry.refresh(), self.progress.snapshot());
        let tasks = tasks?;
        let progress = empty_on_no_goals(progress)?;

        Ok(View::Ready(Dashboard { tasks, progress }))
    }

    pub async fn task(&self, id: TaskId) -> Result<View<DailyTask>, AppError> {
        if let Some(target) = self.guard(Route::Task(id)).await {
            return Ok(View::Redirect(target));
        }
        self.registry.refresh().await?;
        self.registry
            .find_by_id(id)
            .map(View::Ready)
            .ok_or(AppError::TaskNotFound(id))
    }

    /// Submit work for a task. On success the feedback view for `id` is ready
    /// to be opened.
    pub async fn submit(
        &self,
        id: TaskId,
        text: &str,
        image: Option<ImagePayload>,
    ) -> Result<View<Feedback>, AppError> {
        if let Some(target) = self.guard(Route::Task(id)).await {
            return Ok(View::Redirect(target));
        }
        Ok(View::Ready(self.pipeline.submit(id, text, image).await?))
    }

    pub async fn feedback(&self, id: TaskId) -> View<FeedbackView> {
        if let Some(target) = self.guard(Route::Feedback(id)).await {
            return View::Redirect(target);
        }
        View::Ready(FeedbackView::open(&self.slot, id))
    }

    /// Current progress. `None` is the empty state of an account without goals.
    pub async fn progress_view(&self) -> Result<View<Option<ProgressSnapshot>>, AppError> {
        if let Some(target) = self.guard(Route::Progress).await {
            return Ok(View::Redirect(target));
        }
        Ok(View::Ready(empty_on_no_goals(self.progress.snapshot().await)?))
    }

    /// This week's report. `None` is the empty state of an account without goals.
    pub async fn weekly_summary(&self) -> Result<View<Option<WeeklyReport>>, AppError> {
        if let Some(target) = self.guard(Route::WeeklySummary).await {
            return Ok(View::Redirect(target));
        }
        Ok(View::Ready(empty_on_no_goals(self.progress.weekly().await)?))
    }

    /// Send a chat message from the dashboard.
    pub async fn send_chat(&self, text: &str) -> Result<View<ChatReply>, AppError> {
        if let Some(target) = self.guard(Route::Dashboard).await {
            return Ok(View::Redirect(target));
        }
        // Chat context comes from the first task of the day.
        if !self.registry.is_loaded() {
            if let Err(e) = self.registry.refresh().await {
                tracing::warn!("Sending chat without task context: {}", e);
            }
        }
        Ok(View::Ready(self.chat.send(text).await?))
    }
}

/// Map the "no goals yet" response to an empty view instead of an error.
fn empty_on_no_goals<T>(result: Result<T, ApiError>) -> Result<Option<T>, AppError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_no_goals() => Ok(None),
        Err(e) => Err(e.into()),
    }
}
