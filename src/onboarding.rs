//! Goal intake wizard.
//!
//! `Collecting -> Scheduling -> Committing -> Summary`, forward one step at a
//! time, back one step at a time. Goals are written in a single batch on the
//! way into `Committing`; only a successful batch reaches `Summary`.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use thiserror::Error;

use crate::auth::Route;
use crate::goals::{GoalStore, GoalStoreError};
use crate::models::*;

/// Days from today used when no target date is chosen.
pub const DEFAULT_TARGET_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Collecting,
    Scheduling,
    Committing,
    Summary,
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("Add at least one skill to continue")]
    NoSkills,

    #[error("Failed to save goals: {0}")]
    Commit(#[from] GoalStoreError),
}

/// Result of pressing "continue".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved(WizardStep),
    /// The wizard is done; navigate away.
    Finished(Route),
}

/// Result of opening the onboarding view.
pub enum WizardEntry {
    /// Goals already exist for this identity.
    Redirect(Route),
    Start(OnboardingWizard),
}

/// One card of the summary step.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalSummary {
    /// 1-based position in the created batch.
    pub position: usize,
    pub subject: String,
    pub daily_commitment: String,
    pub detected_level: String,
    pub message: String,
}

pub struct OnboardingWizard {
    store: Arc<dyn GoalStore>,
    session: Session,
    step: WizardStep,
    skills: Vec<String>,
    commitment: DailyCommitment,
    target_date: Option<NaiveDate>,
    summary: Vec<GoalSummary>,
}

impl OnboardingWizard {
    /// Open the wizard. Unless `force` is set, an identity that already has
    /// goals is sent to the dashboard. A failed existence check opens the
    /// wizard anyway.
    pub async fn enter(store: Arc<dyn GoalStore>, session: Session, force: bool) -> WizardEntry {
        if !force {
            match store.has_goals(&session).await {
                Ok(true) => return WizardEntry::Redirect(Route::Dashboard),
                Ok(false) => {}
                Err(e) => tracing::warn!("Check for existing goals failed: {}", e),
            }
        }
        WizardEntry::Start(Self::new(store, session))
    }

    pub fn new(store: Arc<dyn GoalStore>, session: Session) -> Self {
        Self {
            store,
            session,
            step: WizardStep::Collecting,
            skills: vec![String::new()],
            commitment: DailyCommitment::default(),
            target_date: None,
            summary: Vec::new(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    pub fn add_skill(&mut self) {
        self.skills.push(String::new());
    }

    /// Remove an entry. The list never shrinks below one entry.
    pub fn remove_skill(&mut self, index: usize) -> bool {
        if self.skills.len() > 1 && index < self.skills.len() {
            self.skills.remove(index);
            true
        } else {
            false
        }
    }

    pub fn set_skill(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.skills.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Replace every entry at once.
    pub fn set_skills<I, S>(&mut self, skills: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        if self.skills.is_empty() {
            self.skills.push(String::new());
        }
    }

    /// Entries with content, trimmed. Blank entries are skipped, not rejected.
    pub fn filled_skills(&self) -> Vec<&str> {
        self.skills
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn commitment(&self) -> DailyCommitment {
        self.commitment
    }

    pub fn set_commitment(&mut self, commitment: DailyCommitment) {
        self.commitment = commitment;
    }

    pub fn target_date(&self) -> Option<NaiveDate> {
        self.target_date
    }

    pub fn set_target_date(&mut self, date: Option<NaiveDate>) {
        self.target_date = date;
    }

    pub fn can_advance(&self) -> bool {
        self.step != WizardStep::Collecting || !self.filled_skills().is_empty()
    }

    pub fn summary(&self) -> &[GoalSummary] {
        &self.summary
    }

    /// Move forward one step. From `Scheduling` (or a failed `Committing`)
    /// this writes the goal batch.
    pub async fn advance(&mut self) -> Result<Transition, WizardError> {
        match self.step {
            WizardStep::Collecting => {
                if self.filled_skills().is_empty() {
                    return Err(WizardError::NoSkills);
                }
                self.step = WizardStep::Scheduling;
                Ok(Transition::Moved(self.step))
            }
            WizardStep::Scheduling | WizardStep::Committing => self.commit().await,
            WizardStep::Summary => Ok(Transition::Finished(Route::Dashboard)),
        }
    }

    /// Move back one step. The summary is terminal: its goals are already saved.
    pub fn back(&mut self) -> WizardStep {
        self.step = match self.step {
            WizardStep::Scheduling => WizardStep::Collecting,
            WizardStep::Committing => WizardStep::Scheduling,
            other => other,
        };
        self.step
    }

    /// The batch that continuing from `Scheduling` would create.
    pub fn pending_goals(&self, today: NaiveDate) -> Vec<NewGoal> {
        let target_date = self
            .target_date
            .unwrap_or_else(|| default_target_date(today));
        self.filled_skills()
            .into_iter()
            .map(|subject| NewGoal {
                user_id: self.session.user_id,
                subject: subject.to_string(),
                exam_or_skill: DEFAULT_MASTERY_TARGET.to_string(),
                daily_time_minutes: self.commitment.minutes(),
                target_date,
                detected_level: DEFAULT_DETECTED_LEVEL.to_string(),
            })
            .collect()
    }

    async fn commit(&mut self) -> Result<Transition, WizardError> {
        let goals = self.pending_goals(Utc::now().date_naive());
        if goals.is_empty() {
            self.step = WizardStep::Collecting;
            return Err(WizardError::NoSkills);
        }

        self.step = WizardStep::Committing;
        let cards: Vec<(String, Option<String>)> = match self
            .store
            .insert_goals(&self.session, &goals)
            .await
        {
            Ok(created) => {
                tracing::info!(count = created.len(), "Goals created");
                created
                    .into_iter()
                    .map(|goal| (goal.subject, goal.detected_level))
                    .collect()
            }
            // Accepted but not echoed back; the rows exist.
            Err(e @ GoalStoreError::Partial { .. }) => {
                tracing::warn!("Goals saved, summary built locally: {}", e);
                goals
                    .into_iter()
                    .map(|goal| (goal.subject, Some(goal.detected_level)))
                    .collect()
            }
            Err(e) => {
                tracing::error!("Onboarding failed: {}", e);
                return Err(e.into());
            }
        };

        let daily_commitment = self.commitment.label();
        self.summary = cards
            .into_iter()
            .enumerate()
            .map(|(i, (subject, detected_level))| GoalSummary {
                position: i + 1,
                message: encouragement(&subject),
                subject,
                daily_commitment: daily_commitment.clone(),
                detected_level: detected_level
                    .unwrap_or_else(|| DEFAULT_DETECTED_LEVEL.to_string()),
            })
            .collect();
        self.step = WizardStep::Summary;
        Ok(Transition::Moved(self.step))
    }
}

pub fn default_target_date(today: NaiveDate) -> NaiveDate {
    today + Duration::days(DEFAULT_TARGET_DAYS)
}

pub fn encouragement(subject: &str) -> String {
    format!("Welcome to the grind! Your path for {} is ready.", subject)
}
