//! Progress snapshot and weekly summary read models.
//!
//! The snapshot is a straight read of the remote progress service and is never
//! derived from the task registry. The two are refreshed independently and
//! may disagree until both have been re-read; callers that show them
//! together accept eventual, not atomic, agreement.

use std::sync::Mutex;

use chrono::{Duration, NaiveDate};

use crate::client::{ApiClient, ApiError};
use crate::models::{ProgressSnapshot, WeeklySummary};

pub struct ProgressAggregator {
    client: ApiClient,
    latest: Mutex<Option<ProgressSnapshot>>,
}

impl ProgressAggregator {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            latest: Mutex::new(None),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ProgressSnapshot>> {
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fetch a fresh snapshot. The latest completed fetch replaces the cached
    /// copy; a failed fetch leaves it untouched.
    pub async fn snapshot(&self) -> Result<ProgressSnapshot, ApiError> {
        let snapshot = self.client.progress().await.inspect_err(|e| {
            if e.is_no_goals() {
                tracing::debug!("No goals configured yet: {}", e);
            } else {
                tracing::error!("Failed to fetch progress: {}", e);
            }
        })?;
        *self.lock() = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Last fetched snapshot, if any.
    pub fn cached(&self) -> Option<ProgressSnapshot> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Mentor summary of the week plus the current snapshot, fetched together.
    pub async fn weekly(&self) -> Result<WeeklyReport, ApiError> {
        let (summary, snapshot) = tokio::try_join!(self.client.weekly_summary(), self.snapshot())?;
        Ok(WeeklyReport { summary, snapshot })
    }
}

/// Everything the weekly summary view shows.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyReport {
    pub summary: WeeklySummary,
    pub snapshot: ProgressSnapshot,
}

impl WeeklyReport {
    pub fn mentor_text(&self) -> &str {
        self.summary.text()
    }
}

/// Display form of a percentage: rounded to a whole number.
pub fn percent_label(value: f64) -> String {
    format!("{}%", value.round() as i64)
}

pub fn motivation(snapshot: &ProgressSnapshot) -> String {
    if snapshot.completed_tasks > 0 {
        format!(
            "You've completed {} tasks with an average score of {}. Keep up the great work!",
            snapshot.completed_tasks, snapshot.average_score
        )
    } else {
        "Start your journey by completing your first task today!".to_string()
    }
}

/// The seven days ending `today`, e.g. "Oct 13 - Oct 19, 2026".
pub fn week_label(today: NaiveDate) -> String {
    let start = today - Duration::days(6);
    format!("{} - {}", start.format("%b %-d"), today.format("%b %-d, %Y"))
}
