use serde::{Deserialize, Serialize};

/// Fallback mentor text for an empty weekly summary.
pub const DEFAULT_WEEKLY_TEXT: &str =
    "Keep up the great work! Your consistency is building real skill.";

/// Aggregate statistics as reported by `GET /progress`.
///
/// Always a possibly stale copy of server truth; it is never derived from
/// the local task registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub total_tasks: u32,
    #[serde(default)]
    pub completed_tasks: u32,
    /// Full precision; round only for display.
    #[serde(default)]
    pub completion_percentage: f64,
    #[serde(default)]
    pub average_score: f64,
}

/// Body of `GET /weekly-summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    #[serde(default)]
    pub mentor_summary_text: Option<String>,
}

impl WeeklySummary {
    pub fn text(&self) -> &str {
        self.mentor_summary_text
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_WEEKLY_TEXT)
    }
}
