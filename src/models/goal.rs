use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GoalId = i64;

/// Mastery target recorded for every goal created by onboarding.
pub const DEFAULT_MASTERY_TARGET: &str = "General Mastery";

/// Level recorded until the planner detects a better one.
pub const DEFAULT_DETECTED_LEVEL: &str = "Beginner";

/// A skill commitment owned by one identity.
///
/// Goals are created in bulk when onboarding commits and are immutable from the
/// client's point of view afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub user_id: Uuid,
    pub subject: String,
    #[serde(default)]
    pub exam_or_skill: Option<String>,
    pub daily_time_minutes: u32,
    pub target_date: NaiveDate,
    /// Filled in by the planner; may lag behind goal creation.
    #[serde(default)]
    pub detected_level: Option<String>,
}

/// Input for one row of the onboarding batch insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGoal {
    pub user_id: Uuid,
    pub subject: String,
    pub exam_or_skill: String,
    pub daily_time_minutes: u32,
    pub target_date: NaiveDate,
    pub detected_level: String,
}

/// How much time per day the user can commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DailyCommitment {
    HalfHour,
    #[default]
    OneHour,
    TwoHours,
    /// "3+ hours", budgeted as three.
    ThreePlusHours,
}

impl DailyCommitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HalfHour => "0.5",
            Self::OneHour => "1",
            Self::TwoHours => "2",
            Self::ThreePlusHours => "3",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "0.5" | ".5" => Some(Self::HalfHour),
            "1" => Some(Self::OneHour),
            "2" => Some(Self::TwoHours),
            "3" | "3+" => Some(Self::ThreePlusHours),
            _ => None,
        }
    }

    pub fn minutes(&self) -> u32 {
        match self {
            Self::HalfHour => 30,
            Self::OneHour => 60,
            Self::TwoHours => 120,
            Self::ThreePlusHours => 180,
        }
    }

    /// Display label, e.g. "1 hour" or "0.5 hours".
    pub fn label(&self) -> String {
        let unit = if matches!(self, Self::OneHour) {
            "hour"
        } else {
            "hours"
        };
        format!("{} {}", self.as_str(), unit)
    }
}
