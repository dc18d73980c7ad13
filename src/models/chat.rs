use serde::{Deserialize, Serialize};

use super::goal::GoalId;
use super::task::TaskId;

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Mentor,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Mentor => "mentor",
        }
    }
}

/// One entry in the append-only mentor conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn mentor(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Mentor,
            text: text.into(),
        }
    }
}

/// Body of `POST /chat`. Context ids come from the first task of the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub goal_id: Option<GoalId>,
    pub task_id: Option<TaskId>,
}

/// Reply of `POST /chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub action_taken: Option<bool>,
    #[serde(default)]
    pub task_updated: Option<bool>,
}

impl ChatResponse {
    /// Whether the mentor changed stored task state while answering.
    pub fn mutated_tasks(&self) -> bool {
        self.action_taken.unwrap_or(false) || self.task_updated.unwrap_or(false)
    }
}
