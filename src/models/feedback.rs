use serde::{Deserialize, Serialize};

use super::task::TaskId;

/// Text shown when a feedback view opens without a stored result.
pub const RECEIVED_FEEDBACK_TEXT: &str = "Submission received. Great job completing the task!";

/// Body of `POST /submit-task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTaskInput {
    pub task_id: TaskId,
    pub submission_text: String,
    /// Self-contained `data:` URL, never a link to an external file.
    pub submission_image_url: Option<String>,
}

/// Grading output for one submission (score on a 0-100 scale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub score: f64,
    #[serde(default, rename = "ai_feedback", alias = "feedback")]
    pub text: String,
}

impl Feedback {
    pub fn new(score: f64, text: impl Into<String>) -> Self {
        Self {
            score,
            text: text.into(),
        }
    }

    /// Neutral acknowledgment used when no graded result is available.
    pub fn received() -> Self {
        Self::new(0.0, RECEIVED_FEEDBACK_TEXT)
    }

    pub fn heading(&self) -> &'static str {
        if self.score >= 80.0 {
            "Excellent work!"
        } else if self.score >= 60.0 {
            "Good effort!"
        } else {
            "Keep practicing!"
        }
    }
}
