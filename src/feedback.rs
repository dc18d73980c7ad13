//! Submission pipeline and the one-hop feedback handoff.
//!
//! A graded result is written to the [`FeedbackSlot`] before `submit` returns,
//! so a caller that navigates on success always finds it. The feedback view
//! consumes the entry; a missing or expired entry degrades to a neutral
//! "received" acknowledgment instead of an error.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use crate::client::{ApiClient, ApiError};
use crate::models::*;
use crate::registry::DailyTaskRegistry;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Submission text is empty")]
    EmptyText,

    #[error("Image must be embedded as a data URL, not referenced externally")]
    ExternalImage,

    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to submit: {0}")]
    Api(#[from] ApiError),
}

/// An image embedded in the request as a `data:image/...` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload(String);

impl ImagePayload {
    pub fn from_data_url(url: impl Into<String>) -> Result<Self, SubmitError> {
        let url = url.into();
        let Some(rest) = url.strip_prefix("data:") else {
            return Err(SubmitError::ExternalImage);
        };
        let mime = rest.split([';', ',']).next().unwrap_or_default();
        if !mime.starts_with("image/") || !rest.contains(',') {
            return Err(SubmitError::UnsupportedImage(mime.to_string()));
        }
        Ok(Self(url))
    }

    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }

    /// Read and embed an image file. The type is taken from the extension.
    pub fn from_path(path: &Path) -> Result<Self, SubmitError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let mime = match extension.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            other => return Err(SubmitError::UnsupportedImage(other.to_string())),
        };
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(mime, &bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Single-hop store carrying [`Feedback`] from submission to presentation.
///
/// Keyed by task id. Reading consumes the entry, and entries left unread
/// expire after `ttl`. Not a cache.
pub struct FeedbackSlot {
    ttl: Duration,
    entries: Mutex<HashMap<TaskId, (Feedback, Instant)>>,
}

impl Default for FeedbackSlot {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

impl FeedbackSlot {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TaskId, (Feedback, Instant)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn put(&self, task_id: TaskId, feedback: Feedback) {
        let mut entries = self.lock();
        let ttl = self.ttl;
        entries.retain(|_, (_, written)| written.elapsed() < ttl);
        entries.insert(task_id, (feedback, Instant::now()));
    }

    /// Remove and return the entry for `task_id` if it has not expired.
    pub fn take(&self, task_id: TaskId) -> Option<Feedback> {
        let (feedback, written) = self.lock().remove(&task_id)?;
        if written.elapsed() < self.ttl {
            Some(feedback)
        } else {
            tracing::debug!(task_id, "Feedback slot entry expired");
            None
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Sends work for grading and hands the result to the feedback view.
pub struct SubmissionPipeline {
    client: ApiClient,
    registry: Arc<DailyTaskRegistry>,
    slot: Arc<FeedbackSlot>,
}

impl SubmissionPipeline {
    pub fn new(client: ApiClient, registry: Arc<DailyTaskRegistry>, slot: Arc<FeedbackSlot>) -> Self {
        Self {
            client,
            registry,
            slot,
        }
    }

    /// Grade a submission. On success the feedback is already in the slot
    /// when this returns; on failure nothing is written and the caller may
    /// retry as is.
    pub async fn submit(
        &self,
        task_id: TaskId,
        text: &str,
        image: Option<ImagePayload>,
    ) -> Result<Feedback, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyText);
        }

        let input = SubmitTaskInput {
            task_id,
            submission_text: text.to_string(),
            submission_image_url: image.map(ImagePayload::into_inner),
        };
        let feedback = match self.client.submit_task(&input).await {
            Ok(feedback) => feedback,
            Err(e) => {
                tracing::error!(task_id, "Failed to submit task: {}", e);
                return Err(e.into());
            }
        };

        tracing::info!(task_id, score = feedback.score, "Submission graded");
        self.slot.put(task_id, feedback.clone());
        self.registry.mark_completed(task_id);
        Ok(feedback)
    }
}

/// What the feedback view shows for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackView {
    pub task_id: TaskId,
    pub feedback: Feedback,
    /// False when the neutral default was substituted.
    pub graded: bool,
}

impl FeedbackView {
    /// Consume the slot entry for `task_id`, or fall back to the default.
    pub fn open(slot: &FeedbackSlot, task_id: TaskId) -> Self {
        match slot.take(task_id) {
            Some(feedback) => Self {
                task_id,
                feedback,
                graded: true,
            },
            None => {
                tracing::debug!(task_id, "No stored feedback, showing acknowledgment");
                Self {
                    task_id,
                    feedback: Feedback::received(),
                    graded: false,
                }
            }
        }
    }

    pub fn heading(&self) -> &'static str {
        self.feedback.heading()
    }

    pub fn score_label(&self) -> String {
        self.feedback.score.to_string()
    }
}
