//! Mentor chat: a side channel that can change task state.
//!
//! The user turn is appended before the request goes out and is never rolled
//! back. When the mentor reports that it changed stored tasks, the registry
//! and the progress snapshot are re-read before the mentor turn is appended,
//! so the reply is never shown next to stale tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::client::ApiClient;
use crate::models::*;
use crate::progress::ProgressAggregator;
use crate::registry::DailyTaskRegistry;

pub const GREETING: &str = "I'm Zuno. Need help with your tasks or have a doubt?";

pub const APOLOGY: &str =
    "Sorry, I'm having trouble connecting right now. Let's focus on your tasks.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("The mentor is still composing a reply")]
    Busy,
}

/// What came back from one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub turn: ChatTurn,
    /// False when the apology was substituted for a failed request.
    pub delivered: bool,
    /// Whether the registry and snapshot were re-read.
    pub refreshed: bool,
}

pub struct MentorChat {
    client: ApiClient,
    registry: Arc<DailyTaskRegistry>,
    progress: Arc<ProgressAggregator>,
    turns: Mutex<Vec<ChatTurn>>,
    composing: AtomicBool,
}

/// Clears the composing flag however `send` exits.
struct Composing<'a>(&'a AtomicBool);

impl Drop for Composing<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MentorChat {
    pub fn new(
        client: ApiClient,
        registry: Arc<DailyTaskRegistry>,
        progress: Arc<ProgressAggregator>,
    ) -> Self {
        Self {
            client,
            registry,
            progress,
            turns: Mutex::new(vec![ChatTurn::mentor(GREETING)]),
            composing: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ChatTurn>> {
        self.turns.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn turns(&self) -> Vec<ChatTurn> {
        self.lock().clone()
    }

    pub fn is_composing(&self) -> bool {
        self.composing.load(Ordering::Acquire)
    }

    /// Send one message. Only one send may be in flight at a time.
    pub async fn send(&self, text: &str) -> Result<ChatReply, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self
            .composing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ChatError::Busy);
        }
        let _composing = Composing(&self.composing);

        self.lock().push(ChatTurn::user(text));

        let context = self.registry.first();
        let request = ChatRequest {
            message: text.to_string(),
            goal_id: context.as_ref().and_then(|t| t.goal_id),
            task_id: context.as_ref().map(|t| t.id),
        };

        let reply = match self.client.chat(&request).await {
            Ok(response) => {
                let refreshed = response.mutated_tasks();
                if refreshed {
                    self.reconcile().await;
                }
                ChatReply {
                    turn: ChatTurn::mentor(response.response),
                    delivered: true,
                    refreshed,
                }
            }
            Err(e) => {
                tracing::error!("Chat failed: {}", e);
                ChatReply {
                    turn: ChatTurn::mentor(APOLOGY),
                    delivered: false,
                    refreshed: false,
                }
            }
        };

        self.lock().push(reply.turn.clone());
        Ok(reply)
    }

    /// Re-read both projections after the mentor changed task state.
    async fn reconcile(&self) {
        tracing::info!("Mentor updated tasks, refreshing");
        let (tasks, snapshot) = tokio::join!(self.registry.refresh(), self.progress.snapshot());
        if let Err(e) = tasks {
            tracing::warn!("Task refresh after chat failed: {}", e);
        }
        if let Err(e) = snapshot {
            tracing::warn!("Progress refresh after chat failed: {}", e);
        }
    }

    /// Drop the conversation, keeping only the greeting.
    pub fn clear(&self) {
        *self.lock() = vec![ChatTurn::mentor(GREETING)];
    }
}
