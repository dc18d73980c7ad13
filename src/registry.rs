//! Client-side projection of today's tasks.

use std::sync::Mutex;

use crate::client::{ApiClient, ApiError};
use crate::models::{DailyTask, TaskId};

/// Today's tasks as last reported by the planner.
///
/// Every [`refresh`](Self::refresh) replaces the whole set when its response
/// arrives, so of two overlapping refreshes the one that completes last wins.
/// Fields are never merged across responses.
pub struct DailyTaskRegistry {
    client: ApiClient,
    tasks: Mutex<Option<Vec<DailyTask>>>,
}

impl DailyTaskRegistry {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            tasks: Mutex::new(None),
        }
    }

    /// Fetch today's plan and replace the in-memory set.
    ///
    /// An account without goals yields an empty list, the same "no tasks yet"
    /// state as an empty plan. Any other failure leaves the previous set in
    /// place.
    pub async fn refresh(&self) -> Result<Vec<DailyTask>, ApiError> {
        let tasks = match self.client.daily_plan().await {
            Ok(tasks) => tasks,
            Err(e) if e.is_no_goals() => {
                tracing::debug!("No goals configured yet: {}", e);
                Vec::new()
            }
            Err(e) => {
                tracing::error!("Failed to fetch daily plan: {}", e);
                return Err(e);
            }
        };

        tracing::debug!(count = tasks.len(), "Daily plan refreshed");
        *self.lock() = Some(tasks.clone());
        Ok(tasks)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Vec<DailyTask>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether any refresh has completed since creation or the last clear.
    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }

    pub fn tasks(&self) -> Vec<DailyTask> {
        self.lock().clone().unwrap_or_default()
    }

    pub fn find_by_id(&self, id: TaskId) -> Option<DailyTask> {
        self.lock()
            .as_ref()
            .and_then(|tasks| tasks.iter().find(|t| t.id == id).cloned())
    }

    /// The task whose ids are sent as chat context.
    pub fn first(&self) -> Option<DailyTask> {
        self.lock().as_ref().and_then(|tasks| tasks.first().cloned())
    }

    /// True when there is at least one task and every task is done.
    pub fn all_completed(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|tasks| !tasks.is_empty() && tasks.iter().all(|t| t.completed))
    }

    /// Record a successful submission. There is no way to un-complete a task
    /// locally; only a refresh can change the flag back.
    pub fn mark_completed(&self, id: TaskId) -> bool {
        let mut guard = self.lock();
        match guard
            .as_mut()
            .and_then(|tasks| tasks.iter_mut().find(|t| t.id == id))
        {
            Some(task) => {
                task.completed = true;
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }
}
