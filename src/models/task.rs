use serde::{Deserialize, Serialize};

use super::goal::GoalId;

pub type TaskId = i64;

/// One day's unit of work, produced by the remote planner.
///
/// The client reads tasks and only ever flips `completed` to true after a
/// successful submission. A task is never shown as incomplete again unless a
/// refresh from the server says so.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTask {
    pub id: TaskId,
    #[serde(default)]
    pub goal_id: Option<GoalId>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub topic: String,
    /// Link to the video, article or exercise backing this task.
    #[serde(default, rename = "resource_link")]
    pub resource: Option<String>,
    #[serde(default, rename = "task_description")]
    pub instructions: String,
    #[serde(default, rename = "is_completed")]
    pub completed: bool,
}

impl DailyTask {
    pub fn subject_label(&self) -> &str {
        self.subject
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Skill Goal")
    }
}

/// Body of `GET /daily-plan`: the planner answers with one task or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DailyPlan {
    Many(Vec<DailyTask>),
    One(Box<DailyTask>),
}

impl From<DailyPlan> for Vec<DailyTask> {
    fn from(plan: DailyPlan) -> Self {
        match plan {
            DailyPlan::Many(tasks) => tasks,
            DailyPlan::One(task) => vec![*task],
        }
    }
}
