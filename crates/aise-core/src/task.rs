use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::AgentType;

/// Kind of work a task asks an agent to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Business analyst: analyze the project's requirements.
    RequirementAnalysis,
    /// Developer: analysis, design, code, review and docs for a feature.
    ImplementFeature,
    /// Developer: open a pull request and request review.
    CreatePullRequest,
    /// Developer: write documentation for `subject`.
    UpdateDocumentation,
    /// Developer: send the daily report.
    PrepareDailyReport,
}

impl TaskKind {
    /// The role able to perform this kind of task.
    pub fn agent_type(&self) -> AgentType {
        match self {
            TaskKind::RequirementAnalysis => AgentType::BusinessAnalyst,
            TaskKind::ImplementFeature
            | TaskKind::CreatePullRequest
            | TaskKind::UpdateDocumentation
            | TaskKind::PrepareDailyReport => AgentType::Developer,
        }
    }

    /// Snake-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::RequirementAnalysis => "requirement_analysis",
            TaskKind::ImplementFeature => "implement_feature",
            TaskKind::CreatePullRequest => "create_pull_request",
            TaskKind::UpdateDocumentation => "update_documentation",
            TaskKind::PrepareDailyReport => "prepare_daily_report",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work handed to exactly one agent.
///
/// The orchestrator does not track progress beyond "assigned"; the agent
/// owns that internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Owning project.
    pub project_id: String,
    /// What to do.
    pub task_type: TaskKind,
    /// Arbitrary task payload.
    #[serde(default)]
    pub data: Value,
}

impl Task {
    /// A task for `project_id`.
    pub fn new(project_id: impl Into<String>, task_type: TaskKind, data: Value) -> Self {
        Self {
            project_id: project_id.into(),
            task_type,
            data,
        }
    }

    /// Read a string field from the task payload.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Error payload produced by an agent's shared error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFailure {
    /// Rendered error.
    pub error: String,
    /// Agent that failed.
    pub agent_id: String,
}

impl AgentFailure {
    /// Render `error` for `agent_id`.
    pub fn new(agent_id: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            error: error.to_string(),
            agent_id: agent_id.into(),
        }
    }
}

/// Result of an agent's `start_task`: serializes to
/// `{"status": "completed", "result": ...}` or
/// `{"status": "error", "error": ..., "agent_id": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The task finished.
    Completed {
        /// Role-specific result document.
        result: Value,
    },
    /// The task failed and the agent is in error.
    Error(AgentFailure),
}

impl TaskOutcome {
    /// Shorthand for [`TaskOutcome::Completed`].
    pub fn completed(result: Value) -> Self {
        TaskOutcome::Completed { result }
    }

    /// Whether the task finished.
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed { .. })
    }

    /// Result document of a completed task.
    pub fn result(&self) -> Option<&Value> {
        match self {
            TaskOutcome::Completed { result } => Some(result),
            TaskOutcome::Error(_) => None,
        }
    }

    /// Failure payload of a failed task.
    pub fn failure(&self) -> Option<&AgentFailure> {
        match self {
            TaskOutcome::Completed { .. } => None,
            TaskOutcome::Error(failure) => Some(failure),
        }
    }
}

impl From<AgentFailure> for TaskOutcome {
    fn from(failure: AgentFailure) -> Self {
        TaskOutcome::Error(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_wire_shape() {
        let task = Task::new(
            "proj_20250101120000",
            TaskKind::RequirementAnalysis,
            json!({"requirements": "build X"}),
        );
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["task_type"], "requirement_analysis");
        assert_eq!(value["project_id"], "proj_20250101120000");
        assert_eq!(task.data_str("requirements"), Some("build X"));
    }

    #[test]
    fn test_outcome_completed_shape() {
        let outcome = TaskOutcome::completed(json!({"pr": 12}));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, json!({"status": "completed", "result": {"pr": 12}}));
    }

    #[test]
    fn test_outcome_error_shape() {
        let outcome: TaskOutcome = AgentFailure::new("ba1", "model timed out").into();
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({"status": "error", "error": "model timed out", "agent_id": "ba1"})
        );
        let parsed: TaskOutcome = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.failure().unwrap().agent_id, "ba1");
    }

    #[test]
    fn test_task_kind_roles() {
        assert_eq!(
            TaskKind::RequirementAnalysis.agent_type(),
            AgentType::BusinessAnalyst
        );
        assert_eq!(TaskKind::CreatePullRequest.agent_type(), AgentType::Developer);
    }
}
