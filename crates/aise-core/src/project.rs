use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

use crate::{AgentType, Task};

/// Project status. Well-known states have variants; anything else is kept
/// verbatim. Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectStatus {
    /// Created; the requirement analysis may still be parked.
    Initializing,
    /// `in_progress`.
    InProgress,
    /// Terminal.
    Completed,
    /// Terminal.
    Error,
    /// Caller-defined status, stored verbatim.
    Other(String),
}

impl ProjectStatus {
    /// String form, as stored and serialized.
    pub fn as_str(&self) -> &str {
        match self {
            ProjectStatus::Initializing => "initializing",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Error => "error",
            ProjectStatus::Other(s) => s,
        }
    }

    /// Completed and errored projects no longer count against
    /// `max_concurrent_projects`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Error)
    }
}

impl From<&str> for ProjectStatus {
    fn from(s: &str) -> Self {
        match s {
            "initializing" => ProjectStatus::Initializing,
            "in_progress" => ProjectStatus::InProgress,
            "completed" => ProjectStatus::Completed,
            "error" => ProjectStatus::Error,
            other => ProjectStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for ProjectStatus {
    fn from(s: String) -> Self {
        ProjectStatus::from(s.as_str())
    }
}

impl From<ProjectStatus> for String {
    fn from(status: ProjectStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work spanning multiple tasks and agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// `proj_<UTC timestamp>`, unique within a registry.
    pub id: String,
    /// The payload the project was started with.
    pub data: Value,
    /// Current status.
    pub status: ProjectStatus,
    /// Ids of agents that received a task for this project.
    pub agents: BTreeSet<String>,
    /// Tasks handed to agents, in assignment order.
    pub tasks: Vec<Task>,
    /// Tasks that found no idle agent of the required type.
    #[serde(default)]
    pub pending_tasks: Vec<Task>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last change to status, tasks or pending tasks.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// A fresh `initializing` project.
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            data,
            status: ProjectStatus::Initializing,
            agents: BTreeSet::new(),
            tasks: Vec::new(),
            pending_tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the status and touch `updated_at`.
    pub fn set_status(&mut self, status: ProjectStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Record that `agent_id` was handed `task`.
    pub fn record_assignment(&mut self, agent_id: &str, task: Task) {
        self.agents.insert(agent_id.to_string());
        self.tasks.push(task);
        self.updated_at = Utc::now();
    }

    /// Park a task until an agent of its role is idle.
    pub fn park(&mut self, task: Task) {
        self.pending_tasks.push(task);
        self.updated_at = Utc::now();
    }

    /// Remove and return the oldest parked task a given role can perform.
    pub fn take_pending(&mut self, agent_type: AgentType) -> Option<Task> {
        let idx = self
            .pending_tasks
            .iter()
            .position(|t| t.task_type.agent_type() == agent_type)?;
        self.updated_at = Utc::now();
        Some(self.pending_tasks.remove(idx))
    }

    /// Whether the project counts against `max_concurrent_projects`.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}
