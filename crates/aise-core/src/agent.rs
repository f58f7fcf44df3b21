use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AiseError;

/// Role of an agent in the delivery team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    /// Analyzes requirements and change requests.
    BusinessAnalyst,
    /// Implements features, opens pull requests, reports progress.
    Developer,
    /// Reviews code and owns technical decisions.
    TechnicalLead,
    /// Plans sprints and collects reports.
    ProjectManager,
}

impl AgentType {
    /// The wire name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::BusinessAnalyst => "business_analyst",
            AgentType::Developer => "developer",
            AgentType::TechnicalLead => "technical_lead",
            AgentType::ProjectManager => "project_manager",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = AiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "business_analyst" => Ok(AgentType::BusinessAnalyst),
            "developer" => Ok(AgentType::Developer),
            "technical_lead" => Ok(AgentType::TechnicalLead),
            "project_manager" => Ok(AgentType::ProjectManager),
            other => Err(AiseError::Config(format!("unknown agent type: {other}"))),
        }
    }
}

/// Lifecycle state of an agent.
///
/// `Idle`, `Busy` and `Error` are shared by every role; the remaining
/// variants are developer work phases and count as busy for selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Free to take a task.
    Idle,
    /// Running a task.
    Busy,
    /// Last task failed; stays here until re-armed.
    Error,
    /// A `task_assignment` message was accepted.
    TaskReceived,
    /// Producing code.
    Implementing,
    /// Opening a pull request.
    CreatingPr,
    /// Writing documentation.
    UpdatingDocs,
    /// Building the daily report.
    PreparingReport,
    /// Recording a sprint plan.
    SprintPlanned,
    /// Answering a daily standup.
    Standup,
}

impl AgentStatus {
    /// Only an idle agent may be handed a new task.
    pub fn is_available(&self) -> bool {
        *self == AgentStatus::Idle
    }

    /// Snake-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Busy => "busy",
            AgentStatus::Error => "error",
            AgentStatus::TaskReceived => "task_received",
            AgentStatus::Implementing => "implementing",
            AgentStatus::CreatingPr => "creating_pr",
            AgentStatus::UpdatingDocs => "updating_docs",
            AgentStatus::PreparingReport => "preparing_report",
            AgentStatus::SprintPlanned => "sprint_planned",
            AgentStatus::Standup => "standup",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
