use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::AiseError;

/// Structured message payload. Keys are unique by construction.
pub type Content = serde_json::Map<String, Value>;

/// The closed set of message types exchanged between agents.
///
/// Serialized as the snake_case wire name (`"requirement_change"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Ask a business analyst to analyze `requirements`.
    RequirementAnalysis,
    /// Reply to [`MessageKind::RequirementAnalysis`].
    RequirementAnalysisResult,
    /// A change to already-analyzed requirements.
    RequirementChange,
    /// Impact analysis of a [`MessageKind::RequirementChange`].
    ChangeAnalysisResult,
    /// Hand a task to a developer.
    TaskAssignment,
    /// Result of an assigned task or documentation request.
    TaskResult,
    /// Pull request ready for review.
    CodeReviewRequest,
    /// Reviewer's answer to a pull request.
    CodeReviewFeedback,
    /// Sprint scope and its task list.
    SprintPlanning,
    /// Standup prompt.
    DailyStandup,
    /// Reply to [`MessageKind::DailyStandup`].
    StandupUpdate,
    /// End-of-day report for the project manager.
    DailyReport,
    /// Ask a developer to document `subject`.
    DocumentationRequest,
    /// Progress note, possibly carrying `blockers`.
    ProgressUpdate,
    /// Error-response produced by an agent's shared error path.
    Error,
}

impl MessageKind {
    /// Every message type, in declaration order.
    pub const ALL: [MessageKind; 15] = [
        MessageKind::RequirementAnalysis,
        MessageKind::RequirementAnalysisResult,
        MessageKind::RequirementChange,
        MessageKind::ChangeAnalysisResult,
        MessageKind::TaskAssignment,
        MessageKind::TaskResult,
        MessageKind::CodeReviewRequest,
        MessageKind::CodeReviewFeedback,
        MessageKind::SprintPlanning,
        MessageKind::DailyStandup,
        MessageKind::StandupUpdate,
        MessageKind::DailyReport,
        MessageKind::DocumentationRequest,
        MessageKind::ProgressUpdate,
        MessageKind::Error,
    ];

    /// The wire name of this message type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::RequirementAnalysis => "requirement_analysis",
            MessageKind::RequirementAnalysisResult => "requirement_analysis_result",
            MessageKind::RequirementChange => "requirement_change",
            MessageKind::ChangeAnalysisResult => "change_analysis_result",
            MessageKind::TaskAssignment => "task_assignment",
            MessageKind::TaskResult => "task_result",
            MessageKind::CodeReviewRequest => "code_review_request",
            MessageKind::CodeReviewFeedback => "code_review_feedback",
            MessageKind::SprintPlanning => "sprint_planning",
            MessageKind::DailyStandup => "daily_standup",
            MessageKind::StandupUpdate => "standup_update",
            MessageKind::DailyReport => "daily_report",
            MessageKind::DocumentationRequest => "documentation_request",
            MessageKind::ProgressUpdate => "progress_update",
            MessageKind::Error => "error",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = AiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AiseError::Router(format!("unknown message type: {s}")))
    }
}

/// Immutable envelope exchanged between agents.
///
/// Fields are only readable; a response is always a new `Message`
/// (see [`Message::reply`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    sender: String,
    receiver: String,
    content: Content,
    timestamp: DateTime<Utc>,
    message_type: MessageKind,
}

impl Message {
    /// Creates a new message stamped with the current UTC time.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        kind: MessageKind,
        content: Content,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            receiver: receiver.into(),
            content,
            timestamp: Utc::now(),
            message_type: kind,
        }
    }

    /// Creates a new message from any JSON value (see [`into_content`]).
    pub fn from_json(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        kind: MessageKind,
        content: Value,
    ) -> Self {
        Self::new(sender, receiver, kind, into_content(content))
    }

    /// Builds a response addressed back to this message's sender.
    pub fn reply(&self, kind: MessageKind, content: Content) -> Self {
        Self::new(self.receiver.clone(), self.sender.clone(), kind, content)
    }

    /// Builds the standard error response `{error, agent_id, status: "error"}`.
    pub fn error_reply(&self, agent_id: &str, error: impl fmt::Display) -> Self {
        let content = into_content(serde_json::json!({
            "error": error.to_string(),
            "agent_id": agent_id,
            "status": "error",
        }));
        Self::new(agent_id, self.sender.clone(), MessageKind::Error, content)
    }

    /// Random v4 id assigned at construction.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Id of the agent that produced the message.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Id of the agent the message is addressed to.
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    /// Structured payload.
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Creation time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Message type.
    pub fn kind(&self) -> MessageKind {
        self.message_type
    }
}

/// Converts a JSON value into message content.
///
/// Objects are used as-is; any other value is wrapped as `{"value": ...}`.
pub fn into_content(value: Value) -> Content {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Content::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
