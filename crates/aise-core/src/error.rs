use thiserror::Error;

/// A convenience `Result` alias using [`AiseError`].
pub type AiseResult<T> = Result<T, AiseError>;

/// Top-level error type for the aise workspace.
///
/// Only lookup and capacity errors are expected to reach callers of the
/// orchestrator; agent execution failures are converted into
/// [`TaskOutcome::Error`](crate::TaskOutcome::Error) at the agent boundary.
#[derive(Error, Debug)]
pub enum AiseError {
    /// No agent is registered under the given id.
    #[error("Agent {0} not found")]
    AgentNotFound(String),

    /// No project exists under the given id.
    #[error("Project {0} not found")]
    ProjectNotFound(String),

    /// A fault raised while an agent executed a task or handled a message.
    #[error("Agent error: {0}")]
    Agent(String),

    /// The text-generation service failed.
    #[error("Generation error: {0}")]
    Generation(String),

    /// The message queue refused a message (closed or full).
    #[error("Router error: {0}")]
    Router(String),

    /// A configured bound (agent pool size, concurrent projects) was reached.
    #[error("Capacity error: {0}")]
    Capacity(String),

    /// Invalid or unreadable configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AiseError {
    /// True for errors caused by an unknown agent or project id.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            AiseError::AgentNotFound(_) | AiseError::ProjectNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_errors() {
        assert!(AiseError::AgentNotFound("ba1".into()).is_lookup());
        assert!(AiseError::ProjectNotFound("proj_1".into()).is_lookup());
        assert!(!AiseError::Router("closed".into()).is_lookup());
    }

    #[test]
    fn test_display() {
        let err = AiseError::AgentNotFound("dev9".into());
        assert_eq!(err.to_string(), "Agent dev9 not found");
        let err = AiseError::Capacity("pool full".into());
        assert_eq!(err.to_string(), "Capacity error: pool full");
    }
}
