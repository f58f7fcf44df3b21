use aise_core::{
    AgentFailure, AgentStatus, AgentType, AiseResult, Message, Task, TaskOutcome,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, error, info};

/// Capability contract every agent implements.
///
/// Implementations must not panic: failures are converted into an error
/// payload through [`AgentCore::fail`] (tasks) or [`Message::error_reply`]
/// (messages).
#[async_trait]
pub trait Agent: Send + Sync {
    /// Identity and lifecycle state shared by every agent.
    fn core(&self) -> &AgentCore;

    /// Ordered capability tags.
    fn capabilities(&self) -> &'static [&'static str];

    /// Handle one routed message, optionally producing a new message.
    ///
    /// Message kinds the role does not handle yield `None`.
    async fn process_message(&self, message: &Message) -> Option<Message>;

    /// Run a task to completion.
    async fn start_task(&self, task: Task) -> TaskOutcome;

    /// Unique agent id.
    fn id(&self) -> &str {
        self.core().id()
    }

    /// Role of this agent.
    fn agent_type(&self) -> AgentType {
        self.core().agent_type()
    }

    /// Current lifecycle status.
    fn status(&self) -> AgentStatus {
        self.core().status()
    }

    /// Project of the most recent task, if any.
    fn current_project(&self) -> Option<String> {
        self.core().current_project()
    }

    /// Overwrite the status unconditionally.
    fn update_status(&self, status: AgentStatus) {
        self.core().set_status(status);
    }

    /// Shared error path: marks the agent as errored and builds the payload.
    fn handle_error(&self, error: &dyn fmt::Display) -> TaskOutcome {
        TaskOutcome::Error(self.core().fail(error))
    }
}

/// Emits messages into the router queue.
#[async_trait]
pub trait Outbox: Send + Sync {
    /// Enqueue `message` for delivery.
    async fn send(&self, message: Message) -> AiseResult<()>;
}

struct CoreState {
    status: AgentStatus,
    current_project: Option<String>,
    // Bumped whenever a task or message takes ownership of the status.
    epoch: u64,
}

/// Identity and lifecycle state of an agent.
///
/// Status reads and writes go through a mutex so the orchestrator can claim
/// an idle agent atomically while the agent updates itself from another task.
pub struct AgentCore {
    id: String,
    agent_type: AgentType,
    state: Mutex<CoreState>,
}

impl AgentCore {
    /// An idle core with no project.
    pub fn new(id: impl Into<String>, agent_type: AgentType) -> Self {
        Self {
            id: id.into(),
            agent_type,
            state: Mutex::new(CoreState {
                status: AgentStatus::Idle,
                current_project: None,
                epoch: 0,
            }),
        }
    }

    /// Unique agent id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Role of this agent.
    pub fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    /// Current lifecycle status.
    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    /// Project of the most recent task, if any.
    pub fn current_project(&self) -> Option<String> {
        self.state.lock().current_project.clone()
    }

    /// Overwrite the status. Used by the task path, which owns the claim.
    pub fn set_status(&self, status: AgentStatus) {
        let previous = std::mem::replace(&mut self.state.lock().status, status);
        if previous != status {
            info!(
                agent_id = %self.id,
                agent_type = %self.agent_type,
                from = %previous,
                to = %status,
                "Agent status updated"
            );
        }
    }

    /// Atomically move `idle -> busy`. Returns false if the agent was not idle.
    pub fn try_claim(&self) -> bool {
        let mut state = self.state.lock();
        if state.status.is_available() {
            state.status = AgentStatus::Busy;
            state.epoch += 1;
            true
        } else {
            false
        }
    }

    /// Move `error -> idle`. Returns false if the agent was not in error.
    pub fn rearm(&self) -> bool {
        let mut state = self.state.lock();
        if state.status == AgentStatus::Error {
            state.status = AgentStatus::Idle;
            info!(agent_id = %self.id, "Agent re-armed");
            true
        } else {
            false
        }
    }

    /// Mark the agent busy on `project_id`.
    pub fn begin_task(&self, project_id: &str) {
        {
            let mut state = self.state.lock();
            state.current_project = Some(project_id.to_string());
            state.epoch += 1;
        }
        self.set_status(AgentStatus::Busy);
    }

    /// Enter a transient `phase` for the duration of one message.
    ///
    /// The phase is only taken from `idle`. An errored agent or one running
    /// a task keeps its status, and the returned guard never touches it.
    /// Dropping a held guard returns the agent to `idle` unless something
    /// else has taken the status in the meantime.
    pub fn enter_phase(&self, phase: AgentStatus) -> PhaseGuard<'_> {
        let held = {
            let mut state = self.state.lock();
            if state.status.is_available() {
                state.status = phase;
                state.epoch += 1;
                Some((phase, state.epoch))
            } else {
                None
            }
        };
        match held {
            Some(_) => debug!(agent_id = %self.id, phase = %phase, "Entered message phase"),
            None => debug!(
                agent_id = %self.id,
                status = %self.status(),
                "Agent not idle, handling message without status change"
            ),
        }
        PhaseGuard { core: self, held }
    }

    /// Compare-and-set on the status, valid only while `epoch` still owns it.
    fn transition(&self, from: AgentStatus, epoch: u64, to: AgentStatus) -> bool {
        let mut state = self.state.lock();
        if state.status != from || state.epoch != epoch {
            return false;
        }
        state.status = to;
        drop(state);
        info!(
            agent_id = %self.id,
            agent_type = %self.agent_type,
            from = %from,
            to = %to,
            "Agent status updated"
        );
        true
    }

    /// Return to idle after successful work.
    pub fn finish(&self) {
        self.set_status(AgentStatus::Idle);
    }

    /// Mark the agent errored and build the `{error, agent_id}` payload.
    pub fn fail(&self, error: &dyn fmt::Display) -> AgentFailure {
        error!(agent_id = %self.id, error = %error, "Agent failed");
        self.set_status(AgentStatus::Error);
        AgentFailure::new(self.id.clone(), error)
    }
}

/// Ownership of a message-handling phase, returned by
/// [`AgentCore::enter_phase`].
#[must_use = "dropping the guard ends the phase immediately"]
pub struct PhaseGuard<'a> {
    core: &'a AgentCore,
    held: Option<(AgentStatus, u64)>,
}

impl PhaseGuard<'_> {
    /// Whether this message owns the agent's status.
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Move from the held phase to `next`. A no-op when not held.
    pub fn advance(&mut self, next: AgentStatus) {
        if let Some((current, epoch)) = self.held {
            self.held = self
                .core
                .transition(current, epoch, next)
                .then_some((next, epoch));
        }
    }

    /// Record a message-handling failure.
    ///
    /// Only a held phase moves to `error`; otherwise the status belongs to
    /// someone else and is left alone.
    pub fn fail(mut self, error: &dyn fmt::Display) -> AgentFailure {
        error!(agent_id = %self.core.id, error = %error, "Agent failed handling message");
        if let Some((current, epoch)) = self.held.take() {
            self.core.transition(current, epoch, AgentStatus::Error);
        }
        AgentFailure::new(self.core.id.clone(), error)
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if let Some((current, epoch)) = self.held.take() {
            self.core.transition(current, epoch, AgentStatus::Idle);
        }
    }
}

impl fmt::Debug for AgentCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AgentCore")
            .field("id", &self.id)
            .field("agent_type", &self.agent_type)
            .field("status", &state.status)
            .field("current_project", &state.current_project)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_core_is_idle() {
        let core = AgentCore::new("ba1", AgentType::BusinessAnalyst);
        assert_eq!(core.status(), AgentStatus::Idle);
        assert!(core.current_project().is_none());
    }

    #[test]
    fn test_claim_is_exclusive() {
        let core = AgentCore::new("ba1", AgentType::BusinessAnalyst);
        assert!(core.try_claim());
        assert!(!core.try_claim());
        assert_eq!(core.status(), AgentStatus::Busy);
    }

    #[test]
    fn test_fail_then_rearm() {
        let core = AgentCore::new("dev1", AgentType::Developer);
        core.begin_task("proj_1");
        let failure = core.fail(&"boom");
        assert_eq!(failure.agent_id, "dev1");
        assert_eq!(failure.error, "boom");
        assert_eq!(core.status(), AgentStatus::Error);
        assert!(!core.try_claim());

        assert!(core.rearm());
        assert_eq!(core.status(), AgentStatus::Idle);
        assert!(!core.rearm());
        assert_eq!(core.current_project().as_deref(), Some("proj_1"));
    }

    #[test]
    fn test_phase_from_idle_returns_to_idle() {
        let core = AgentCore::new("dev1", AgentType::Developer);
        {
            let mut phase = core.enter_phase(AgentStatus::TaskReceived);
            assert!(phase.is_held());
            assert!(!core.try_claim());
            phase.advance(AgentStatus::Implementing);
            assert_eq!(core.status(), AgentStatus::Implementing);
        }
        assert_eq!(core.status(), AgentStatus::Idle);
    }

    #[test]
    fn test_phase_never_leaves_error() {
        let core = AgentCore::new("dev1", AgentType::Developer);
        core.begin_task("proj_1");
        core.fail(&"boom");

        let mut phase = core.enter_phase(AgentStatus::Standup);
        assert!(!phase.is_held());
        phase.advance(AgentStatus::Implementing);
        drop(phase);
        assert_eq!(core.status(), AgentStatus::Error);

        let failure = core.enter_phase(AgentStatus::UpdatingDocs).fail(&"again");
        assert_eq!(failure.error, "again");
        assert_eq!(core.status(), AgentStatus::Error);
    }

    #[test]
    fn test_phase_does_not_end_running_task() {
        let core = AgentCore::new("dev1", AgentType::Developer);
        assert!(core.try_claim());
        core.set_status(AgentStatus::Implementing);

        drop(core.enter_phase(AgentStatus::SprintPlanned));
        assert_eq!(core.status(), AgentStatus::Implementing);
        let _ = core.enter_phase(AgentStatus::UpdatingDocs).fail(&"boom");
        assert_eq!(core.status(), AgentStatus::Implementing);
        assert!(!core.try_claim());
    }

    #[test]
    fn test_phase_released_after_task_took_over() {
        let core = AgentCore::new("dev1", AgentType::Developer);
        let phase = core.enter_phase(AgentStatus::Implementing);
        assert!(phase.is_held());

        // A task assigned directly re-enters the same status.
        core.begin_task("proj_1");
        core.set_status(AgentStatus::Implementing);
        drop(phase);
        assert_eq!(core.status(), AgentStatus::Implementing);
    }

    #[test]
    fn test_phase_failure_marks_error() {
        let core = AgentCore::new("dev1", AgentType::Developer);
        let failure = core.enter_phase(AgentStatus::UpdatingDocs).fail(&"boom");
        assert_eq!(failure.agent_id, "dev1");
        assert_eq!(core.status(), AgentStatus::Error);
        assert!(core.rearm());
    }

    #[test]
    fn test_rearm_ignores_busy_agent() {
        let core = AgentCore::new("dev1", AgentType::Developer);
        core.begin_task("proj_1");
        assert!(!core.rearm());
        assert_eq!(core.status(), AgentStatus::Busy);
    }
}
