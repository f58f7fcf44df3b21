use crate::monitor::OrchestratorMonitor;
use crate::project::ProjectRegistry;
use crate::registry::AgentRegistry;
use crate::router::{panic_message, Dispatch, MessageQueue, MessageRouter, RouterHandle};
use aise_agent::{default_roster, Agent, Outbox, TextGenerator};
use aise_core::{
    AgentType, AiseError, AiseResult, Message, OrchestratorConfig, Project, ProjectStatus, Task,
    TaskKind, TaskOutcome,
};
use futures_util::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Owner of the agent and project registries and the message router.
pub struct Orchestrator {
    config: OrchestratorConfig,
    agents: Arc<AgentRegistry>,
    projects: ProjectRegistry,
    queue: Arc<MessageQueue>,
    router: MessageRouter,
    monitor: Arc<OrchestratorMonitor>,
}

impl Orchestrator {
    /// Create an orchestrator with no agents. Fails if `config` is invalid.
    pub fn new(config: OrchestratorConfig) -> AiseResult<Self> {
        config.validate()?;

        let agents = Arc::new(AgentRegistry::new(config.agent_pool_size));
        let queue = Arc::new(MessageQueue::new(config.queue_capacity));
        let monitor = Arc::new(OrchestratorMonitor::new());
        let router = MessageRouter::new(queue.clone(), agents.clone(), monitor.clone());

        info!(
            agent_pool_size = config.agent_pool_size,
            max_concurrent_projects = config.max_concurrent_projects,
            queue_capacity = config.queue_capacity,
            "Orchestrator created"
        );

        Ok(Self {
            config,
            agents,
            projects: ProjectRegistry::new(),
            queue,
            router,
            monitor,
        })
    }

    /// Validated configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Task and message counters.
    pub fn monitor(&self) -> &Arc<OrchestratorMonitor> {
        &self.monitor
    }

    /// Handle agents use to emit messages into the router queue.
    pub fn outbox(&self) -> Arc<dyn Outbox> {
        self.queue.clone()
    }

    // -- Agents ------------------------------------------------------------

    /// Insert or replace an agent; last registration for an id wins.
    pub fn register_agent(&self, agent: Arc<dyn Agent>) -> AiseResult<()> {
        self.agents.register(agent).map(|_| ())
    }

    /// Fill the free pool slots with the default delivery team, wired to
    /// this orchestrator's queue.
    ///
    /// Roster ids that are already registered keep their existing agent.
    /// Returns the number of agents actually added.
    pub fn register_default_roster(&self, generator: Arc<dyn TextGenerator>) -> AiseResult<usize> {
        let mut added = 0;
        for agent in default_roster(self.config.agent_pool_size, generator, Some(self.outbox())) {
            match self.agents.register_new(agent) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(AiseError::Capacity(_)) => break,
                Err(e) => return Err(e),
            }
        }
        info!(added, total = self.agents.len(), "Registered default roster");
        Ok(added)
    }

    /// Remove an agent; unknown ids are a lookup error.
    pub fn unregister_agent(&self, agent_id: &str) -> AiseResult<Arc<dyn Agent>> {
        self.agents
            .unregister(agent_id)
            .ok_or_else(|| AiseError::AgentNotFound(agent_id.to_string()))
    }

    /// Handle to a registered agent.
    pub fn agent(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(agent_id)
    }

    /// Registered agents in registration order.
    pub fn agents(&self) -> Vec<Arc<dyn Agent>> {
        self.agents.snapshot()
    }

    /// First idle agent of `agent_type` in registration order.
    pub fn find_agent_by_type(&self, agent_type: AgentType) -> Option<Arc<dyn Agent>> {
        self.agents.find_idle(agent_type)
    }

    /// Move an errored agent back to idle. Returns false if it was not in
    /// error.
    pub fn rearm_agent(&self, agent_id: &str) -> AiseResult<bool> {
        let agent = self
            .agents
            .get(agent_id)
            .ok_or_else(|| AiseError::AgentNotFound(agent_id.to_string()))?;
        Ok(agent.core().rearm())
    }

    // -- Projects and tasks -----------------------------------------------

    /// Create a project and hand its requirement analysis to the first idle
    /// business analyst.
    ///
    /// When no business analyst is idle the task is parked on the project
    /// and the project stays `initializing` until
    /// [`retry_pending_assignments`](Self::retry_pending_assignments) places
    /// it. The id is returned either way.
    pub async fn start_project(&self, data: Value) -> AiseResult<String> {
        let project_id = self
            .projects
            .create(data.clone(), self.config.max_concurrent_projects)?;
        info!(project_id = %project_id, "Project started");

        let task = Task::new(project_id.clone(), TaskKind::RequirementAnalysis, data);
        match self.agents.claim_idle(AgentType::BusinessAnalyst) {
            Some(agent) => {
                self.run_assignment(agent, task).await;
            }
            None => {
                let agent_type = AgentType::BusinessAnalyst;
                warn!(
                    project_id = %project_id,
                    agent_type = %agent_type,
                    "No idle agent available, task parked"
                );
                self.projects.park(task)?;
            }
        }
        Ok(project_id)
    }

    /// Run `task` on a registered agent and return its outcome.
    ///
    /// The outcome is logged and returned but not stored on the project.
    /// Agent failures, panics included, come back as
    /// [`TaskOutcome::Error`]; only an unknown `agent_id` is an `Err`.
    pub async fn assign_task(&self, agent_id: &str, task: Task) -> AiseResult<TaskOutcome> {
        let agent = self
            .agents
            .get(agent_id)
            .ok_or_else(|| AiseError::AgentNotFound(agent_id.to_string()))?;
        Ok(self.run_assignment(agent, task).await)
    }

    async fn run_assignment(&self, agent: Arc<dyn Agent>, task: Task) -> TaskOutcome {
        let agent_id = agent.id().to_string();
        let project_id = task.project_id.clone();
        let task_type = task.task_type;

        self.projects.record_assignment(&agent_id, &task);
        self.monitor.record_assigned(&agent_id);
        info!(
            agent_id = %agent_id,
            project_id = %project_id,
            task_type = %task_type,
            "Task assigned"
        );

        let outcome = match AssertUnwindSafe(agent.start_task(task)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                agent.handle_error(&format!("task panicked: {reason}"))
            }
        };

        match &outcome {
            TaskOutcome::Completed { .. } => {
                self.monitor.record_completed(&agent_id);
                info!(agent_id = %agent_id, project_id = %project_id, "Task completed");
            }
            TaskOutcome::Error(failure) => {
                self.monitor.record_failed(&agent_id);
                error!(
                    agent_id = %agent_id,
                    project_id = %project_id,
                    task_type = %task_type,
                    error = %failure.error,
                    "Task failed"
                );
                if self.config.auto_rearm {
                    agent.core().rearm();
                }
            }
        }
        outcome
    }

    /// Place parked tasks on agents that have become idle. Returns the
    /// number of tasks placed.
    pub async fn retry_pending_assignments(&self) -> usize {
        let mut placed = 0;
        for (project_id, needed) in self.projects.pending() {
            for agent_type in needed {
                let Some(agent) = self.agents.claim_idle(agent_type) else {
                    continue;
                };
                let Some(task) = self.projects.take_pending(&project_id, agent_type) else {
                    agent.core().finish();
                    continue;
                };
                self.run_assignment(agent, task).await;
                placed += 1;
            }
        }
        if placed > 0 {
            info!(placed, "Placed parked tasks");
        }
        placed
    }

    /// Snapshot of a project.
    pub fn get_project_status(&self, project_id: &str) -> AiseResult<Project> {
        self.projects.get(project_id)
    }

    /// Set a project's status. Strings outside the known set are kept
    /// verbatim.
    pub fn update_project_status(
        &self,
        project_id: &str,
        status: impl Into<ProjectStatus>,
    ) -> AiseResult<()> {
        let status = status.into();
        info!(project_id, status = %status, "Project status updated");
        self.projects.update_status(project_id, status)
    }

    /// Number of projects not yet completed or errored.
    pub fn active_projects(&self) -> usize {
        self.projects.active_count()
    }

    // -- Messaging ---------------------------------------------------------

    /// Enqueue a message, waiting for queue capacity.
    pub async fn send_message(&self, message: Message) -> AiseResult<()> {
        self.queue.send(message).await
    }

    /// Deliver the message at the head of the queue, if any.
    pub async fn dispatch_next(&self) -> Option<Dispatch> {
        self.router.dispatch_next().await
    }

    /// Dispatch until the queue is empty. Returns the number dispatched.
    pub async fn drain(&self) -> usize {
        self.router.drain().await
    }

    /// Messages waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Run the message router on a background task.
    pub fn spawn_router(&self) -> RouterHandle {
        self.router.spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aise_agent::PlaceholderGenerator;
    use serde_json::json;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(OrchestratorConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = OrchestratorConfig {
            queue_capacity: 0,
            ..OrchestratorConfig::default()
        };
        assert!(matches!(
            Orchestrator::new(config),
            Err(AiseError::Config(_))
        ));
    }

    #[test]
    fn test_default_roster_fills_pool() {
        let orch = orchestrator();
        let count = orch
            .register_default_roster(Arc::new(PlaceholderGenerator::default()))
            .unwrap();
        assert_eq!(count, 5);
        assert_eq!(orch.agents().len(), 5);
        assert!(orch.find_agent_by_type(AgentType::BusinessAnalyst).is_some());
    }

    #[test]
    fn test_default_roster_keeps_registered_ids() {
        let orch = orchestrator();
        let custom: Arc<dyn Agent> = Arc::new(aise_agent::BusinessAnalystAgent::new(
            "ba1",
            Arc::new(PlaceholderGenerator::new("custom")),
        ));
        orch.register_agent(custom.clone()).unwrap();

        let added = orch
            .register_default_roster(Arc::new(PlaceholderGenerator::default()))
            .unwrap();
        assert_eq!(added, 4);
        assert_eq!(orch.agents().len(), 5);
        assert!(Arc::ptr_eq(&orch.agent("ba1").unwrap(), &custom));
        assert!(orch.agent("dev4").is_some());

        let added = orch
            .register_default_roster(Arc::new(PlaceholderGenerator::default()))
            .unwrap();
        assert_eq!(added, 0);
        assert!(Arc::ptr_eq(&orch.agent("ba1").unwrap(), &custom));
    }

    #[test]
    fn test_default_roster_stops_at_pool_size() {
        let orch = orchestrator();
        let outsider: Arc<dyn Agent> = Arc::new(aise_agent::DeveloperAgent::new(
            "contractor",
            Arc::new(PlaceholderGenerator::default()),
        ));
        orch.register_agent(outsider).unwrap();

        let added = orch
            .register_default_roster(Arc::new(PlaceholderGenerator::default()))
            .unwrap();
        assert_eq!(added, 4);
        assert_eq!(orch.agents().len(), 5);
        assert!(orch.agent("dev3").is_some());
        assert!(orch.agent("dev4").is_none());
    }

    #[tokio::test]
    async fn test_start_project_with_default_roster() {
        let orch = orchestrator();
        orch.register_default_roster(Arc::new(PlaceholderGenerator::default()))
            .unwrap();

        let id = orch
            .start_project(json!({"requirements": "build X"}))
            .await
            .unwrap();
        let project = orch.get_project_status(&id).unwrap();
        assert_eq!(project.status, ProjectStatus::Initializing);
        assert!(project.agents.contains("ba1"));
        assert_eq!(project.tasks[0].task_type, TaskKind::RequirementAnalysis);
        assert_eq!(orch.monitor().agent("ba1").unwrap().tasks_completed, 1);
    }

    #[tokio::test]
    async fn test_unknown_agent_and_project() {
        let orch = orchestrator();
        let task = Task::new("proj_x", TaskKind::ImplementFeature, json!({}));
        assert!(orch.assign_task("ghost", task).await.unwrap_err().is_lookup());
        assert!(orch.rearm_agent("ghost").unwrap_err().is_lookup());
        assert!(matches!(
            orch.unregister_agent("ghost"),
            Err(AiseError::AgentNotFound(_))
        ));
        assert!(orch
            .update_project_status("proj_x", "completed")
            .unwrap_err()
            .is_lookup());
    }

    #[tokio::test]
    async fn test_developer_outbox_routes_through_queue() {
        let orch = orchestrator();
        orch.register_default_roster(Arc::new(PlaceholderGenerator::default()))
            .unwrap();

        let outcome = orch
            .assign_task(
                "dev1",
                Task::new("proj_x", TaskKind::PrepareDailyReport, json!({})),
            )
            .await
            .unwrap();
        assert!(outcome.is_completed());
        assert_eq!(orch.queue_len(), 1);
        assert_eq!(orch.dispatch_next().await, Some(Dispatch::Dropped));
    }
}
