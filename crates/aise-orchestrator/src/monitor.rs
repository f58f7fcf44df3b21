use crate::router::Dispatch;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-agent counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Tasks handed to the agent.
    pub tasks_assigned: u64,
    /// Tasks that returned a result.
    pub tasks_completed: u64,
    /// Tasks that failed or panicked.
    pub tasks_failed: u64,
    /// Messages delivered to the agent.
    pub messages_received: u64,
    /// Replies the agent produced.
    pub responses_sent: u64,
}

/// Counters for the message router, one per [`Dispatch`] outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterMetrics {
    /// Delivered without a reply.
    pub delivered: u64,
    /// Delivered and a reply re-enqueued.
    pub responded: u64,
    /// Receiver not registered.
    pub dropped: u64,
    /// Handler panicked.
    pub failed: u64,
}

/// Metrics of a single agent, as returned by [`OrchestratorMonitor::snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentActivity {
    /// Agent id.
    pub agent_id: String,
    /// Its counters.
    pub metrics: AgentMetrics,
}

#[derive(Default)]
struct MonitorState {
    agents: BTreeMap<String, AgentMetrics>,
    router: RouterMetrics,
}

/// Tracks task and message activity across the orchestrator.
pub struct OrchestratorMonitor {
    state: RwLock<MonitorState>,
}

impl OrchestratorMonitor {
    /// A monitor with all counters at zero.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MonitorState::default()),
        }
    }

    fn update_agent(&self, agent_id: &str, f: impl FnOnce(&mut AgentMetrics)) {
        let mut state = self.state.write();
        f(state.agents.entry(agent_id.to_string()).or_default());
    }

    /// Count a task handed to `agent_id`.
    pub fn record_assigned(&self, agent_id: &str) {
        self.update_agent(agent_id, |m| m.tasks_assigned += 1);
    }

    /// Count a completed task.
    pub fn record_completed(&self, agent_id: &str) {
        self.update_agent(agent_id, |m| m.tasks_completed += 1);
    }

    /// Count a failed task.
    pub fn record_failed(&self, agent_id: &str) {
        self.update_agent(agent_id, |m| m.tasks_failed += 1);
    }

    /// Record the outcome of routing one message.
    ///
    /// `receiver` is `None` when the message was dropped for lack of one.
    pub fn record_dispatch(&self, receiver: Option<&str>, outcome: Dispatch) {
        let mut state = self.state.write();
        match outcome {
            Dispatch::Delivered => state.router.delivered += 1,
            Dispatch::Responded => state.router.responded += 1,
            Dispatch::Dropped => state.router.dropped += 1,
            Dispatch::Failed => state.router.failed += 1,
        }
        if let Some(receiver) = receiver {
            let metrics = state.agents.entry(receiver.to_string()).or_default();
            metrics.messages_received += 1;
            if outcome == Dispatch::Responded {
                metrics.responses_sent += 1;
            }
        }
    }

    /// Metrics for every agent seen so far, ordered by agent id.
    pub fn snapshot(&self) -> Vec<AgentActivity> {
        self.state
            .read()
            .agents
            .iter()
            .map(|(agent_id, metrics)| AgentActivity {
                agent_id: agent_id.clone(),
                metrics: *metrics,
            })
            .collect()
    }

    /// Counters of one agent, if it ever had activity.
    pub fn agent(&self, agent_id: &str) -> Option<AgentMetrics> {
        self.state.read().agents.get(agent_id).copied()
    }

    /// Router counters.
    pub fn router(&self) -> RouterMetrics {
        self.state.read().router
    }

    /// Sum of all per-agent counters.
    pub fn aggregate(&self) -> AgentMetrics {
        let state = self.state.read();
        let mut total = AgentMetrics::default();
        for metrics in state.agents.values() {
            total.tasks_assigned += metrics.tasks_assigned;
            total.tasks_completed += metrics.tasks_completed;
            total.tasks_failed += metrics.tasks_failed;
            total.messages_received += metrics.messages_received;
            total.responses_sent += metrics.responses_sent;
        }
        total
    }

    /// Serialize the current state as JSON (for dashboards).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "agents": self.snapshot(),
            "aggregate": self.aggregate(),
            "router": self.router(),
        })
    }
}

impl Default for OrchestratorMonitor {
    fn default() -> Self {
        Self::new()
    }
}
