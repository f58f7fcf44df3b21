use aise_agent::Agent;
use aise_core::{AgentType, AiseError, AiseResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
struct Entries {
    agents: HashMap<String, Arc<dyn Agent>>,
    /// Registration order, used for first-match selection.
    order: Vec<String>,
}

/// Insertion-ordered registry of agents keyed by id.
///
/// Guards are never held across an agent call: lookups hand out cloned
/// `Arc` handles.
pub struct AgentRegistry {
    entries: RwLock<Entries>,
    pool_size: usize,
}

impl AgentRegistry {
    /// An empty registry holding at most `pool_size` agents.
    pub fn new(pool_size: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            pool_size,
        }
    }

    /// Insert or replace an agent.
    ///
    /// Replacing keeps the original position. A new id beyond the pool size
    /// fails with [`AiseError::Capacity`]. Returns true if an agent was
    /// replaced.
    pub fn register(&self, agent: Arc<dyn Agent>) -> AiseResult<bool> {
        let id = agent.id().to_string();
        let mut entries = self.entries.write();

        if let Some(slot) = entries.agents.get_mut(&id) {
            *slot = agent;
            info!(agent_id = %id, "Replaced registered agent");
            return Ok(true);
        }

        self.insert(&mut entries, id, agent)?;
        Ok(false)
    }

    /// Insert an agent only if its id is free. Returns false, leaving the
    /// registered agent in place, when the id is taken.
    pub fn register_new(&self, agent: Arc<dyn Agent>) -> AiseResult<bool> {
        let id = agent.id().to_string();
        let mut entries = self.entries.write();
        if entries.agents.contains_key(&id) {
            debug!(agent_id = %id, "Agent id already registered, skipping");
            return Ok(false);
        }
        self.insert(&mut entries, id, agent)?;
        Ok(true)
    }

    fn insert(&self, entries: &mut Entries, id: String, agent: Arc<dyn Agent>) -> AiseResult<()> {
        if entries.order.len() >= self.pool_size {
            return Err(AiseError::Capacity(format!(
                "agent pool is full ({} agents), cannot register {id}",
                self.pool_size
            )));
        }

        info!(agent_id = %id, agent_type = %agent.agent_type(), "Registered agent");
        entries.order.push(id.clone());
        entries.agents.insert(id, agent);
        Ok(())
    }

    /// Remove an agent, returning it if it was registered.
    pub fn unregister(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        let mut entries = self.entries.write();
        let agent = entries.agents.remove(agent_id)?;
        entries.order.retain(|id| id != agent_id);
        info!(agent_id, "Unregistered agent");
        Some(agent)
    }

    /// Handle to a registered agent.
    pub fn get(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.entries.read().agents.get(agent_id).cloned()
    }

    /// Whether `agent_id` is registered.
    pub fn contains(&self, agent_id: &str) -> bool {
        self.entries.read().agents.contains_key(agent_id)
    }

    /// All agents in registration order.
    pub fn snapshot(&self) -> Vec<Arc<dyn Agent>> {
        let entries = self.entries.read();
        entries
            .order
            .iter()
            .filter_map(|id| entries.agents.get(id).cloned())
            .collect()
    }

    /// First idle agent of `agent_type` in registration order.
    pub fn find_idle(&self, agent_type: AgentType) -> Option<Arc<dyn Agent>> {
        self.snapshot()
            .into_iter()
            .find(|a| a.agent_type() == agent_type && a.status().is_available())
    }

    /// Like [`find_idle`](Self::find_idle), but atomically moves the match
    /// to busy so no concurrent caller can select it too.
    pub fn claim_idle(&self, agent_type: AgentType) -> Option<Arc<dyn Agent>> {
        self.snapshot()
            .into_iter()
            .find(|a| a.agent_type() == agent_type && a.core().try_claim())
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.entries.read().order.len()
    }

    /// Whether no agent is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of distinct agent ids.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }
}
