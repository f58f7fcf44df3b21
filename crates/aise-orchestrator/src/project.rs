use aise_core::{AgentType, AiseError, AiseResult, Project, ProjectStatus, Task};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Projects keyed by id. Projects are never removed.
pub struct ProjectRegistry {
    projects: RwLock<HashMap<String, Project>>,
}

fn project_id(at: DateTime<Utc>) -> String {
    format!("proj_{}", at.format("%Y%m%d%H%M%S"))
}

impl ProjectRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
        }
    }

    /// Create a project in `initializing` state and return its id.
    ///
    /// Ids are `proj_<UTC yyyymmddHHMMSS>`; when an id for the current second
    /// was already issued the timestamp is advanced until it is unique. Fails
    /// with [`AiseError::Capacity`] when `max_active` non-terminal projects
    /// already exist.
    pub fn create(&self, data: Value, max_active: usize) -> AiseResult<String> {
        let mut projects = self.projects.write();

        let active = projects.values().filter(|p| p.is_active()).count();
        if active >= max_active {
            return Err(AiseError::Capacity(format!(
                "{active} projects already active (max {max_active})"
            )));
        }

        let mut at = Utc::now();
        let mut id = project_id(at);
        while projects.contains_key(&id) {
            at += Duration::seconds(1);
            id = project_id(at);
        }

        projects.insert(id.clone(), Project::new(id.clone(), data));
        Ok(id)
    }

    /// Snapshot of a project; unknown ids are a lookup error.
    pub fn get(&self, project_id: &str) -> AiseResult<Project> {
        self.projects
            .read()
            .get(project_id)
            .cloned()
            .ok_or_else(|| AiseError::ProjectNotFound(project_id.to_string()))
    }

    /// Whether `project_id` exists.
    pub fn contains(&self, project_id: &str) -> bool {
        self.projects.read().contains_key(project_id)
    }

    fn with_project<R>(
        &self,
        project_id: &str,
        f: impl FnOnce(&mut Project) -> R,
    ) -> AiseResult<R> {
        let mut projects = self.projects.write();
        let project = projects
            .get_mut(project_id)
            .ok_or_else(|| AiseError::ProjectNotFound(project_id.to_string()))?;
        Ok(f(project))
    }

    /// Set a project's status.
    pub fn update_status(&self, project_id: &str, status: ProjectStatus) -> AiseResult<()> {
        self.with_project(project_id, |p| p.set_status(status))
    }

    /// Record an assignment on the task's project, if that project exists.
    pub fn record_assignment(&self, agent_id: &str, task: &Task) -> bool {
        let recorded = self
            .with_project(&task.project_id, |p| {
                p.record_assignment(agent_id, task.clone());
            })
            .is_ok();
        if !recorded {
            debug!(project_id = %task.project_id, agent_id, "Assignment for untracked project");
        }
        recorded
    }

    /// Park `task` on its project until an agent is free.
    pub fn park(&self, task: Task) -> AiseResult<()> {
        let project_id = task.project_id.clone();
        self.with_project(&project_id, |p| p.park(task))
    }

    /// Remove the oldest parked task of `project_id` that `agent_type` can run.
    pub fn take_pending(&self, project_id: &str, agent_type: AgentType) -> Option<Task> {
        self.with_project(project_id, |p| p.take_pending(agent_type))
            .ok()
            .flatten()
    }

    /// Active projects with parked tasks, and the role each parked task
    /// needs, in parking order.
    pub fn pending(&self) -> Vec<(String, Vec<AgentType>)> {
        let projects = self.projects.read();
        let mut pending: Vec<(String, Vec<AgentType>)> = projects
            .values()
            .filter(|p| p.is_active() && !p.pending_tasks.is_empty())
            .map(|p| {
                let types = p
                    .pending_tasks
                    .iter()
                    .map(|t| t.task_type.agent_type())
                    .collect();
                (p.id.clone(), types)
            })
            .collect();
        pending.sort_by(|a, b| a.0.cmp(&b.0));
        pending
    }

    /// Projects not completed or errored.
    pub fn active_count(&self) -> usize {
        self.projects.read().values().filter(|p| p.is_active()).count()
    }

    /// Number of projects, terminal ones included.
    pub fn len(&self) -> usize {
        self.projects.read().len()
    }

    /// Whether no project exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aise_core::TaskKind;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_within_a_second() {
        let registry = ProjectRegistry::new();
        let ids: HashSet<String> = (0..5)
            .map(|_| registry.create(json!({}), 10).unwrap())
            .collect();
        assert_eq!(ids.len(), 5);
        for id in &ids {
            assert_eq!(id.len(), "proj_".len() + 14);
            assert!(id["proj_".len()..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_create_initializing() {
        let registry = ProjectRegistry::new();
        let id = registry.create(json!({"requirements": "x"}), 3).unwrap();
        let project = registry.get(&id).unwrap();
        assert_eq!(project.status, ProjectStatus::Initializing);
        assert!(project.agents.is_empty());
        assert!(project.tasks.is_empty());
        assert_eq!(project.data["requirements"], "x");
    }

    #[test]
    fn test_capacity_counts_active_projects_only() {
        let registry = ProjectRegistry::new();
        let first = registry.create(json!({}), 1).unwrap();
        let err = registry.create(json!({}), 1).unwrap_err();
        assert!(matches!(err, AiseError::Capacity(_)));

        registry
            .update_status(&first, ProjectStatus::Completed)
            .unwrap();
        assert_eq!(registry.active_count(), 0);
        assert!(registry.create(json!({}), 1).is_ok());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unknown_project() {
        let registry = ProjectRegistry::new();
        assert!(registry.get("proj_missing").unwrap_err().is_lookup());
        assert!(registry
            .update_status("proj_missing", ProjectStatus::Error)
            .unwrap_err()
            .is_lookup());
        let task = Task::new("proj_missing", TaskKind::ImplementFeature, json!({}));
        assert!(!registry.record_assignment("dev1", &task));
    }

    #[test]
    fn test_park_and_take_pending() {
        let registry = ProjectRegistry::new();
        let id = registry.create(json!({}), 3).unwrap();
        registry
            .park(Task::new(&id, TaskKind::RequirementAnalysis, json!({})))
            .unwrap();

        assert_eq!(
            registry.pending(),
            vec![(id.clone(), vec![AgentType::BusinessAnalyst])]
        );
        assert!(registry.take_pending(&id, AgentType::Developer).is_none());
        let task = registry
            .take_pending(&id, AgentType::BusinessAnalyst)
            .unwrap();
        assert_eq!(task.task_type, TaskKind::RequirementAnalysis);
        assert!(registry.pending().is_empty());
    }
}
