use crate::agent::{Agent, AgentCore};
use crate::generator::TextGenerator;
use aise_core::message::into_content;
use aise_core::{
    AgentStatus, AgentType, AiseError, AiseResult, Content, Message, MessageKind, Task, TaskKind, TaskOutcome,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const CAPABILITIES: &[&str] = &[
    "requirement_analysis",
    "scope_definition",
    "feature_identification",
    "technical_requirement_analysis",
    "timeline_estimation",
    "risk_assessment",
];

/// Days of schedule slip above which a change is at least major.
const MAJOR_CHANGE_DAYS: u32 = 5;

/// How urgently a requirement change must be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangePriority {
    /// Fits without schedule pressure.
    Minor,
    /// Slips the schedule by more than a few days.
    Major,
    /// Flagged `critical` by the requester.
    Critical,
}

/// Implementation complexity reported with a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Contained change.
    Low,
    /// The default when unspecified.
    Medium,
    /// Touches several features.
    High,
}

/// Estimated effect of a requirement change on the running sprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    /// Extra days of work, 3 when not given.
    pub additional_days: u32,
    /// Whether the extra days fit into the sprint's remaining days.
    pub can_meet_deadline: bool,
    /// `additional_days * 8`.
    pub additional_hours: u32,
    /// Requester flagged a need for more people.
    pub additional_resources_needed: bool,
    /// Reported complexity, `medium` when not given.
    pub complexity: Complexity,
    /// Always true for now.
    pub feasible: bool,
    /// Feature names the change touches.
    pub affected_features: Vec<String>,
    /// Risk entries (`risk`, `severity`, `mitigation`).
    pub risks: Vec<Value>,
}

/// A recorded requirement change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// `CR_<8 hex chars>`.
    pub change_id: String,
    /// What the requester asked for.
    pub description: String,
    /// Derived urgency.
    pub priority: ChangePriority,
    /// Estimated sprint impact.
    pub impact_analysis: ImpactAnalysis,
    /// Sprint the change fits into, if it can be absorbed now.
    pub proposed_sprint: Option<String>,
    /// Always `pending_approval` when recorded.
    pub status: String,
    /// Approval flag, false when recorded.
    pub approved: bool,
    /// When the change was recorded.
    pub created_at: DateTime<Utc>,
}

impl ChangeRequest {
    /// Human-readable next step for this change.
    pub fn recommendation(&self) -> String {
        if self.priority == ChangePriority::Critical {
            "Immediate implementation required".to_string()
        } else if self.proposed_sprint.is_some() {
            format!(
                "Can be implemented in current sprint with {} days extension",
                self.impact_analysis.additional_days
            )
        } else {
            "Should be planned for next sprint".to_string()
        }
    }
}

/// Analyzes project requirements and requirement changes.
pub struct BusinessAnalystAgent {
    core: AgentCore,
    generator: Arc<dyn TextGenerator>,
    change_requests: RwLock<Vec<ChangeRequest>>,
    sprint_scope: RwLock<Value>,
}

impl BusinessAnalystAgent {
    /// An idle analyst with no sprint and no change requests.
    pub fn new(id: impl Into<String>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            core: AgentCore::new(id, AgentType::BusinessAnalyst),
            generator,
            change_requests: RwLock::new(Vec::new()),
            sprint_scope: RwLock::new(Value::Null),
        }
    }

    /// Build the requirement analysis document.
    pub async fn analyze_requirements(&self, requirements: &str) -> AiseResult<Value> {
        let scope = self
            .generator
            .generate(
                &format!("Summarize the project scope for: {requirements}"),
                200,
            )
            .await?;

        Ok(json!({
            "project_scope": {
                "description": scope,
                "objectives": ["Objective 1", "Objective 2"],
                "deliverables": ["Deliverable 1", "Deliverable 2"],
            },
            "main_features": [
                {"name": "Feature 1", "description": "Description of feature 1", "priority": "high"},
                {"name": "Feature 2", "description": "Description of feature 2", "priority": "medium"},
            ],
            "technical_requirements": {
                "frontend": ["React", "TypeScript"],
                "backend": ["Rust", "Axum"],
                "database": "PostgreSQL",
                "infrastructure": ["Docker", "Kubernetes"],
            },
            "timeline_estimate": {
                "total_weeks": 12,
                "phases": [
                    {"name": "Planning", "weeks": 2},
                    {"name": "Development", "weeks": 8},
                    {"name": "Testing", "weeks": 2},
                ],
            },
            "risk_assessment": [{
                "risk": "Technical complexity",
                "impact": "high",
                "probability": "medium",
                "mitigation": "Early technical spikes",
            }],
        }))
    }

    /// Estimate the impact of a requirement change and record it.
    ///
    /// `content` may carry `change_description`, `current_sprint`
    /// (`{id, remaining_days}`) and estimate hints (`estimated_days`,
    /// `complexity`, `needs_resources`, `priority`).
    pub fn analyze_requirement_change(&self, content: &Content) -> Value {
        let description = content
            .get("change_description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let current_sprint = content.get("current_sprint").cloned().unwrap_or(Value::Null);

        let impact = estimate_impact(content, &current_sprint);
        let can_accommodate =
            impact.can_meet_deadline && !impact.additional_resources_needed && impact.feasible;

        let priority = if content.get("priority").and_then(Value::as_str) == Some("critical") {
            ChangePriority::Critical
        } else if impact.complexity == Complexity::High
            || impact.additional_days > MAJOR_CHANGE_DAYS
        {
            ChangePriority::Major
        } else {
            ChangePriority::Minor
        };

        let proposed_sprint = if can_accommodate {
            current_sprint
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
        } else {
            None
        };

        let request = ChangeRequest {
            change_id: format!("cr_{}", Uuid::new_v4().simple()),
            description,
            priority,
            impact_analysis: impact,
            proposed_sprint,
            status: "pending".to_string(),
            approved: false,
            created_at: Utc::now(),
        };

        let result = json!({
            "change_id": request.change_id,
            "can_accommodate": can_accommodate,
            "impact_analysis": request.impact_analysis,
            "recommendation": request.recommendation(),
            "priority": request.priority,
        });

        info!(
            agent_id = %self.core.id(),
            change_id = %request.change_id,
            priority = ?request.priority,
            can_accommodate,
            "Recorded change request"
        );
        self.change_requests.write().push(request);
        result
    }

    /// Change requests recorded so far, oldest first.
    pub fn change_requests(&self) -> Vec<ChangeRequest> {
        self.change_requests.read().clone()
    }

    /// Replace the sprint that change requests are measured against.
    pub fn update_sprint_scope(&self, sprint: Value) {
        let sprint_id = sprint
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        info!(agent_id = %self.core.id(), sprint = %sprint_id, "Updated sprint scope");
        *self.sprint_scope.write() = sprint;
    }

    /// Current sprint, `null` until one is set.
    pub fn sprint_scope(&self) -> Value {
        self.sprint_scope.read().clone()
    }
}

fn estimate_impact(content: &Content, current_sprint: &Value) -> ImpactAnalysis {
    let additional_days = content
        .get("estimated_days")
        .and_then(Value::as_u64)
        .and_then(|d| u32::try_from(d).ok())
        .unwrap_or(3);
    let complexity = content
        .get("complexity")
        .cloned()
        .and_then(|c| serde_json::from_value(c).ok())
        .unwrap_or(Complexity::Medium);
    let additional_resources_needed = content
        .get("needs_resources")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let can_meet_deadline = current_sprint
        .get("remaining_days")
        .and_then(Value::as_u64)
        .map_or(true, |remaining| u64::from(additional_days) <= remaining);

    ImpactAnalysis {
        additional_days,
        can_meet_deadline,
        additional_hours: additional_days * 8,
        additional_resources_needed,
        complexity,
        feasible: true,
        affected_features: content
            .get("affected_features")
            .and_then(Value::as_array)
            .map(|features| {
                features
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        risks: vec![json!({
            "risk": "Integration complexity",
            "severity": "medium",
            "mitigation": "Additional testing required",
        })],
    }
}

#[async_trait]
impl Agent for BusinessAnalystAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn capabilities(&self) -> &'static [&'static str] {
        CAPABILITIES
    }

    async fn process_message(&self, message: &Message) -> Option<Message> {
        info!(
            agent_id = %self.core.id(),
            message_type = %message.kind(),
            from = %message.sender(),
            "Business analyst received message"
        );

        match message.kind() {
            MessageKind::RequirementAnalysis => {
                let phase = self.core.enter_phase(AgentStatus::Busy);
                let requirements = message
                    .content()
                    .get("requirements")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                match self.analyze_requirements(requirements).await {
                    Ok(analysis) => Some(message.reply(
                        MessageKind::RequirementAnalysisResult,
                        into_content(analysis),
                    )),
                    Err(e) => {
                        phase.fail(&e);
                        Some(message.error_reply(self.core.id(), e))
                    }
                }
            }
            MessageKind::RequirementChange => {
                let analysis = self.analyze_requirement_change(message.content());
                Some(message.reply(MessageKind::ChangeAnalysisResult, into_content(analysis)))
            }
            other => {
                debug!(agent_id = %self.core.id(), message_type = %other, "Ignoring message");
                None
            }
        }
    }

    async fn start_task(&self, task: Task) -> TaskOutcome {
        self.core.begin_task(&task.project_id);

        let result = match task.task_type {
            TaskKind::RequirementAnalysis => {
                self.analyze_requirements(task.data_str("requirements").unwrap_or_default())
                    .await
            }
            other => Err(AiseError::Agent(format!(
                "business analyst cannot perform {other}"
            ))),
        };

        match result {
            Ok(analysis) => {
                self.core.finish();
                TaskOutcome::completed(analysis)
            }
            Err(e) => self.handle_error(&e),
        }
    }
}
