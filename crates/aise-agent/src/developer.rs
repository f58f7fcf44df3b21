use crate::agent::{Agent, AgentCore, Outbox, PhaseGuard};
use crate::generator::TextGenerator;
use aise_core::message::into_content;
use aise_core::{
    AgentStatus, AgentType, AiseError, AiseResult, Message, MessageKind, Task, TaskKind,
    TaskOutcome,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CAPABILITIES: &[&str] = &[
    "code_generation",
    "code_review",
    "documentation",
    "pull_request_creation",
    "progress_reporting",
];

const DEFAULT_TECHNICAL_LEAD: &str = "technical_lead";
const DEFAULT_PROJECT_MANAGER: &str = "project_manager";

#[derive(Default)]
struct WorkLog {
    current_task: Option<Value>,
    sprint: Option<Value>,
    daily_tasks: Vec<Value>,
    feedback: Vec<Value>,
    completed: Vec<String>,
    blockers: Vec<String>,
    pull_requests: Vec<Value>,
}

/// Implements features, opens pull requests and reports progress.
pub struct DeveloperAgent {
    core: AgentCore,
    generator: Arc<dyn TextGenerator>,
    outbox: Option<Arc<dyn Outbox>>,
    technical_lead: String,
    project_manager: String,
    work: Mutex<WorkLog>,
}

impl DeveloperAgent {
    /// An idle developer without an outbox.
    pub fn new(id: impl Into<String>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            core: AgentCore::new(id, AgentType::Developer),
            generator,
            outbox: None,
            technical_lead: DEFAULT_TECHNICAL_LEAD.to_string(),
            project_manager: DEFAULT_PROJECT_MANAGER.to_string(),
            work: Mutex::new(WorkLog::default()),
        }
    }

    /// Attach the handle used to emit review requests and daily reports.
    pub fn with_outbox(mut self, outbox: Arc<dyn Outbox>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    /// Override the receivers of review requests and daily reports.
    pub fn with_contacts(
        mut self,
        technical_lead: impl Into<String>,
        project_manager: impl Into<String>,
    ) -> Self {
        self.technical_lead = technical_lead.into();
        self.project_manager = project_manager.into();
        self
    }

    /// Task received by the last `task_assignment`.
    pub fn current_task(&self) -> Option<Value> {
        self.work.lock().current_task.clone()
    }

    /// Sprint from the last `sprint_planning`.
    pub fn sprint(&self) -> Option<Value> {
        self.work.lock().sprint.clone()
    }

    /// Planned `{day, task}` entries.
    pub fn daily_tasks(&self) -> Vec<Value> {
        self.work.lock().daily_tasks.clone()
    }

    /// Code review feedback received, oldest first.
    pub fn review_feedback(&self) -> Vec<Value> {
        self.work.lock().feedback.clone()
    }

    /// Ids of tasks finished through `task_assignment`.
    pub fn completed_tasks(&self) -> Vec<String> {
        self.work.lock().completed.clone()
    }

    /// Pull requests opened so far.
    pub fn pull_requests(&self) -> Vec<Value> {
        self.work.lock().pull_requests.clone()
    }

    async fn ask(&self, prompt: String, max_tokens: u32) -> AiseResult<String> {
        self.generator.generate(&prompt, max_tokens).await
    }

    /// Analysis, design, code, self-review and documentation for one task.
    async fn implement(&self, task: &Value) -> AiseResult<Value> {
        let description = task
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unnamed task");

        let analysis = self
            .ask(format!("Analyze the task requirements: {description}"), 300)
            .await?;
        let design = self
            .ask(format!("Design a solution for: {analysis}"), 300)
            .await?;
        let code = self
            .ask(format!("Implement the design: {design}"), 500)
            .await?;
        let review = self.ask(format!("Review code: {code}"), 300).await?;
        let documentation = self
            .ask(format!("Document the implementation: {code}"), 300)
            .await?;

        Ok(json!({
            "task": task,
            "analysis": analysis,
            "design": design,
            "code": code,
            "review": review,
            "documentation": documentation,
        }))
    }

    async fn handle_task_assignment(&self, message: &Message) -> Message {
        let mut phase = self.core.enter_phase(AgentStatus::TaskReceived);
        let task = Value::Object(message.content().clone());
        self.work.lock().current_task = Some(task.clone());

        phase.advance(AgentStatus::Implementing);
        let result = match self.implement(&task).await {
            Ok(result) => result,
            Err(e) => return self.failed_reply(message, phase, e),
        };

        if let Some(id) = task.get("id").and_then(Value::as_str) {
            self.work.lock().completed.push(id.to_string());
        }
        message.reply(
            MessageKind::TaskResult,
            into_content(json!({"status": "completed", "result": result})),
        )
    }

    fn handle_sprint_planning(&self, message: &Message) {
        let _phase = self.core.enter_phase(AgentStatus::SprintPlanned);
        let sprint = Value::Object(message.content().clone());
        let planned: Vec<Value> = message
            .content()
            .get("tasks")
            .and_then(Value::as_array)
            .map(|tasks| {
                tasks
                    .iter()
                    .enumerate()
                    .map(|(day, task)| json!({"day": day + 1, "task": task}))
                    .collect()
            })
            .unwrap_or_default();

        info!(agent_id = %self.core.id(), tasks = planned.len(), "Planned sprint work");
        let mut work = self.work.lock();
        work.sprint = Some(sprint);
        work.daily_tasks = planned;
    }

    fn standup_update(&self, message: &Message) -> Message {
        let _phase = self.core.enter_phase(AgentStatus::Standup);
        let update = {
            let work = self.work.lock();
            json!({
                "yesterday": work.completed,
                "today": work
                    .current_task
                    .as_ref()
                    .map_or_else(Vec::new, |task| vec![task.clone()]),
                "blockers": work.blockers,
            })
        };
        message.reply(MessageKind::StandupUpdate, into_content(update))
    }

    async fn handle_documentation_request(&self, message: &Message) -> Message {
        let phase = self.core.enter_phase(AgentStatus::UpdatingDocs);
        let subject = message
            .content()
            .get("subject")
            .and_then(Value::as_str)
            .unwrap_or("project");
        match self.write_documentation(subject).await {
            Ok(docs) => message.reply(MessageKind::TaskResult, into_content(docs)),
            Err(e) => self.failed_reply(message, phase, e),
        }
    }

    fn failed_reply(&self, message: &Message, phase: PhaseGuard<'_>, error: AiseError) -> Message {
        phase.fail(&error);
        message.error_reply(self.core.id(), error)
    }

    async fn write_documentation(&self, subject: &str) -> AiseResult<Value> {
        let docs = self
            .ask(format!("Write documentation for: {subject}"), 400)
            .await?;
        Ok(json!({"documentation": docs, "subject": subject}))
    }

    async fn emit(&self, receiver: &str, kind: MessageKind, content: Value) -> AiseResult<()> {
        match &self.outbox {
            Some(outbox) => {
                outbox
                    .send(Message::from_json(self.core.id(), receiver, kind, content))
                    .await
            }
            None => {
                warn!(
                    agent_id = %self.core.id(),
                    message_type = %kind,
                    receiver,
                    "No outbox attached, message not sent"
                );
                Ok(())
            }
        }
    }

    async fn create_pull_request(&self, task: &Task) -> AiseResult<Value> {
        self.core.set_status(AgentStatus::CreatingPr);
        let feature = task.data_str("feature").unwrap_or("feature");
        let description = self
            .ask(format!("Write a pull request description for: {feature}"), 200)
            .await?;

        let pull_request = json!({
            "title": format!("Implement {feature}"),
            "description": description,
            "branch": format!("feature/{}", feature.replace(' ', "-").to_lowercase()),
            "project_id": task.project_id,
            "files": task.data.get("files").cloned().unwrap_or_else(|| json!([])),
        });
        self.work.lock().pull_requests.push(pull_request.clone());

        self.emit(
            &self.technical_lead,
            MessageKind::CodeReviewRequest,
            json!({"pull_request": pull_request}),
        )
        .await?;
        Ok(pull_request)
    }

    async fn prepare_daily_report(&self) -> AiseResult<Value> {
        self.core.set_status(AgentStatus::PreparingReport);
        let report = {
            let work = self.work.lock();
            json!({
                "date": Utc::now().date_naive().to_string(),
                "completed_tasks": work.completed,
                "in_progress": work.current_task,
                "blockers": work.blockers,
                "next_steps": work.daily_tasks,
            })
        };
        self.emit(&self.project_manager, MessageKind::DailyReport, report.clone())
            .await?;
        Ok(report)
    }
}

#[async_trait]
impl Agent for DeveloperAgent {
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
            "Developer received message"
        );

        match message.kind() {
            MessageKind::TaskAssignment => Some(self.handle_task_assignment(message).await),
            MessageKind::CodeReviewFeedback => {
                self.work
                    .lock()
                    .feedback
                    .push(Value::Object(message.content().clone()));
                None
            }
            MessageKind::SprintPlanning => {
                self.handle_sprint_planning(message);
                None
            }
            MessageKind::DailyStandup => Some(self.standup_update(message)),
            MessageKind::DocumentationRequest => {
                Some(self.handle_documentation_request(message).await)
            }
            MessageKind::ProgressUpdate => {
                if let Some(blockers) = message.content().get("blockers").and_then(Value::as_array)
                {
                    self.work
                        .lock()
                        .blockers
                        .extend(blockers.iter().filter_map(Value::as_str).map(str::to_string));
                }
                None
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
            TaskKind::ImplementFeature => {
                self.core.set_status(AgentStatus::Implementing);
                self.implement(&task.data).await
            }
            TaskKind::CreatePullRequest => self.create_pull_request(&task).await,
            TaskKind::UpdateDocumentation => {
                self.core.set_status(AgentStatus::UpdatingDocs);
                self.write_documentation(task.data_str("subject").unwrap_or("project"))
                    .await
            }
            TaskKind::PrepareDailyReport => self.prepare_daily_report().await,
            other => Err(AiseError::Agent(format!("developer cannot perform {other}"))),
        };

        match result {
            Ok(value) => {
                self.core.finish();
                TaskOutcome::completed(value)
            }
            Err(e) => self.handle_error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::PlaceholderGenerator;
    use std::time::Duration;

    fn developer() -> DeveloperAgent {
        DeveloperAgent::new("dev1", Arc::new(PlaceholderGenerator::default()))
    }

    struct SlowGenerator(Duration);

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate(&self, prompt: &str, _max_tokens: u32) -> AiseResult<String> {
            tokio::time::sleep(self.0).await;
            Ok(format!("Response to: {prompt}"))
        }
    }

    fn errored_developer() -> DeveloperAgent {
        let dev = developer();
        dev.core().begin_task("proj_1");
        dev.core().fail(&"previous task failed");
        dev
    }

    #[tokio::test]
    async fn test_task_assignment_replies_task_result() {
        let dev = developer();
        let msg = Message::from_json(
            "pm1",
            "dev1",
            MessageKind::TaskAssignment,
            json!({"id": "t1", "description": "login form"}),
        );
        let reply = dev.process_message(&msg).await.unwrap();
        assert_eq!(reply.kind(), MessageKind::TaskResult);
        assert_eq!(reply.receiver(), "pm1");
        assert_eq!(reply.content()["status"], "completed");
        assert_eq!(dev.status(), AgentStatus::Idle);
        assert_eq!(dev.completed_tasks(), vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn test_sprint_planning_has_no_reply() {
        let dev = developer();
        let msg = Message::from_json(
            "pm1",
            "dev1",
            MessageKind::SprintPlanning,
            json!({"id": "s1", "tasks": ["a", "b"]}),
        );
        assert!(dev.process_message(&msg).await.is_none());
        assert_eq!(dev.daily_tasks().len(), 2);
        assert_eq!(dev.daily_tasks()[1]["day"], 2);
        assert_eq!(dev.sprint().unwrap()["id"], "s1");
    }

    #[tokio::test]
    async fn test_standup_reports_blockers() {
        let dev = developer();
        let progress = Message::from_json(
            "pm1",
            "dev1",
            MessageKind::ProgressUpdate,
            json!({"blockers": ["waiting on API keys"]}),
        );
        assert!(dev.process_message(&progress).await.is_none());

        let standup = Message::from_json("pm1", "dev1", MessageKind::DailyStandup, json!({}));
        let reply = dev.process_message(&standup).await.unwrap();
        assert_eq!(reply.kind(), MessageKind::StandupUpdate);
        assert_eq!(reply.content()["blockers"][0], "waiting on API keys");
        assert_eq!(dev.status(), AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_review_feedback_recorded() {
        let dev = developer();
        let msg = Message::from_json(
            "technical_lead",
            "dev1",
            MessageKind::CodeReviewFeedback,
            json!({"approved": false}),
        );
        assert!(dev.process_message(&msg).await.is_none());
        assert_eq!(dev.review_feedback().len(), 1);
    }

    #[tokio::test]
    async fn test_unhandled_kind_returns_none() {
        let dev = developer();
        let msg = Message::from_json("x", "dev1", MessageKind::RequirementChange, json!({}));
        assert!(dev.process_message(&msg).await.is_none());
    }

    #[tokio::test]
    async fn test_implement_feature_task() {
        let dev = developer();
        let outcome = dev
            .start_task(Task::new(
                "proj_1",
                TaskKind::ImplementFeature,
                json!({"description": "search"}),
            ))
            .await;
        let result = outcome.result().unwrap();
        assert!(result["analysis"].as_str().unwrap().contains("search"));
        assert_eq!(dev.status(), AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_pull_request_without_outbox_still_completes() {
        let dev = developer();
        let outcome = dev
            .start_task(Task::new(
                "proj_1",
                TaskKind::CreatePullRequest,
                json!({"feature": "Dark Mode"}),
            ))
            .await;
        assert_eq!(outcome.result().unwrap()["branch"], "feature/dark-mode");
        assert_eq!(dev.pull_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_messages_do_not_rearm_failed_developer() {
        let dev = developer();
        let outcome = dev
            .start_task(Task::new("proj_1", TaskKind::RequirementAnalysis, json!({})))
            .await;
        assert!(!outcome.is_completed());
        assert_eq!(dev.status(), AgentStatus::Error);

        let standup = Message::from_json("pm1", "dev1", MessageKind::DailyStandup, json!({}));
        let reply = dev.process_message(&standup).await.unwrap();
        assert_eq!(reply.kind(), MessageKind::StandupUpdate);
        assert_eq!(dev.status(), AgentStatus::Error);

        let planning = Message::from_json(
            "pm1",
            "dev1",
            MessageKind::SprintPlanning,
            json!({"id": "s1", "tasks": ["a"]}),
        );
        assert!(dev.process_message(&planning).await.is_none());
        assert_eq!(dev.daily_tasks().len(), 1);
        assert_eq!(dev.status(), AgentStatus::Error);
        assert!(!dev.core().try_claim());
    }

    #[tokio::test]
    async fn test_work_messages_on_failed_developer_keep_error() {
        let dev = errored_developer();

        let assignment = Message::from_json(
            "pm1",
            "dev1",
            MessageKind::TaskAssignment,
            json!({"id": "t9", "description": "retry"}),
        );
        let reply = dev.process_message(&assignment).await.unwrap();
        assert_eq!(reply.kind(), MessageKind::TaskResult);
        assert_eq!(dev.status(), AgentStatus::Error);

        let docs = Message::from_json(
            "pm1",
            "dev1",
            MessageKind::DocumentationRequest,
            json!({"subject": "api"}),
        );
        let reply = dev.process_message(&docs).await.unwrap();
        assert_eq!(reply.kind(), MessageKind::TaskResult);
        assert_eq!(dev.status(), AgentStatus::Error);

        assert!(dev.core().rearm());
        assert_eq!(dev.status(), AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_sprint_planning_mid_task_keeps_claim() {
        let dev = Arc::new(DeveloperAgent::new(
            "dev1",
            Arc::new(SlowGenerator(Duration::from_millis(40))),
        ));
        let running = tokio::spawn({
            let dev = dev.clone();
            async move {
                dev.start_task(Task::new(
                    "proj_1",
                    TaskKind::ImplementFeature,
                    json!({"description": "search"}),
                ))
                .await
            }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(dev.status(), AgentStatus::Implementing);

        let planning = Message::from_json(
            "pm1",
            "dev1",
            MessageKind::SprintPlanning,
            json!({"id": "s1", "tasks": ["a", "b"]}),
        );
        assert!(dev.process_message(&planning).await.is_none());
        assert_eq!(dev.status(), AgentStatus::Implementing);
        assert!(!dev.core().try_claim());

        let standup = Message::from_json("pm1", "dev1", MessageKind::DailyStandup, json!({}));
        assert!(dev.process_message(&standup).await.is_some());
        assert_eq!(dev.status(), AgentStatus::Implementing);

        let outcome = running.await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(dev.status(), AgentStatus::Idle);
        assert_eq!(dev.daily_tasks().len(), 2);
    }

    #[tokio::test]
    async fn test_requirement_analysis_is_rejected() {
        let dev = developer();
        let outcome = dev
            .start_task(Task::new("proj_1", TaskKind::RequirementAnalysis, json!({})))
            .await;
        assert!(!outcome.is_completed());
        assert_eq!(dev.status(), AgentStatus::Error);
    }
}
