#![allow(clippy::unwrap_used, clippy::expect_used)]

use aise_core::telemetry::init_tracing;
use aise_core::*;
use serde_json::json;

// ---------------------------------------------------------------------------
// 1. Config file loading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aise.toml");
    tokio::fs::write(
        &path,
        "[orchestrator]\nagent_pool_size = 2\nmax_concurrent_projects = 10\n",
    )
    .await
    .unwrap();

    let config = AiseConfig::load(&path).await.unwrap();
    assert_eq!(config.orchestrator.agent_pool_size, 2);
    assert_eq!(config.orchestrator.max_concurrent_projects, 10);
    assert_eq!(config.orchestrator.queue_capacity, 256);
}

#[tokio::test]
async fn load_missing_config_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AiseConfig::load(dir.path().join("nope.toml"))
        .await
        .unwrap_err();
    assert!(matches!(err, AiseError::Config(_)));
}

// ---------------------------------------------------------------------------
// 2. Tracing can only be installed once per process
// ---------------------------------------------------------------------------

#[test]
fn tracing_initialises_once() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        json: true,
    };
    init_tracing(&config).unwrap();
    assert!(init_tracing(&config).is_err());
}

// ---------------------------------------------------------------------------
// 3. Envelope roundtrip keeps identity and payload
// ---------------------------------------------------------------------------

#[test]
fn message_roundtrip_preserves_envelope() {
    let msg = Message::from_json(
        "pm1",
        "dev1",
        MessageKind::SprintPlanning,
        json!({"id": "sprint-7", "tasks": [{"title": "Login"}]}),
    );
    let json = serde_json::to_string(&msg).unwrap();
    let parsed: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, msg);
    assert_eq!(parsed.content()["tasks"][0]["title"], "Login");
}

// ---------------------------------------------------------------------------
// 4. Project snapshot serializes status as a plain string
// ---------------------------------------------------------------------------

#[test]
fn project_snapshot_shape() {
    let mut project = Project::new("proj_20250102030405", json!({"requirements": "build X"}));
    project.record_assignment(
        "ba1",
        Task::new(
            "proj_20250102030405",
            TaskKind::RequirementAnalysis,
            json!({"requirements": "build X"}),
        ),
    );
    project.set_status(ProjectStatus::InProgress);

    let value = serde_json::to_value(&project).unwrap();
    assert_eq!(value["status"], "in_progress");
    assert_eq!(value["agents"], json!(["ba1"]));
    assert_eq!(value["tasks"][0]["task_type"], "requirement_analysis");
}
