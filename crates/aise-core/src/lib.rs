//! Core types and error definitions for the aise agent orchestrator.
//!
//! This crate provides the foundational types shared across all aise crates:
//! the error taxonomy, the inter-agent message envelope, task descriptors,
//! agent and project state, configuration and tracing initialisation.
//!
//! # Main types
//!
//! - [`AiseError`] — Unified error enum for all aise subsystems.
//! - [`AiseResult`] — Convenience alias for `Result<T, AiseError>`.
//! - [`Message`] — Immutable envelope exchanged between agents.
//! - [`MessageKind`] — Closed set of message types an agent can receive.
//! - [`Task`] / [`TaskKind`] / [`TaskOutcome`] — Work handed to one agent and its result.
//! - [`AgentType`] / [`AgentStatus`] — Agent role and lifecycle state.
//! - [`Project`] / [`ProjectStatus`] — Project state tracked by the orchestrator.
//! - [`AiseConfig`] — Startup configuration passed explicitly to the orchestrator.

/// Agent roles and lifecycle states.
pub mod agent;
/// Startup configuration (TOML).
pub mod config;
/// Error taxonomy.
pub mod error;
/// Inter-agent message envelope.
pub mod message;
/// Project state.
pub mod project;
/// Task descriptors and outcomes.
pub mod task;
/// Tracing subscriber setup.
pub mod telemetry;

pub use agent::{AgentStatus, AgentType};
pub use config::{AiseConfig, LoggingConfig, OrchestratorConfig};
pub use error::{AiseError, AiseResult};
pub use message::{Content, Message, MessageKind};
pub use project::{Project, ProjectStatus};
pub use task::{AgentFailure, Task, TaskKind, TaskOutcome};
