//! Agent registry, project tracking and message routing for aise.
//!
//! The [`Orchestrator`] owns every agent (behind `Arc<dyn Agent>`) and every
//! project, hands tasks to idle agents and moves messages between agents
//! through a single bounded FIFO queue.
//!
//! # Main types
//!
//! - [`Orchestrator`] — Entry point: agents, projects, tasks and messaging.
//! - [`MessageQueue`] — Global FIFO with a capacity bound, `join` and `close`.
//! - [`MessageRouter`] — Delivers queued messages and re-enqueues responses.
//! - [`RouterHandle`] — Stop or drain a router running in the background.
//! - [`OrchestratorMonitor`] — Task and message counters.

/// Insertion-ordered agent registry.
pub mod registry;
/// Task and message metrics.
pub mod monitor;
/// Top-level orchestrator.
pub mod orchestrator;
/// Project registry and id generation.
pub mod project;
/// Message queue and router loop.
pub mod router;

pub use monitor::{AgentActivity, AgentMetrics, OrchestratorMonitor, RouterMetrics};
pub use orchestrator::Orchestrator;
pub use project::ProjectRegistry;
pub use registry::AgentRegistry;
pub use router::{Dispatch, MessageQueue, MessageRouter, RouterHandle};
