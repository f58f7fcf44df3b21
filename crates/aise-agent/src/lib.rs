//! Agent contract and built-in agents for the aise orchestrator.
//!
//! The orchestrator only ever talks to agents through the [`Agent`] trait.
//! Concrete agents embed an [`AgentCore`] which owns their identity and
//! lifecycle state, and reach the text-generation service through the
//! [`TextGenerator`] seam.
//!
//! # Main types
//!
//! - [`Agent`] — The four-operation capability contract.
//! - [`AgentCore`] — Shared identity/status state with atomic claiming.
//! - [`Outbox`] — Handle an agent uses to emit messages into the router.
//! - [`TextGenerator`] / [`GeneratorRegistry`] — Opaque text-generation service.
//! - [`BusinessAnalystAgent`] / [`DeveloperAgent`] — Built-in roles.

/// Agent trait, shared core and outbox seam.
pub mod agent;
/// Requirement analysis and change impact.
pub mod business_analyst;
/// Feature work, pull requests and daily reports.
pub mod developer;
/// Text-generation seam.
pub mod generator;
/// Default delivery team.
pub mod roster;

pub use agent::{Agent, AgentCore, Outbox, PhaseGuard};
pub use business_analyst::{BusinessAnalystAgent, ChangePriority, ChangeRequest};
pub use developer::DeveloperAgent;
pub use generator::{GeneratorRegistry, PlaceholderGenerator, TextGenerator, DEFAULT_MODEL};
pub use roster::default_roster;
