//! # Aegis Orchestrator
//!
//! The agent orchestration core for a DeFi assistant: classifies and
//! analyses intents, selects and dispatches work to specialised agents
//! through a message router, maintains the registries of agents and
//! blockchain adapters that back them, and exposes the adapter family
//! clients (actionKit, analytics, realtime) those agents call out to.
//!
//! Rendering, voice I/O, model downloading, natural-language intent
//! detection, on-chain transaction signing, durable session storage, and
//! authentication all live outside this crate.

/// Agent trait and behavior contracts backing agents implement.
pub mod agents;
/// Blockchain adapter family clients: actionKit, analytics, realtime.
pub mod adapters;
/// Process-wide configuration loaded from the environment.
pub mod config;
/// System-wide constants shared across modules.
pub mod constants;
/// Error types and the crate-wide `Result` alias.
pub mod error;
/// Fire-and-forget event bus for pipeline lifecycle notifications.
pub mod events;
/// Core data models: intents, agents, adapters, tasks, messages, results.
pub mod models;
/// Orchestration core: intent analysis, agent selection, task pipeline.
pub mod orchestrator;
/// Message routing, priority queues, retries, and concurrency gating.
pub mod router;
/// Agent and adapter registries with health tracking.
pub mod registry;
/// Input validation for intents before they enter the pipeline.
pub mod validation;

pub use error::{OrchestratorError, Result};
pub use orchestrator::Orchestrator;
