//! concierge-core - Intent routing for the campus concierge
//!
//! This crate provides:
//! - Entity extraction (times, constraints, subjects, course types)
//! - Keyword intent classification with multi-intent detection
//! - A name → handler registry behind the `AgentHandler` trait
//! - Sequential or parallel dispatch with per-handler timeouts
//! - Ordered synthesis of handler outputs into a single reply

pub mod bundle;
pub mod entities;
pub mod error;
pub mod intent;
pub mod orchestrator;
pub mod registry;
pub mod router;
pub mod synthesizer;
pub mod types;

// Re-export main types for convenience
pub use bundle::{BundleEntry, ResponseBundle};
pub use entities::extract;
pub use error::ConciergeError;
pub use intent::{classify, score_query};
pub use orchestrator::{FailurePolicy, Orchestrator, OrchestratorConfig, Turn};
pub use registry::{AgentHandler, AgentRegistry};
pub use router::{DispatchMode, Router, RouterConfig};
pub use synthesizer::{DEFAULT_FALLBACK_MESSAGE, ResponseSynthesizer, section_title};
pub use types::{
    ClassificationResult, Domain, DomainScores, Entity, EntityKind, GENERAL_HANDLER, Intent,
    RoutingTarget,
};
