//! `debate-arena` - Multi-agent debate orchestration.
//!
//! This library coordinates several independent text-generation
//! capabilities ("agents") to iteratively build one shared artifact (the
//! working response) toward a stated goal, across bounded rounds, until
//! the response stabilizes or the round budget is exhausted.
//!
//! The crate provides the orchestration engine only: round scheduling
//! (fixed rotation or a routing authority), a bounded-memory conversation
//! store with summarization, convergence detection, and a response
//! synthesizer with a degrading fallback chain. How text is actually
//! generated is left to [`Capability`] implementations supplied by the
//! caller.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use debate_arena::{AgentDescriptor, ArenaConfig, DebateArena, OrchestrationPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider: Arc<dyn debate_arena::Capability> = my_provider();
//!
//!     let mut arena = DebateArena::new(ArenaConfig {
//!         max_rounds: 5,
//!         ..Default::default()
//!     });
//!     arena.register_agent(AgentDescriptor::new("coder", "writing code", provider.clone()))?;
//!     arena.register_agent(AgentDescriptor::new("validator", "correctness review", provider.clone()))?;
//!     arena.set_orchestration_policy(OrchestrationPolicy::Routed(provider.clone()));
//!     arena.set_synthesis_capability(Some(provider));
//!     arena.set_goal("Design a rate limiter for a public API");
//!
//!     let outcome = arena.run().await?;
//!     println!("{} ({:?} after {} rounds)",
//!         outcome.final_response, outcome.termination_reason, outcome.rounds_run);
//!     Ok(())
//! }
//! ```
//!
//! # Failure model
//!
//! Only pre-flight errors are fatal: invalid registration
//! ([`ConfigurationError`]) and unmet run preconditions
//! ([`SessionStateError`]). Everything that fails inside the round loop
//! degrades to a defined fallback and is logged via `tracing`: a failing
//! agent is skipped for the round, a malformed routing decision falls
//! back to the first registered agent, and a failing synthesis merge
//! degrades to an attributed concatenation. A running session always
//! terminates with `Converged`, `RoundsExhausted` or `Cancelled`.

pub mod agent;
pub mod arena;
pub mod capability;
pub mod conversation;
pub mod convergence;
pub mod extract;
pub mod synthesis;

pub use agent::{
    AgentDescriptor, AgentRegistry, ConfigurationError, ContributionRequest, DefaultPromptBuilder,
    PromptBuilder,
};
pub use arena::{
    ArenaConfig, DebateArena, DebateOutcome, OrchestrationPolicy, Priority, RoutingDecision,
    RoutingParseError, SessionState, SessionStateError, TerminationReason,
};
pub use capability::{Capability, CapabilityError, GenerateOptions};
pub use conversation::{Conversation, ConversationStats, Message, Summary};
pub use convergence::{ConvergenceDetector, DEFAULT_CONVERGENCE_THRESHOLD, similarity};
pub use synthesis::{Synthesizer, SynthesisError};
