//! Error types for session lifecycle preconditions.

use thiserror::Error;

/// Pre-flight errors raised by [`DebateArena::run`](super::DebateArena::run).
///
/// These are the only fatal errors a session surfaces: once the round
/// loop starts, every failure degrades to a defined fallback and the
/// session still reaches a terminal state.
#[derive(Debug, Error)]
pub enum SessionStateError {
    /// `run` was called before a goal was set.
    #[error("goal must be set before starting the debate")]
    GoalNotSet,

    /// `run` was called with no registered agents.
    #[error("at least one agent must be registered")]
    NoAgents,

    /// Routed orchestration was requested in the configuration, but no
    /// routing authority was configured.
    #[error("routed orchestration requested but no routing authority is configured")]
    RoutingAuthorityMissing,
}
