//! Configuration for a debate session.

use crate::convergence::DEFAULT_CONVERGENCE_THRESHOLD;

/// Configuration knobs for a [`DebateArena`](super::DebateArena).
///
/// All fields have defaults; customize with struct-update syntax:
///
/// ```
/// use debate_arena::ArenaConfig;
///
/// let config = ArenaConfig {
///     max_rounds: 3,
///     ..Default::default()
/// };
/// assert_eq!(config.max_history, 1000);
/// ```
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// Round budget: the session terminates with `RoundsExhausted` once
    /// this many rounds have run without convergence.
    ///
    /// **Default:** 10
    pub max_rounds: usize,

    /// Live-history cap of the conversation store. Exceeding it triggers
    /// a summarization pass evicting the oldest half.
    ///
    /// **Default:** 1000
    pub max_history: usize,

    /// Jaccard similarity threshold in `(0, 1]` at which successive
    /// working responses count as converged.
    ///
    /// **Default:** 0.85
    pub convergence_threshold: f64,

    /// Requires a routed orchestration policy at run start. Setting a
    /// `Routed` policy enables routing regardless of this flag; the flag
    /// exists so a session configured for routing fails fast when no
    /// authority was wired up.
    ///
    /// **Default:** `false`
    pub use_routed_orchestration: bool,

    /// Promotes per-round progress logs from `debug` to `info` level.
    /// Observability only, no behavioral effect.
    ///
    /// **Default:** `false`
    pub verbose_logging: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            max_history: 1000,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            use_routed_orchestration: false,
            verbose_logging: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ArenaConfig::default();
        assert_eq!(config.max_rounds, 10);
        assert_eq!(config.max_history, 1000);
        assert_eq!(config.convergence_threshold, 0.85);
        assert!(!config.use_routed_orchestration);
        assert!(!config.verbose_logging);
    }

    #[test]
    fn partial_override() {
        let config = ArenaConfig {
            convergence_threshold: 0.95,
            ..Default::default()
        };
        assert_eq!(config.convergence_threshold, 0.95);
        assert_eq!(config.max_rounds, 10);
    }
}
