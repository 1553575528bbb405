//! Convergence detection between successive working responses.
//!
//! A coarse lexical heuristic, not semantic equivalence: two responses
//! are compared as lowercase whitespace-token sets and the session stops
//! once their Jaccard similarity reaches the configured threshold.

use std::collections::HashSet;

/// Default similarity threshold for convergence.
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 0.85;

/// Token-set (Jaccard) similarity between two texts.
///
/// Both texts are lowercased and split on whitespace into sets; the
/// result is `|intersection| / |union|`. Texts with no tokens at all
/// yield 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<String> = a.to_lowercase().split_whitespace().map(String::from).collect();
    let tokens_b: HashSet<String> = b.to_lowercase().split_whitespace().map(String::from).collect();

    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();

    intersection as f64 / union as f64
}

/// Decides whether successive working responses are similar enough to
/// stop the session.
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceDetector {
    threshold: f64,
}

impl ConvergenceDetector {
    /// Creates a detector with the given threshold, clamped to `(0, 1]`.
    ///
    /// A threshold at or below zero would stop every session after round
    /// two regardless of content, so the lower bound is exclusive. NaN
    /// would survive the clamp and make every comparison false, so it
    /// falls back to the default threshold instead.
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_nan() {
            DEFAULT_CONVERGENCE_THRESHOLD
        } else {
            threshold.clamp(f64::EPSILON, 1.0)
        };
        Self { threshold }
    }

    /// The effective threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns true when `current` is lexically near-identical to
    /// `previous`.
    ///
    /// Never true when either side is empty; in particular there is no
    /// previous response on round 1, so convergence cannot be signaled
    /// there.
    pub fn has_converged(&self, previous: &str, current: &str) -> bool {
        if previous.is_empty() || current.is_empty() {
            return false;
        }
        similarity(previous, current) >= self.threshold
    }
}

impl Default for ConvergenceDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERGENCE_THRESHOLD)
    }
}
