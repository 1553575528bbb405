//! Folding agent contributions into the working response.
//!
//! The synthesizer owns the merge policy and its degradation chain. It
//! never mutates shared state: the arena passes read-only views in and
//! adopts the returned value as the next working response.

use std::sync::Arc;

use thiserror::Error;

use crate::capability::{Capability, CapabilityError, GenerateOptions};

/// Sampling temperature for merge requests; merging should be precise,
/// not creative.
const SYNTHESIS_TEMPERATURE: f32 = 0.3;

/// Output bound for merge requests.
const SYNTHESIS_MAX_OUTPUT_TOKENS: usize = 3000;

/// Errors from a synthesis merge attempt.
///
/// Always recovered: the caller degrades to the structural fallback, so
/// content is never silently dropped.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The synthesis capability failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// The synthesis capability returned only whitespace.
    #[error("synthesis capability returned an empty merge result")]
    EmptyResult,
}

/// Merges new contributions into the working response.
pub struct Synthesizer {
    capability: Option<Arc<dyn Capability>>,
}

impl Synthesizer {
    /// Creates a synthesizer; with `None`, the adopt-latest policy
    /// applies (see [`fold`](Self::fold)).
    pub fn new(capability: Option<Arc<dyn Capability>>) -> Self {
        Self { capability }
    }

    /// Replaces the synthesis capability.
    pub fn set_capability(&mut self, capability: Option<Arc<dyn Capability>>) {
        self.capability = capability;
    }

    /// Returns true if a synthesis capability is configured.
    pub fn has_capability(&self) -> bool {
        self.capability.is_some()
    }

    /// Produces the next working response from the current one and a new
    /// contribution.
    ///
    /// Policy, evaluated in order:
    /// 1. empty working response: adopt the contribution verbatim;
    /// 2. capability configured: issue a merge request and adopt its
    ///    result;
    /// 3. capability failed or returned nothing: structural fallback,
    ///    appending a clearly attributed block so content survives;
    /// 4. no capability configured: adopt the latest contribution
    ///    outright. Earlier contributions then remain visible only in
    ///    conversation history; deliberate but lossy.
    pub async fn fold(&self, working_response: &str, contribution: &str, role: &str) -> String {
        if working_response.is_empty() {
            return contribution.to_string();
        }

        match &self.capability {
            Some(capability) => {
                match self.merge(capability, working_response, contribution, role).await {
                    Ok(merged) => merged,
                    Err(error) => {
                        tracing::warn!(
                            agent = %role,
                            %error,
                            "synthesis failed, degrading to structural merge"
                        );
                        structural_merge(working_response, contribution, role)
                    }
                }
            }
            None => contribution.to_string(),
        }
    }

    async fn merge(
        &self,
        capability: &Arc<dyn Capability>,
        working_response: &str,
        contribution: &str,
        role: &str,
    ) -> Result<String, SynthesisError> {
        let prompt = merge_prompt(working_response, contribution, role);
        let options = GenerateOptions::new()
            .with_temperature(SYNTHESIS_TEMPERATURE)
            .with_max_output_tokens(SYNTHESIS_MAX_OUTPUT_TOKENS);

        let merged = capability.generate(&prompt, &options).await?;
        if merged.trim().is_empty() {
            return Err(SynthesisError::EmptyResult);
        }
        Ok(merged)
    }
}

/// Deterministic fallback merge: concatenation with an attribution
/// marker. Content from both sides is always preserved.
fn structural_merge(working_response: &str, contribution: &str, role: &str) -> String {
    format!("{working_response}\n\n--- {role} adds ---\n{contribution}")
}

fn merge_prompt(working_response: &str, contribution: &str, role: &str) -> String {
    format!(
        "You are a synthesis expert. Your job is to merge contributions into a coherent response.\n\
         \n\
         CURRENT RESPONSE:\n\
         {working_response}\n\
         \n\
         NEW CONTRIBUTION from {role}:\n\
         {contribution}\n\
         \n\
         YOUR TASK:\n\
         Intelligently merge the new contribution into the current response.\n\
         - Keep the best parts of both\n\
         - Resolve any conflicts\n\
         - Maintain coherence and flow\n\
         - Build upon previous work\n\
         - Don't repeat information\n\
         \n\
         Output ONLY the merged response, nothing else."
    )
}
