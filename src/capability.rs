//! The text-generation capability contract.
//!
//! A [`Capability`] is the external boundary of the arena: every agent
//! contribution, routing decision and synthesis merge is produced by some
//! capability implementation (an HTTP provider client, a local model, a
//! scripted mock in tests). The core never implements generation itself,
//! it only schedules, records and merges what capabilities return.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a capability invocation.
///
/// These are recovered per-contribution by the arena: a failing agent is
/// skipped for the round, a failing routing authority falls back to the
/// first registered agent, a failing synthesis capability degrades to a
/// structural merge. They never abort a running session.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The underlying provider or network call failed.
    #[error("provider call failed: {0}")]
    Provider(String),

    /// The provider did not answer within the implementation's deadline.
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered, but with no usable text.
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// I/O error while talking to the provider.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic error for other cases.
    #[error("capability error: {0}")]
    Other(String),
}

/// Tuning options passed to a capability invocation.
///
/// All fields are optional; implementations apply their own defaults for
/// anything left unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    /// Sampling temperature, if the backend supports it.
    pub temperature: Option<f32>,

    /// Upper bound on the generated output size, in backend-defined units
    /// (typically tokens).
    pub max_output_tokens: Option<usize>,
}

impl GenerateOptions {
    /// Creates options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the output size bound.
    pub fn with_max_output_tokens(mut self, max_output_tokens: usize) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// A text-generation capability.
///
/// Implementations wrap a concrete provider and are shared across the
/// arena via `Arc<dyn Capability>`. Invocations are suspension points:
/// the arena awaits each call to completion before proceeding, so
/// conversation order and working-response evolution stay deterministic.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Generates text for the given prompt.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, CapabilityError>;

    /// Generates text, delivering incremental chunks via `on_chunk`.
    ///
    /// The full text is still returned at the end. The default
    /// implementation performs a plain `generate` and delivers the result
    /// as a single chunk, so non-streaming backends satisfy the contract
    /// unchanged.
    async fn generate_streaming(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, CapabilityError> {
        let full = self.generate(prompt, options).await?;
        on_chunk(&full);
        Ok(full)
    }

    /// Returns the name of this capability.
    ///
    /// By default, this returns the type name. Can be overridden for
    /// custom naming.
    fn name(&self) -> String {
        std::any::type_name::<Self>()
            .split("::")
            .last()
            .unwrap_or("UnknownCapability")
            .to_string()
    }
}
