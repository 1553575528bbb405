//! Agent descriptors and the session registry.
//!
//! An agent is data, not a subtype: a role, a specialty label, a reference
//! to a [`Capability`] and a prompt-building strategy, all injected at
//! registration. The arena only ever depends on the capability contract,
//! never on a particular agent "kind".

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::capability::Capability;

/// Errors raised while configuring a session.
///
/// These are fatal at the call site: an invalid registration never enters
/// the round loop.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// An agent with this role is already registered.
    #[error("an agent with role '{0}' is already registered")]
    DuplicateRole(String),

    /// The descriptor's role is empty.
    #[error("agent role must not be empty")]
    EmptyRole,
}

/// Everything an agent needs to see in order to contribute to a round.
///
/// Borrowed views only: the arena retains exclusive ownership of the
/// working response and the conversation.
#[derive(Debug, Clone, Copy)]
pub struct ContributionRequest<'a> {
    /// The session goal.
    pub goal: &'a str,
    /// Rendered recent conversation, as produced by
    /// [`Conversation::context`](crate::conversation::Conversation::context).
    pub context: &'a str,
    /// The current working response, empty on the first contribution.
    pub working_response: &'a str,
    /// Focus hint from the routing authority, if any.
    pub focus: Option<&'a str>,
    /// The contributing agent's role.
    pub role: &'a str,
    /// The contributing agent's specialty label.
    pub specialty: &'a str,
}

/// Strategy for turning a [`ContributionRequest`] into a prompt.
///
/// Injected per descriptor so that specialties can shape their own prompts
/// without introducing an agent class hierarchy.
pub trait PromptBuilder: Send + Sync {
    /// Builds the prompt an agent's capability will be invoked with.
    fn build(&self, request: &ContributionRequest<'_>) -> String;
}

/// The default prompt builder.
///
/// Renders the goal, the current working response, the recent discussion
/// and the routing focus (when present), then asks the agent for an
/// expert contribution in its specialty.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPromptBuilder;

impl PromptBuilder for DefaultPromptBuilder {
    fn build(&self, request: &ContributionRequest<'_>) -> String {
        let mut prompt = format!(
            "You are a helpful AI assistant specializing in {}.\n\n",
            request.specialty
        );
        prompt.push_str(&format!("HIGH-LEVEL GOAL: {}\n\n", request.goal));

        if !request.working_response.is_empty() {
            prompt.push_str(&format!(
                "CURRENT RESPONSE:\n{}\n\n",
                request.working_response
            ));
        }

        if !request.context.is_empty() {
            prompt.push_str(&format!("RECENT DISCUSSION:\n{}\n\n", request.context));
        }

        if let Some(focus) = request.focus {
            prompt.push_str(&format!("FOCUS ON: {focus}\n\n"));
        }

        prompt.push_str(&format!(
            "As the {}, provide your expert contribution to improve this response. \
             Focus on your specialty: {}.\n\
             Be specific and actionable in your suggestions or improvements.",
            request.role, request.specialty
        ));

        prompt
    }
}

/// A registered agent: role, specialty, capability and prompt strategy.
///
/// The capability reference is an `Arc`, so a missing capability is
/// unrepresentable; cloning a descriptor is cheap.
#[derive(Clone)]
pub struct AgentDescriptor {
    role: String,
    specialty: String,
    temperature: f32,
    capability: Arc<dyn Capability>,
    prompt_builder: Arc<dyn PromptBuilder>,
}

impl AgentDescriptor {
    /// Creates a descriptor with the default temperature (0.7) and the
    /// default prompt builder.
    pub fn new(
        role: impl Into<String>,
        specialty: impl Into<String>,
        capability: Arc<dyn Capability>,
    ) -> Self {
        Self {
            role: role.into(),
            specialty: specialty.into(),
            temperature: 0.7,
            capability,
            prompt_builder: Arc::new(DefaultPromptBuilder),
        }
    }

    /// Sets the sampling temperature used for this agent's contributions.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replaces the prompt-building strategy.
    pub fn with_prompt_builder(mut self, prompt_builder: Arc<dyn PromptBuilder>) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    /// The unique role of this agent within a session.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// The specialty label.
    pub fn specialty(&self) -> &str {
        &self.specialty
    }

    /// The sampling temperature for this agent.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// The capability this agent delegates generation to.
    pub fn capability(&self) -> &Arc<dyn Capability> {
        &self.capability
    }

    /// Builds the contribution prompt via the injected strategy.
    pub fn build_prompt(&self, request: &ContributionRequest<'_>) -> String {
        self.prompt_builder.build(request)
    }
}

impl fmt::Debug for AgentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentDescriptor")
            .field("role", &self.role)
            .field("specialty", &self.specialty)
            .field("temperature", &self.temperature)
            .field("capability", &self.capability.name())
            .finish()
    }
}

/// Holds the agents registered for a session.
///
/// Registration order is preserved and semantically meaningful: the
/// rotation policy visits agents in this order, and the first registered
/// agent is the deterministic routing fallback.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<AgentDescriptor>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent.
    ///
    /// Fails with [`ConfigurationError`] if the role is empty or already
    /// taken.
    pub fn register(&mut self, descriptor: AgentDescriptor) -> Result<(), ConfigurationError> {
        if descriptor.role().is_empty() {
            return Err(ConfigurationError::EmptyRole);
        }
        if self.find(descriptor.role()).is_some() {
            return Err(ConfigurationError::DuplicateRole(
                descriptor.role().to_string(),
            ));
        }
        self.agents.push(descriptor);
        Ok(())
    }

    /// Looks up an agent by role.
    pub fn find(&self, role: &str) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|agent| agent.role() == role)
    }

    /// The first registered agent, used as the routing fallback.
    pub fn first(&self) -> Option<&AgentDescriptor> {
        self.agents.first()
    }

    /// Iterates over agents in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.iter()
    }

    /// Registered roles, in registration order.
    pub fn roles(&self) -> Vec<String> {
        self.agents
            .iter()
            .map(|agent| agent.role().to_string())
            .collect()
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns true if no agents are registered.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Renders a `- role: specialty` line per agent, for routing prompts.
    pub fn describe(&self) -> String {
        self.agents
            .iter()
            .map(|agent| format!("- {}: {}", agent.role(), agent.specialty()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
