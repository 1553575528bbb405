//! Round scheduling: fixed rotation or delegation to a routing authority.
//!
//! The routing authority is an untrusted text boundary. Its answer is
//! free text expected to embed a JSON decision; parsing is defensive and
//! every failure mode (capability error, malformed payload, unregistered
//! role) falls back deterministically to the first registered agent. A
//! routing problem never aborts a round.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::AgentRegistry;
use crate::capability::{Capability, CapabilityError, GenerateOptions};
use crate::extract::{extract_first_json_object, extract_tagged};

/// Sampling temperature for routing decisions; balanced, the authority
/// is making a judgment call rather than writing prose.
const ROUTING_TEMPERATURE: f32 = 0.4;

/// Errors while obtaining or validating a routing decision.
///
/// Recovered internally via the deterministic fallback; exposed for
/// logging and tests.
#[derive(Debug, Error)]
pub enum RoutingParseError {
    /// The routing authority's generation call failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// No JSON payload could be located in the authority's answer.
    #[error("no decision payload found in routing response")]
    NoPayload,

    /// A payload was found but did not deserialize into a decision.
    #[error("invalid decision payload: {0}")]
    InvalidPayload(String),

    /// The decision names a role that is not registered.
    #[error("routing decision names unregistered agent '{0}'")]
    UnknownRole(String),
}

/// Priority attached to a routing decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// A validated decision from the routing authority.
///
/// Only `agent` is required in the payload; the remaining fields default
/// so that a terse but well-formed answer still routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Role of the agent that should contribute next.
    pub agent: String,

    /// Why that agent's expertise is needed now.
    #[serde(default)]
    pub reason: String,

    /// The specific aspect the agent should address.
    #[serde(default)]
    pub focus: String,

    /// How urgent the authority considers this contribution.
    #[serde(default)]
    pub priority: Priority,
}

/// Parses a routing decision out of a free-text authority response.
///
/// Tries a `<decision>` tagged block first, then the first balanced JSON
/// object anywhere in the text.
pub fn parse_routing_decision(text: &str) -> Result<RoutingDecision, RoutingParseError> {
    let payload = extract_tagged(text, "decision")
        .and_then(|inner| extract_first_json_object(&inner).or(Some(inner)))
        .or_else(|| extract_first_json_object(text))
        .ok_or(RoutingParseError::NoPayload)?;

    serde_json::from_str(&payload).map_err(|e| RoutingParseError::InvalidPayload(e.to_string()))
}

/// One agent selected to contribute in a round, with an optional focus
/// hint from the routing authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub role: String,
    pub focus: Option<String>,
}

impl Selection {
    fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            focus: None,
        }
    }
}

/// How contributors are chosen each round.
#[derive(Clone)]
pub enum OrchestrationPolicy {
    /// Every registered agent contributes, in registration order.
    Rotation,

    /// A routing authority capability picks a single contributor per
    /// round.
    Routed(Arc<dyn Capability>),
}

impl fmt::Debug for OrchestrationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rotation => write!(f, "Rotation"),
            Self::Routed(authority) => write!(f, "Routed({})", authority.name()),
        }
    }
}

impl OrchestrationPolicy {
    /// Returns true for the routed variant.
    pub fn is_routed(&self) -> bool {
        matches!(self, Self::Routed(_))
    }

    /// Plans the contributors for one round.
    ///
    /// `context` is a bounded recent-history excerpt rendered by the
    /// conversation store. The registry is guaranteed non-empty by the
    /// arena's run preconditions, so the plan is never empty.
    pub(crate) async fn plan_round(
        &self,
        registry: &AgentRegistry,
        goal: &str,
        working_response: &str,
        context: &str,
    ) -> Vec<Selection> {
        match self {
            Self::Rotation => registry.roles().into_iter().map(Selection::new).collect(),
            Self::Routed(authority) => {
                match route(authority, registry, goal, working_response, context).await {
                    Ok(decision) => {
                        tracing::debug!(
                            agent = %decision.agent,
                            reason = %decision.reason,
                            focus = %decision.focus,
                            priority = ?decision.priority,
                            "routing authority selected contributor"
                        );
                        let focus = if decision.focus.is_empty() {
                            None
                        } else {
                            Some(decision.focus)
                        };
                        vec![Selection {
                            role: decision.agent,
                            focus,
                        }]
                    }
                    Err(error) => {
                        // Deterministic fallback; the round must not abort.
                        let fallback = registry
                            .first()
                            .map(|agent| agent.role().to_string())
                            .unwrap_or_default();
                        tracing::warn!(
                            %error,
                            fallback = %fallback,
                            "routing failed, falling back to first registered agent"
                        );
                        vec![Selection::new(fallback)]
                    }
                }
            }
        }
    }
}

/// Asks the routing authority for a decision and validates it against
/// the registry.
async fn route(
    authority: &Arc<dyn Capability>,
    registry: &AgentRegistry,
    goal: &str,
    working_response: &str,
    context: &str,
) -> Result<RoutingDecision, RoutingParseError> {
    let prompt = routing_prompt(registry, goal, working_response, context);
    let options = GenerateOptions::new().with_temperature(ROUTING_TEMPERATURE);

    let response = authority.generate(&prompt, &options).await?;
    let decision = parse_routing_decision(&response)?;

    if registry.find(&decision.agent).is_none() {
        return Err(RoutingParseError::UnknownRole(decision.agent));
    }

    Ok(decision)
}

fn routing_prompt(
    registry: &AgentRegistry,
    goal: &str,
    working_response: &str,
    context: &str,
) -> String {
    let current_response = if working_response.is_empty() {
        "No response yet - this is the beginning"
    } else {
        working_response
    };
    let recent_discussion = if context.is_empty() {
        "No discussion yet"
    } else {
        context
    };

    format!(
        "You are an expert orchestrator and project manager for a team of specialized AI agents.\n\
         \n\
         AVAILABLE AGENTS:\n\
         {agents}\n\
         \n\
         HIGH-LEVEL GOAL:\n\
         {goal}\n\
         \n\
         CURRENT RESPONSE:\n\
         {current_response}\n\
         \n\
         RECENT DISCUSSION:\n\
         {recent_discussion}\n\
         \n\
         YOUR TASK:\n\
         1. Analyze what the response needs next\n\
         2. Choose the BEST agent for this stage\n\
         3. Explain WHY their expertise is needed now\n\
         4. Provide SPECIFIC guidance on what to focus on\n\
         \n\
         Respond in this JSON format:\n\
         {{\n\
          \"agent\": \"agent_role_here\",\n\
          \"reason\": \"Why this agent is needed now\",\n\
          \"focus\": \"Specific aspect they should address\",\n\
          \"priority\": \"high/medium/low\"\n\
         }}",
        agents = registry.describe(),
    )
}
