//! The debate arena: the top-level state machine driving rounds.
//!
//! The arena owns the working response and the conversation store
//! exclusively; every other component receives read-only views or
//! returns new values for the arena to adopt. The round loop is a
//! single logical task with strictly sequential suspension points, so
//! append order and working-response evolution are deterministic and
//! reproducible.

pub mod config;
pub mod error;
pub mod policy;

pub use config::ArenaConfig;
pub use error::SessionStateError;
pub use policy::{OrchestrationPolicy, Priority, RoutingDecision, RoutingParseError};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::agent::{AgentDescriptor, AgentRegistry, ConfigurationError, ContributionRequest};
use crate::capability::{Capability, GenerateOptions};
use crate::conversation::{Conversation, ConversationStats, Message};
use crate::convergence::ConvergenceDetector;
use crate::synthesis::Synthesizer;

/// How many recent messages are rendered into the context excerpt passed
/// to agents and the routing authority.
const CONTEXT_WINDOW: usize = 15;

/// Lifecycle of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, no goal yet.
    Idle,
    /// Goal set, ready to run.
    GoalSet,
    /// Round loop in progress.
    Running,
    /// Terminal; see the outcome's termination reason.
    Complete,
}

/// Why a session reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Successive working responses crossed the similarity threshold.
    Converged,
    /// The round budget was exhausted without convergence.
    RoundsExhausted,
    /// An external cancellation signal was honored between rounds.
    Cancelled,
}

/// The result of a completed session.
#[derive(Debug, Clone)]
pub struct DebateOutcome {
    /// The final working response.
    pub final_response: String,

    /// How many rounds actually executed.
    pub rounds_run: usize,

    /// Conversation statistics at termination.
    pub stats: ConversationStats,

    /// The live conversation log at termination.
    pub full_history: Vec<Message>,

    /// Why the session stopped.
    pub termination_reason: TerminationReason,
}

/// Coordinates registered agents to iteratively build one shared
/// working response toward a goal.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use debate_arena::{AgentDescriptor, ArenaConfig, DebateArena};
///
/// let mut arena = DebateArena::new(ArenaConfig::default());
/// arena.register_agent(AgentDescriptor::new("coder", "writing code", provider.clone()))?;
/// arena.register_agent(AgentDescriptor::new("validator", "correctness review", provider))?;
/// arena.set_goal("Design a rate limiter");
///
/// let outcome = arena.run().await?;
/// println!("{}", outcome.final_response);
/// ```
pub struct DebateArena {
    config: ArenaConfig,
    registry: AgentRegistry,
    conversation: Conversation,
    working_response: String,
    goal: String,
    policy: OrchestrationPolicy,
    synthesizer: Synthesizer,
    detector: ConvergenceDetector,
    state: SessionState,
    cancellation: CancellationToken,
}

impl DebateArena {
    /// Creates an arena with the given configuration, a rotation policy
    /// and no synthesis capability.
    pub fn new(config: ArenaConfig) -> Self {
        let conversation = Conversation::new(config.max_history);
        let detector = ConvergenceDetector::new(config.convergence_threshold);
        Self {
            config,
            registry: AgentRegistry::new(),
            conversation,
            working_response: String::new(),
            goal: String::new(),
            policy: OrchestrationPolicy::Rotation,
            synthesizer: Synthesizer::new(None),
            detector,
            state: SessionState::Idle,
            cancellation: CancellationToken::new(),
        }
    }

    /// Registers an agent for this session.
    ///
    /// Fails with [`ConfigurationError`] on an empty or duplicate role.
    pub fn register_agent(&mut self, descriptor: AgentDescriptor) -> Result<(), ConfigurationError> {
        tracing::info!(
            role = %descriptor.role(),
            specialty = %descriptor.specialty(),
            "registering agent"
        );
        self.registry.register(descriptor)
    }

    /// Selects how contributors are chosen each round.
    pub fn set_orchestration_policy(&mut self, policy: OrchestrationPolicy) {
        self.policy = policy;
    }

    /// Sets or clears the synthesis capability used to merge
    /// contributions into the working response.
    pub fn set_synthesis_capability(&mut self, capability: Option<Arc<dyn Capability>>) {
        self.synthesizer.set_capability(capability);
    }

    /// Sets the high-level goal, resetting the working response and
    /// announcing the goal in the conversation.
    pub fn set_goal(&mut self, goal: impl Into<String>) {
        self.goal = goal.into();
        self.working_response.clear();
        self.conversation
            .append(Message::new("system", format!("Goal set: {}", self.goal), 0));
        self.state = SessionState::GoalSet;
    }

    /// Installs an external cancellation signal, checked between rounds.
    /// A respected cancellation terminates the session cleanly with
    /// [`TerminationReason::Cancelled`].
    pub fn cancellation_token(&mut self, token: CancellationToken) {
        self.cancellation = token;
    }

    /// The current session lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The current working response.
    pub fn final_response(&self) -> &str {
        &self.working_response
    }

    /// Resets goal, working response and conversation for a new debate.
    /// Registered agents and policy are kept.
    pub fn reset(&mut self) {
        self.goal.clear();
        self.working_response.clear();
        self.conversation.clear();
        self.state = SessionState::Idle;
    }

    /// Runs the debate to completion.
    ///
    /// Preconditions (checked before round 1, fatal): a non-empty goal
    /// and at least one registered agent; if the configuration requests
    /// routed orchestration, a routing authority must be configured.
    ///
    /// Once running, every failure is recovered: a failing agent is
    /// skipped for the round, routing falls back to the first registered
    /// agent, synthesis degrades to a structural merge. The session
    /// always terminates with `Converged`, `RoundsExhausted` or
    /// `Cancelled`.
    pub async fn run(&mut self) -> Result<DebateOutcome, SessionStateError> {
        if self.goal.is_empty() {
            return Err(SessionStateError::GoalNotSet);
        }
        if self.registry.is_empty() {
            return Err(SessionStateError::NoAgents);
        }
        if self.config.use_routed_orchestration && !self.policy.is_routed() {
            return Err(SessionStateError::RoutingAuthorityMissing);
        }

        self.state = SessionState::Running;
        tracing::info!(
            goal = %self.goal,
            agents = ?self.registry.roles(),
            policy = ?self.policy,
            max_rounds = self.config.max_rounds,
            "debate session starting"
        );

        let mut previous_response = String::new();
        let mut rounds_run = 0;
        let mut termination_reason = TerminationReason::RoundsExhausted;

        for round in 1..=self.config.max_rounds {
            if self.cancellation.is_cancelled() {
                tracing::info!(round, "cancellation requested, stopping between rounds");
                termination_reason = TerminationReason::Cancelled;
                break;
            }
            rounds_run = round;
            self.log_round_start(round);

            let plan = self
                .policy
                .plan_round(
                    &self.registry,
                    &self.goal,
                    &self.working_response,
                    &self.conversation.context(CONTEXT_WINDOW),
                )
                .await;

            for selection in plan {
                self.agent_contribute(&selection.role, round, selection.focus.as_deref())
                    .await;
            }

            // Convergence is judged against the pre-round response, so it
            // can never fire on round 1.
            if self
                .detector
                .has_converged(&previous_response, &self.working_response)
            {
                tracing::info!(round, "working response converged");
                termination_reason = TerminationReason::Converged;
                break;
            }
            previous_response = self.working_response.clone();
        }

        self.state = SessionState::Complete;
        let outcome = DebateOutcome {
            final_response: self.working_response.clone(),
            rounds_run,
            stats: self.conversation.stats(),
            full_history: self.conversation.all().to_vec(),
            termination_reason,
        };
        tracing::info!(
            rounds = outcome.rounds_run,
            reason = ?outcome.termination_reason,
            messages = outcome.stats.live_count,
            "debate session complete"
        );
        Ok(outcome)
    }

    /// Invokes one agent's capability and folds a successful
    /// contribution into the working response.
    ///
    /// A capability failure skips only this contribution; the round and
    /// the session continue.
    async fn agent_contribute(&mut self, role: &str, round: usize, focus: Option<&str>) {
        let Some(descriptor) = self.registry.find(role).cloned() else {
            // Plans only name registered roles; a miss here means the
            // registry changed mid-round, which the API does not allow.
            tracing::warn!(agent = %role, round, "planned agent not found, skipping");
            return;
        };

        let context = self.conversation.context(CONTEXT_WINDOW);
        let prompt = descriptor.build_prompt(&ContributionRequest {
            goal: &self.goal,
            context: &context,
            working_response: &self.working_response,
            focus,
            role: descriptor.role(),
            specialty: descriptor.specialty(),
        });
        let options = GenerateOptions::new().with_temperature(descriptor.temperature());

        match descriptor.capability().generate(&prompt, &options).await {
            Ok(contribution) => {
                let message = Message::new(role, contribution.clone(), round)
                    .with_metadata("specialty", descriptor.specialty())
                    .with_metadata("focus", focus.unwrap_or("general"));
                self.conversation.append(message);

                self.working_response = self
                    .synthesizer
                    .fold(&self.working_response, &contribution, role)
                    .await;

                self.log_contribution(role, round, &contribution);
            }
            Err(error) => {
                tracing::warn!(
                    agent = %role,
                    round,
                    %error,
                    "agent contribution failed, skipping for this round"
                );
            }
        }
    }

    fn log_round_start(&self, round: usize) {
        if self.config.verbose_logging {
            tracing::info!(round, max_rounds = self.config.max_rounds, "round starting");
        } else {
            tracing::debug!(round, max_rounds = self.config.max_rounds, "round starting");
        }
    }

    fn log_contribution(&self, role: &str, round: usize, contribution: &str) {
        if self.config.verbose_logging {
            tracing::info!(agent = %role, round, chars = contribution.len(), "agent contributed");
        } else {
            tracing::debug!(agent = %role, round, chars = contribution.len(), "agent contributed");
        }
    }
}
