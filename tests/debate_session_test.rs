//! End-to-end debate session scenarios with scripted capabilities.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use debate_arena::{
    AgentDescriptor, ArenaConfig, Capability, CapabilityError, DebateArena, GenerateOptions,
    OrchestrationPolicy, TerminationReason,
};

/// Returns a fixed response on every call.
struct FixedCapability(String);

#[async_trait]
impl Capability for FixedCapability {
    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, CapabilityError> {
        Ok(self.0.clone())
    }
}

/// Pops one scripted response per call; errors when the script runs out
/// so miscounted invocations fail the test loudly.
struct ScriptedCapability {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedCapability {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
        }
    }
}

#[async_trait]
impl Capability for ScriptedCapability {
    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, CapabilityError> {
        self.responses
            .lock()
            .expect("script lock")
            .pop_front()
            .ok_or_else(|| CapabilityError::Other("script exhausted".to_string()))
    }
}

/// Always fails, standing in for an unreachable provider.
struct FailingCapability;

#[async_trait]
impl Capability for FailingCapability {
    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, CapabilityError> {
        Err(CapabilityError::Provider("connection refused".to_string()))
    }
}

/// A synthesis stand-in that answers `MERGED(old,new)` by reading both
/// texts back out of the merge prompt.
struct MergeEchoCapability;

fn section<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    let from = text.find(start).expect("section start") + start.len();
    let rest = &text[from..];
    let to = rest.find(end).expect("section end");
    &rest[..to]
}

#[async_trait]
impl Capability for MergeEchoCapability {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, CapabilityError> {
        let current = section(prompt, "CURRENT RESPONSE:\n", "\n\nNEW CONTRIBUTION");
        let after_header = section(prompt, "NEW CONTRIBUTION from ", "\n\nYOUR TASK");
        let contribution = &after_header[after_header.find(":\n").expect("header colon") + 2..];
        Ok(format!("MERGED({current},{contribution})"))
    }
}

/// Contributes normally but cancels the given token as a side effect,
/// simulating an external shutdown signal arriving mid-session.
struct CancellingCapability {
    token: CancellationToken,
    response: String,
}

#[async_trait]
impl Capability for CancellingCapability {
    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<String, CapabilityError> {
        self.token.cancel();
        Ok(self.response.clone())
    }
}

/// Makes session logs visible when running with `RUST_LOG`, e.g.
/// `RUST_LOG=debate_arena=debug cargo test`.
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn arena(max_rounds: usize) -> DebateArena {
    init_tracing();
    DebateArena::new(ArenaConfig {
        max_rounds,
        ..Default::default()
    })
}

#[tokio::test]
async fn rotation_without_synthesis_adopts_latest_contribution() {
    let mut arena = arena(3);
    arena
        .register_agent(AgentDescriptor::new(
            "a",
            "first specialty",
            Arc::new(ScriptedCapability::new(&["ares", "atlas", "aurora"])),
        ))
        .unwrap();
    arena
        .register_agent(AgentDescriptor::new(
            "b",
            "second specialty",
            Arc::new(ScriptedCapability::new(&["boreas", "baltic", "badger"])),
        ))
        .unwrap();
    arena.set_goal("reach no agreement");

    let outcome = arena.run().await.unwrap();

    assert_eq!(outcome.rounds_run, 3);
    assert_eq!(
        outcome.termination_reason,
        TerminationReason::RoundsExhausted
    );
    // Adopt-latest policy: the final response is b's round-3 contribution.
    assert_eq!(outcome.final_response, "badger");
}

#[tokio::test]
async fn rotation_selects_every_agent_in_registration_order_each_round() {
    let mut arena = arena(2);
    for role in ["validator", "coder", "mathematician"] {
        arena
            .register_agent(AgentDescriptor::new(
                role,
                format!("{role} specialty"),
                Arc::new(FixedCapability(format!("{role} contribution"))),
            ))
            .unwrap();
    }
    arena.set_goal("exercise the rotation");

    let outcome = arena.run().await.unwrap();

    for round in 1..=2 {
        let roles: Vec<&str> = outcome
            .full_history
            .iter()
            .filter(|m| m.round == round)
            .map(|m| m.role.as_str())
            .collect();
        assert_eq!(roles, vec!["validator", "coder", "mathematician"]);
    }
}

#[tokio::test]
async fn synthesis_folds_contributions_in_strict_sequential_order() {
    let mut arena = arena(2);
    arena
        .register_agent(AgentDescriptor::new(
            "a",
            "first specialty",
            Arc::new(ScriptedCapability::new(&["A1", "A2"])),
        ))
        .unwrap();
    arena
        .register_agent(AgentDescriptor::new(
            "b",
            "second specialty",
            Arc::new(ScriptedCapability::new(&["B1", "B2"])),
        ))
        .unwrap();
    arena.set_synthesis_capability(Some(Arc::new(MergeEchoCapability)));
    arena.set_goal("merge everything");

    let outcome = arena.run().await.unwrap();

    // A1 is adopted verbatim (first write), then every later contribution
    // is folded in append order.
    assert_eq!(
        outcome.final_response,
        "MERGED(MERGED(MERGED(A1,B1),A2),B2)"
    );
    assert_eq!(
        outcome.termination_reason,
        TerminationReason::RoundsExhausted
    );
}

#[tokio::test]
async fn always_failing_synthesis_preserves_all_content_structurally() {
    let mut arena = arena(2);
    arena
        .register_agent(AgentDescriptor::new(
            "a",
            "first specialty",
            Arc::new(ScriptedCapability::new(&["apple", "apricot"])),
        ))
        .unwrap();
    arena
        .register_agent(AgentDescriptor::new(
            "b",
            "second specialty",
            Arc::new(ScriptedCapability::new(&["banana", "blueberry"])),
        ))
        .unwrap();
    arena.set_synthesis_capability(Some(Arc::new(FailingCapability)));
    arena.set_goal("collect all fruit");

    let outcome = arena.run().await.unwrap();

    assert_eq!(
        outcome.final_response,
        "apple\n\n--- b adds ---\nbanana\n\n--- a adds ---\napricot\n\n--- b adds ---\nblueberry"
    );
}

#[tokio::test]
async fn identical_responses_converge_on_round_two() {
    let mut arena = arena(10);
    arena
        .register_agent(AgentDescriptor::new(
            "echo",
            "repeats itself",
            Arc::new(FixedCapability("the final stable answer".to_string())),
        ))
        .unwrap();
    arena.set_goal("stabilize quickly");

    let outcome = arena.run().await.unwrap();

    // Round 1 can never converge (no previous response); round 2 compares
    // two identical responses and stops.
    assert_eq!(outcome.rounds_run, 2);
    assert_eq!(outcome.termination_reason, TerminationReason::Converged);
    assert_eq!(outcome.final_response, "the final stable answer");
}

#[tokio::test]
async fn failing_agent_is_skipped_and_session_continues() {
    let mut arena = arena(2);
    arena
        .register_agent(AgentDescriptor::new(
            "broken",
            "unreachable provider",
            Arc::new(FailingCapability),
        ))
        .unwrap();
    arena
        .register_agent(AgentDescriptor::new(
            "healthy",
            "reliable provider",
            Arc::new(ScriptedCapability::new(&["halcyon", "harbor"])),
        ))
        .unwrap();
    arena.set_goal("survive partial failure");

    let outcome = arena.run().await.unwrap();

    assert_eq!(outcome.rounds_run, 2);
    assert_eq!(outcome.final_response, "harbor");
    assert!(
        outcome
            .full_history
            .iter()
            .all(|m| m.role != "broken"),
        "failed contributions must not enter the conversation"
    );
}

#[tokio::test]
async fn routed_policy_follows_authority_decision_and_records_focus() {
    let mut arena = arena(1);
    arena
        .register_agent(AgentDescriptor::new(
            "a",
            "first specialty",
            Arc::new(FixedCapability("from a".to_string())),
        ))
        .unwrap();
    arena
        .register_agent(AgentDescriptor::new(
            "b",
            "second specialty",
            Arc::new(FixedCapability("from b".to_string())),
        ))
        .unwrap();
    let authority = Arc::new(FixedCapability(
        "Routing it to b. {\"agent\": \"b\", \"reason\": \"b fits\", \"focus\": \"edge cases\", \"priority\": \"high\"}"
            .to_string(),
    ));
    arena.set_orchestration_policy(OrchestrationPolicy::Routed(authority));
    arena.set_goal("route to the right agent");

    let outcome = arena.run().await.unwrap();

    let contributions: Vec<_> = outcome
        .full_history
        .iter()
        .filter(|m| m.round == 1)
        .collect();
    assert_eq!(contributions.len(), 1);
    assert_eq!(contributions[0].role, "b");
    assert_eq!(
        contributions[0].metadata.get("focus").map(String::as_str),
        Some("edge cases")
    );
    assert_eq!(outcome.final_response, "from b");
}

#[tokio::test]
async fn routed_policy_falls_back_to_first_agent_on_unknown_role() {
    let mut arena = arena(1);
    arena
        .register_agent(AgentDescriptor::new(
            "a",
            "first specialty",
            Arc::new(FixedCapability("from a".to_string())),
        ))
        .unwrap();
    arena
        .register_agent(AgentDescriptor::new(
            "b",
            "second specialty",
            Arc::new(FixedCapability("from b".to_string())),
        ))
        .unwrap();
    let authority = Arc::new(FixedCapability("{\"agent\": \"ghost\"}".to_string()));
    arena.set_orchestration_policy(OrchestrationPolicy::Routed(authority));
    arena.set_goal("route to a missing agent");

    let outcome = arena.run().await.unwrap();

    assert_eq!(outcome.final_response, "from a");
    assert_eq!(
        outcome.termination_reason,
        TerminationReason::RoundsExhausted
    );
}

#[tokio::test]
async fn long_sessions_stay_within_the_history_cap() {
    init_tracing();
    // verbose_logging promotes per-round progress to info level; it has
    // no behavioral effect, which this session's assertions rely on.
    let mut arena = DebateArena::new(ArenaConfig {
        max_rounds: 6,
        max_history: 4,
        verbose_logging: true,
        ..Default::default()
    });
    arena
        .register_agent(AgentDescriptor::new(
            "a",
            "first specialty",
            Arc::new(FixedCapability("always alpha".to_string())),
        ))
        .unwrap();
    arena
        .register_agent(AgentDescriptor::new(
            "b",
            "second specialty",
            Arc::new(FixedCapability("forever boreal".to_string())),
        ))
        .unwrap();
    arena.set_goal("fill the history");

    let outcome = arena.run().await.unwrap();

    // Goal announcement plus two contributions per round exceeds the cap
    // during round 2 (which also converges: both rounds end on b's fixed
    // text), so at least one compaction pass must have fired.
    assert!(outcome.stats.live_count <= 4);
    assert!(outcome.stats.summary_count >= 1);
    assert!(outcome.stats.summarized_count >= 1);
    // Participants survive compaction: the system goal announcement was
    // evicted long ago but still counts.
    assert!(
        outcome
            .stats
            .distinct_participants
            .iter()
            .any(|p| p == "system")
    );
}

#[tokio::test]
async fn cancellation_is_honored_between_rounds() {
    let token = CancellationToken::new();
    let mut arena = arena(10);
    arena
        .register_agent(AgentDescriptor::new(
            "a",
            "first specialty",
            Arc::new(CancellingCapability {
                token: token.clone(),
                response: "made it into round one".to_string(),
            }),
        ))
        .unwrap();
    arena.cancellation_token(token);
    arena.set_goal("stop early");

    let outcome = arena.run().await.unwrap();

    assert_eq!(outcome.rounds_run, 1);
    assert_eq!(outcome.termination_reason, TerminationReason::Cancelled);
    assert_eq!(outcome.final_response, "made it into round one");
}
