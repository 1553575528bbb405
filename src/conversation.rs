//! Bounded-memory conversation store.
//!
//! The store keeps a live log of contributions plus rolling summaries of
//! evicted history. Appends are the only mutation; when the live log
//! exceeds `max_history`, exactly one summarization pass compacts the
//! oldest half into a content-free [`Summary`], so memory stays bounded
//! under arbitrarily long sessions.

use std::collections::{BTreeSet, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Returns the current Unix timestamp in seconds.
fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A single contribution in the conversation.
///
/// Immutable once appended: the store hands out shared references only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Contributing role (agent role, or `system`).
    pub role: String,

    /// The contribution text.
    pub content: String,

    /// Creation timestamp (Unix seconds).
    pub timestamp: u64,

    /// Round in which the message was produced (0 for pre-session
    /// messages such as the goal announcement).
    pub round: usize,

    /// Free-form metadata, e.g. focus hint or specialty.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Message {
    /// Creates a message timestamped now, with empty metadata.
    pub fn new(role: impl Into<String>, content: impl Into<String>, round: usize) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: current_unix_timestamp(),
            round,
            metadata: HashMap::new(),
        }
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Formats this message for context rendering.
    pub fn format(&self) -> String {
        format!("[{}]: {}", self.role, self.content)
    }
}

/// A compacted aggregate of a contiguous evicted prefix of the live log.
///
/// Compaction, not archival: raw content is never retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// How many messages were evicted into this summary.
    pub message_count: usize,

    /// Timestamp of the first evicted message.
    pub first_timestamp: u64,

    /// Timestamp of the last evicted message.
    pub last_timestamp: u64,

    /// Distinct roles that participated in the evicted range.
    pub participants: Vec<String>,
}

/// Statistics over both tiers of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStats {
    /// Messages currently live.
    pub live_count: usize,

    /// Total messages evicted into summaries.
    pub summarized_count: usize,

    /// Distinct roles across live and summarized history, sorted.
    pub distinct_participants: Vec<String>,

    /// Number of summarization passes that have fired.
    pub summary_count: usize,
}

/// The two-tier conversation store: live log plus rolling summaries.
///
/// Invariant: after any `append` completes, the live length is at most
/// `max_history`.
#[derive(Debug, Clone)]
pub struct Conversation {
    max_history: usize,
    live: Vec<Message>,
    summaries: Vec<Summary>,
}

impl Conversation {
    /// Creates a store capped at `max_history` live messages.
    ///
    /// The cap is clamped to at least 2: an eviction removes
    /// `floor(max_history / 2)` messages, and that must be at least one
    /// for a pass to restore the size invariant.
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(2),
            live: Vec::new(),
            summaries: Vec::new(),
        }
    }

    /// The effective live-history cap.
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Appends a message, compacting the oldest half of the live log if
    /// the cap is exceeded. Exactly one summarization pass fires per
    /// violating append.
    pub fn append(&mut self, message: Message) {
        self.live.push(message);

        if self.live.len() > self.max_history {
            self.summarize_oldest();
        }
    }

    /// Evicts the oldest `floor(max_history / 2)` live messages into a
    /// new summary.
    fn summarize_oldest(&mut self) {
        let evict = self.max_history / 2;
        let evicted: Vec<Message> = self.live.drain(..evict).collect();

        let participants: Vec<String> = evicted
            .iter()
            .map(|m| m.role.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let summary = Summary {
            message_count: evicted.len(),
            first_timestamp: evicted.first().map(|m| m.timestamp).unwrap_or(0),
            last_timestamp: evicted.last().map(|m| m.timestamp).unwrap_or(0),
            participants,
        };

        tracing::debug!(
            evicted = summary.message_count,
            live = self.live.len(),
            "compacted oldest conversation history into summary"
        );

        self.summaries.push(summary);
    }

    /// The last `n` live messages, oldest first.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.live.len().saturating_sub(n);
        &self.live[start..]
    }

    /// Renders the last `window` live messages as `[role]: content`
    /// pairs, separated by blank lines.
    ///
    /// This is the only formatted view the core exposes to agent
    /// capabilities.
    pub fn context(&self, window: usize) -> String {
        self.recent(window)
            .iter()
            .map(Message::format)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// All live messages, in insertion order.
    pub fn all(&self) -> &[Message] {
        &self.live
    }

    /// Live messages from the given role.
    pub fn messages_by_role(&self, role: &str) -> Vec<&Message> {
        self.live.iter().filter(|m| m.role == role).collect()
    }

    /// Completed summaries, oldest first.
    pub fn summaries(&self) -> &[Summary] {
        &self.summaries
    }

    /// Statistics across live and summarized history.
    pub fn stats(&self) -> ConversationStats {
        let mut participants: BTreeSet<String> =
            self.live.iter().map(|m| m.role.clone()).collect();
        for summary in &self.summaries {
            participants.extend(summary.participants.iter().cloned());
        }

        ConversationStats {
            live_count: self.live.len(),
            summarized_count: self.summaries.iter().map(|s| s.message_count).sum(),
            distinct_participants: participants.into_iter().collect(),
            summary_count: self.summaries.len(),
        }
    }

    /// Clears both tiers.
    pub fn clear(&mut self) {
        self.live.clear();
        self.summaries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: &str, content: &str) -> Message {
        Message::new(role, content, 1)
    }

    #[test]
    fn append_keeps_insertion_order() {
        let mut conversation = Conversation::new(10);
        conversation.append(message("a", "first"));
        conversation.append(message("b", "second"));

        let all = conversation.all();
        assert_eq!(all[0].content, "first");
        assert_eq!(all[1].content, "second");
    }

    #[test]
    fn exceeding_cap_fires_exactly_one_summarization_pass() {
        let mut conversation = Conversation::new(10);
        for i in 0..10 {
            conversation.append(message("agent", &format!("msg {i}")));
        }
        assert_eq!(conversation.stats().summary_count, 0);

        // The 11th append violates the cap and evicts floor(10/2) = 5.
        conversation.append(message("agent", "msg 10"));

        let stats = conversation.stats();
        assert_eq!(stats.summary_count, 1);
        assert_eq!(stats.summarized_count, 5);
        assert_eq!(stats.live_count, 6);
        assert_eq!(conversation.all()[0].content, "msg 5");
    }

    #[test]
    fn live_length_never_exceeds_cap_after_append() {
        let mut conversation = Conversation::new(6);
        for i in 0..100 {
            conversation.append(message("agent", &format!("msg {i}")));
            assert!(conversation.all().len() <= 6);
        }
    }

    #[test]
    fn tiny_cap_is_clamped_so_eviction_makes_progress() {
        let mut conversation = Conversation::new(0);
        assert_eq!(conversation.max_history(), 2);

        for i in 0..20 {
            conversation.append(message("agent", &format!("msg {i}")));
            assert!(conversation.all().len() <= 2);
        }
    }

    #[test]
    fn summary_records_count_range_and_participants() {
        let mut conversation = Conversation::new(4);
        conversation.append(message("alice", "one"));
        conversation.append(message("bob", "two"));
        conversation.append(message("alice", "three"));
        conversation.append(message("carol", "four"));
        conversation.append(message("bob", "five"));

        let summaries = conversation.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(summaries[0].participants, vec!["alice", "bob"]);
        assert!(summaries[0].first_timestamp <= summaries[0].last_timestamp);
    }

    #[test]
    fn stats_participants_union_live_and_summarized() {
        let mut conversation = Conversation::new(4);
        conversation.append(message("alice", "one"));
        conversation.append(message("alice", "two"));
        conversation.append(message("bob", "three"));
        conversation.append(message("bob", "four"));
        // Evicts alice's messages entirely out of the live log.
        conversation.append(message("carol", "five"));

        let stats = conversation.stats();
        assert_eq!(stats.distinct_participants, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn recent_returns_last_n() {
        let mut conversation = Conversation::new(10);
        for i in 0..5 {
            conversation.append(message("agent", &format!("msg {i}")));
        }

        let recent = conversation.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "msg 3");
        assert_eq!(recent[1].content, "msg 4");

        // Asking for more than exists returns everything.
        assert_eq!(conversation.recent(100).len(), 5);
    }

    #[test]
    fn context_renders_role_content_pairs() {
        let mut conversation = Conversation::new(10);
        conversation.append(message("coder", "use a B-tree"));
        conversation.append(message("validator", "agreed"));

        assert_eq!(
            conversation.context(10),
            "[coder]: use a B-tree\n\n[validator]: agreed"
        );
    }

    #[test]
    fn messages_by_role_filters_live_log() {
        let mut conversation = Conversation::new(10);
        conversation.append(message("coder", "one"));
        conversation.append(message("validator", "two"));
        conversation.append(message("coder", "three"));

        let coder = conversation.messages_by_role("coder");
        assert_eq!(coder.len(), 2);
        assert_eq!(coder[1].content, "three");
    }

    #[test]
    fn clear_empties_both_tiers() {
        let mut conversation = Conversation::new(2);
        for i in 0..5 {
            conversation.append(message("agent", &format!("msg {i}")));
        }
        conversation.clear();

        let stats = conversation.stats();
        assert_eq!(stats.live_count, 0);
        assert_eq!(stats.summarized_count, 0);
        assert_eq!(stats.summary_count, 0);
        assert!(stats.distinct_participants.is_empty());
    }
}
