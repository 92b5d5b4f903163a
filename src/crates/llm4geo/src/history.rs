//! Bounded chat history.
//!
//! Clients send history as a flat list of strings. Roles are implicit by
//! position: even indices are user turns, odd indices assistant turns. Roles
//! are assigned before any eviction so dropping entries never flips them.

use llm::{Message, MessageRole};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of entries kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 8;

/// Which entries survive when the history exceeds its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryPolicy {
    /// Keep the most recent entries, evicting whole exchanges from the front.
    #[default]
    KeepRecent,

    /// Keep the first entries and ignore later ones.
    KeepOldest,
}

impl fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryPolicy::KeepRecent => write!(f, "keep-recent"),
            HistoryPolicy::KeepOldest => write!(f, "keep-oldest"),
        }
    }
}

impl FromStr for HistoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep-recent" => Ok(HistoryPolicy::KeepRecent),
            "keep-oldest" => Ok(HistoryPolicy::KeepOldest),
            other => Err(format!(
                "unknown history policy '{}' (expected keep-recent or keep-oldest)",
                other
            )),
        }
    }
}

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    fn at_position(index: usize) -> Self {
        if index % 2 == 0 {
            TurnRole::User
        } else {
            TurnRole::Assistant
        }
    }
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ChatTurn {
    pub fn to_message(&self) -> Message {
        let role = match self.role {
            TurnRole::User => MessageRole::Human,
            TurnRole::Assistant => MessageRole::Assistant,
        };
        Message::new(role, self.text.clone())
    }
}

/// Ordered, length-bounded conversation history.
///
/// Owned by the calling session and passed into each request; the protocol
/// itself keeps no state between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
    limit: usize,
    policy: HistoryPolicy,
    // Position of the next pushed entry in the full, untruncated sequence.
    next_position: usize,
}

impl ChatHistory {
    /// An empty history.
    pub fn new(limit: usize, policy: HistoryPolicy) -> Self {
        Self {
            turns: Vec::new(),
            limit,
            policy,
            next_position: 0,
        }
    }

    /// Build from the wire representation, assigning roles by position and
    /// then enforcing the bound.
    pub fn from_entries<I, S>(entries: I, limit: usize, policy: HistoryPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut history = Self::new(limit, policy);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    /// Append the next entry; its role follows from its position.
    pub fn push(&mut self, text: impl Into<String>) {
        let role = TurnRole::at_position(self.next_position);
        self.next_position += 1;

        if self.policy == HistoryPolicy::KeepOldest && self.turns.len() >= self.limit {
            return;
        }

        self.turns.push(ChatTurn {
            role,
            text: text.into(),
        });
        self.evict();
    }

    fn evict(&mut self) {
        if self.turns.len() <= self.limit {
            return;
        }
        match self.policy {
            HistoryPolicy::KeepRecent => {
                // Drop an even number so the retained history still starts
                // on a user turn when re-sent as a flat list.
                let excess = self.turns.len() - self.limit;
                let drop = (excess + excess % 2).min(self.turns.len());
                self.turns.drain(..drop);
            }
            HistoryPolicy::KeepOldest => self.turns.truncate(self.limit),
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    /// Conversation messages for a model request.
    pub fn to_messages(&self) -> Vec<Message> {
        self.turns.iter().map(ChatTurn::to_message).collect()
    }

    /// Flat wire representation.
    pub fn to_entries(&self) -> Vec<String> {
        self.turns.iter().map(|t| t.text.clone()).collect()
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT, HistoryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entries(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("entry {}", i)).collect()
    }

    #[test]
    fn test_roles_alternate_from_user() {
        let history = ChatHistory::from_entries(["add osm", "Loading OSM.", "zoom to paris"], 8, HistoryPolicy::KeepRecent);
        let roles: Vec<TurnRole> = history.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![TurnRole::User, TurnRole::Assistant, TurnRole::User]);

        let messages = history.to_messages();
        assert_eq!(messages[0].role, MessageRole::Human);
        assert_eq!(messages[1].role, MessageRole::Assistant);
    }

    #[test]
    fn test_keep_oldest_matches_prefix_truncation() {
        let history = ChatHistory::from_entries(entries(12), 8, HistoryPolicy::KeepOldest);
        assert_eq!(history.to_entries(), entries(8));
    }

    #[test]
    fn test_keep_recent_keeps_latest_exchanges() {
        let history = ChatHistory::from_entries(entries(12), 8, HistoryPolicy::KeepRecent);
        assert_eq!(history.to_entries(), entries(12)[4..].to_vec());
        assert_eq!(history.turns()[0].role, TurnRole::User);
    }

    #[test]
    fn test_keep_recent_odd_excess_drops_whole_exchange() {
        let history = ChatHistory::from_entries(entries(9), 8, HistoryPolicy::KeepRecent);
        assert_eq!(history.len(), 7);
        assert_eq!(history.turns()[0].text, "entry 2");
        assert_eq!(history.turns()[0].role, TurnRole::User);
    }

    #[test]
    fn test_zero_limit_keeps_nothing() {
        for policy in [HistoryPolicy::KeepRecent, HistoryPolicy::KeepOldest] {
            let history = ChatHistory::from_entries(entries(3), 0, policy);
            assert!(history.is_empty());
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("keep-recent".parse::<HistoryPolicy>().unwrap(), HistoryPolicy::KeepRecent);
        assert_eq!("keep-oldest".parse::<HistoryPolicy>().unwrap(), HistoryPolicy::KeepOldest);
        assert!("newest".parse::<HistoryPolicy>().is_err());
        assert_eq!(HistoryPolicy::KeepOldest.to_string(), "keep-oldest");
    }

    proptest! {
        #[test]
        fn prop_history_never_exceeds_limit(
            n in 0usize..40,
            limit in 0usize..12,
            keep_recent in any::<bool>(),
        ) {
            let policy = if keep_recent { HistoryPolicy::KeepRecent } else { HistoryPolicy::KeepOldest };
            let all = entries(n);
            let history = ChatHistory::from_entries(all.clone(), limit, policy);
            let kept = history.to_entries();

            prop_assert!(kept.len() <= limit);
            match policy {
                HistoryPolicy::KeepOldest => {
                    prop_assert_eq!(&kept[..], &all[..kept.len()]);
                    prop_assert_eq!(kept.len(), n.min(limit));
                }
                HistoryPolicy::KeepRecent => {
                    prop_assert_eq!(&kept[..], &all[n - kept.len()..]);
                    prop_assert!(kept.len() + 1 >= n.min(limit));
                }
            }
        }

        #[test]
        fn prop_roles_follow_original_position(n in 0usize..40, limit in 0usize..12) {
            let all = entries(n);
            let history = ChatHistory::from_entries(all.clone(), limit, HistoryPolicy::KeepRecent);
            let offset = n - history.len();
            for (i, turn) in history.turns().iter().enumerate() {
                prop_assert_eq!(turn.role, TurnRole::at_position(offset + i));
            }
        }
    }
}
