//! Append-only per-group message history.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

/// One stored message. `seq` is the arrival position within the group and can
/// be used to correlate later-delivered augmented responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub author: String,
    pub text: String,
    pub seq: u64,
}

/// Per-group append-only message logs.
///
/// A group's log is created on first append. Appends to the same group
/// serialize on that group's lock so arrival order is preserved; appends to
/// different groups do not contend with each other.
pub struct GroupHistory {
    groups: RwLock<HashMap<String, Arc<Mutex<Vec<HistoryEntry>>>>>,
}

impl GroupHistory {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Append a message to `group`'s log, creating the log on first use.
    /// Returns the stored entry with its assigned sequence number.
    pub async fn append(&self, group: &str, author: &str, text: &str) -> HistoryEntry {
        let log = self.log_for(group).await;
        let mut entries = log.lock().await;
        let entry = HistoryEntry {
            author: author.to_string(),
            text: text.to_string(),
            seq: entries.len() as u64,
        };
        entries.push(entry.clone());
        entry
    }

    /// Ordered snapshot of `group`'s log; empty for unknown groups.
    pub async fn read(&self, group: &str) -> Vec<HistoryEntry> {
        let log = {
            let groups = self.groups.read().await;
            groups.get(group).cloned()
        };
        match log {
            Some(log) => log.lock().await.clone(),
            None => Vec::new(),
        }
    }

    async fn log_for(&self, group: &str) -> Arc<Mutex<Vec<HistoryEntry>>> {
        if let Some(log) = self.groups.read().await.get(group) {
            return log.clone();
        }
        self.groups
            .write()
            .await
            .entry(group.to_string())
            .or_default()
            .clone()
    }
}

impl Default for GroupHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_assigns_sequence_numbers_in_order() {
        let history = GroupHistory::new();

        let first = history.append("g1", "alice", "hello").await;
        let second = history.append("g1", "bob", "hi").await;

        assert_eq!(first.seq, 0);
        assert_eq!(second.seq, 1);
    }

    #[tokio::test]
    async fn read_returns_entries_in_append_order() {
        let history = GroupHistory::new();

        history.append("g1", "alice", "one").await;
        history.append("g1", "alice", "two").await;
        history.append("g1", "bob", "three").await;

        let entries = history.read("g1").await;
        let texts: Vec<&str> = entries.iter().map(|entry| entry.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn groups_do_not_share_logs() {
        let history = GroupHistory::new();

        history.append("g1", "alice", "hello").await;

        assert!(history.read("g2").await.is_empty());
        assert_eq!(history.read("g1").await.len(), 1);
    }

    #[tokio::test]
    async fn read_on_unknown_group_is_empty() {
        let history = GroupHistory::new();

        assert!(history.read("missing").await.is_empty());
    }
}
