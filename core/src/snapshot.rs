//! In-memory snapshot of the todo list and the reconciliation rules applied
//! to it when backing-store calls complete.
//!
//! # Design
//! Every change bumps a snapshot-wide `version`; each entry remembers the
//! version at which it last changed (its revision). A mutation records the
//! target's revision when it is dispatched and hands it back when the
//! confirmed value arrives, so a confirmed update that raced with another
//! confirmed update is detected instead of silently overwriting it. What to
//! do about it is the caller's `ConflictPolicy`.
//!
//! # Invariants
//! - Entries keep insertion order; `push` appends.
//! - Only the owner of the snapshot (the store actor) mutates it.

use serde::{Deserialize, Serialize};

use crate::error::TodoError;
use crate::types::Todo;

/// How to resolve a confirmed update whose target changed after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Apply in arrival order; the later-confirmed value wins.
    #[default]
    AcceptLatest,
    /// Keep the snapshot as it is and report `TodoError::Conflict`.
    Reject,
}

/// Outcome of a successful `apply_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Clean,
    /// Applied over a value confirmed after this mutation was dispatched.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    todo: Todo,
    revision: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<Entry>,
    version: u64,
}

impl Snapshot {
    pub fn new(todos: Vec<Todo>) -> Self {
        let mut snapshot = Self::default();
        snapshot.replace_all(todos);
        snapshot
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Todo> {
        self.entries.iter().map(|entry| &entry.todo)
    }

    pub fn todos(&self) -> Vec<Todo> {
        self.iter().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.iter().find(|todo| todo.id == id)
    }

    /// Revision of the entry with `id`, if present.
    pub fn revision_of(&self, id: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.todo.id == id)
            .map(|entry| entry.revision)
    }

    /// Replaces the whole list with a fetch result.
    pub fn replace_all(&mut self, todos: Vec<Todo>) {
        let revision = self.bump();
        self.entries = todos
            .into_iter()
            .map(|todo| Entry { todo, revision })
            .collect();
    }

    /// Appends a record the backing store has confirmed.
    pub fn push(&mut self, todo: Todo) {
        let revision = self.bump();
        self.entries.push(Entry { todo, revision });
    }

    /// Replaces the entry with `todo.id` by the confirmed `todo`.
    ///
    /// `expected` is the revision observed when the mutation was dispatched
    /// (`None` if the entry was absent then).
    pub fn apply_update(
        &mut self,
        todo: Todo,
        expected: Option<u64>,
        policy: ConflictPolicy,
    ) -> Result<Applied, TodoError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.todo.id == todo.id)
            .ok_or_else(|| TodoError::NotFound {
                id: todo.id.clone(),
            })?;

        let outcome = if expected == Some(self.entries[index].revision) {
            Applied::Clean
        } else {
            match policy {
                ConflictPolicy::AcceptLatest => Applied::Superseded,
                ConflictPolicy::Reject => return Err(TodoError::Conflict { id: todo.id }),
            }
        };

        let revision = self.bump();
        self.entries[index] = Entry { todo, revision };
        Ok(outcome)
    }

    /// Removes every entry with `id`; returns how many were removed.
    pub fn remove(&mut self, id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.todo.id != id);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.bump();
        }
        removed
    }

    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn todo(id: &str) -> Todo {
        Todo {
            id: id.to_string(),
            title: format!("todo {id}"),
            date: Utc.with_ymd_and_hms(2025, 5, 11, 9, 0, 0).unwrap(),
            contents: String::new(),
            is_done: false,
        }
    }

    #[test]
    fn replace_all_discards_previous_entries() {
        let mut snapshot = Snapshot::new(vec![todo("1"), todo("2")]);
        snapshot.replace_all(vec![todo("3")]);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("1").is_none());
        assert!(snapshot.get("3").is_some());
    }

    #[test]
    fn push_appends_in_order() {
        let mut snapshot = Snapshot::new(vec![todo("1")]);
        snapshot.push(todo("2"));
        let ids: Vec<_> = snapshot.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn update_with_matching_revision_is_clean() {
        let mut snapshot = Snapshot::new(vec![todo("1")]);
        let base = snapshot.revision_of("1");
        let applied = snapshot
            .apply_update(todo("1").with_done(true), base, ConflictPolicy::Reject)
            .unwrap();
        assert_eq!(applied, Applied::Clean);
        assert!(snapshot.get("1").unwrap().is_done);
        assert!(snapshot.revision_of("1") > base);
    }

    #[test]
    fn update_of_missing_entry_is_not_found_and_changes_nothing() {
        let mut snapshot = Snapshot::new(vec![todo("1")]);
        let before = snapshot.clone();
        let err = snapshot
            .apply_update(todo("9"), None, ConflictPolicy::AcceptLatest)
            .unwrap_err();
        assert_eq!(err, TodoError::NotFound { id: "9".to_string() });
        assert_eq!(snapshot, before);
    }

    #[test]
    fn stale_update_is_superseded_or_rejected_by_policy() {
        let mut snapshot = Snapshot::new(vec![todo("1")]);
        let base = snapshot.revision_of("1");

        // Another confirmed edit lands first.
        let mut renamed = todo("1");
        renamed.title = "renamed".to_string();
        snapshot
            .apply_update(renamed, base, ConflictPolicy::Reject)
            .unwrap();

        let stale = todo("1").with_done(true);
        let err = snapshot
            .apply_update(stale.clone(), base, ConflictPolicy::Reject)
            .unwrap_err();
        assert_eq!(err, TodoError::Conflict { id: "1".to_string() });
        assert_eq!(snapshot.get("1").unwrap().title, "renamed");

        let applied = snapshot
            .apply_update(stale, base, ConflictPolicy::AcceptLatest)
            .unwrap();
        assert_eq!(applied, Applied::Superseded);
        assert!(snapshot.get("1").unwrap().is_done);
    }

    #[test]
    fn double_toggle_restores_flag() {
        let mut snapshot = Snapshot::new(vec![todo("1")]);
        for _ in 0..2 {
            let current = snapshot.get("1").unwrap().clone();
            let base = snapshot.revision_of("1");
            snapshot
                .apply_update(current.with_done(!current.is_done), base, ConflictPolicy::Reject)
                .unwrap();
        }
        assert!(!snapshot.get("1").unwrap().is_done);
    }

    #[test]
    fn remove_drops_every_entry_with_id() {
        let mut snapshot = Snapshot::new(vec![todo("1"), todo("2"), todo("1")]);
        assert_eq!(snapshot.remove("1"), 2);
        assert!(snapshot.get("1").is_none());
        assert_eq!(snapshot.len(), 1);

        let version = snapshot.version();
        assert_eq!(snapshot.remove("1"), 0);
        assert_eq!(snapshot.version(), version);
    }
}
