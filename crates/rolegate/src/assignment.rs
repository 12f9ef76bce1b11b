//! Per-actor direct assignments.

use std::collections::{HashMap, HashSet};

use crate::snapshot::Snapshot;
use crate::types::Assignment;

/// Item names directly granted to each actor.
///
/// Built wholesale from a snapshot; there is no incremental mutation.
#[derive(Debug, Clone, Default)]
pub struct AssignmentStore {
    by_user: HashMap<String, HashSet<String>>,
}

impl AssignmentStore {
    /// Flattens the snapshot's actor -> item list map into per-actor sets.
    #[must_use]
    pub fn build(snapshot: &Snapshot) -> Self {
        let by_user = snapshot
            .assignments
            .iter()
            .map(|(username, items)| (username.clone(), items.iter().cloned().collect()))
            .collect();

        Self { by_user }
    }

    /// Returns `true` if `username` directly holds `item_name`.
    pub fn has_assignment(&self, username: &str, item_name: &str) -> bool {
        self.by_user
            .get(username)
            .is_some_and(|items| items.contains(item_name))
    }

    /// Direct assignments for one actor, sorted by item name.
    pub fn assignments_for(&self, username: &str) -> Vec<Assignment> {
        let mut assignments: Vec<_> = self
            .by_user
            .get(username)
            .into_iter()
            .flatten()
            .map(|item| Assignment::new(username, item.clone()))
            .collect();
        assignments.sort_by(|a, b| a.item_name.cmp(&b.item_name));
        assignments
    }

    /// Number of actors with at least one assignment entry.
    pub fn actor_count(&self) -> usize {
        self.by_user.len()
    }

    /// Total number of distinct (actor, item) assignments.
    pub fn assignment_count(&self) -> usize {
        self.by_user.values().map(HashSet::len).sum()
    }
}
