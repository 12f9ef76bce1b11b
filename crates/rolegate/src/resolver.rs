//! Access resolution over a loaded policy graph.
//!
//! Resolution walks upward from the requested item:
//!
//! 1. An unknown item resolves to `false`.
//! 2. The item's rule, if any, must pass; a failing rule vetoes the branch.
//! 3. A direct assignment resolves to `true`.
//! 4. Otherwise each parent is resolved in turn and the first `true` wins.
//!
//! The walk keeps an explicit stack rather than recursing, so its depth is not
//! bounded by the call stack. Every item is expanded at most once per check,
//! so accidental cycles in the parent relation terminate.

use std::collections::HashSet;

use crate::assignment::AssignmentStore;
use crate::graph::PolicyGraph;
use crate::types::{Item, RuleParams};
use crate::{RbacError, RbacResult};

/// Resolves single-item access checks against one graph and assignment set.
#[derive(Debug, Clone, Copy)]
pub struct AccessResolver<'a> {
    graph: &'a PolicyGraph,
    assignments: &'a AssignmentStore,
}

impl<'a> AccessResolver<'a> {
    #[must_use]
    pub fn new(graph: &'a PolicyGraph, assignments: &'a AssignmentStore) -> Self {
        Self { graph, assignments }
    }

    /// Decides whether `username` holds `item_name` given `params`.
    ///
    /// # Errors
    ///
    /// Returns `MissingRule` if an item on the walked path names a rule that
    /// is absent from the graph.
    pub fn check_access(
        &self,
        username: &str,
        item_name: &str,
        params: &RuleParams,
    ) -> RbacResult<bool> {
        let mut visited = HashSet::new();
        let mut pending = vec![item_name];

        while let Some(name) = pending.pop() {
            // A revisited item either sits on a walked path or already failed.
            if !visited.insert(name) {
                tracing::trace!(item = name, "Item already visited, skipping");
                continue;
            }

            let Some(item) = self.graph.get_item(name) else {
                tracing::trace!(item = name, "Unknown item");
                continue;
            };

            if !self.execute_rule(username, item, params)? {
                tracing::trace!(item = name, username, "Rule denied");
                continue;
            }

            if self.assignments.has_assignment(username, name) {
                tracing::trace!(item = name, username, "Direct assignment");
                return Ok(true);
            }

            // Reversed so the first declared parent is expanded first.
            pending.extend(self.graph.parent_names(name).iter().rev().map(String::as_str));
        }

        Ok(false)
    }

    /// Runs the item's rule. An item without a rule always passes.
    fn execute_rule(&self, username: &str, item: &Item, params: &RuleParams) -> RbacResult<bool> {
        let Some(rule_name) = item.rule_name() else {
            return Ok(true);
        };

        let rule = self
            .graph
            .get_rule(rule_name)
            .ok_or_else(|| RbacError::missing_rule(item.name(), rule_name))?;

        Ok(rule.execute(username, item, params))
    }
}
