//! In-memory policy graph.
//!
//! The graph holds every item, the rule bound to each rule name, and a
//! parent lookup keyed by child name. Snapshots declare edges top-down
//! (`parent.children`); the graph inverts them so the resolver can walk
//! upward from the requested item.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::RbacResult;
use crate::rule::{Rule, RuleRegistry};
use crate::snapshot::Snapshot;
use crate::types::Item;

/// Items, rules and parent edges materialized from one snapshot.
#[derive(Debug, Default)]
pub struct PolicyGraph {
    /// Items in snapshot declaration order.
    items: IndexMap<String, Item>,

    /// Child name -> parent names, in snapshot declaration order.
    parents: HashMap<String, Vec<String>>,

    /// Rule name -> executable rule.
    rules: HashMap<String, Arc<dyn Rule>>,
}

impl PolicyGraph {
    /// Builds the graph from a snapshot.
    ///
    /// Child references naming unknown items are dropped. Rule configurations
    /// are parsed through `registry`; a single malformed configuration fails
    /// the whole build.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRule` if any rule configuration cannot be parsed.
    pub fn build(snapshot: &Snapshot, registry: &RuleRegistry) -> RbacResult<Self> {
        let items: IndexMap<String, Item> = snapshot
            .items
            .iter()
            .map(|(name, def)| {
                let mut item = Item::new(name.clone(), def.kind);
                if let Some(description) = &def.description {
                    item = item.with_description(description.clone());
                }
                if let Some(rule_name) = &def.rule_name {
                    item = item.with_rule(rule_name.clone());
                }
                (name.clone(), item)
            })
            .collect();

        let mut parents: HashMap<String, Vec<String>> = HashMap::new();
        for (name, def) in &snapshot.items {
            for child in &def.children {
                if !items.contains_key(child) {
                    tracing::trace!(parent = %name, child = %child, "Dropping edge to unknown item");
                    continue;
                }
                let entry = parents.entry(child.clone()).or_default();
                if !entry.contains(name) {
                    entry.push(name.clone());
                }
            }
        }

        let mut rules: HashMap<String, Arc<dyn Rule>> = HashMap::with_capacity(snapshot.rules.len());
        for (name, def) in &snapshot.rules {
            let rule = registry.build_from_str(name, &def.data.type_name, &def.data.rule)?;
            rules.insert(name.clone(), rule);
        }

        for item in items.values() {
            if let Some(rule_name) = item.rule_name()
                && !rules.contains_key(rule_name)
            {
                tracing::warn!(
                    item = item.name(),
                    rule = rule_name,
                    "Item references a rule missing from the snapshot"
                );
            }
        }

        Ok(Self {
            items,
            parents,
            rules,
        })
    }

    /// Returns `true` if an item with this name exists.
    pub fn item_exists(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn get_item(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    pub fn get_rule(&self, name: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.get(name)
    }

    /// Items that directly contain `child_name`. Empty if none.
    pub fn get_parents(&self, child_name: &str) -> Vec<&Item> {
        self.parent_names(child_name)
            .iter()
            .filter_map(|name| self.items.get(name))
            .collect()
    }

    /// Names of the items that directly contain `child_name`.
    pub fn parent_names(&self, child_name: &str) -> &[String] {
        self.parents
            .get(child_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All items in declaration order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn role_count(&self) -> usize {
        self.items.values().filter(|i| i.is_role()).count()
    }

    pub fn permission_count(&self) -> usize {
        self.items.values().filter(|i| i.is_permission()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RbacError;
    use crate::snapshot::{ItemDefinition, RuleDefinition};
    use crate::types::ItemKind;
    use serde_json::json;

    fn blog_snapshot() -> Snapshot {
        Snapshot::empty()
            .with_item(
                "admin",
                ItemDefinition::role().with_children(["editor", "post.delete"]),
            )
            .with_item(
                "editor",
                ItemDefinition::role().with_children(["post.edit", "post.delete", "ghost"]),
            )
            .with_item(
                "post.edit",
                ItemDefinition::permission().with_description("Edit posts"),
            )
            .with_item("post.delete", ItemDefinition::permission().with_rule("isOwner"))
            .with_rule("isOwner", RuleDefinition::new("owner", &json!({})))
    }

    #[test]
    fn test_build_items() {
        let graph = PolicyGraph::build(&blog_snapshot(), &RuleRegistry::new()).unwrap();

        assert_eq!(graph.item_count(), 4);
        assert_eq!(graph.role_count(), 2);
        assert_eq!(graph.permission_count(), 2);
        assert!(graph.item_exists("post.edit"));
        assert!(!graph.item_exists("ghost"));

        let edit = graph.get_item("post.edit").unwrap();
        assert_eq!(edit.kind(), ItemKind::Permission);
        assert_eq!(edit.description(), Some("Edit posts"));
        assert_eq!(
            graph.get_item("post.delete").unwrap().rule_name(),
            Some("isOwner")
        );
    }

    #[test]
    fn test_parents_are_inverted_children() {
        let graph = PolicyGraph::build(&blog_snapshot(), &RuleRegistry::new()).unwrap();

        assert_eq!(graph.parent_names("post.delete"), ["admin", "editor"]);
        assert_eq!(graph.parent_names("editor"), ["admin"]);
        assert!(graph.parent_names("admin").is_empty());

        let parents: Vec<_> = graph.get_parents("post.edit").iter().map(|i| i.name()).collect();
        assert_eq!(parents, ["editor"]);
    }

    #[test]
    fn test_dangling_children_dropped() {
        let graph = PolicyGraph::build(&blog_snapshot(), &RuleRegistry::new()).unwrap();
        assert!(graph.get_parents("ghost").is_empty());
    }

    #[test]
    fn test_rules_built_through_registry() {
        let graph =
            PolicyGraph::build(&blog_snapshot(), &RuleRegistry::with_builtin_rules()).unwrap();
        assert_eq!(graph.rule_count(), 1);
        assert_eq!(graph.get_rule("isOwner").unwrap().name(), "isOwner");
        assert!(graph.get_rule("missing").is_none());
    }

    #[test]
    fn test_malformed_rule_fails_build() {
        let snapshot = blog_snapshot()
            .with_rule("broken", RuleDefinition::raw("customX", "{not json"));

        let err = PolicyGraph::build(&snapshot, &RuleRegistry::new()).unwrap_err();
        assert!(matches!(err, RbacError::MalformedRule { ref rule, .. } if rule == "broken"));
    }

    #[test]
    fn test_duplicate_children_produce_one_edge() {
        let snapshot = Snapshot::empty()
            .with_item("r", ItemDefinition::role().with_children(["p", "p"]))
            .with_item("p", ItemDefinition::permission());

        let graph = PolicyGraph::build(&snapshot, &RuleRegistry::new()).unwrap();
        assert_eq!(graph.parent_names("p"), ["r"]);
    }
}
