//! Policy snapshot wire format.
//!
//! A snapshot is the complete point-in-time policy document served by the
//! remote source:
//!
//! ```json
//! {
//!   "items": {
//!     "editor":    { "type": "role", "children": ["post.edit"] },
//!     "post.edit": { "type": "permission", "description": "Edit posts" }
//!   },
//!   "rules": {
//!     "isOwner": { "data": { "typeName": "owner", "rule": "{\"param\":\"resourceOwner\"}" } }
//!   },
//!   "assignments": { "alice": ["editor"] }
//! }
//! ```
//!
//! Maps keep declaration order, which fixes the order parents are visited in.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::ItemKind;

/// The complete policy document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Item definitions keyed by item name.
    pub items: IndexMap<String, ItemDefinition>,

    /// Rule definitions keyed by rule name.
    pub rules: IndexMap<String, RuleDefinition>,

    /// Item names directly assigned to each actor.
    pub assignments: IndexMap<String, Vec<String>>,
}

impl Snapshot {
    /// The empty policy, used when no document has been published.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if the snapshot defines nothing.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.rules.is_empty() && self.assignments.is_empty()
    }

    /// Decodes a snapshot from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> crate::RbacResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| crate::RbacError::invalid_snapshot(e.to_string()))
    }

    /// Adds an item definition.
    #[must_use]
    pub fn with_item(mut self, name: impl Into<String>, item: ItemDefinition) -> Self {
        self.items.insert(name.into(), item);
        self
    }

    /// Adds a rule definition.
    #[must_use]
    pub fn with_rule(mut self, name: impl Into<String>, rule: RuleDefinition) -> Self {
        self.rules.insert(name.into(), rule);
        self
    }

    /// Assigns items to an actor, appending to any existing assignment list.
    #[must_use]
    pub fn with_assignment<I, S>(mut self, username: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assignments
            .entry(username.into())
            .or_default()
            .extend(items.into_iter().map(Into::into));
        self
    }
}

/// Definition of a single item inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDefinition {
    /// Role or permission.
    #[serde(rename = "type")]
    pub kind: ItemKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Name of the rule guarding the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,

    /// Names of the items this item contains.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

impl ItemDefinition {
    #[must_use]
    pub fn role() -> Self {
        Self::new(ItemKind::Role)
    }

    #[must_use]
    pub fn permission() -> Self {
        Self::new(ItemKind::Permission)
    }

    #[must_use]
    pub fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            description: None,
            rule_name: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule_name: impl Into<String>) -> Self {
        self.rule_name = Some(rule_name.into());
        self
    }

    #[must_use]
    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

/// Definition of a rule inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub data: RuleData,
}

/// Rule type discriminator and its serialized configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleData {
    /// Key into the rule registry.
    pub type_name: String,

    /// JSON-encoded rule configuration.
    pub rule: String,
}

impl RuleDefinition {
    /// Creates a rule definition from a type name and a configuration value.
    #[must_use]
    pub fn new(type_name: impl Into<String>, config: &serde_json::Value) -> Self {
        Self {
            data: RuleData {
                type_name: type_name.into(),
                rule: config.to_string(),
            },
        }
    }

    /// Creates a rule definition with raw (possibly invalid) configuration text.
    #[must_use]
    pub fn raw(type_name: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            data: RuleData {
                type_name: type_name.into(),
                rule: rule.into(),
            },
        }
    }
}
