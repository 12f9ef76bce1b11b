//! Core policy model types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Item
// =============================================================================

/// Classification of a policy graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A single granular capability.
    Permission,
    /// A broader grouping of permissions.
    Role,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permission => write!(f, "permission"),
            Self::Role => write!(f, "role"),
        }
    }
}

/// A named node in the policy graph.
///
/// Items are immutable once built. The kind classifies the item and carries
/// no behavior of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    name: String,
    kind: ItemKind,
    description: Option<String>,
    rule_name: Option<String>,
}

impl Item {
    /// Creates a permission item.
    #[must_use]
    pub fn permission(name: impl Into<String>) -> Self {
        Self::new(name, ItemKind::Permission)
    }

    /// Creates a role item.
    #[must_use]
    pub fn role(name: impl Into<String>) -> Self {
        Self::new(name, ItemKind::Role)
    }

    /// Creates an item of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            rule_name: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Binds a rule by name.
    #[must_use]
    pub fn with_rule(mut self, rule_name: impl Into<String>) -> Self {
        self.rule_name = Some(rule_name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Name of the rule guarding this item, if any.
    pub fn rule_name(&self) -> Option<&str> {
        self.rule_name.as_deref()
    }

    pub fn is_role(&self) -> bool {
        self.kind == ItemKind::Role
    }

    pub fn is_permission(&self) -> bool {
        self.kind == ItemKind::Permission
    }
}

// =============================================================================
// Assignment
// =============================================================================

/// A direct grant of one item to one actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assignment {
    pub username: String,
    pub item_name: String,
}

impl Assignment {
    #[must_use]
    pub fn new(username: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            item_name: item_name.into(),
        }
    }
}

// =============================================================================
// Rule Parameters
// =============================================================================

/// Caller-supplied contextual parameters passed to rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleParams(Map<String, Value>);

impl RuleParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, returning the updated set.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a parameter, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the parameter as a string slice if it is a JSON string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for RuleParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RuleParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
