//! Pluggable rules that gate item grants.
//!
//! A rule is a named predicate over the acting user, the item being checked
//! and caller-supplied parameters. Rule implementations are looked up by the
//! `typeName` discriminator carried in the snapshot:
//!
//! ```ignore
//! use rolegate::rule::{RuleRegistry, OwnerRule};
//!
//! let mut registry = RuleRegistry::new();
//! registry.register_rule::<OwnerRule>("owner");
//!
//! // Unregistered discriminators fall back to `NoopRule`, which grants.
//! let rule = registry.build("isOwner", "owner", serde_json::json!({ "param": "resourceOwner" }))?;
//! ```

pub mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{Item, RuleParams};
use crate::{RbacError, RbacResult};

pub use builtin::{ActorInRule, OwnerRule, ParamInRule};

// =============================================================================
// Rule Trait
// =============================================================================

/// A named predicate bound to zero or more items.
///
/// `execute` must be synchronous and side-effect free with respect to its
/// arguments.
pub trait Rule: Send + Sync + fmt::Debug {
    /// The rule name as declared in the snapshot.
    fn name(&self) -> &str;

    /// Returns `true` if `username` may hold `item` given `params`.
    fn execute(&self, username: &str, item: &Item, params: &RuleParams) -> bool;
}

/// Rule used for unregistered type discriminators.
///
/// Carries no predicate logic and therefore always grants.
#[derive(Debug, Clone)]
pub struct NoopRule {
    name: String,
    config: Value,
}

impl NoopRule {
    #[must_use]
    pub fn new(name: impl Into<String>, config: Value) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// The opaque configuration the rule was built from.
    pub fn config(&self) -> &Value {
        &self.config
    }
}

impl Rule for NoopRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, _username: &str, _item: &Item, _params: &RuleParams) -> bool {
        true
    }
}

/// Rule types that can be built from a deserialized configuration payload.
pub trait ConfiguredRule: Rule + Sized + 'static {
    /// Configuration payload decoded from the snapshot's `rule` string.
    type Config: DeserializeOwned;

    fn from_config(name: &str, config: Self::Config) -> Self;
}

// =============================================================================
// Rule Registry
// =============================================================================

/// Constructor that parses a rule's configuration into an executable rule.
pub type RuleFactory = Arc<dyn Fn(&str, Value) -> RbacResult<Arc<dyn Rule>> + Send + Sync>;

/// Mapping from rule type discriminator to rule constructor.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    factories: HashMap<String, RuleFactory>,
}

impl RuleRegistry {
    /// Creates an empty registry. Every rule built from it is a [`NoopRule`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in rule types registered:
    /// `owner`, `paramIn` and `actorIn`.
    #[must_use]
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        registry.register_rule::<OwnerRule>("owner");
        registry.register_rule::<ParamInRule>("paramIn");
        registry.register_rule::<ActorInRule>("actorIn");
        registry
    }

    /// Registers a raw factory for a type discriminator, replacing any
    /// previous registration.
    pub fn register(&mut self, type_name: impl Into<String>, factory: RuleFactory) -> &mut Self {
        self.factories.insert(type_name.into(), factory);
        self
    }

    /// Registers a rule type whose configuration deserializes with serde.
    pub fn register_rule<R: ConfiguredRule>(&mut self, type_name: impl Into<String>) -> &mut Self {
        let factory: RuleFactory = Arc::new(|name: &str, config: Value| -> RbacResult<Arc<dyn Rule>> {
            let config: R::Config = serde_json::from_value(config)
                .map_err(|e| RbacError::malformed_rule(name, e.to_string()))?;
            Ok(Arc::new(R::from_config(name, config)) as Arc<dyn Rule>)
        });
        self.register(type_name, factory)
    }

    /// Returns `true` if a factory is registered for the discriminator.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered discriminators, in no particular order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builds a rule, falling back to [`NoopRule`] for unknown discriminators.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRule` if the registered factory rejects the
    /// configuration.
    pub fn build(&self, rule_name: &str, type_name: &str, config: Value) -> RbacResult<Arc<dyn Rule>> {
        match self.factories.get(type_name) {
            Some(factory) => factory(rule_name, config),
            None => {
                tracing::trace!(
                    rule = rule_name,
                    type_name,
                    "No rule type registered, using no-op rule"
                );
                Ok(Arc::new(NoopRule::new(rule_name, config)))
            }
        }
    }

    /// Decodes a JSON-encoded configuration string and builds the rule.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRule` if the string is not valid JSON or the factory
    /// rejects it.
    pub fn build_from_str(
        &self,
        rule_name: &str,
        type_name: &str,
        raw_config: &str,
    ) -> RbacResult<Arc<dyn Rule>> {
        let config: Value = serde_json::from_str(raw_config)
            .map_err(|e| RbacError::malformed_rule(rule_name, e.to_string()))?;
        self.build(rule_name, type_name, config)
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.type_names().collect();
        names.sort_unstable();
        f.debug_struct("RuleRegistry").field("types", &names).finish()
    }
}
