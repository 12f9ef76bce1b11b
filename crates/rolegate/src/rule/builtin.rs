//! Built-in rule types.
//!
//! These are opt-in; see [`RuleRegistry::with_builtin_rules`](super::RuleRegistry::with_builtin_rules).

use serde::Deserialize;
use serde_json::Value;

use super::{ConfiguredRule, Rule};
use crate::types::{Item, RuleParams};

fn default_owner_param() -> String {
    "owner".to_string()
}

/// Grants when the actor owns the resource named in the parameters.
///
/// Configuration: `{ "param": "resourceOwner" }` (defaults to `"owner"`).
#[derive(Debug, Clone)]
pub struct OwnerRule {
    name: String,
    param: String,
}

/// Configuration for [`OwnerRule`].
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerRuleConfig {
    #[serde(default = "default_owner_param")]
    pub param: String,
}

impl ConfiguredRule for OwnerRule {
    type Config = OwnerRuleConfig;

    fn from_config(name: &str, config: OwnerRuleConfig) -> Self {
        Self {
            name: name.to_string(),
            param: config.param,
        }
    }
}

impl Rule for OwnerRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, username: &str, _item: &Item, params: &RuleParams) -> bool {
        params.get_str(&self.param) == Some(username)
    }
}

/// Grants when a parameter equals one of the configured values.
///
/// Configuration: `{ "param": "status", "values": ["draft", "review"] }`.
/// A missing parameter never matches.
#[derive(Debug, Clone)]
pub struct ParamInRule {
    name: String,
    param: String,
    values: Vec<Value>,
}

/// Configuration for [`ParamInRule`].
#[derive(Debug, Clone, Deserialize)]
pub struct ParamInRuleConfig {
    pub param: String,
    #[serde(default)]
    pub values: Vec<Value>,
}

impl ConfiguredRule for ParamInRule {
    type Config = ParamInRuleConfig;

    fn from_config(name: &str, config: ParamInRuleConfig) -> Self {
        Self {
            name: name.to_string(),
            param: config.param,
            values: config.values,
        }
    }
}

impl Rule for ParamInRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, _username: &str, _item: &Item, params: &RuleParams) -> bool {
        params
            .get(&self.param)
            .is_some_and(|value| self.values.contains(value))
    }
}

/// Grants only to the listed actors.
///
/// Configuration: `{ "usernames": ["alice", "bob"] }`.
#[derive(Debug, Clone)]
pub struct ActorInRule {
    name: String,
    usernames: Vec<String>,
}

/// Configuration for [`ActorInRule`].
#[derive(Debug, Clone, Deserialize)]
pub struct ActorInRuleConfig {
    #[serde(default)]
    pub usernames: Vec<String>,
}

impl ConfiguredRule for ActorInRule {
    type Config = ActorInRuleConfig;

    fn from_config(name: &str, config: ActorInRuleConfig) -> Self {
        Self {
            name: name.to_string(),
            usernames: config.usernames,
        }
    }
}

impl Rule for ActorInRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, username: &str, _item: &Item, _params: &RuleParams) -> bool {
        self.usernames.iter().any(|u| u == username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleRegistry;
    use serde_json::json;

    fn item() -> Item {
        Item::permission("post.delete")
    }

    #[test]
    fn test_owner_rule() {
        let registry = RuleRegistry::with_builtin_rules();
        let rule = registry
            .build("isOwner", "owner", json!({ "param": "resourceOwner" }))
            .unwrap();

        let params = RuleParams::new().with("resourceOwner", "carol");
        assert!(rule.execute("carol", &item(), &params));
        assert!(!rule.execute("alice", &item(), &params));
        assert!(!rule.execute("carol", &item(), &RuleParams::new()));
    }

    #[test]
    fn test_owner_rule_default_param() {
        let registry = RuleRegistry::with_builtin_rules();
        let rule = registry.build("isOwner", "owner", json!({})).unwrap();

        let params = RuleParams::new().with("owner", "alice");
        assert!(rule.execute("alice", &item(), &params));
    }

    #[test]
    fn test_param_in_rule() {
        let registry = RuleRegistry::with_builtin_rules();
        let rule = registry
            .build(
                "editable",
                "paramIn",
                json!({ "param": "status", "values": ["draft", "review"] }),
            )
            .unwrap();

        assert!(rule.execute("x", &item(), &RuleParams::new().with("status", "draft")));
        assert!(!rule.execute("x", &item(), &RuleParams::new().with("status", "published")));
        assert!(!rule.execute("x", &item(), &RuleParams::new()));
    }

    #[test]
    fn test_actor_in_rule() {
        let registry = RuleRegistry::with_builtin_rules();
        let rule = registry
            .build("staff", "actorIn", json!({ "usernames": ["alice", "bob"] }))
            .unwrap();

        assert!(rule.execute("bob", &item(), &RuleParams::new()));
        assert!(!rule.execute("mallory", &item(), &RuleParams::new()));
    }
}
