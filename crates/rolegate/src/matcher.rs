//! Role-list matching.
//!
//! A role-list check asks whether an actor satisfies any one of several role
//! or permission names, with two sentinel names:
//!
//! - [`GUEST_ROLE`] (`"?"`) matches unauthenticated actors
//! - [`AUTHENTICATED_ROLE`] (`"@"`) matches authenticated actors
//!
//! Any other name is resolved through an [`AccessCheck`]. The final decision
//! is `superuser || (role gate && custom predicate && allow)`.
//!
//! # Example
//!
//! ```ignore
//! use rolegate::matcher::{Actor, CheckAccessOptions};
//!
//! let options = CheckAccessOptions::new()
//!     .with_roles(["@"])
//!     .with_custom_match(|actor, _| actor.username().ends_with("@example.com"));
//!
//! let allowed = engine.check(&Actor::user("alice@example.com"), &options).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use crate::RbacResult;
use crate::resolver::AccessResolver;
use crate::types::RuleParams;

/// Role name matching only guest (unauthenticated) actors.
pub const GUEST_ROLE: &str = "?";

/// Role name matching only authenticated actors.
pub const AUTHENTICATED_ROLE: &str = "@";

/// Caller predicate evaluated after the role gate.
pub type MatchFn = Arc<dyn Fn(&Actor, &RuleParams) -> bool + Send + Sync>;

/// Produces rule parameters at check time.
pub type ParamsProducer = Arc<dyn Fn() -> RuleParams + Send + Sync>;

/// Single-item access decision used by the role gate.
pub trait AccessCheck {
    /// Decides whether `username` holds `item_name` given `params`.
    fn check_access(&self, username: &str, item_name: &str, params: &RuleParams) -> RbacResult<bool>;
}

impl AccessCheck for AccessResolver<'_> {
    fn check_access(&self, username: &str, item_name: &str, params: &RuleParams) -> RbacResult<bool> {
        AccessResolver::check_access(self, username, item_name, params)
    }
}

// =============================================================================
// Actor
// =============================================================================

/// The party an access check is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    username: String,
    is_guest: bool,
    is_superuser: bool,
}

impl Actor {
    /// An unauthenticated actor with an empty username.
    #[must_use]
    pub fn guest() -> Self {
        Self {
            username: String::new(),
            is_guest: true,
            is_superuser: false,
        }
    }

    /// An authenticated actor.
    #[must_use]
    pub fn user(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_guest: false,
            is_superuser: false,
        }
    }

    /// An authenticated actor that bypasses every check.
    #[must_use]
    pub fn superuser(username: impl Into<String>) -> Self {
        Self {
            is_superuser: true,
            ..Self::user(username)
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_guest(&self) -> bool {
        self.is_guest
    }

    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }
}

// =============================================================================
// Options
// =============================================================================

/// Where rule parameters for a check come from.
#[derive(Clone)]
pub enum ParamsSource {
    /// A fixed parameter set.
    Value(RuleParams),
    /// Invoked once per check.
    Producer(ParamsProducer),
}

impl ParamsSource {
    /// Returns the parameters for one check.
    pub fn resolve(&self) -> RuleParams {
        match self {
            Self::Value(params) => params.clone(),
            Self::Producer(producer) => producer(),
        }
    }
}

impl Default for ParamsSource {
    fn default() -> Self {
        Self::Value(RuleParams::new())
    }
}

impl From<RuleParams> for ParamsSource {
    fn from(params: RuleParams) -> Self {
        Self::Value(params)
    }
}

impl fmt::Debug for ParamsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(params) => f.debug_tuple("Value").field(params).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Options for a role-list check.
#[derive(Clone)]
pub struct CheckAccessOptions {
    /// Names tried in order; the first satisfied name passes the role gate.
    /// An empty list passes trivially.
    pub roles: Vec<String>,

    /// Must be `true` for a non-superuser to pass.
    pub allow: bool,

    /// Parameters handed to rules while resolving `roles`.
    pub params: ParamsSource,

    /// Extra predicate that must also hold.
    pub custom_match: Option<MatchFn>,
}

impl Default for CheckAccessOptions {
    fn default() -> Self {
        Self {
            roles: Vec::new(),
            allow: true,
            params: ParamsSource::default(),
            custom_match: None,
        }
    }
}

impl CheckAccessOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_allow(mut self, allow: bool) -> Self {
        self.allow = allow;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: RuleParams) -> Self {
        self.params = ParamsSource::Value(params);
        self
    }

    /// Computes parameters afresh on every check.
    #[must_use]
    pub fn with_params_producer<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> RuleParams + Send + Sync + 'static,
    {
        self.params = ParamsSource::Producer(Arc::new(producer));
        self
    }

    #[must_use]
    pub fn with_custom_match<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Actor, &RuleParams) -> bool + Send + Sync + 'static,
    {
        self.custom_match = Some(Arc::new(predicate));
        self
    }

    /// Returns `true` if checking `actor` against these options may consult
    /// the policy graph.
    pub fn requires_resolution(&self, actor: &Actor) -> bool {
        !actor.is_superuser() && self.roles.iter().any(|role| !is_sentinel(role))
    }
}

impl fmt::Debug for CheckAccessOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckAccessOptions")
            .field("roles", &self.roles)
            .field("allow", &self.allow)
            .field("params", &self.params)
            .field("has_custom_match", &self.custom_match.is_some())
            .finish()
    }
}

fn is_sentinel(role: &str) -> bool {
    role == GUEST_ROLE || role == AUTHENTICATED_ROLE
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluates a role-list check.
///
/// # Errors
///
/// Propagates any resolution error raised while walking `options.roles`.
pub fn check_roles(
    checker: &impl AccessCheck,
    actor: &Actor,
    options: &CheckAccessOptions,
) -> RbacResult<bool> {
    if actor.is_superuser() {
        tracing::trace!(username = actor.username(), "Superuser bypass");
        return Ok(true);
    }

    let params = options.params.resolve();

    if !role_gate(checker, actor, &options.roles, &params)? {
        return Ok(false);
    }

    if let Some(predicate) = &options.custom_match
        && !predicate(actor, &params)
    {
        tracing::trace!(username = actor.username(), "Custom match rejected");
        return Ok(false);
    }

    Ok(options.allow)
}

fn role_gate(
    checker: &impl AccessCheck,
    actor: &Actor,
    roles: &[String],
    params: &RuleParams,
) -> RbacResult<bool> {
    if roles.is_empty() {
        return Ok(true);
    }

    for role in roles {
        let matched = match role.as_str() {
            GUEST_ROLE => actor.is_guest(),
            AUTHENTICATED_ROLE => !actor.is_guest(),
            name => checker.check_access(actor.username(), name, params)?,
        };
        if matched {
            tracing::trace!(username = actor.username(), role = %role, "Role matched");
            return Ok(true);
        }
    }

    Ok(false)
}
