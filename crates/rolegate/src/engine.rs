//! Policy engine: snapshot loading and access checks.
//!
//! The engine owns the currently published [`PolicyState`] behind an
//! [`ArcSwapOption`]. Checks take one `Arc` of the state and resolve entirely
//! against it, so a concurrent reload never exposes a half-built graph.
//!
//! Loads are single-flight: callers that arrive while a load is running wait
//! for it and receive its outcome instead of fetching again.
//!
//! # Example
//!
//! ```ignore
//! use rolegate::prelude::*;
//!
//! let config = RbacConfig::from_file("rolegate.toml")?;
//! let engine = RbacEngine::from_config(&config, RuleRegistry::with_builtin_rules(), None)?;
//!
//! // The first check loads the snapshot.
//! let allowed = engine
//!     .check_access("alice", "post.edit", &RuleParams::new())
//!     .await?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;

use crate::assignment::AssignmentStore;
use crate::config::{EngineConfig, RbacConfig};
use crate::graph::PolicyGraph;
use crate::matcher::{self, AccessCheck, Actor, CheckAccessOptions};
use crate::resolver::AccessResolver;
use crate::rule::RuleRegistry;
use crate::snapshot::Snapshot;
use crate::source::{HttpSnapshotSource, SnapshotSource, TokenProvider};
use crate::types::RuleParams;
use crate::{RbacError, RbacResult};

// =============================================================================
// Policy State
// =============================================================================

/// One published policy: graph, assignments and the load version that
/// produced them.
#[derive(Debug, Default)]
pub struct PolicyState {
    graph: PolicyGraph,
    assignments: AssignmentStore,
    version: u64,
}

impl PolicyState {
    /// Materializes a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRule` if any rule configuration cannot be parsed.
    pub fn build(snapshot: &Snapshot, registry: &RuleRegistry, version: u64) -> RbacResult<Self> {
        Ok(Self {
            graph: PolicyGraph::build(snapshot, registry)?,
            assignments: AssignmentStore::build(snapshot),
            version,
        })
    }

    pub fn graph(&self) -> &PolicyGraph {
        &self.graph
    }

    pub fn assignments(&self) -> &AssignmentStore {
        &self.assignments
    }

    /// Load counter value; starts at 1 for the first published state.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// A resolver over this state.
    pub fn resolver(&self) -> AccessResolver<'_> {
        AccessResolver::new(&self.graph, &self.assignments)
    }

    /// Summary counts.
    pub fn stats(&self) -> PolicyStats {
        PolicyStats {
            items: self.graph.item_count(),
            roles: self.graph.role_count(),
            permissions: self.graph.permission_count(),
            rules: self.graph.rule_count(),
            actors: self.assignments.actor_count(),
            assignments: self.assignments.assignment_count(),
            version: self.version,
        }
    }
}

impl AccessCheck for PolicyState {
    fn check_access(&self, username: &str, item_name: &str, params: &RuleParams) -> RbacResult<bool> {
        self.resolver().check_access(username, item_name, params)
    }
}

/// Summary counts for a published policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyStats {
    pub items: usize,
    pub roles: usize,
    pub permissions: usize,
    pub rules: usize,
    pub actors: usize,
    pub assignments: usize,
    pub version: u64,
}

/// Engine readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// No policy has been published yet.
    NotLoaded,
    /// A load is in flight. A previously published policy, if any, is still
    /// served.
    Loading,
    /// A policy is published.
    Ready {
        /// Version of the published policy.
        version: u64,
    },
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoaded => write!(f, "not loaded"),
            Self::Loading => write!(f, "loading"),
            Self::Ready { version } => write!(f, "ready (version {version})"),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Outcome of the most recent load, shared with callers that waited on it.
#[derive(Debug, Default)]
struct LoadGate {
    completed: u64,
    last: Option<RbacResult<u64>>,
}

/// Clears the loading flag even if the load future is dropped.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Loads policy snapshots and answers access checks.
pub struct RbacEngine {
    source: Arc<dyn SnapshotSource>,
    registry: RuleRegistry,
    config: EngineConfig,
    state: ArcSwapOption<PolicyState>,
    gate: Mutex<LoadGate>,
    /// Mirror of `LoadGate::completed`, readable without the lock.
    completed_loads: AtomicU64,
    loading: AtomicBool,
}

impl RbacEngine {
    /// Creates an engine over `source`. Nothing is fetched until the first
    /// [`load`](Self::load) or check.
    pub fn new(source: Arc<dyn SnapshotSource>, registry: RuleRegistry, config: EngineConfig) -> Self {
        Self {
            source,
            registry,
            config,
            state: ArcSwapOption::empty(),
            gate: Mutex::new(LoadGate::default()),
            completed_loads: AtomicU64::new(0),
            loading: AtomicBool::new(false),
        }
    }

    /// Creates an engine fetching from the HTTP source described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the source configuration is invalid.
    pub fn from_config(
        config: &RbacConfig,
        registry: RuleRegistry,
        token_provider: Option<TokenProvider>,
    ) -> RbacResult<Self> {
        let mut source = HttpSnapshotSource::new(&config.source)?;
        if let Some(provider) = token_provider {
            source = source.with_token_provider(provider);
        }
        Ok(Self::new(Arc::new(source), registry, config.engine.clone()))
    }

    /// Fetches the snapshot and publishes the resulting policy.
    ///
    /// A "not found" response publishes an empty policy. Any other failure
    /// leaves the previously published policy in place. Concurrent calls share
    /// a single fetch.
    ///
    /// # Errors
    ///
    /// Returns the load error of the fetch this call observed.
    pub async fn load(&self) -> RbacResult<()> {
        let seen = self.completed_loads.load(Ordering::Acquire);
        self.load_after(seen).await
    }

    /// Runs a load unless one completed after the caller observed `seen`
    /// completions, in which case that load's outcome is returned.
    async fn load_after(&self, seen: u64) -> RbacResult<()> {
        let mut gate = self.gate.lock().await;

        // A load finished while we waited for the gate; share its outcome.
        if gate.completed != seen
            && let Some(outcome) = &gate.last
        {
            tracing::debug!("Joining completed policy load");
            return outcome.clone().map(|_| ());
        }

        let outcome = {
            let _loading = LoadingGuard::set(&self.loading);
            self.fetch_and_publish().await
        };

        gate.completed += 1;
        gate.last = Some(outcome.clone());
        self.completed_loads.store(gate.completed, Ordering::Release);

        outcome.map(|_| ())
    }

    async fn fetch_and_publish(&self) -> RbacResult<u64> {
        let snapshot = match self.source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_not_found() => {
                tracing::debug!("No policy snapshot published, using empty policy");
                Snapshot::empty()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Policy load failed, keeping previous state");
                return Err(e);
            }
        };

        let version = self.state.load_full().map_or(0, |state| state.version) + 1;
        let state = PolicyState::build(&snapshot, &self.registry, version).inspect_err(|e| {
            tracing::warn!(error = %e, "Policy snapshot rejected, keeping previous state");
        })?;
        let stats = state.stats();

        self.state.store(Some(Arc::new(state)));

        tracing::info!(
            version,
            items = stats.items,
            rules = stats.rules,
            actors = stats.actors,
            assignments = stats.assignments,
            "Policy published"
        );

        Ok(version)
    }

    /// Current readiness.
    pub fn status(&self) -> EngineStatus {
        if self.loading.load(Ordering::Acquire) {
            return EngineStatus::Loading;
        }
        match self.state.load_full() {
            Some(state) => EngineStatus::Ready {
                version: state.version,
            },
            None => EngineStatus::NotLoaded,
        }
    }

    /// Returns `true` once a policy has been published.
    pub fn is_ready(&self) -> bool {
        self.state.load().is_some()
    }

    /// The currently published policy, if any.
    pub fn snapshot(&self) -> Option<Arc<PolicyState>> {
        self.state.load_full()
    }

    /// Counts for the currently published policy, if any.
    pub fn stats(&self) -> Option<PolicyStats> {
        self.state.load_full().map(|state| state.stats())
    }

    /// The rule registry used to build policies.
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Decides whether `username` holds `item_name` given `params`.
    ///
    /// The first check on an unloaded engine triggers a load when lazy loading
    /// is enabled.
    ///
    /// # Errors
    ///
    /// Returns the load error if the implicit load fails, `Configuration` if
    /// the engine is not loaded and lazy loading is disabled, or a resolution
    /// error such as `MissingRule`.
    pub async fn check_access(&self, username: &str, item_name: &str, params: &RuleParams) -> RbacResult<bool> {
        let state = self.ready_state().await?;
        let granted = state.check_access(username, item_name, params)?;
        tracing::debug!(username, item = item_name, granted, "Access check");
        Ok(granted)
    }

    /// Evaluates a role-list check for `actor`.
    ///
    /// The policy is only loaded when a role name other than the guest or
    /// authenticated sentinel has to be resolved.
    ///
    /// # Errors
    ///
    /// Same as [`check_access`](Self::check_access).
    pub async fn check(&self, actor: &Actor, options: &CheckAccessOptions) -> RbacResult<bool> {
        let state = if options.requires_resolution(actor) {
            self.ready_state().await?
        } else {
            Arc::new(PolicyState::default())
        };
        let granted = matcher::check_roles(&*state, actor, options)?;
        tracing::debug!(username = actor.username(), roles = ?options.roles, granted, "Role check");
        Ok(granted)
    }

    async fn ready_state(&self) -> RbacResult<Arc<PolicyState>> {
        // Read before the state so a load publishing in between is joined,
        // not repeated.
        let seen = self.completed_loads.load(Ordering::Acquire);
        if let Some(state) = self.state.load_full() {
            return Ok(state);
        }

        if !self.config.lazy_load {
            return Err(RbacError::configuration(
                "Policy is not loaded and lazy loading is disabled",
            ));
        }

        tracing::debug!("Policy not loaded, loading on first check");
        self.load_after(seen).await?;
        self.state
            .load_full()
            .ok_or_else(|| RbacError::configuration("Policy load completed without publishing"))
    }
}

impl fmt::Debug for RbacEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RbacEngine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}
