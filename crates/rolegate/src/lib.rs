//! # rolegate
//!
//! Role-based access resolution over a remotely published policy snapshot.
//!
//! This crate provides:
//! - A policy graph of roles and permissions with inherited grants
//! - Pluggable rules that gate individual items
//! - An engine that loads the snapshot once, publishes it atomically and
//!   answers access checks concurrently
//! - Role-list checks with guest and authenticated sentinels
//!
//! ## Modules
//!
//! - [`config`] - Source and engine configuration
//! - [`snapshot`] - Snapshot wire format
//! - [`source`] - Snapshot sources (HTTP, in-memory)
//! - [`rule`] - Rule trait, registry and built-in rule types
//! - [`graph`] - Policy graph built from a snapshot
//! - [`assignment`] - Direct per-actor assignments
//! - [`resolver`] - Access resolution over the parent graph
//! - [`matcher`] - Role-list checks
//! - [`engine`] - Loading, publication and the public check API

pub mod assignment;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod matcher;
pub mod resolver;
pub mod rule;
pub mod snapshot;
pub mod source;
pub mod types;

pub use config::{ConfigError, EngineConfig, RbacConfig, SourceConfig};
pub use engine::{EngineStatus, PolicyState, PolicyStats, RbacEngine};
pub use error::{ErrorCategory, RbacError};
pub use matcher::{
    AUTHENTICATED_ROLE, AccessCheck, Actor, CheckAccessOptions, GUEST_ROLE, MatchFn, ParamsSource,
};
pub use rule::{ConfiguredRule, NoopRule, Rule, RuleFactory, RuleRegistry};
pub use snapshot::Snapshot;
pub use source::{HttpSnapshotSource, SnapshotSource, StaticSnapshotSource, TokenProvider};
pub use types::{Assignment, Item, ItemKind, RuleParams};

/// Type alias for loading and resolution results.
pub type RbacResult<T> = Result<T, RbacError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use rolegate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::RbacResult;
    pub use crate::config::{ConfigError, EngineConfig, RbacConfig, SourceConfig};
    pub use crate::engine::{EngineStatus, PolicyState, PolicyStats, RbacEngine};
    pub use crate::error::{ErrorCategory, RbacError};
    pub use crate::matcher::{
        AUTHENTICATED_ROLE, Actor, CheckAccessOptions, GUEST_ROLE, ParamsSource,
    };
    pub use crate::rule::{ConfiguredRule, Rule, RuleRegistry};
    pub use crate::snapshot::{ItemDefinition, RuleDefinition, Snapshot};
    pub use crate::source::{HttpSnapshotSource, SnapshotSource, StaticSnapshotSource};
    pub use crate::types::{Item, ItemKind, RuleParams};
}
