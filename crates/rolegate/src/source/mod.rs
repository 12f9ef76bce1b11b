//! Snapshot sources.
//!
//! A [`SnapshotSource`] fetches the complete policy document. Sources report
//! an unpublished document as [`RbacError::SnapshotNotFound`]; the engine
//! turns that into an empty policy.

pub mod http;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::snapshot::Snapshot;
use crate::{RbacError, RbacResult};

pub use http::{HttpSnapshotSource, TokenProvider};

/// Fetches the policy snapshot from wherever it is published.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetches the complete snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotNotFound` when no document has been published, or any
    /// other load error on failure.
    async fn fetch(&self) -> RbacResult<Snapshot>;
}

/// Serves a snapshot held in memory.
///
/// The snapshot can be swapped with [`replace`](Self::replace) to emulate a
/// remote document changing between loads.
#[derive(Debug, Default)]
pub struct StaticSnapshotSource {
    snapshot: Mutex<Option<Snapshot>>,
    fetch_count: AtomicUsize,
}

impl StaticSnapshotSource {
    /// A source that serves `snapshot`.
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            fetch_count: AtomicUsize::new(0),
        }
    }

    /// A source with no published document; every fetch reports not found.
    #[must_use]
    pub fn not_found() -> Self {
        Self::default()
    }

    /// Replaces the served snapshot. `None` makes later fetches report not found.
    pub fn replace(&self, snapshot: Option<Snapshot>) {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    async fn fetch(&self) -> RbacResult<Snapshot> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(RbacError::SnapshotNotFound)
    }
}
