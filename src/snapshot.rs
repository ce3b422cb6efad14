//! Versioned index snapshots
//!
//! The serving process holds one [`SharedIndex`]. Readers take an `Arc` to the
//! current [`IndexSnapshot`] and keep using it until they are done, even if a
//! refresh publishes a newer one in the meantime. A refresh builds the new
//! index off to the side and publishes it with a single pointer swap; the old
//! snapshot is dropped once its last reader lets go.

use crate::builder::{BuildError, BuildStats, BuiltIndex, IndexBuilder};
use crate::index::ContainmentIndex;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// An immutable, fully built index plus its provenance
#[derive(Debug)]
pub struct IndexSnapshot {
    pub index: Arc<ContainmentIndex>,
    pub stats: BuildStats,
    /// Monotonic publish counter, starting at 1
    pub version: u64,
    pub built_at: DateTime<Utc>,
    pub root: PathBuf,
}

/// Serializable summary of a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub version: u64,
    pub built_at: String,
    pub root: String,
    pub files: usize,
    pub entries: usize,
    pub ipv4_entries: usize,
    pub ipv6_entries: usize,
    pub labels: usize,
    pub skipped_lines: usize,
}

impl IndexSnapshot {
    fn new(built: BuiltIndex, version: u64, root: PathBuf) -> Self {
        Self {
            index: Arc::new(built.index),
            stats: built.stats,
            version,
            built_at: Utc::now(),
            root,
        }
    }

    pub fn info(&self) -> SnapshotInfo {
        use crate::prefix::AddressFamily;

        SnapshotInfo {
            version: self.version,
            built_at: self.built_at.to_rfc3339(),
            root: self.root.display().to_string(),
            files: self.stats.files,
            entries: self.index.len(),
            ipv4_entries: self.index.family_len(AddressFamily::V4),
            ipv6_entries: self.index.family_len(AddressFamily::V6),
            labels: self.index.labels().len(),
            skipped_lines: self.stats.skipped_lines,
        }
    }
}

/// Handle to the current snapshot, swapped atomically on refresh
pub struct SharedIndex {
    current: ArcSwap<IndexSnapshot>,
}

impl SharedIndex {
    /// Wrap an initial build as version 1
    pub fn new(built: BuiltIndex, root: impl Into<PathBuf>) -> Self {
        Self {
            current: ArcSwap::from_pointee(IndexSnapshot::new(built, 1, root.into())),
        }
    }

    /// Run the builder once and wrap the result as version 1
    pub fn build(builder: &IndexBuilder) -> Result<Self, BuildError> {
        let built = builder.build()?;
        Ok(Self::new(built, builder.root()))
    }

    /// The snapshot current at the time of the call
    pub fn load(&self) -> Arc<IndexSnapshot> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Publish a new index, replacing the current snapshot. Returns the new version.
    ///
    /// The version bump and the swap happen in one step, so concurrent
    /// publishers never hand out the same version.
    pub fn publish(&self, built: BuiltIndex, root: impl Into<PathBuf>) -> u64 {
        let index = Arc::new(built.index);
        let stats = built.stats;
        let root = root.into();
        let built_at = Utc::now();

        // the closure may run more than once if another publisher wins the race
        let previous = self.current.rcu(|current| IndexSnapshot {
            index: index.clone(),
            stats: stats.clone(),
            version: current.version + 1,
            built_at,
            root: root.clone(),
        });
        let version = previous.version + 1;
        info!(
            "published index version {} ({} prefixes)",
            version, stats.entries
        );
        version
    }

    /// Rebuild with `builder` and publish on success.
    ///
    /// On failure the current snapshot stays in place and the error is returned.
    pub fn refresh(&self, builder: &IndexBuilder) -> Result<u64, BuildError> {
        match builder.build() {
            Ok(built) => Ok(self.publish(built, builder.root())),
            Err(e) => {
                warn!(
                    "index refresh failed, keeping version {}: {}",
                    self.version(),
                    e
                );
                Err(e)
            }
        }
    }
}
