//! Metrics Collectors
//!
//! One collector per metric family. Each scrape builds a fresh set of
//! collectors for its target, so a collector never serves two targets.
//!
//! # Architecture
//!
//! Collectors follow a consistent pattern:
//! - `bind_target` records the target for log correlation
//! - `update` resets the snapshot to empty, queries Redfish through the shared
//!   [`Session`], and publishes a complete new snapshot
//! - `collect_snapshot` turns the last published snapshot into metric families
//! - `describe` lists the metric descriptors, independent of any target
//!
//! # Error Handling
//!
//! Fetch failures are non-fatal. A collector that cannot reach its resources
//! logs at debug level and is left with an empty snapshot for that cycle, never
//! the previous one. An `Err` from `update` only tells the orchestrator there
//! is something worth logging.

use crate::error::Result;
use crate::redfish::Session;
use futures_util::future::BoxFuture;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use std::sync::{Arc, RwLock};

pub mod fans;
pub mod power;
pub mod sensors;
pub mod system;
pub mod telemetry;

pub use fans::FansCollector;
pub use power::PowerCollector;
pub use sensors::SensorCollector;
pub use system::SystemCollector;
pub use telemetry::TelemetryCollector;

/// Contract shared by every metric family
pub trait MetricCollector: Send + Sync {
    /// Short family name used in logs and the scrape-duration metric
    fn name(&self) -> &'static str;

    /// Record which target the next `update` queries
    fn bind_target(&self, target: &str);

    /// Replace the snapshot with fresh readings from `session`
    fn update<'a>(&'a self, session: &'a Session) -> BoxFuture<'a, Result<()>>;

    fn describe(&self) -> Vec<&Desc>;

    /// Emit the last published snapshot
    fn collect_snapshot(&self) -> Vec<MetricFamily>;
}

/// Build one instance of every collector family, in emission order
pub fn all() -> prometheus::Result<Vec<Arc<dyn MetricCollector>>> {
    Ok(vec![
        Arc::new(SystemCollector::new()?),
        Arc::new(SensorCollector::new()?),
        Arc::new(PowerCollector::new()?),
        Arc::new(FansCollector::new()?),
        Arc::new(TelemetryCollector::new()?),
    ])
}

/// Holds an immutable snapshot that is swapped wholesale
///
/// Readers clone the `Arc` and never observe a half-built snapshot; writers
/// build the next value off-lock and replace it in one assignment.
pub struct SnapshotCell<T> {
    current: RwLock<Arc<T>>,
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self {
            current: RwLock::new(Arc::new(T::default())),
        }
    }
}

impl<T: Default> SnapshotCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.replace(T::default());
    }
}

impl<T> SnapshotCell<T> {
    pub fn replace(&self, next: T) {
        let next = Arc::new(next);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = next;
    }

    pub fn load(&self) -> Arc<T> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}
