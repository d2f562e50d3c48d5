//! Fan Metrics Collector
//!
//! # Metrics Produced
//! - `ipmi_fan_health` - Labels: name
//! - `ipmi_fan_state` - Fan operating state (1 = Enabled, 0 = Disabled). Labels: name
//! - `ipmi_fan_speed_rpm` - Labels: name
//! - `ipmi_fan_scrape_duration_seconds`

use super::{MetricCollector, SnapshotCell};
use crate::error::Result;
use crate::metrics::{gauge_vec, status_health, ScrapeTimer};
use crate::redfish::types::Thermal;
use crate::redfish::{ResourceLocator, Session};
use futures_util::future::BoxFuture;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::GaugeVec;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanReading {
    pub health: f64,
    pub state: f64,
    pub speed_rpm: f64,
}

/// Readings keyed by fan name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanSnapshot {
    pub fans: BTreeMap<String, FanReading>,
}

fn build_snapshot(thermal: &Thermal) -> FanSnapshot {
    let mut fans = BTreeMap::new();
    for fan in &thermal.fans {
        let name = fan.display_name();
        if name.is_empty() {
            continue;
        }
        let state = if fan.status.state.as_deref() == Some("Enabled") {
            1.0
        } else {
            0.0
        };
        fans.insert(
            name.to_string(),
            FanReading {
                health: status_health(&fan.status),
                state,
                speed_rpm: fan.speed(),
            },
        );
    }
    FanSnapshot { fans }
}

pub struct FansCollector {
    timer: ScrapeTimer,
    health: GaugeVec,
    state: GaugeVec,
    speed: GaugeVec,
    snapshot: SnapshotCell<FanSnapshot>,
}

impl FansCollector {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            timer: ScrapeTimer::new("fan")?,
            health: gauge_vec(
                "fan_health",
                "Fan health status (1 = OK, 0 = Warning/Critical, 2 = Not Available)",
                &["name"],
            )?,
            state: gauge_vec(
                "fan_state",
                "Fan operating state (1 = Enabled, 0 = Disabled)",
                &["name"],
            )?,
            speed: gauge_vec("fan_speed_rpm", "Fan speed in RPM", &["name"])?,
            snapshot: SnapshotCell::new(),
        })
    }

    pub fn snapshot(&self) -> Arc<FanSnapshot> {
        self.snapshot.load()
    }

    async fn fetch(&self, session: &Session) -> Option<FanSnapshot> {
        let chassis = match ResourceLocator::new(session).primary().await {
            Ok(chassis) => chassis,
            Err(e) => {
                debug!(error = %e, "Failed to get main chassis");
                return None;
            }
        };

        match chassis.thermal(session).await {
            Ok(thermal) => Some(build_snapshot(&thermal)),
            Err(e) => {
                debug!(error = %e, chassis = %chassis.id(), "Failed to get thermal information");
                None
            }
        }
    }
}

impl MetricCollector for FansCollector {
    fn name(&self) -> &'static str {
        self.timer.family()
    }

    fn bind_target(&self, target: &str) {
        self.timer.bind_target(target);
    }

    fn update<'a>(&'a self, session: &'a Session) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let start = Instant::now();
            self.snapshot.clear();

            if let Some(snapshot) = self.fetch(session).await {
                self.snapshot.replace(snapshot);
            }

            self.timer.record(start);
            Ok(())
        })
    }

    fn describe(&self) -> Vec<&Desc> {
        let mut descs = self.health.desc();
        descs.extend(self.state.desc());
        descs.extend(self.speed.desc());
        descs.extend(self.timer.desc());
        descs
    }

    fn collect_snapshot(&self) -> Vec<MetricFamily> {
        let snapshot = self.snapshot.load();
        self.health.reset();
        self.state.reset();
        self.speed.reset();

        for (name, fan) in &snapshot.fans {
            let labels = [name.as_str()];
            self.health.with_label_values(&labels).set(fan.health);
            self.state.with_label_values(&labels).set(fan.state);
            self.speed.with_label_values(&labels).set(fan.speed_rpm);
        }

        let mut families = self.health.collect();
        families.extend(self.state.collect());
        families.extend(self.speed.collect());
        families.extend(self.timer.collect());
        families
    }
}
