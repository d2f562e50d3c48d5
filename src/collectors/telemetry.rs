//! Power Telemetry Collector
//!
//! # Metrics Produced
//! - `ipmi_telemetry_power_consumption_watts` - Current power consumption in watts
//! - `ipmi_telemetry_scrape_duration_seconds`
//!
//! Only the first power-control entry with a positive consumed-watts value is
//! reported. Without one, the gauge is omitted for the cycle.

use super::{MetricCollector, SnapshotCell};
use crate::error::Result;
use crate::metrics::{ScrapeTimer, NAMESPACE};
use crate::redfish::types::Power;
use crate::redfish::{ResourceLocator, Session};
use futures_util::future::BoxFuture;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Opts};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub consumed_watts: Option<f64>,
}

/// First strictly positive consumed-watts reading
pub fn first_consumption(power: &Power) -> Option<f64> {
    power
        .power_control
        .iter()
        .filter_map(|control| control.power_consumed_watts)
        .find(|watts| *watts > 0.0)
}

pub struct TelemetryCollector {
    timer: ScrapeTimer,
    power_consumption: Gauge,
    snapshot: SnapshotCell<TelemetrySnapshot>,
}

impl TelemetryCollector {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            timer: ScrapeTimer::new("telemetry")?,
            power_consumption: Gauge::with_opts(
                Opts::new(
                    "telemetry_power_consumption_watts",
                    "Current power consumption in watts",
                )
                .namespace(NAMESPACE),
            )?,
            snapshot: SnapshotCell::new(),
        })
    }

    pub fn snapshot(&self) -> Arc<TelemetrySnapshot> {
        self.snapshot.load()
    }

    async fn fetch(&self, session: &Session) -> Option<TelemetrySnapshot> {
        let chassis = match ResourceLocator::new(session).primary().await {
            Ok(chassis) => chassis,
            Err(e) => {
                debug!(error = %e, "Failed to get main chassis");
                return None;
            }
        };

        let power = match chassis.power(session).await {
            Ok(power) => power,
            Err(e) => {
                debug!(error = %e, chassis = %chassis.id(), "Failed to get power information");
                return None;
            }
        };

        let consumed_watts = first_consumption(&power);
        if let Some(watts) = consumed_watts {
            debug!(watts, "Updated power consumption");
        }
        Some(TelemetrySnapshot { consumed_watts })
    }
}

impl MetricCollector for TelemetryCollector {
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
        let mut descs = self.power_consumption.desc();
        descs.extend(self.timer.desc());
        descs
    }

    fn collect_snapshot(&self) -> Vec<MetricFamily> {
        let mut families = Vec::new();
        if let Some(watts) = self.snapshot.load().consumed_watts {
            self.power_consumption.set(watts);
            families.extend(self.power_consumption.collect());
        }
        families.extend(self.timer.collect());
        families
    }
}
