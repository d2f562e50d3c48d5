//! Power Supply Metrics Collector
//!
//! Collects PSU health and input/output wattage.
//!
//! # Metrics Produced
//! - `ipmi_psu_health` - Labels: name
//! - `ipmi_psu_ac_input_power_watts` - Labels: name
//! - `ipmi_psu_dc_output_power_watts` - Labels: name
//! - `ipmi_power_scrape_duration_seconds`
//!
//! PSUs are labelled `PSU 1`, `PSU 2`, ... in the order the BMC lists them,
//! whatever the BMC calls them. When the primary chassis or its power
//! resource is unavailable, the remaining chassis are scanned (see
//! [`ResourceLocator::power_fallback`]).

use super::{MetricCollector, SnapshotCell};
use crate::error::Result;
use crate::metrics::{gauge_vec, status_health, ScrapeTimer};
use crate::redfish::locator::PRIMARY_CHASSIS_ID;
use crate::redfish::types::Power;
use crate::redfish::{ResourceLocator, Session};
use futures_util::future::BoxFuture;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::GaugeVec;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct PsuReading {
    /// Ordinal display name, e.g. `PSU 1`
    pub name: String,
    pub health: f64,
    pub ac_input_watts: f64,
    pub dc_output_watts: f64,
}

/// Readings keyed by the PSU's own resource name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerSnapshot {
    pub chassis: Option<String>,
    pub supplies: BTreeMap<String, PsuReading>,
}

/// Number of PSUs with a name, i.e. ones that produce readings
pub fn usable_supplies(power: &Power) -> usize {
    power
        .power_supplies
        .iter()
        .filter(|psu| !psu.name.is_empty())
        .count()
}

fn build_snapshot(chassis: &str, power: &Power) -> PowerSnapshot {
    let mut supplies = BTreeMap::new();
    let named = power.power_supplies.iter().filter(|psu| !psu.name.is_empty());
    for (index, psu) in named.enumerate() {
        supplies.insert(
            psu.name.clone(),
            PsuReading {
                name: format!("PSU {}", index + 1),
                health: status_health(&psu.status),
                ac_input_watts: psu.power_input_watts.unwrap_or_default(),
                dc_output_watts: psu.output_watts(),
            },
        );
    }
    PowerSnapshot {
        chassis: Some(chassis.to_string()),
        supplies,
    }
}

pub struct PowerCollector {
    timer: ScrapeTimer,
    psu_health: GaugeVec,
    psu_ac_input_power: GaugeVec,
    psu_dc_output_power: GaugeVec,
    snapshot: SnapshotCell<PowerSnapshot>,
}

impl PowerCollector {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            timer: ScrapeTimer::new("power")?,
            psu_health: gauge_vec(
                "psu_health",
                "Power supply health status (1 = OK, 0 = Warning/Critical, 2 = Not Available)",
                &["name"],
            )?,
            psu_ac_input_power: gauge_vec(
                "psu_ac_input_power_watts",
                "Power supply AC input power in watts",
                &["name"],
            )?,
            psu_dc_output_power: gauge_vec(
                "psu_dc_output_power_watts",
                "Power supply DC output power in watts",
                &["name"],
            )?,
            snapshot: SnapshotCell::new(),
        })
    }

    pub fn snapshot(&self) -> Arc<PowerSnapshot> {
        self.snapshot.load()
    }

    async fn fetch(&self, session: &Session) -> Result<PowerSnapshot> {
        let locator = ResourceLocator::new(session);

        let primary = match locator.by_id(PRIMARY_CHASSIS_ID).await {
            Ok(chassis) => match chassis.power(session).await {
                Ok(power) => Some((chassis, power)),
                Err(e) => {
                    debug!(error = %e, "Failed to get power information from primary chassis");
                    None
                }
            },
            Err(e) => {
                debug!(error = %e, "Failed to get primary chassis");
                None
            }
        };

        let (chassis, power) = match primary {
            Some(found) => found,
            None => locator.power_fallback(usable_supplies).await?,
        };

        Ok(build_snapshot(chassis.id(), &power))
    }
}

impl MetricCollector for PowerCollector {
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

            let result = self.fetch(session).await.map(|snapshot| {
                self.snapshot.replace(snapshot);
            });

            self.timer.record(start);
            result
        })
    }

    fn describe(&self) -> Vec<&Desc> {
        let mut descs = self.psu_health.desc();
        descs.extend(self.psu_ac_input_power.desc());
        descs.extend(self.psu_dc_output_power.desc());
        descs.extend(self.timer.desc());
        descs
    }

    fn collect_snapshot(&self) -> Vec<MetricFamily> {
        let snapshot = self.snapshot.load();
        self.psu_health.reset();
        self.psu_ac_input_power.reset();
        self.psu_dc_output_power.reset();

        for reading in snapshot.supplies.values() {
            let labels = [reading.name.as_str()];
            self.psu_health.with_label_values(&labels).set(reading.health);
            self.psu_ac_input_power
                .with_label_values(&labels)
                .set(reading.ac_input_watts);
            self.psu_dc_output_power
                .with_label_values(&labels)
                .set(reading.dc_output_watts);
        }

        let mut families = self.psu_health.collect();
        families.extend(self.psu_ac_input_power.collect());
        families.extend(self.psu_dc_output_power.collect());
        families.extend(self.timer.collect());
        families
    }
}
