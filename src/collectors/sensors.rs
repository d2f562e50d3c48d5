//! Sensor Metrics Collector
//!
//! Collects temperature and voltage readings from the primary chassis.
//!
//! # Metrics Produced
//! - `ipmi_temperature_celsius` / `ipmi_temperature_health` - Labels: name
//! - `ipmi_voltage_volts` / `ipmi_voltage_health` - Labels: name
//! - `ipmi_sensor_scrape_duration_seconds`
//!
//! Temperatures come first. If they cannot be read the cycle ends empty and
//! voltages are not attempted; if only voltages fail, temperatures are kept.

use super::{MetricCollector, SnapshotCell};
use crate::error::Result;
use crate::metrics::{gauge_vec, round, status_health, ScrapeTimer};
use crate::redfish::{ResourceLocator, Session};
use futures_util::future::BoxFuture;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::GaugeVec;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Decimal places kept for voltage readings
const VOLTAGE_PRECISION: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub value: f64,
    pub health: f64,
}

/// Readings keyed by sensor name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSnapshot {
    pub temperatures: BTreeMap<String, SensorReading>,
    pub voltages: BTreeMap<String, SensorReading>,
}

impl SensorSnapshot {
    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty() && self.voltages.is_empty()
    }
}

pub struct SensorCollector {
    timer: ScrapeTimer,
    temperature: GaugeVec,
    temperature_health: GaugeVec,
    voltage: GaugeVec,
    voltage_health: GaugeVec,
    snapshot: SnapshotCell<SensorSnapshot>,
}

impl SensorCollector {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            timer: ScrapeTimer::new("sensor")?,
            temperature: gauge_vec(
                "temperature_celsius",
                "Temperature reading in degree Celsius",
                &["name"],
            )?,
            temperature_health: gauge_vec(
                "temperature_health",
                "Temperature sensor health status (1 = OK, 0 = Warning/Critical, 2 = Not Available)",
                &["name"],
            )?,
            voltage: gauge_vec("voltage_volts", "Voltage reading in Volts", &["name"])?,
            voltage_health: gauge_vec(
                "voltage_health",
                "Voltage sensor health status (1 = OK, 0 = Warning/Critical, 2 = Not Available)",
                &["name"],
            )?,
            snapshot: SnapshotCell::new(),
        })
    }

    pub fn snapshot(&self) -> Arc<SensorSnapshot> {
        self.snapshot.load()
    }

    async fn fetch(&self, session: &Session) -> Option<SensorSnapshot> {
        let chassis = match ResourceLocator::new(session).primary().await {
            Ok(chassis) => chassis,
            Err(e) => {
                debug!(error = %e, "Failed to get main chassis");
                return None;
            }
        };

        let thermal = match chassis.thermal(session).await {
            Ok(thermal) => thermal,
            Err(e) => {
                debug!(error = %e, chassis = %chassis.id(), "Failed to get thermal information");
                return None;
            }
        };

        let mut snapshot = SensorSnapshot::default();
        for temp in thermal.temperatures.iter().filter(|t| !t.name.is_empty()) {
            snapshot.temperatures.insert(
                temp.name.clone(),
                SensorReading {
                    value: temp.reading_celsius.unwrap_or_default(),
                    health: status_health(&temp.status),
                },
            );
        }

        let power = match chassis.power(session).await {
            Ok(power) => power,
            Err(e) => {
                debug!(error = %e, chassis = %chassis.id(), "Failed to get power information");
                return Some(snapshot);
            }
        };

        for volt in power.voltages.iter().filter(|v| !v.name.is_empty()) {
            snapshot.voltages.insert(
                volt.name.clone(),
                SensorReading {
                    value: round(volt.reading_volts.unwrap_or_default(), VOLTAGE_PRECISION),
                    health: status_health(&volt.status),
                },
            );
        }

        Some(snapshot)
    }
}

impl MetricCollector for SensorCollector {
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
        let mut descs = self.temperature.desc();
        descs.extend(self.voltage.desc());
        descs.extend(self.temperature_health.desc());
        descs.extend(self.voltage_health.desc());
        descs.extend(self.timer.desc());
        descs
    }

    fn collect_snapshot(&self) -> Vec<MetricFamily> {
        let snapshot = self.snapshot.load();
        for vec in [
            &self.temperature,
            &self.temperature_health,
            &self.voltage,
            &self.voltage_health,
        ] {
            vec.reset();
        }

        for (name, reading) in &snapshot.temperatures {
            self.temperature
                .with_label_values(&[name.as_str()])
                .set(reading.value);
            self.temperature_health
                .with_label_values(&[name.as_str()])
                .set(reading.health);
        }
        for (name, reading) in &snapshot.voltages {
            self.voltage
                .with_label_values(&[name.as_str()])
                .set(reading.value);
            self.voltage_health
                .with_label_values(&[name.as_str()])
                .set(reading.health);
        }

        let mut families = self.temperature.collect();
        families.extend(self.temperature_health.collect());
        families.extend(self.voltage.collect());
        families.extend(self.voltage_health.collect());
        families.extend(self.timer.collect());
        families
    }
}
