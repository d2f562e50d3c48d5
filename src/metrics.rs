//! Prometheus Metric Helpers
//!
//! Shared building blocks for the collectors:
//!
//! - [`health_value`] - the tri-state health encoding used by every `*_health` gauge
//! - [`round`] - fixed-precision rounding for sensor readings
//! - [`ScrapeTimer`] - the per-family `ipmi_<family>_scrape_duration_seconds` gauge
//! - [`render`] - text exposition of gathered metric families
//!
//! # Health Encoding
//!
//! | Redfish `Status.Health` | Value |
//! |---|---|
//! | `"OK"` | `1.0` |
//! | any other non-empty text | `0.0` |
//! | empty or absent | `2.0` |
//!
//! All metrics use the `ipmi_` namespace prefix.

use crate::redfish::types::Status;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, TextEncoder};
use std::sync::RwLock;
use std::time::Instant;
use tracing::debug;

pub const NAMESPACE: &str = "ipmi";

pub const HEALTH_OK: f64 = 1.0;
pub const HEALTH_DEGRADED: f64 = 0.0;
pub const HEALTH_NOT_AVAILABLE: f64 = 2.0;

/// Map a Redfish health string onto the tri-state gauge value
pub fn health_value(health: Option<&str>) -> f64 {
    match health {
        None | Some("") => HEALTH_NOT_AVAILABLE,
        Some("OK") => HEALTH_OK,
        Some(_) => HEALTH_DEGRADED,
    }
}

/// [`health_value`] for a whole `Status` object
pub fn status_health(status: &Status) -> f64 {
    health_value(status.health.as_deref())
}

/// Round `value` to `places` decimal places
pub fn round(value: f64, places: i32) -> f64 {
    let multiplier = 10f64.powi(places);
    (value * multiplier).round() / multiplier
}

/// Build a labelled gauge vector in the `ipmi` namespace
pub fn gauge_vec(name: &str, help: &str, labels: &[&str]) -> prometheus::Result<GaugeVec> {
    GaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), labels)
}

/// Records how long one collector family took to update
pub struct ScrapeTimer {
    family: &'static str,
    duration: Gauge,
    target: RwLock<String>,
}

impl ScrapeTimer {
    pub fn new(family: &'static str) -> prometheus::Result<Self> {
        let duration = Gauge::with_opts(
            Opts::new(
                "scrape_duration_seconds",
                "Duration of the last scrape in seconds",
            )
            .namespace(NAMESPACE)
            .subsystem(family),
        )?;

        Ok(Self {
            family,
            duration,
            target: RwLock::new(String::new()),
        })
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn bind_target(&self, target: &str) {
        let mut guard = match self.target.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = target.to_string();
    }

    pub fn target(&self) -> String {
        match self.target.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Set the gauge to the time elapsed since `start`
    pub fn record(&self, start: Instant) {
        let seconds = start.elapsed().as_secs_f64();
        self.duration.set(seconds);
        debug!(
            duration_seconds = seconds,
            subsystem = %format!("{}_{}", NAMESPACE, self.family),
            bmc = %self.target(),
            "scrape completed"
        );
    }

    pub fn seconds(&self) -> f64 {
        self.duration.get()
    }

    pub fn desc(&self) -> Vec<&Desc> {
        self.duration.desc()
    }

    pub fn collect(&self) -> Vec<MetricFamily> {
        self.duration.collect()
    }
}

/// Encode gathered families in the Prometheus text format
pub fn render(families: &[MetricFamily]) -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
