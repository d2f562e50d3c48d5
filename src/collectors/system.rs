//! System Metrics Collector
//!
//! Collects power state, per-CPU health and overall memory health from the
//! first computer system the BMC reports.
//!
//! # Metrics Produced
//! - `ipmi_system_power_state` - System power state (1 = On, 0 = Off)
//! - `ipmi_cpu_health` - CPU health status
//!   - Labels: name, model, cores
//! - `ipmi_memory_health` - Overall memory subsystem health status
//!   - Labels: total_gib
//! - `ipmi_system_scrape_duration_seconds`
//!
//! Power state and memory health are system-wide. They ride on the reading of
//! the first processor and are emitted exactly once.

use super::{MetricCollector, SnapshotCell};
use crate::error::Result;
use crate::metrics::{gauge_vec, status_health, ScrapeTimer};
use crate::redfish::types::{Collection, ComputerSystem, Processor, SYSTEMS};
use crate::redfish::Session;
use futures_util::future::BoxFuture;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, Opts};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// System-wide values folded onto the first processor's reading
#[derive(Debug, Clone, PartialEq)]
pub struct SystemWide {
    pub power_state: f64,
    pub memory_health: f64,
    pub total_memory_gib: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorReading {
    pub health: f64,
    pub model: String,
    pub cores: u32,
    pub system: Option<SystemWide>,
}

/// Readings keyed by processor id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemSnapshot {
    pub processors: BTreeMap<String, ProcessorReading>,
}

pub struct SystemCollector {
    timer: ScrapeTimer,
    power_state: Gauge,
    cpu_health: GaugeVec,
    memory_health: GaugeVec,
    snapshot: SnapshotCell<SystemSnapshot>,
}

impl SystemCollector {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            timer: ScrapeTimer::new("system")?,
            power_state: Gauge::with_opts(
                Opts::new("system_power_state", "System power state (1 = On, 0 = Off)")
                    .namespace(crate::metrics::NAMESPACE),
            )?,
            cpu_health: gauge_vec(
                "cpu_health",
                "CPU health status (1 = OK, 0 = Warning/Critical, 2 = Not Available)",
                &["name", "model", "cores"],
            )?,
            memory_health: gauge_vec(
                "memory_health",
                "Overall memory subsystem health status (1 = OK, 0 = Warning/Critical, 2 = Not Available)",
                &["total_gib"],
            )?,
            snapshot: SnapshotCell::new(),
        })
    }

    pub fn snapshot(&self) -> Arc<SystemSnapshot> {
        self.snapshot.load()
    }

    async fn fetch(&self, session: &Session) -> Option<SystemSnapshot> {
        let systems: Collection = match session.call(SYSTEMS).await {
            Ok(systems) => systems,
            Err(e) => {
                debug!(error = %e, "Failed to get systems");
                return None;
            }
        };

        let Some(first) = systems.members.first() else {
            debug!("No computer systems reported");
            return None;
        };

        let system: ComputerSystem = match session.call(&first.odata_id).await {
            Ok(system) => system,
            Err(e) => {
                debug!(error = %e, system = %first.odata_id, "Failed to get system");
                return None;
            }
        };

        let processors = match &system.processors {
            Some(link) => match session.call::<Collection>(&link.odata_id).await {
                Ok(collection) => collection,
                Err(e) => {
                    debug!(error = %e, "Failed to get processors");
                    return None;
                }
            },
            None => {
                debug!(system = %system.id, "System exposes no processors");
                return None;
            }
        };

        let mut cpus = Vec::with_capacity(processors.members.len());
        for member in &processors.members {
            match session.call::<Processor>(&member.odata_id).await {
                Ok(cpu) => cpus.push(cpu),
                Err(e) => debug!(error = %e, processor = %member.odata_id, "Failed to get processor"),
            }
        }

        Some(build_snapshot(&system, &cpus))
    }
}

fn build_snapshot(system: &ComputerSystem, cpus: &[Processor]) -> SystemSnapshot {
    let power_state = if system.power_state.as_deref() == Some("On") {
        1.0
    } else {
        0.0
    };

    let mut processors = BTreeMap::new();
    for cpu in cpus {
        processors.insert(
            cpu.id.clone(),
            ProcessorReading {
                health: status_health(&cpu.status),
                model: cpu.model.clone().unwrap_or_default(),
                cores: cpu.total_cores.unwrap_or_default(),
                system: None,
            },
        );
    }

    if let Some(reading) = cpus.first().and_then(|cpu| processors.get_mut(&cpu.id)) {
        let memory = &system.memory_summary;
        reading.system = Some(SystemWide {
            power_state,
            memory_health: status_health(&memory.status),
            total_memory_gib: format!("{:.0}", memory.total_system_memory_gib.unwrap_or_default()),
        });
    }

    SystemSnapshot { processors }
}

impl MetricCollector for SystemCollector {
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
        let mut descs = self.power_state.desc();
        descs.extend(self.cpu_health.desc());
        descs.extend(self.memory_health.desc());
        descs.extend(self.timer.desc());
        descs
    }

    fn collect_snapshot(&self) -> Vec<MetricFamily> {
        let snapshot = self.snapshot.load();
        self.cpu_health.reset();
        self.memory_health.reset();

        let mut families = Vec::new();
        for (id, reading) in &snapshot.processors {
            if let Some(system) = &reading.system {
                self.power_state.set(system.power_state);
                families.extend(self.power_state.collect());
                self.memory_health
                    .with_label_values(&[system.total_memory_gib.as_str()])
                    .set(system.memory_health);
            }

            let cores = reading.cores.to_string();
            self.cpu_health
                .with_label_values(&[id.as_str(), reading.model.as_str(), cores.as_str()])
                .set(reading.health);
        }

        families.extend(self.cpu_health.collect());
        families.extend(self.memory_health.collect());
        families.extend(self.timer.collect());
        families
    }
}
