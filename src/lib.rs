//! Redfish Prometheus Exporter
//!
//! A multi-target Prometheus exporter for server hardware health, read from
//! BMCs over the DMTF Redfish REST API.
//!
//! # Overview
//!
//! Prometheus scrapes `/metrics?target=<bmc>`. The exporter opens (or reuses)
//! an authenticated Redfish session for that BMC, runs every collector family
//! in parallel, and answers with the combined snapshot. Metric names keep the
//! `ipmi_` prefix so existing dashboards continue to work.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  GET /metrics?target=bmc-1  ┌──────────────────────────┐   Redfish/HTTPS   ┌───────┐
//! │ Prometheus │ ──────────────────────────► │ server                   │ ◄───────────────► │ bmc-1 │
//! └────────────┘                             │  └─ TargetOrchestrator   │                   └───────┘
//!                                            │      ├─ SessionPool      │ ◄───────────────► ┌───────┐
//!                                            │      └─ collectors (x5)  │                   │ bmc-2 │
//!                                            └──────────────────────────┘                   └───────┘
//! ```
//!
//! # Modules
//!
//! - [`redfish`] - session, connection seam, resource models and chassis lookup
//! - [`collectors`] - system, sensor, power, fan and telemetry collectors
//! - [`orchestrator`] - per-target session cache and parallel scrape
//! - [`metrics`] - health encoding and shared metric helpers
//! - [`server`] - HTTP endpoints and per-request exposition
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use redfish_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod collectors;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod redfish;
pub mod server;
