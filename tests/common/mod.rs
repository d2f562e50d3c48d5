//! In-memory Redfish backend for integration tests
//!
//! [`MockConnector`] serves per-host JSON resource trees through the
//! [`Connector`]/[`Connection`] seam and records every connect, read and
//! logout so tests can assert on wire behaviour without a BMC.

#![allow(dead_code)]

use futures_util::future::BoxFuture;
use redfish_exporter::error::{ExporterError, Result};
use redfish_exporter::orchestrator::{Credentials, SessionPool, TargetOrchestrator};
use redfish_exporter::redfish::{Connection, ConnectionConfig, Connector, Session};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// One simulated BMC
#[derive(Debug, Default, Clone)]
pub struct MockBmc {
    resources: HashMap<String, Value>,
    failing: HashSet<String>,
    expired_connections: usize,
    refuse_all: bool,
    refuse_after_first: bool,
}

impl MockBmc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, body: Value) -> Self {
        self.resources.insert(path.to_string(), body);
        self
    }

    /// Reads of `path` fail with a transport error
    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    /// The first `count` connections answer every read with an auth error
    pub fn expire_first(mut self, count: usize) -> Self {
        self.expired_connections = count;
        self
    }

    pub fn refuse_connections(mut self) -> Self {
        self.refuse_all = true;
        self
    }

    /// Only the first connection succeeds
    pub fn refuse_reconnect(mut self) -> Self {
        self.refuse_after_first = true;
        self
    }
}

#[derive(Debug, Default)]
struct Journal {
    connects: HashMap<String, usize>,
    requests: Vec<(String, String)>,
    logouts: Vec<(String, usize)>,
    hosts: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MockConnector {
    bmcs: Arc<HashMap<String, MockBmc>>,
    journal: Arc<Mutex<Journal>>,
}

impl MockConnector {
    pub fn new(bmcs: Vec<(&str, MockBmc)>) -> Self {
        let bmcs = bmcs
            .into_iter()
            .map(|(host, bmc)| (host.to_string(), bmc))
            .collect();
        Self {
            bmcs: Arc::new(bmcs),
            journal: Arc::default(),
        }
    }

    pub fn single(host: &str, bmc: MockBmc) -> Self {
        Self::new(vec![(host, bmc)])
    }

    fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().expect("journal lock poisoned")
    }

    /// Connection attempts against `host`, successful or not
    pub fn connects(&self, host: &str) -> usize {
        self.journal().connects.get(host).copied().unwrap_or_default()
    }

    pub fn total_connects(&self) -> usize {
        self.journal().connects.values().sum()
    }

    /// Paths read from `host`, in order
    pub fn requests(&self, host: &str) -> Vec<String> {
        self.journal()
            .requests
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, path)| path.clone())
            .collect()
    }

    /// Connection indices on `host` that were logged out, in order
    pub fn logouts(&self, host: &str) -> Vec<usize> {
        self.journal()
            .logouts
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, index)| *index)
            .collect()
    }

    /// Base URLs passed to `connect`, in order
    pub fn connected_urls(&self) -> Vec<String> {
        self.journal().hosts.clone()
    }
}

impl Connector for MockConnector {
    fn connect<'a>(
        &'a self,
        config: &'a ConnectionConfig,
    ) -> BoxFuture<'a, Result<Box<dyn Connection>>> {
        Box::pin(async move {
            let host = config
                .host
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .to_string();

            let index = {
                let mut journal = self.journal();
                journal.hosts.push(config.host.clone());
                let count = journal.connects.entry(host.clone()).or_default();
                *count += 1;
                *count - 1
            };

            let bmc = self
                .bmcs
                .get(&host)
                .ok_or_else(|| ExporterError::Connect(format!("no route to {}", host)))?;
            if bmc.refuse_all || (bmc.refuse_after_first && index > 0) {
                return Err(ExporterError::Connect(format!("{} refused connection", host)));
            }

            Ok(Box::new(MockConnection {
                host,
                index,
                expired: index < bmc.expired_connections,
                bmc: bmc.clone(),
                journal: Arc::clone(&self.journal),
            }) as Box<dyn Connection>)
        })
    }
}

struct MockConnection {
    host: String,
    index: usize,
    expired: bool,
    bmc: MockBmc,
    journal: Arc<Mutex<Journal>>,
}

impl Connection for MockConnection {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            self.journal
                .lock()
                .expect("journal lock poisoned")
                .requests
                .push((self.host.clone(), path.to_string()));
            tokio::task::yield_now().await;

            if self.expired {
                return Err(ExporterError::Auth(format!("session expired reading {}", path)));
            }
            if self.bmc.failing.contains(path) {
                return Err(ExporterError::Transport(format!("GET {} returned 500", path)));
            }
            self.bmc
                .resources
                .get(path)
                .cloned()
                .ok_or_else(|| ExporterError::NotFound(path.to_string()))
        })
    }

    fn logout(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.journal
                .lock()
                .expect("journal lock poisoned")
                .logouts
                .push((self.host.clone(), self.index));
            Ok(())
        })
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "admin".to_string(),
        password: SecretString::new("password".into()),
        insecure: true,
    }
}

pub fn orchestrator(connector: &MockConnector) -> TargetOrchestrator {
    TargetOrchestrator::new(SessionPool::new(Arc::new(connector.clone()), credentials()))
}

pub async fn session(connector: &MockConnector, host: &str) -> Session {
    let config = ConnectionConfig {
        host: format!("https://{}", host),
        username: "admin".to_string(),
        password: SecretString::new("password".into()),
        insecure: true,
    };
    Session::connect(host, config, Arc::new(connector.clone()))
        .await
        .expect("mock session should connect")
}

fn collection(members: &[&str]) -> Value {
    let members: Vec<Value> = members.iter().map(|id| json!({ "@odata.id": id })).collect();
    json!({ "Members": members })
}

fn chassis(id: &str) -> Value {
    json!({
        "Id": id,
        "Name": format!("Chassis {}", id),
        "Status": { "Health": "OK", "State": "Enabled" },
        "Thermal": { "@odata.id": format!("/redfish/v1/Chassis/{}/Thermal", id) },
        "Power": { "@odata.id": format!("/redfish/v1/Chassis/{}/Power", id) }
    })
}

/// A BMC with one system, two CPUs, and a fully populated chassis `1`
pub fn healthy_bmc() -> MockBmc {
    MockBmc::new()
        .with("/redfish/v1/Systems", collection(&["/redfish/v1/Systems/1"]))
        .with(
            "/redfish/v1/Systems/1",
            json!({
                "Id": "1",
                "PowerState": "On",
                "Status": { "Health": "OK" },
                "MemorySummary": {
                    "TotalSystemMemoryGiB": 256,
                    "Status": { "Health": "Warning" }
                },
                "Processors": { "@odata.id": "/redfish/v1/Systems/1/Processors" }
            }),
        )
        .with(
            "/redfish/v1/Systems/1/Processors",
            collection(&[
                "/redfish/v1/Systems/1/Processors/CPU1",
                "/redfish/v1/Systems/1/Processors/CPU2",
            ]),
        )
        .with(
            "/redfish/v1/Systems/1/Processors/CPU1",
            json!({
                "Id": "CPU1",
                "Model": "Intel Xeon Gold 6330",
                "TotalCores": 28,
                "Status": { "Health": "OK" }
            }),
        )
        .with(
            "/redfish/v1/Systems/1/Processors/CPU2",
            json!({
                "Id": "CPU2",
                "Model": "Intel Xeon Gold 6330",
                "TotalCores": 28,
                "Status": { "Health": "Critical" }
            }),
        )
        .with("/redfish/v1/Chassis", collection(&["/redfish/v1/Chassis/1"]))
        .with("/redfish/v1/Chassis/1", chassis("1"))
        .with(
            "/redfish/v1/Chassis/1/Thermal",
            json!({
                "Temperatures": [
                    { "Name": "CPU1 Temp", "ReadingCelsius": 45.0, "Status": { "Health": "OK" } },
                    { "Name": "Inlet Temp", "ReadingCelsius": 22.5, "Status": {} }
                ],
                "Fans": [
                    { "Name": "Fan1", "Reading": 5400, "Status": { "Health": "OK", "State": "Enabled" } },
                    { "FanName": "Fan2", "ReadingRPM": 4800, "Status": { "Health": "OK", "State": "Absent" } },
                    { "Name": "", "Reading": 100, "Status": { "Health": "OK" } }
                ]
            }),
        )
        .with(
            "/redfish/v1/Chassis/1/Power",
            json!({
                "PowerSupplies": [
                    {
                        "Name": "PS1 Status",
                        "PowerInputWatts": 210.0,
                        "PowerOutputWatts": 190.0,
                        "Status": { "Health": "OK" }
                    },
                    {
                        "Name": "PS2 Status",
                        "PowerInputWatts": 205.0,
                        "LastPowerOutputWatts": 185.0,
                        "Status": { "Health": "OK" }
                    }
                ],
                "Voltages": [
                    { "Name": "12V", "ReadingVolts": 12.0456, "Status": { "Health": "OK" } }
                ],
                "PowerControl": [
                    { "Name": "System Power Control", "PowerConsumedWatts": 0 },
                    { "PowerConsumedWatts": 380.0 },
                    { "PowerConsumedWatts": 999.0 }
                ]
            }),
        )
}

/// Chassis `A` (denylisted), `B` (no PSUs) and `C` (two PSUs); no chassis `1`
pub fn fallback_bmc() -> MockBmc {
    let denylisted = "NVMeSSD.0.Group.0.StorageBackplane";
    MockBmc::new()
        .with(
            "/redfish/v1/Chassis",
            collection(&[
                "/redfish/v1/Chassis/A",
                "/redfish/v1/Chassis/B",
                "/redfish/v1/Chassis/C",
            ]),
        )
        .with("/redfish/v1/Chassis/A", chassis(denylisted))
        .with("/redfish/v1/Chassis/B", chassis("B"))
        .with("/redfish/v1/Chassis/C", chassis("C"))
        .with(
            &format!("/redfish/v1/Chassis/{}/Power", denylisted),
            json!({ "PowerSupplies": [ { "Name": "Backplane PSU" } ] }),
        )
        .with("/redfish/v1/Chassis/B/Power", json!({ "PowerSupplies": [] }))
        .with(
            "/redfish/v1/Chassis/C/Power",
            json!({
                "PowerSupplies": [
                    { "Name": "PSU1", "PowerInputWatts": 300.0, "PowerOutputWatts": 280.0, "Status": { "Health": "OK" } },
                    { "Name": "PSU2", "PowerInputWatts": 310.0, "PowerOutputWatts": 290.0, "Status": { "Health": "Warning" } }
                ]
            }),
        )
}
