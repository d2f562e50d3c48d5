//! Multi-target Scrape Orchestration
//!
//! # Architecture
//!
//! - **SessionPool**: hostname → [`Session`] cache owned by the orchestrator.
//!   Entries are created on first use and live until [`TargetOrchestrator::close`].
//! - **Fan-out**: every scrape builds one instance of each collector family,
//!   binds it to the target, and runs all `update` calls as parallel tasks.
//! - **Join**: the scrape waits for every task. Failures are logged and
//!   dropped; a scrape never fails because a collector did.
//! - **Gather**: snapshots are read sequentially, in family order, through
//!   [`TargetScrape`], which plugs into a per-request Prometheus registry.
//!
//! # Locking
//!
//! The pool lock is held only to look up or insert a target's slot, never
//! across a network call. Connection setup happens inside the slot's
//! `OnceCell`, so concurrent first scrapes of one host share a single
//! connection attempt while other hosts proceed independently.

use crate::collectors::{self, MetricCollector};
use crate::config::RedfishConfig;
use crate::error::{ExporterError, Result};
use crate::redfish::{ConnectionConfig, Connector, Session};
use futures_util::future::BoxFuture;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// Credentials applied to every target
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub insecure: bool,
}

impl From<&RedfishConfig> for Credentials {
    fn from(config: &RedfishConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            insecure: config.insecure,
        }
    }
}

type SessionSlot = Arc<OnceCell<Arc<Session>>>;

/// Process-lifetime cache of one [`Session`] per target hostname
pub struct SessionPool {
    connector: Arc<dyn Connector>,
    credentials: Credentials,
    sessions: Mutex<HashMap<String, SessionSlot>>,
}

impl SessionPool {
    pub fn new(connector: Arc<dyn Connector>, credentials: Credentials) -> Self {
        Self {
            connector,
            credentials,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionSlot>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn connection_config(&self, target: &str) -> ConnectionConfig {
        ConnectionConfig {
            host: format!("https://{}", target),
            username: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
            insecure: self.credentials.insecure,
        }
    }

    /// Return the cached session for `target`, connecting on first use
    ///
    /// A failed connection attempt is not cached; the next caller retries.
    pub async fn get_or_create(&self, target: &str) -> Result<Arc<Session>> {
        let slot = Arc::clone(self.slots().entry(target.to_string()).or_default());

        let session = slot
            .get_or_try_init(|| async {
                info!(bmc = %target, "Creating Redfish session");
                let session = Session::connect(
                    target,
                    self.connection_config(target),
                    Arc::clone(&self.connector),
                )
                .await?;
                Ok::<_, ExporterError>(Arc::new(session))
            })
            .await?;

        Ok(Arc::clone(session))
    }

    /// Number of targets with an established session
    pub fn len(&self) -> usize {
        self.slots()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Log out of every session and empty the pool
    pub async fn close(&self) {
        let drained: Vec<(String, SessionSlot)> = self.slots().drain().collect();
        for (target, slot) in drained {
            if let Some(session) = slot.get() {
                session.close().await;
                debug!(bmc = %target, "Removed session from pool");
            }
        }
    }
}

/// Result of one collector task
#[derive(Debug)]
pub struct TaskOutcome {
    pub collector: &'static str,
    pub result: Result<()>,
}

/// Spawn every task, wait for all of them, and report outcomes in input order
pub async fn run_all(tasks: Vec<(&'static str, BoxFuture<'static, Result<()>>)>) -> Vec<TaskOutcome> {
    let handles: Vec<_> = tasks
        .into_iter()
        .map(|(name, task)| (name, tokio::spawn(task)))
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (collector, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ExporterError::Task(format!("{}: {}", collector, e))),
        };
        outcomes.push(TaskOutcome { collector, result });
    }
    outcomes
}

pub struct TargetOrchestrator {
    pool: SessionPool,
}

impl TargetOrchestrator {
    pub fn new(pool: SessionPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    pub async fn get_or_create_session(&self, target: &str) -> Result<Arc<Session>> {
        self.pool.get_or_create(target).await
    }

    /// Run every collector family against `target` and keep their snapshots
    ///
    /// Only building the metric schema can fail; Redfish problems show up as
    /// missing samples.
    pub async fn scrape(&self, target: &str) -> Result<TargetScrape> {
        let collectors = collectors::all()?;

        let session = match self.get_or_create_session(target).await {
            Ok(session) => session,
            Err(e) => {
                error!(bmc = %target, error = %e, "Failed to connect to Redfish API");
                return Ok(TargetScrape {
                    target: target.to_string(),
                    collectors,
                    outcomes: Vec::new(),
                    connected: false,
                });
            }
        };

        for collector in &collectors {
            collector.bind_target(target);
        }

        let tasks = collectors
            .iter()
            .map(|collector| {
                let name = collector.name();
                let collector = Arc::clone(collector);
                let session = Arc::clone(&session);
                let task: BoxFuture<'static, Result<()>> =
                    Box::pin(async move { collector.update(&session).await });
                (name, task)
            })
            .collect();

        let outcomes = run_all(tasks).await;
        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                error!(
                    bmc = %target,
                    collector = outcome.collector,
                    error = %e,
                    "Collector update failed"
                );
            }
        }

        Ok(TargetScrape {
            target: target.to_string(),
            collectors,
            outcomes,
            connected: true,
        })
    }

    /// Log out of every cached session; for shutdown only
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// One target's finished scrape, ready to be registered and gathered
pub struct TargetScrape {
    target: String,
    collectors: Vec<Arc<dyn MetricCollector>>,
    outcomes: Vec<TaskOutcome>,
    connected: bool,
}

impl TargetScrape {
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether a session could be obtained for the target
    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn outcomes(&self) -> &[TaskOutcome] {
        &self.outcomes
    }

    pub fn collectors(&self) -> &[Arc<dyn MetricCollector>] {
        &self.collectors
    }
}

impl Collector for TargetScrape {
    fn desc(&self) -> Vec<&Desc> {
        self.collectors
            .iter()
            .flat_map(|collector| collector.describe())
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        if !self.connected {
            return Vec::new();
        }
        self.collectors
            .iter()
            .flat_map(|collector| collector.collect_snapshot())
            .collect()
    }
}
