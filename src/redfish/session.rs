//! Per-target Redfish Session
//!
//! A [`Session`] owns the single live [`Connection`] to one BMC. All reads go
//! through one `tokio::sync::Mutex`, so collectors running in parallel against
//! the same target queue up rather than interleave on the wire. The same lock
//! covers reconnects, which means at most one reconnect is ever in flight.

use crate::error::{ExporterError, Result};
use crate::redfish::connection::{Connection, ConnectionConfig, Connector};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct Session {
    target: String,
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    /// `None` only after a failed reconnect or after `close`
    connection: Mutex<Option<Box<dyn Connection>>>,
}

impl Session {
    /// Establish the first connection for `target`
    pub async fn connect(
        target: impl Into<String>,
        config: ConnectionConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let connection = connector.connect(&config).await?;
        Ok(Self {
            target: target.into(),
            config,
            connector,
            connection: Mutex::new(Some(connection)),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Read the resource at `path` and deserialize it
    ///
    /// An authentication failure triggers exactly one reconnect followed by
    /// one retry. A failed reconnect reports the original error together with
    /// the reconnect failure.
    pub async fn call<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut guard = self.connection.lock().await;

        if guard.is_none() {
            info!(bmc = %self.target, "Re-establishing Redfish session");
            *guard = Some(self.connector.connect(&self.config).await?);
        }

        let first = match guard.as_ref() {
            Some(conn) => conn.get(path).await,
            None => return Err(ExporterError::Connect("no active connection".to_string())),
        };

        let value = match first {
            Ok(value) => value,
            Err(e) if e.is_auth() => {
                warn!(bmc = %self.target, error = %e, "Session rejected, reconnecting");
                if let Err(reconnect) = self.reconnect_locked(&mut guard).await {
                    return Err(ExporterError::Reconnect {
                        original: Box::new(e),
                        reconnect: Box::new(reconnect),
                    });
                }
                match guard.as_ref() {
                    Some(conn) => conn.get(path).await.map_err(|retry| {
                        if retry.is_auth() {
                            ExporterError::Transport(format!(
                                "still unauthorized after reconnect: {}",
                                retry
                            ))
                        } else {
                            retry
                        }
                    })?,
                    None => {
                        return Err(ExporterError::Connect("no active connection".to_string()))
                    }
                }
            }
            Err(e) => return Err(e),
        };

        debug!(bmc = %self.target, "Read {}", path);
        serde_json::from_value(value).map_err(ExporterError::Json)
    }

    /// Drop the current connection and open a fresh one
    pub async fn reconnect(&self) -> Result<()> {
        let mut guard = self.connection.lock().await;
        self.reconnect_locked(&mut guard).await
    }

    async fn reconnect_locked(&self, slot: &mut Option<Box<dyn Connection>>) -> Result<()> {
        if let Some(old) = slot.take() {
            logout_quietly(&self.target, old.as_ref()).await;
        }
        let fresh = self.connector.connect(&self.config).await?;
        *slot = Some(fresh);
        info!(bmc = %self.target, "Redfish session re-established");
        Ok(())
    }

    /// Log out of the remote session; failures are logged and swallowed
    pub async fn close(&self) {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.take() {
            logout_quietly(&self.target, conn.as_ref()).await;
            info!(bmc = %self.target, "Redfish session closed");
        }
    }
}

async fn logout_quietly(target: &str, connection: &dyn Connection) {
    if let Err(e) = connection.logout().await {
        debug!(bmc = %target, error = %e, "Logout failed, discarding connection");
    }
}
