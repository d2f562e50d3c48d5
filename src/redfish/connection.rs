//! Redfish Connection Management
//!
//! A [`Connection`] is one authenticated Redfish session against one BMC. It is
//! produced by a [`Connector`], which is the seam that lets the rest of the
//! exporter run against real hardware ([`HttpConnector`]) or an in-memory
//! backend in tests.
//!
//! Session authentication follows the Redfish session service:
//! 1. `GET /redfish/v1` to confirm the endpoint speaks Redfish
//! 2. `POST /redfish/v1/SessionService/Sessions` with the credentials
//! 3. Every later request carries the returned `X-Auth-Token`
//! 4. Logout is a `DELETE` of the session resource named by `Location`

use crate::error::{ExporterError, Result};
use crate::redfish::types::{ServiceRoot, SessionLogin, SERVICE_ROOT, SESSIONS};
use futures_util::future::BoxFuture;
use reqwest::{header, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Everything needed to open a session against one target
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base URL including scheme, e.g. `https://bmc01.example.com`
    pub host: String,
    pub username: String,
    pub password: SecretString,
    /// Accept self-signed or otherwise invalid BMC certificates
    pub insecure: bool,
}

/// One live, authenticated connection
pub trait Connection: Send + Sync {
    /// Read the resource at `path` (an `@odata.id`) as raw JSON
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<serde_json::Value>>;

    /// End the remote session
    fn logout(&self) -> BoxFuture<'_, Result<()>>;
}

/// Opens connections from a [`ConnectionConfig`]
pub trait Connector: Send + Sync {
    fn connect<'a>(&'a self, config: &'a ConnectionConfig)
        -> BoxFuture<'a, Result<Box<dyn Connection>>>;
}

/// Connector speaking Redfish over HTTPS via `reqwest`
#[derive(Debug, Default, Clone)]
pub struct HttpConnector;

impl HttpConnector {
    pub fn new() -> Self {
        Self
    }

    async fn open(config: &ConnectionConfig) -> Result<HttpConnection> {
        let base_url = config.host.trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .danger_accept_invalid_hostnames(config.insecure)
            .build()
            .map_err(|e| ExporterError::Connect(e.to_string()))?;

        debug!("Connecting to {}{}", base_url, SERVICE_ROOT);
        let root = client
            .get(format!("{}{}", base_url, SERVICE_ROOT))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ExporterError::Connect(e.to_string()))?;
        if !root.status().is_success() {
            return Err(ExporterError::Connect(format!(
                "service root returned {}",
                root.status()
            )));
        }
        let root: ServiceRoot = root
            .json()
            .await
            .map_err(|e| ExporterError::Connect(format!("invalid service root: {}", e)))?;
        debug!(
            "Redfish service root {} (version {})",
            root.id.as_deref().unwrap_or("unknown"),
            root.redfish_version.as_deref().unwrap_or("unknown")
        );

        let login = SessionLogin {
            user_name: &config.username,
            password: config.password.expose_secret(),
        };
        let response = client
            .post(format!("{}{}", base_url, SESSIONS))
            .json(&login)
            .send()
            .await
            .map_err(|e| ExporterError::Connect(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ExporterError::Connect(format!(
                    "session creation rejected for user {} ({})",
                    config.username,
                    response.status()
                )));
            }
            status if !status.is_success() => {
                return Err(ExporterError::Connect(format!(
                    "session creation returned {}",
                    status
                )));
            }
            _ => {}
        }

        let token = response
            .headers()
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ExporterError::Connect("session response carried no X-Auth-Token".to_string())
            })?;
        let token = SecretString::new(token.into());

        let session_uri = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|location| absolute_url(&base_url, location));

        info!("Redfish session established with {}", base_url);

        Ok(HttpConnection {
            client,
            base_url,
            token,
            session_uri,
        })
    }
}

impl Connector for HttpConnector {
    fn connect<'a>(
        &'a self,
        config: &'a ConnectionConfig,
    ) -> BoxFuture<'a, Result<Box<dyn Connection>>> {
        Box::pin(async move {
            let connection = Self::open(config).await?;
            Ok(Box::new(connection) as Box<dyn Connection>)
        })
    }
}

/// `Location` may be absolute or relative to the service
fn absolute_url(base_url: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        location.to_string()
    } else {
        format!("{}{}", base_url, location)
    }
}

struct HttpConnection {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
    session_uri: Option<String>,
}

impl Connection for HttpConnection {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<serde_json::Value>> {
        Box::pin(async move {
            let response = self
                .client
                .get(absolute_url(&self.base_url, path))
                .header(header::ACCEPT, "application/json")
                .header(AUTH_TOKEN_HEADER, self.token.expose_secret())
                .send()
                .await
                .map_err(|e| ExporterError::Transport(format!("GET {}: {}", path, e)))?;

            match response.status() {
                StatusCode::UNAUTHORIZED => Err(ExporterError::Auth(format!(
                    "session expired while reading {}",
                    path
                ))),
                StatusCode::NOT_FOUND => Err(ExporterError::NotFound(path.to_string())),
                status if !status.is_success() => Err(ExporterError::Transport(format!(
                    "GET {} returned {}",
                    path, status
                ))),
                _ => Ok(response.json().await?),
            }
        })
    }

    fn logout(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let Some(uri) = &self.session_uri else {
                return Ok(());
            };
            self.client
                .delete(uri)
                .header(AUTH_TOKEN_HEADER, self.token.expose_secret())
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
    }
}
