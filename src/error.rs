use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Redfish transport error: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Partial result: retrieved {retrieved} of {requested} items")]
    PartialResult { retrieved: usize, requested: usize },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to connect to Redfish API: {0}")]
    Connect(String),

    #[error("Failed to reconnect: {reconnect} (original error: {original})")]
    Reconnect {
        original: Box<ExporterError>,
        reconnect: Box<ExporterError>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Collector task failed: {0}")]
    Task(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExporterError {
    /// Whether this failure means the session credentials are no longer accepted.
    pub fn is_auth(&self) -> bool {
        match self {
            ExporterError::Auth(_) => true,
            ExporterError::Http(e) => e.status() == Some(reqwest::StatusCode::UNAUTHORIZED),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
