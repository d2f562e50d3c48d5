pub mod connection;
pub mod locator;
pub mod session;
pub mod types;

pub use connection::{Connection, ConnectionConfig, Connector, HttpConnector};
pub use locator::{ChassisRef, ResourceLocator};
pub use session::Session;
