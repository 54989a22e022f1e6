//! # DX Hub - real-time request/response hub
//!
//! A hub sits behind any number of full-duplex message connections and
//! answers their requests, either point-to-point or by broadcasting to every
//! connected client. All shared state lives in one task fed by channels, so
//! nothing is locked.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dx_hub::{echo, Hub, HubConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HubConfig::default();
//!     let hub = Hub::spawn(echo::EchoHandler::default(), echo::actions()?, &config);
//!     dx_hub::server::start(config, hub).await
//! }
//! ```
//!
//! Clients send `{"id": "r1", "type": "ACTION", "action": "ping"}` and get
//! back `{"type": "STATUS", "status": "OK", "payload": "pong", "id": "r1"}`.

pub mod config;
pub mod connection;
pub mod echo;
pub mod error;
pub mod hub;
pub mod link;
pub mod logging;
pub mod protocol;
pub mod server;

// Re-export main types for library consumers
pub use config::{Backpressure, HubConfig};
pub use error::{HubError, HubResult, ProtocolError};
pub use hub::{ClientId, Hub, HubHandle, RequestHandler};
pub use protocol::{ActionTable, Delivery, GenericRequest, Request, RequestHeader, Response, Status};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
