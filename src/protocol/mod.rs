//! Wire protocol model
//!
//! Inbound frames are JSON objects carrying a request header
//! (`id`, `type`, `action`) plus action-specific fields. Outbound frames are
//! [`Response`] values.

pub mod actions;
pub mod request;
pub mod response;

pub use actions::{ActionTable, ActionTableBuilder};
pub use request::{GenericRequest, Request, RequestHeader, RequestKind};
pub use response::{Delivery, Response, Status};
