use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a response is routed by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Delivery {
    /// Only the client that issued the request
    Unicast,
    /// Every registered client, the issuer included
    Broadcast,
    /// Only the issuer, correlated by the request id
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Error,
}

/// Outbound frame.
///
/// `id` is filled in by the hub for [`Delivery::Status`] responses and is
/// omitted from the wire otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub delivery: Delivery,
    pub status: Status,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Response {
    pub fn new(delivery: Delivery, status: Status, payload: impl Into<Value>) -> Self {
        Self {
            delivery,
            status,
            payload: payload.into(),
            id: None,
        }
    }

    pub fn unicast(payload: impl Into<Value>) -> Self {
        Self::new(Delivery::Unicast, Status::Ok, payload)
    }

    pub fn broadcast(payload: impl Into<Value>) -> Self {
        Self::new(Delivery::Broadcast, Status::Ok, payload)
    }

    /// Successful status reply to the current request
    pub fn ok(payload: impl Into<Value>) -> Self {
        Self::new(Delivery::Status, Status::Ok, payload)
    }

    /// Failed status reply to the current request
    pub fn error(payload: impl Into<Value>) -> Self {
        Self::new(Delivery::Status, Status::Error, payload)
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }
}
