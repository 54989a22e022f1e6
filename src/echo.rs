//! Demo application served by the `dx-hub` binary
//!
//! | action | reply |
//! |--------|-------|
//! | `ping` | status `"pong"` |
//! | `echo` | unicast of `text` |
//! | `say`  | broadcast of `{from, text}` |
//! | `tick` | broadcast of the tick counter |
//!
//! Anything else gets an error status.

use serde::Deserialize;
use serde_json::json;

use crate::error::HubResult;
use crate::hub::RequestHandler;
use crate::protocol::{ActionTable, GenericRequest, Request, RequestHeader, Response};

#[derive(Debug, Clone, Deserialize)]
pub struct EchoRequest {
    #[serde(flatten)]
    pub header: RequestHeader,
    pub text: String,
}

impl Request for EchoRequest {
    fn header(&self) -> &RequestHeader {
        &self.header
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SayRequest {
    #[serde(flatten)]
    pub header: RequestHeader,
    pub text: String,
    #[serde(default)]
    pub from: Option<String>,
}

impl Request for SayRequest {
    fn header(&self) -> &RequestHeader {
        &self.header
    }
}

pub fn actions() -> HubResult<ActionTable> {
    ActionTable::builder()
        .register::<EchoRequest>("echo")
        .register::<SayRequest>("say")
        .build()
}

/// Request injected by the heartbeat timer
pub fn tick_request(sequence: u64) -> GenericRequest {
    GenericRequest::new(format!("tick-{sequence}"), "tick", json!(sequence))
}

#[derive(Debug, Default)]
pub struct EchoHandler {
    connections: u64,
    ticks: u64,
}

impl RequestHandler for EchoHandler {
    fn new_client(&mut self) -> Vec<Response> {
        self.connections += 1;
        vec![Response::unicast(json!({
            "welcome": "dx-hub",
            "connection": self.connections,
        }))]
    }

    fn process_request(&mut self, request: &dyn Request) -> Vec<Response> {
        match request.action() {
            "ping" => vec![Response::ok("pong")],
            "echo" => match request.downcast_ref::<EchoRequest>() {
                Some(echo) => vec![Response::unicast(echo.text.as_str())],
                None => vec![Response::error("echo needs text")],
            },
            "say" => match request.downcast_ref::<SayRequest>() {
                Some(say) => vec![Response::broadcast(json!({
                    "from": say.from,
                    "text": say.text,
                }))],
                None => vec![Response::error("say needs text")],
            },
            "tick" => {
                self.ticks += 1;
                vec![Response::broadcast(json!({ "tick": self.ticks }))]
            }
            other => vec![Response::error(format!("unknown action {other:?}"))],
        }
    }
}
