//! Hub - the single serialized actor behind every connection
//!
//! The hub task owns the client registry and the application handler. Two
//! channels feed it: control messages (client added/removed) and requests.
//! Nothing else touches its state, so registry mutation and request
//! processing never race and need no locks.
//!
//! ## Ordering
//!
//! - A client's registration is acknowledged before its forwarder starts,
//!   so no request is processed for a client the registry has not seen.
//! - Requests from one client are processed in the order they were read.
//! - A broadcast reaches exactly the clients registered when it is routed.

pub mod handler;
mod registry;

pub use handler::RequestHandler;
pub use registry::{ClientId, SendOutcome};

use registry::Registry;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::{Backpressure, HubConfig};
use crate::error::{HubError, HubResult};
use crate::link::{BoxedRequest, CloseSignal, ConnectionEnd, HubEnd, Link};
use crate::protocol::{ActionTable, Delivery, Request, Response};

enum Control {
    AddClient {
        id: ClientId,
        outbound: mpsc::Sender<Response>,
        ack: oneshot::Sender<()>,
    },
    RemoveClient {
        id: ClientId,
        ack: oneshot::Sender<()>,
    },
    Clients {
        reply: oneshot::Sender<Vec<ClientId>>,
    },
}

struct Envelope {
    client: ClientId,
    request: BoxedRequest,
}

/// The hub actor. Build with [`Hub::new`] and drive with [`Hub::run`], or
/// use [`Hub::spawn`].
pub struct Hub<H> {
    handler: H,
    registry: Registry,
    backpressure: Backpressure,
    control_rx: mpsc::Receiver<Control>,
    request_rx: mpsc::Receiver<Envelope>,
}

impl<H: RequestHandler> Hub<H> {
    pub fn new(handler: H, actions: ActionTable, config: &HubConfig) -> (Self, HubHandle) {
        // Control messages are acknowledged one at a time; a single slot is
        // enough.
        let (control_tx, control_rx) = mpsc::channel(1);
        let (request_tx, request_rx) = mpsc::channel(config.request_buffer.max(1));

        let hub = Self {
            handler,
            registry: Registry::new(),
            backpressure: config.backpressure,
            control_rx,
            request_rx,
        };
        let handle = HubHandle {
            control_tx,
            request_tx,
            actions: Arc::new(actions),
            last_client: Arc::new(AtomicU64::new(0)),
            link_capacity: config.link_capacity.max(1),
        };

        (hub, handle)
    }

    /// Start the hub on the current tokio runtime
    pub fn spawn(handler: H, actions: ActionTable, config: &HubConfig) -> HubHandle {
        let (hub, handle) = Self::new(handler, actions, config);
        tokio::spawn(hub.run());
        handle
    }

    /// Process control messages and requests until every handle is dropped
    pub async fn run(mut self) {
        info!(backpressure = ?self.backpressure, "hub started");

        loop {
            tokio::select! {
                Some(control) = self.control_rx.recv() => self.control(control).await,
                Some(envelope) = self.request_rx.recv() => self.dispatch(envelope).await,
                else => break,
            }
        }

        info!(clients = self.registry.len(), "hub stopped");
    }

    async fn control(&mut self, control: Control) {
        match control {
            Control::AddClient { id, outbound, ack } => {
                if !self.registry.insert(id, outbound) {
                    warn!(client = %id, "client registered twice, replacing its queue");
                }
                let _ = ack.send(());
                debug!(client = %id, clients = self.registry.len(), "client registered");

                let responses = self.handler.new_client();
                self.route(id, None, responses).await;
            }
            Control::RemoveClient { id, ack } => {
                let removed = self.registry.remove(id);
                let _ = ack.send(());
                if removed {
                    debug!(client = %id, clients = self.registry.len(), "client removed");
                }
            }
            Control::Clients { reply } => {
                let _ = reply.send(self.registry.ids());
            }
        }
    }

    async fn dispatch(&mut self, envelope: Envelope) {
        let Envelope { client, request } = envelope;
        debug!(
            client = %client,
            request = request.id(),
            action = request.action(),
            "processing request"
        );

        let responses = self.handler.process_request(request.as_ref());
        self.route(client, Some(request.id()), responses).await;
    }

    async fn route(&mut self, origin: ClientId, request_id: Option<&str>, responses: Vec<Response>) {
        for mut response in responses {
            match response.delivery {
                Delivery::Broadcast => {
                    self.registry
                        .broadcast(&response, self.backpressure, report)
                        .await;
                }
                Delivery::Unicast | Delivery::Status => {
                    if response.delivery == Delivery::Status {
                        response.id = request_id.map(str::to_owned);
                    }
                    let outcome = self.registry.send(origin, response, self.backpressure).await;
                    report(origin, outcome);
                }
            }
        }
    }
}

fn report(client: ClientId, outcome: SendOutcome) {
    match outcome {
        SendOutcome::Delivered => {}
        SendOutcome::Absent => {
            error!(client = %client, "trying to send a message to a non-existing client");
        }
        SendOutcome::Closed => {
            debug!(client = %client, "client queue closed, dropping message");
        }
        SendOutcome::Dropped => {
            warn!(client = %client, "client queue full, dropping message");
        }
    }
}

/// Cloneable handle to a running hub.
#[derive(Clone)]
pub struct HubHandle {
    control_tx: mpsc::Sender<Control>,
    request_tx: mpsc::Sender<Envelope>,
    actions: Arc<ActionTable>,
    last_client: Arc<AtomicU64>,
    link_capacity: usize,
}

impl std::fmt::Debug for HubHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubHandle")
            .field("actions", &self.actions)
            .field("last_client", &self.last_client.load(Ordering::Relaxed))
            .field("link_capacity", &self.link_capacity)
            .finish()
    }
}

impl HubHandle {
    /// Action table used to decode frames for this hub
    pub fn actions(&self) -> Arc<ActionTable> {
        Arc::clone(&self.actions)
    }

    /// Attach a new client.
    ///
    /// Creates its link, registers it (waiting for the acknowledgment) and
    /// starts the forwarder that feeds its requests to the hub and removes
    /// it once the link closes. The returned end belongs to the connection
    /// adapter.
    pub async fn connect(&self) -> HubResult<(ClientId, ConnectionEnd)> {
        let id = ClientId::new(self.last_client.fetch_add(1, Ordering::Relaxed) + 1);
        let (connection, hub_end) = Link::new(self.link_capacity).split();
        let HubEnd {
            requests,
            responses,
            closed,
        } = hub_end;

        self.register(id, responses).await?;
        tokio::spawn(forward(self.clone(), id, requests, closed));

        Ok((id, connection))
    }

    /// Add `id` to the registry; returns once the hub has recorded it
    pub async fn register(&self, id: ClientId, outbound: mpsc::Sender<Response>) -> HubResult<()> {
        let (ack, acked) = oneshot::channel();
        self.control_tx
            .send(Control::AddClient { id, outbound, ack })
            .await
            .map_err(|_| HubError::HubClosed)?;
        acked.await.map_err(|_| HubError::HubClosed)
    }

    /// Remove `id` from the registry. Removing an absent id is a no-op.
    pub async fn deregister(&self, id: ClientId) -> HubResult<()> {
        let (ack, acked) = oneshot::channel();
        self.control_tx
            .send(Control::RemoveClient { id, ack })
            .await
            .map_err(|_| HubError::HubClosed)?;
        acked.await.map_err(|_| HubError::HubClosed)
    }

    /// Currently registered clients, sorted
    pub async fn clients(&self) -> HubResult<Vec<ClientId>> {
        let (reply, ids) = oneshot::channel();
        self.control_tx
            .send(Control::Clients { reply })
            .await
            .map_err(|_| HubError::HubClosed)?;
        ids.await.map_err(|_| HubError::HubClosed)
    }

    /// Queue a request on behalf of `client`
    pub async fn submit(&self, client: ClientId, request: BoxedRequest) -> HubResult<()> {
        self.request_tx
            .send(Envelope { client, request })
            .await
            .map_err(|_| HubError::HubClosed)
    }

    /// Queue a request on behalf of no client, e.g. a timer-driven
    /// broadcast. Unicast and status responses to it have nowhere to go and
    /// are dropped.
    pub async fn inject(&self, request: impl Request) -> HubResult<()> {
        self.submit(ClientId::SYSTEM, Box::new(request)).await
    }
}

async fn forward(
    hub: HubHandle,
    id: ClientId,
    mut requests: mpsc::Receiver<BoxedRequest>,
    closed: CloseSignal,
) {
    loop {
        tokio::select! {
            _ = closed.closed() => break,
            request = requests.recv() => {
                let Some(request) = request else { break };
                if hub.submit(id, request).await.is_err() {
                    return;
                }
            }
        }
    }

    if hub.deregister(id).await.is_err() {
        debug!(client = %id, "hub gone before client removal");
    }
}
