use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::config::Backpressure;
use crate::protocol::Response;

/// Identifier of a registered client. Allocated by the hub handle, never
/// reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(u64);

impl ClientId {
    /// Origin of requests injected on behalf of no client
    pub const SYSTEM: ClientId = ClientId(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn is_system(self) -> bool {
        self == Self::SYSTEM
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of handing one response to one client queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// The client is not registered
    Absent,
    /// The client's writer has gone away
    Closed,
    /// The queue was full and the policy says drop
    Dropped,
}

/// Client registry. Only ever touched from the hub task.
#[derive(Debug, Default)]
pub struct Registry {
    clients: HashMap<ClientId, mpsc::Sender<Response>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the id was already present (the queue is replaced)
    pub fn insert(&mut self, id: ClientId, outbound: mpsc::Sender<Response>) -> bool {
        self.clients.insert(id, outbound).is_none()
    }

    /// Returns `false` if the id was not registered
    pub fn remove(&mut self, id: ClientId) -> bool {
        self.clients.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.clients.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Enqueue `response` for `id`. With [`Backpressure::Block`] this waits
    /// for queue space.
    pub async fn send(
        &self,
        id: ClientId,
        response: Response,
        policy: Backpressure,
    ) -> SendOutcome {
        match self.clients.get(&id) {
            Some(queue) => deliver(queue, response, policy).await,
            None => SendOutcome::Absent,
        }
    }

    /// Enqueue a copy of `response` for every registered client, passing
    /// each outcome to `report`
    pub async fn broadcast(
        &self,
        response: &Response,
        policy: Backpressure,
        mut report: impl FnMut(ClientId, SendOutcome),
    ) {
        for (&id, queue) in &self.clients {
            report(id, deliver(queue, response.clone(), policy).await);
        }
    }
}

async fn deliver(
    queue: &mpsc::Sender<Response>,
    response: Response,
    policy: Backpressure,
) -> SendOutcome {
    match policy {
        Backpressure::Block => match queue.send(response).await {
            Ok(()) => SendOutcome::Delivered,
            Err(_) => SendOutcome::Closed,
        },
        Backpressure::DropNewest => match queue.try_send(response) {
            Ok(()) => SendOutcome::Delivered,
            Err(TrySendError::Full(_)) => SendOutcome::Dropped,
            Err(TrySendError::Closed(_)) => SendOutcome::Closed,
        },
    }
}
