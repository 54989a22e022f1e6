//! Per-connection link between a transport connection and the hub.
//!
//! A link owns two bounded queues and a close signal. The connection side
//! feeds decoded requests in and drains responses out; the hub side does the
//! opposite. Both the reader and the writer loop watch the same close
//! signal, and either may fire it.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_LINK_CAPACITY;
use crate::protocol::{Request, Response};

pub type BoxedRequest = Box<dyn Request>;

#[derive(Debug)]
pub struct Link {
    requests: (mpsc::Sender<BoxedRequest>, mpsc::Receiver<BoxedRequest>),
    responses: (mpsc::Sender<Response>, mpsc::Receiver<Response>),
    closed: CloseSignal,
}

impl Link {
    pub fn new(capacity: usize) -> Self {
        Self {
            requests: mpsc::channel(capacity),
            responses: mpsc::channel(capacity),
            closed: CloseSignal::new(),
        }
    }

    pub fn close(&self) {
        self.closed.close();
    }

    /// Separate the link into the ends used by the connection adapter and
    /// the ends used by the hub.
    pub fn split(self) -> (ConnectionEnd, HubEnd) {
        let (request_tx, request_rx) = self.requests;
        let (response_tx, response_rx) = self.responses;

        (
            ConnectionEnd {
                requests: request_tx,
                responses: response_rx,
                closed: self.closed.clone(),
            },
            HubEnd {
                requests: request_rx,
                responses: response_tx,
                closed: self.closed,
            },
        )
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_CAPACITY)
    }
}

/// Close notification observable by any number of independent waiters.
///
/// Closing is idempotent and never blocks; every waiter sees it exactly
/// once because [`CloseSignal::closed`] resolves immediately after the
/// first close.
#[derive(Debug, Clone, Default)]
pub struct CloseSignal {
    token: CancellationToken,
}

impl CloseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the link has been closed
    pub async fn closed(&self) {
        self.token.cancelled().await;
    }
}

/// Connection-facing ends: reader pushes requests, writer pulls responses.
#[derive(Debug)]
pub struct ConnectionEnd {
    pub requests: mpsc::Sender<BoxedRequest>,
    pub responses: mpsc::Receiver<Response>,
    pub closed: CloseSignal,
}

/// Hub-facing ends: the forwarder pulls requests, the registry holds the
/// response sender.
#[derive(Debug)]
pub struct HubEnd {
    pub requests: mpsc::Receiver<BoxedRequest>,
    pub responses: mpsc::Sender<Response>,
    pub closed: CloseSignal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::GenericRequest;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_queues_connect_the_two_ends() {
        let (mut conn, mut hub) = Link::default().split();

        conn.requests
            .send(Box::new(GenericRequest::new("1", "ping", serde_json::Value::Null)))
            .await
            .unwrap();
        hub.responses.send(Response::ok("pong")).await.unwrap();

        assert_eq!(hub.requests.recv().await.unwrap().id(), "1");
        assert_eq!(conn.responses.recv().await.unwrap().payload, "pong");
    }

    #[tokio::test]
    async fn test_queues_are_bounded() {
        let (conn, _hub) = Link::new(2).split();
        let request = || Box::new(GenericRequest::default()) as BoxedRequest;

        conn.requests.try_send(request()).unwrap();
        conn.requests.try_send(request()).unwrap();
        assert!(conn.requests.try_send(request()).is_err());
    }

    #[tokio::test]
    async fn test_close_wakes_both_waiters() {
        let (conn, hub) = Link::default().split();

        let reader = tokio::spawn({
            let closed = conn.closed.clone();
            async move { closed.closed().await }
        });
        let writer = tokio::spawn({
            let closed = hub.closed.clone();
            async move { closed.closed().await }
        });

        conn.closed.close();
        // A second close from the other loop must not block or panic.
        hub.closed.close();

        timeout(Duration::from_secs(1), reader).await.unwrap().unwrap();
        timeout(Duration::from_secs(1), writer).await.unwrap().unwrap();
        assert!(conn.closed.is_closed());
    }

    #[tokio::test]
    async fn test_close_before_wait_is_observed() {
        let link = Link::default();
        link.close();
        let (conn, _hub) = link.split();

        timeout(Duration::from_millis(100), conn.closed.closed())
            .await
            .expect("already closed");
    }
}
