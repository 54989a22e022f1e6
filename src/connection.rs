//! Connection adapter
//!
//! Bridges one message-frame connection to the hub with two loops:
//!
//! - the **reader** decodes text frames into requests and pushes them onto
//!   the link, racing every push against the close signal;
//! - the **writer** encodes responses from the link and writes them out.
//!
//! A transport error on either side closes the link, which stops the other
//! loop and makes the hub forget the client. Both loops race every await
//! against the close signal, so a closed link always releases its queues.

use std::fmt;
use std::sync::Arc;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::HubResult;
use crate::hub::{ClientId, HubHandle};
use crate::link::{BoxedRequest, CloseSignal, ConnectionEnd};
use crate::protocol::{ActionTable, Response};

/// A transport message type that can carry text frames.
pub trait TextFrame: Sized + Send + 'static {
    fn from_text(text: String) -> Self;

    /// The frame's text, or `None` for any other kind of frame
    fn as_text(&self) -> Option<&str>;
}

impl TextFrame for axum::extract::ws::Message {
    fn from_text(text: String) -> Self {
        Self::Text(text.into())
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Serve one connection until either side fails. Returns the id the client
/// had while attached.
pub async fn serve<S, M, E>(hub: HubHandle, socket: S) -> HubResult<ClientId>
where
    S: Stream<Item = Result<M, E>> + Sink<M> + Send + 'static,
    <S as Sink<M>>::Error: fmt::Display,
    M: TextFrame,
    E: fmt::Display + Send + 'static,
{
    let (sink, stream) = socket.split();
    serve_split(hub, sink, stream).await
}

/// [`serve`] for transports that come already split
pub async fn serve_split<Si, St, M, E>(hub: HubHandle, sink: Si, stream: St) -> HubResult<ClientId>
where
    Si: Sink<M> + Unpin + Send,
    Si::Error: fmt::Display,
    St: Stream<Item = Result<M, E>> + Unpin + Send + 'static,
    M: TextFrame,
    E: fmt::Display + Send + 'static,
{
    // Neither loop runs before the hub has acknowledged the registration.
    let (client, end) = hub.connect().await?;
    let ConnectionEnd {
        requests,
        responses,
        closed,
    } = end;
    debug!(client = %client, "connection attached");

    let reader = tokio::spawn(read_frames(
        client,
        hub.actions(),
        stream,
        requests,
        closed.clone(),
    ));
    write_responses(client, sink, responses, closed).await;

    if let Err(err) = reader.await {
        error!(client = %client, error = %err, "reader task failed");
    }
    debug!(client = %client, "connection detached");
    Ok(client)
}

async fn read_frames<St, M, E>(
    client: ClientId,
    actions: Arc<ActionTable>,
    mut stream: St,
    requests: mpsc::Sender<BoxedRequest>,
    closed: CloseSignal,
) where
    St: Stream<Item = Result<M, E>> + Unpin,
    M: TextFrame,
    E: fmt::Display,
{
    loop {
        let frame = tokio::select! {
            _ = closed.closed() => return,
            frame = stream.next() => frame,
        };

        let message = match frame {
            Some(Ok(message)) => message,
            Some(Err(err)) => {
                debug!(client = %client, error = %err, "read failed, closing link");
                closed.close();
                return;
            }
            None => {
                debug!(client = %client, "peer hung up, closing link");
                closed.close();
                return;
            }
        };

        let Some(text) = message.as_text() else {
            continue;
        };

        let request = match actions.decode(text) {
            Ok(request) => request,
            Err(err) => {
                warn!(client = %client, error = %err, "dropping frame");
                continue;
            }
        };

        tokio::select! {
            _ = closed.closed() => return,
            sent = requests.send(request) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

async fn write_responses<Si, M>(
    client: ClientId,
    mut sink: Si,
    mut responses: mpsc::Receiver<Response>,
    closed: CloseSignal,
) where
    Si: Sink<M> + Unpin,
    Si::Error: fmt::Display,
    M: TextFrame,
{
    loop {
        let response = tokio::select! {
            _ = closed.closed() => break,
            response = responses.recv() => response,
        };

        // The hub dropped our queue, nothing more will arrive.
        let Some(response) = response else {
            closed.close();
            break;
        };

        let text = match serde_json::to_string(&response) {
            Ok(text) => text,
            Err(err) => {
                error!(client = %client, error = %err, "unable to encode response");
                continue;
            }
        };

        // A peer that stopped reading must not keep the queue alive once
        // the link is closed.
        let sent = tokio::select! {
            _ = closed.closed() => break,
            sent = sink.send(M::from_text(text)) => sent,
        };
        if let Err(err) = sent {
            debug!(client = %client, error = %err, "write failed, closing link");
            closed.close();
            break;
        }
    }

    drop(responses);
    if let Err(err) = sink.close().await {
        debug!(client = %client, error = %err, "closing sink failed");
    }
}
