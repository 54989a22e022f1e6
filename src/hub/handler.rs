use crate::protocol::{Request, Response};

/// Application logic plugged into the hub.
///
/// Both hooks run inline on the hub task, one call at a time, so they get
/// exclusive access to the handler's state. They must not block.
pub trait RequestHandler: Send + 'static {
    /// Called once after each client registration. Unicast and status
    /// responses go to the new client.
    fn new_client(&mut self) -> Vec<Response> {
        Vec::new()
    }

    /// Called once per accepted request
    fn process_request(&mut self, request: &dyn Request) -> Vec<Response>;
}
