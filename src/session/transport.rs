//! Trait abstraction for the outbound connection to enable testing

use crate::error::Result;

/// Write side of the connection to the receiver.
///
/// Implementations must not block: the session calls them from the event
/// loop and expects the write to be queued.
pub trait Transport {
    /// Queues one text frame.
    fn send_text(&mut self, text: String) -> Result<()>;

    /// Closes the connection. Further sends must fail.
    fn close(&mut self);
}
