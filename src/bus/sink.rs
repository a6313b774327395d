//! Trait abstraction for the frame transport to enable testing

use crate::can::protocol::CanFrame;

/// Non-blocking sink for outgoing CAN frames.
///
/// `try_send` must return immediately: `true` means the frame was accepted
/// for transmission (not necessarily delivered), `false` means it could not
/// be queued right now and the caller should retry later. Implementations
/// must not block beyond bus-arbitration-scale latency.
pub trait FrameSink {
    /// Attempt to queue a frame for transmission
    fn try_send(&mut self, frame: &CanFrame) -> bool;
}
