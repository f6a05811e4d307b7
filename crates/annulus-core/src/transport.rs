//! The transport seam THE CORE sends and receives frames through (§4.9, §6).

use annulus_types::Address;
use bytes::Bytes;

/// Non-blocking message delivery between peers. `send` never fails from
/// the caller's point of view — a dropped or undeliverable message simply
/// never shows up in the recipient's `recv_all`, which the coordinator's
/// quorum/timeout sweep already has to tolerate.
pub trait Transport {
    fn send(&self, from: Address, to: Address, frame: Bytes);

    /// Drains every frame queued for `me` since the last call, in FIFO
    /// order (§5).
    fn recv_all(&self, me: Address) -> Vec<Bytes>;
}
