use core::sync::atomic::Ordering;

use esp_scope::{
    error::SendError,
    stream::{PeerId, SampleTransport},
};

use super::config::{SampleFrame, LIVE_PEER, NEXT_PEER, STREAM_OUTBOX};

/// Hands frames to the WebSocket task that owns the live viewer.
pub(crate) struct OutboxTransport;

impl SampleTransport for OutboxTransport {
    fn try_send(&mut self, peer: PeerId, frame: &[u8]) -> Result<(), SendError> {
        if LIVE_PEER.load(Ordering::Acquire) != peer.get() {
            return Err(SendError::Gone);
        }
        let mut queued = SampleFrame::new();
        queued
            .extend_from_slice(frame)
            .map_err(|_| SendError::Congestion)?;
        STREAM_OUTBOX
            .try_send(queued)
            .map_err(|_| SendError::Congestion)
    }
}

pub(crate) fn allocate_peer() -> PeerId {
    loop {
        if let Some(peer) = PeerId::new(NEXT_PEER.fetch_add(1, Ordering::Relaxed)) {
            return peer;
        }
    }
}

/// Make `peer` the connection that receives frames. Frames queued for the
/// previous owner are discarded.
pub(crate) fn claim_stream(peer: PeerId) {
    LIVE_PEER.store(peer.get(), Ordering::Release);
    STREAM_OUTBOX.clear();
}

pub(crate) fn owns_stream(peer: PeerId) -> bool {
    LIVE_PEER.load(Ordering::Acquire) == peer.get()
}

pub(crate) fn release_stream(peer: PeerId) {
    let _ = LIVE_PEER.compare_exchange(peer.get(), 0, Ordering::AcqRel, Ordering::Acquire);
}
