//! Single-viewer, best-effort sample streaming.

use core::num::NonZeroU32;
use core::sync::atomic::{AtomicU32, Ordering};

use heapless::Vec;

use crate::config::{SAMPLE_FRAME_MAX_BYTES, STREAM_THROTTLE_DIVISOR};
use crate::error::SendError;
use crate::telemetry;

/// Transport-level identity of a connected peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerId(NonZeroU32);

impl PeerId {
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

/// Non-blocking "send to peer" primitive of the push transport.
pub trait SampleTransport {
    fn try_send(&mut self, peer: PeerId, frame: &[u8]) -> Result<(), SendError>;
}

/// The one registered viewer, shared between the handshake handler and the
/// acquisition loop. Zero means empty.
pub struct ViewerSlot {
    peer: AtomicU32,
}

impl ViewerSlot {
    pub const fn new() -> Self {
        Self {
            peer: AtomicU32::new(0),
        }
    }

    /// Last writer wins; returns the viewer that was replaced.
    pub fn register(&self, peer: PeerId) -> Option<PeerId> {
        PeerId::new(self.peer.swap(peer.get(), Ordering::AcqRel))
    }

    pub fn current(&self) -> Option<PeerId> {
        PeerId::new(self.peer.load(Ordering::Acquire))
    }

    /// Clears the slot only if `peer` still holds it.
    pub fn evict(&self, peer: PeerId) -> bool {
        self.peer
            .compare_exchange(peer.get(), 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for ViewerSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    NoViewer,
    Throttled,
    Sent,
    /// Congestion; the viewer stays registered.
    Dropped,
    Evicted,
}

pub struct StreamingSink<'a> {
    viewer: &'a ViewerSlot,
    divisor: u32,
    cycles: u32,
    phase_owner: Option<PeerId>,
    frame: Vec<u8, SAMPLE_FRAME_MAX_BYTES>,
}

impl<'a> StreamingSink<'a> {
    pub fn new(viewer: &'a ViewerSlot) -> Self {
        Self::with_divisor(viewer, STREAM_THROTTLE_DIVISOR)
    }

    pub fn with_divisor(viewer: &'a ViewerSlot, divisor: u32) -> Self {
        Self {
            viewer,
            divisor: divisor.max(1),
            cycles: 0,
            phase_owner: None,
            frame: Vec::new(),
        }
    }

    pub fn register(&self, peer: PeerId) -> Option<PeerId> {
        let replaced = self.viewer.register(peer);
        log::info!("stream: viewer {} registered", peer.get());
        replaced
    }

    pub fn viewer(&self) -> Option<PeerId> {
        self.viewer.current()
    }

    /// Offer one acquisition batch. Never blocks.
    pub fn publish<T: SampleTransport>(
        &mut self,
        transport: &mut T,
        batch: &[u16],
    ) -> PublishOutcome {
        let Some(peer) = self.viewer.current() else {
            self.phase_owner = None;
            return PublishOutcome::NoViewer;
        };
        if self.phase_owner != Some(peer) {
            self.phase_owner = Some(peer);
            self.cycles = 0;
        }

        self.cycles = self.cycles.wrapping_add(1);
        if self.cycles % self.divisor != 0 {
            return PublishOutcome::Throttled;
        }

        encode_samples(batch, &mut self.frame);
        match transport.try_send(peer, &self.frame) {
            Ok(()) => {
                telemetry::record_frame_sent();
                PublishOutcome::Sent
            }
            Err(SendError::Congestion) => {
                telemetry::record_frame_dropped();
                PublishOutcome::Dropped
            }
            Err(SendError::Gone) => {
                if self.viewer.evict(peer) {
                    telemetry::record_viewer_eviction();
                    log::info!("stream: viewer {} gone, evicted", peer.get());
                }
                self.phase_owner = None;
                PublishOutcome::Evicted
            }
        }
    }
}

/// Little-endian u16 samples, truncated to the frame capacity.
pub fn encode_samples<const N: usize>(batch: &[u16], frame: &mut Vec<u8, N>) {
    frame.clear();
    for sample in batch {
        if frame.extend_from_slice(&sample.to_le_bytes()).is_err() {
            break;
        }
    }
}
