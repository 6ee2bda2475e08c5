//! The decoupling buffer between the producer thread and the audio
//! device's pull callback.
//!
//! Chunk-granular, bounded: the producer may block on backpressure, the
//! consumer (the callback) never blocks — an empty ring yields one chunk
//! of midpoint silence and increments an underrun counter instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, select, Receiver, Sender};

/// The producer's handle onto the ring. `push` blocks while the ring is
/// full, giving the producer thread natural backpressure.
pub struct RingProducer {
    tx: Sender<Vec<u8>>,
}

impl RingProducer {
    /// Pushes one packed chunk, blocking until there is room — unless
    /// `shutdown` becomes ready first (a signal sent, or its sender
    /// dropped), in which case the chunk is dropped and this returns
    /// `false` without enqueuing it.
    ///
    /// A plain blocking `send` would leave the producer thread stuck here
    /// forever if the ring fills and nothing is left to drain it (e.g. the
    /// host stopped calling `fill()` right before shutdown); racing the
    /// send against `shutdown` in one `select!` guarantees the producer
    /// thread is always responsive to a shutdown signal, full ring or not.
    pub fn push(&self, chunk: Vec<u8>, shutdown: &Receiver<()>) -> bool {
        select! {
            send(self.tx, chunk) -> res => res.is_ok(),
            recv(shutdown) -> _ => false,
        }
    }
}

/// The audio callback's handle onto the ring.
pub struct RingConsumer {
    rx: Receiver<Vec<u8>>,
    silence_chunk: Vec<u8>,
    underruns: Arc<AtomicU64>,
}

impl RingConsumer {
    /// Pulls the next chunk, never blocking. Returns a fresh all-midpoint
    /// chunk and increments the underrun counter if the ring is empty.
    pub fn pull(&self) -> Vec<u8> {
        match self.rx.try_recv() {
            Ok(chunk) => chunk,
            Err(_) => {
                let underruns = self.underruns.fetch_add(1, Ordering::Relaxed) + 1;
                if crate::is_log_worthy(underruns) {
                    tracing::warn!(underruns, "sample ring empty, emitting silence");
                }
                self.silence_chunk.clone()
            }
        }
    }

    /// Total underruns observed since construction.
    pub fn underrun_count(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// A clone of the shared underrun counter, for a
    /// [`crate::engine::Stats`] snapshot that outlives this consumer.
    pub fn underrun_counter(&self) -> Arc<AtomicU64> {
        self.underruns.clone()
    }
}

/// Builds a bounded sample ring of `capacity` chunks, each `silence_chunk`
/// bytes long (pre-filled with the configured bit depth's midpoint) used
/// whenever the ring runs dry.
pub fn sample_ring(capacity: usize, silence_chunk: Vec<u8>) -> (RingProducer, RingConsumer) {
    let (tx, rx) = bounded(capacity.max(1));
    let consumer = RingConsumer {
        rx,
        silence_chunk,
        underruns: Arc::new(AtomicU64::new(0)),
    };
    (RingProducer { tx }, consumer)
}

/// `ceil(buffer_ms * sample_rate / 1000 / frames_per_callback)`, minimum 1.
pub fn ring_capacity(buffer_ms: u32, sample_rate: u32, frames_per_callback: usize) -> usize {
    let buffer_samples = (buffer_ms as u64 * sample_rate as u64).div_ceil(1000);
    let capacity = buffer_samples.div_ceil(frames_per_callback.max(1) as u64);
    capacity.max(1) as usize
}
