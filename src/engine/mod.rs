//! The owning value for one running instance of the core.
//!
//! Replaces a process-wide audio singleton with an explicitly constructed
//! `Engine`: `new` validates configuration and wires the channels, `run`
//! spawns the producer thread, `stop` tears it down. Nothing here is
//! global — construct as many engines as the host application needs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};
use thiserror::Error;
use tracing::info;

use crate::config::{Config, ConfigError};
use crate::envelope::AdsrEnvelope;
use crate::event::{event_queue, EventSender};
use crate::mixer::Mixer;
use crate::oscillator::SineOscillator;
use crate::ring::{ring_capacity, sample_ring, RingConsumer, RingProducer};

/// Errors constructing an [`Engine`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A snapshot of the two real-time health counters a host can poll without
/// touching the producer thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub events_dropped: u64,
    pub ring_underruns: u64,
}

type CoreMixer = Mixer<SineOscillator, AdsrEnvelope>;

/// A constructed-but-not-yet-running engine. Holds the mixer and the
/// producer-side of the sample ring; nothing runs on its own thread until
/// [`Engine::run`].
pub struct Engine {
    config: Config,
    mixer: CoreMixer,
    ring_producer: RingProducer,
    ring_consumer: Option<RingConsumer>,
    events_dropped: Arc<AtomicU64>,
}

impl Engine {
    /// Validates `config`, builds the event queue and the sample ring, and
    /// returns the engine plus the event-source's handle onto the queue.
    /// Does not start the producer thread — see [`Engine::run`].
    pub fn new(
        config: Config,
    ) -> Result<(Engine, EventSender<SineOscillator, AdsrEnvelope>), EngineError> {
        config.validate()?;

        let (event_tx, event_rx) = event_queue(config.event_queue_capacity);
        let events_dropped = event_tx.dropped_counter();
        let mixer = Mixer::new(event_rx);

        let bit_depth = config.bit_depth();
        let frame_samples = config.frames_per_callback * config.num_channels as usize;
        let mut silence_chunk = Vec::with_capacity(frame_samples * bit_depth.byte_width());
        for _ in 0..frame_samples {
            bit_depth.pack_into(bit_depth.midpoint(), &mut silence_chunk);
        }

        let capacity = ring_capacity(
            config.effective_buffer_ms(),
            config.sample_rate_hz,
            config.frames_per_callback,
        );
        let (ring_producer, ring_consumer) = sample_ring(capacity, silence_chunk);

        info!(
            sample_rate_hz = config.sample_rate_hz,
            sample_bit_depth = config.sample_bit_depth,
            num_channels = config.num_channels,
            ring_capacity = capacity,
            "engine constructed"
        );

        Ok((
            Engine {
                config,
                mixer,
                ring_producer,
                ring_consumer: Some(ring_consumer),
                events_dropped,
            },
            event_tx,
        ))
    }

    /// Spawns the producer thread and returns the host-facing handle. Can
    /// only be called once per engine.
    pub fn run(mut self) -> EngineHandle {
        // A zero-capacity channel used purely as a shutdown signal: dropping
        // `shutdown_tx` (in `EngineHandle::stop`) makes `recv` on the paired
        // receiver ready immediately, everywhere it's raced against in a
        // `select!` — including inside a blocked `RingProducer::push`.
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let ring_consumer = self
            .ring_consumer
            .take()
            .expect("Engine::run called more than once");
        let underrun_counter = ring_consumer.underrun_counter();

        let config = self.config.clone();

        let join_handle = std::thread::Builder::new()
            .name("synthcore-producer".into())
            .spawn(move || producer_loop(self.mixer, self.ring_producer, config, shutdown_rx))
            .expect("failed to spawn producer thread");

        info!("engine started");

        EngineHandle {
            consumer: ring_consumer,
            shutdown_tx,
            join_handle: Some(join_handle),
            underrun_counter,
            events_dropped: self.events_dropped,
        }
    }
}

/// The host-facing handle to a running [`Engine`]: the pull callback and
/// health stats.
pub struct EngineHandle {
    consumer: RingConsumer,
    shutdown_tx: Sender<()>,
    join_handle: Option<JoinHandle<()>>,
    underrun_counter: Arc<AtomicU64>,
    events_dropped: Arc<AtomicU64>,
}

impl EngineHandle {
    /// The pull callback: returns the next pre-packed chunk, never
    /// blocking, allocating, or computing a sample on this thread.
    ///
    /// `num_frames` is accepted for interface symmetry with spec.md's pull
    /// callback, but chunks are pre-sized to the configured
    /// `frames_per_callback`; a device requesting a different frame count
    /// is a configuration mismatch the caller is responsible for avoiding.
    pub fn fill(&self, num_frames: usize) -> Vec<u8> {
        let _ = num_frames;
        self.consumer.pull()
    }

    /// A snapshot of the dropped-event and ring-underrun counters.
    pub fn stats(&self) -> Stats {
        Stats {
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            ring_underruns: self.underrun_counter.load(Ordering::Relaxed),
        }
    }

    /// Signals the producer thread to stop and joins it. `fill()` keeps
    /// returning silence chunks for as long as the handle is called after
    /// this, since the caller may still own it briefly during shutdown.
    ///
    /// Drops `shutdown_tx` before joining: the producer thread may be
    /// blocked inside `RingProducer::push` on a full ring, and only a
    /// disconnected (or signaled) `shutdown_tx` unblocks it there.
    pub fn stop(mut self) {
        drop(self.shutdown_tx);
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
        info!("engine stopped");
    }
}

fn producer_loop(
    mut mixer: CoreMixer,
    producer: RingProducer,
    config: Config,
    shutdown: Receiver<()>,
) {
    let bit_depth = config.bit_depth();
    let midpoint = bit_depth.midpoint();

    loop {
        let mut chunk = Vec::with_capacity(
            config.frames_per_callback * config.num_channels as usize * bit_depth.byte_width(),
        );
        for _ in 0..config.frames_per_callback {
            let sample = mixer.tick(midpoint);
            for _ in 0..config.num_channels {
                bit_depth.pack_into(sample, &mut chunk);
            }
        }
        if !producer.push(chunk, &shutdown) {
            return;
        }
    }
}
