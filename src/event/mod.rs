//! The inbound event channel: the only synchronization boundary between the
//! control thread (event source) and the audio thread (mixer).
//!
//! A NoteOn event carries the fully constructed [`Voice`] itself, not just
//! its handle: voice construction allocates (the oscillator's one-cycle
//! table) and must happen on the event source thread, never on the audio
//! thread, so the event source builds the voice via
//! [`crate::voice::factory::make_voice`] and hands it across already built.
//! A NoteOff only needs the handle to look up the live voice to release.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TryIter, TrySendError};

use crate::envelope::Envelope;
use crate::oscillator::Oscillator;
use crate::voice::{Voice, VoiceHandle};

/// One key event, immutable once enqueued.
pub enum NoteEvent<O: Oscillator, E: Envelope> {
    NoteOn(Box<Voice<O, E>>),
    NoteOff(VoiceHandle),
}

impl<O: Oscillator, E: Envelope> NoteEvent<O, E> {
    /// The pitch this event concerns, regardless of kind.
    pub fn midi_note(&self) -> u8 {
        match self {
            NoteEvent::NoteOn(voice) => voice.midi_note(),
            NoteEvent::NoteOff(handle) => handle.midi_note,
        }
    }
}

/// The event source's handle onto the queue.
///
/// `send` never blocks: on a full queue the event is dropped and the
/// overflow counter increments, rather than blocking the control thread or
/// evicting an already-queued event. This prefers losing the newest NoteOn
/// over losing an in-flight NoteOff.
pub struct EventSender<O: Oscillator, E: Envelope> {
    tx: Sender<NoteEvent<O, E>>,
    dropped: Arc<AtomicU64>,
}

impl<O: Oscillator, E: Envelope> Clone for EventSender<O, E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            dropped: self.dropped.clone(),
        }
    }
}

impl<O: Oscillator, E: Envelope> EventSender<O, E> {
    /// Enqueues `event`, dropping it and incrementing the overflow counter
    /// if the queue is full.
    pub fn send(&self, event: NoteEvent<O, E>) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if crate::is_log_worthy(dropped) {
                tracing::warn!(dropped, "event queue full, dropping NoteEvent");
            }
        }
    }

    /// Total events dropped for a full queue since construction.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// A clone of the shared overflow counter, for a [`crate::engine::Stats`]
    /// snapshot that outlives this sender.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }
}

/// The mixer's handle onto the queue.
pub struct EventReceiver<O: Oscillator, E: Envelope> {
    rx: Receiver<NoteEvent<O, E>>,
}

impl<O: Oscillator, E: Envelope> EventReceiver<O, E> {
    /// Drains every event currently queued, in issuance order, without
    /// blocking. Call once per sample tick before advancing voices.
    pub fn drain(&self) -> TryIter<'_, NoteEvent<O, E>> {
        self.rx.try_iter()
    }
}

/// Builds a bounded SPSC event queue of the given capacity (spec default
/// 127), returning the producer and consumer halves.
pub fn event_queue<O: Oscillator, E: Envelope>(
    capacity: usize,
) -> (EventSender<O, E>, EventReceiver<O, E>) {
    let (tx, rx) = bounded(capacity.max(1));
    let sender = EventSender {
        tx,
        dropped: Arc::new(AtomicU64::new(0)),
    };
    let receiver = EventReceiver { rx };
    (sender, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::AdsrEnvelope;
    use crate::oscillator::SineOscillator;
    use crate::voice::factory::{make_voice, EnvelopeParams};

    fn params() -> EnvelopeParams {
        EnvelopeParams {
            attack_ms: 10,
            decay_ms: 10,
            release_ms: 10,
            sustain_level: 200,
        }
    }

    fn note_on(midi_note: u8, generation: u64) -> NoteEvent<SineOscillator, AdsrEnvelope> {
        let handle = VoiceHandle {
            midi_note,
            generation,
        };
        let voice = make_voice(handle, 48_000, 127, params(), 255).unwrap();
        NoteEvent::NoteOn(Box::new(voice))
    }

    #[test]
    fn accepted_events_preserve_order() {
        let (tx, rx) = event_queue(4);
        for i in 0..4 {
            tx.send(note_on(60, i));
        }
        let received: Vec<_> = rx.drain().collect();
        assert_eq!(received.len(), 4);
    }

    #[test]
    fn overflow_drops_newest_and_counts() {
        let (tx, rx) = event_queue(4);
        for i in 0..10 {
            tx.send(note_on(60, i));
        }
        assert_eq!(tx.dropped_count(), 6);
        assert_eq!(rx.drain().count(), 4);
    }

    #[test]
    fn note_off_carries_only_a_handle() {
        let (tx, rx) = event_queue::<SineOscillator, AdsrEnvelope>(4);
        let handle = VoiceHandle {
            midi_note: 60,
            generation: 0,
        };
        tx.send(NoteEvent::NoteOff(handle));
        let received: Vec<_> = rx.drain().collect();
        assert_eq!(received.len(), 1);
        assert!(matches!(received[0], NoteEvent::NoteOff(h) if h == handle));
    }
}
