//! Synthesizer voice management.
//!
//! A voice is one struck key's lifetime: it binds an [`Oscillator`] to an
//! [`Envelope`] and produces `(amplitude, volume)` pairs until the envelope
//! fades to OFF.

use crate::envelope::Envelope;
use crate::oscillator::Oscillator;
use crate::sample::{Amplitude, NoteSample};

/// Identifies one voice instance: a MIDI note plus a generation counter.
///
/// Retriggering the same pitch forks an independent voice rather than
/// reusing one, so two live voices can share a `midi_note` — `generation`
/// is what tells them apart. This replaces the original implementation's
/// identity-by-hash-of-mutable-attributes with a plain monotonic counter
/// assigned by whatever creates voices (see [`crate::voice::factory`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceHandle {
    pub midi_note: u8,
    pub generation: u64,
}

/// A single synthesizer voice combining an oscillator and amplitude envelope.
///
/// # Type parameters
///
/// * `O` - Oscillator type (sine by default: [`crate::oscillator::SineOscillator`])
/// * `E` - Envelope type ([`crate::envelope::AdsrEnvelope`])
///
/// # Example
///
/// ```
/// use synthcore::voice::{Voice, VoiceHandle};
/// use synthcore::oscillator::SineOscillator;
/// use synthcore::envelope::AdsrEnvelope;
///
/// let handle = VoiceHandle { midi_note: 60, generation: 0 };
/// let osc = SineOscillator::new(60, 48_000, 127).unwrap();
/// let env = AdsrEnvelope::new(48_000, 10, 10, 100, 200).unwrap();
/// let mut voice = Voice::new(handle, osc, env, 255);
///
/// let sample = voice.next_sample();
/// voice.key_up();
/// ```
pub struct Voice<O: Oscillator, E: Envelope> {
    handle: VoiceHandle,
    osc: O,
    env: E,
    /// `0..=255`; scales amplitude directly, independent of the envelope.
    velocity: u8,
}

impl<O: Oscillator, E: Envelope> Voice<O, E> {
    /// Creates a voice bound to `handle` and immediately gates the envelope
    /// on (ATTACK begins on the first `next_sample()` call).
    pub fn new(handle: VoiceHandle, mut osc: O, mut env: E, velocity: u8) -> Self {
        osc.reset();
        env.key_down();
        Self {
            handle,
            osc,
            env,
            velocity,
        }
    }

    /// This voice's identity.
    pub fn handle(&self) -> VoiceHandle {
        self.handle
    }

    /// The pitch this voice is sounding.
    pub fn midi_note(&self) -> u8 {
        self.handle.midi_note
    }

    /// Releases the voice, starting the envelope's RELEASE stage.
    ///
    /// Forwarded straight to the envelope, which already handles the
    /// "ignored if already releasing or off" case.
    pub fn key_up(&mut self) {
        self.env.key_up();
    }

    /// Reads one oscillator sample and one envelope tick, returning the
    /// amplitude (scaled by velocity) and the volume — or `None` if the
    /// envelope has already reached OFF.
    ///
    /// A voice is never ticked while OFF (the invariant the Mixer
    /// enforces by purging on `None`), so this checks first rather than
    /// ticking and discarding. A call that *causes* the transition into
    /// OFF (the last Release sample) still returns `Some` — its volume is
    /// genuine output; only the call after that returns `None`.
    pub fn next_sample(&mut self) -> Option<NoteSample> {
        if !self.env.is_active() {
            return None;
        }
        let amplitude = self.osc.next_sample();
        let volume = self.env.tick();
        let scaled = (amplitude as i64 * self.velocity as i64 / 255) as Amplitude;
        Some(NoteSample {
            amplitude: scaled,
            volume,
        })
    }

    /// `true` from construction until the envelope reaches OFF.
    pub fn is_active(&self) -> bool {
        self.env.is_active()
    }
}

pub mod factory;
