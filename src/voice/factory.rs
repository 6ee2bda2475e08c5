//! The note factory: the only place a `Voice` is constructed.
//!
//! Construction can fail (oscillator table too short for the sample rate,
//! envelope parameters out of range); those failures are reported back to
//! whatever is turning key events into voices and the failed NoteOn never
//! reaches the Mixer, per the event source's side of the allocation
//! discipline.

use thiserror::Error;

use crate::envelope::{AdsrEnvelope, EnvelopeError};
use crate::oscillator::{OscillatorError, SineOscillator};
use crate::sample::Amplitude;
use crate::voice::{Voice, VoiceHandle};

/// ADSR parameters for a new voice, as accepted by [`make_voice`].
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeParams {
    pub attack_ms: u32,
    pub decay_ms: u32,
    pub release_ms: u32,
    pub sustain_level: u16,
}

/// Errors constructing a voice, aggregating the oscillator's and the
/// envelope's failure modes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error(transparent)]
    Oscillator(#[from] OscillatorError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Builds a voice for `handle` at `sample_rate`, scaling oscillator
/// amplitude to `amplitude_max` (from the configured bit depth) and
/// applying `velocity` (`0..=255`).
///
/// Fails with [`VoiceError::Oscillator`] if `handle.midi_note` is too high
/// for `sample_rate` (fewer than 2 samples per cycle), or with
/// [`VoiceError::Envelope`] if `params.sustain_level` is out of range. A
/// failed call never touches the Mixer — the event source is expected to
/// drop the originating NoteOn.
pub fn make_voice(
    handle: VoiceHandle,
    sample_rate: u32,
    amplitude_max: Amplitude,
    params: EnvelopeParams,
    velocity: u8,
) -> Result<Voice<SineOscillator, AdsrEnvelope>, VoiceError> {
    let osc = SineOscillator::new(handle.midi_note, sample_rate, amplitude_max)?;
    let env = AdsrEnvelope::new(
        sample_rate,
        params.attack_ms,
        params.decay_ms,
        params.release_ms,
        params.sustain_level,
    )?;
    Ok(Voice::new(handle, osc, env, velocity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> EnvelopeParams {
        EnvelopeParams {
            attack_ms: 10,
            decay_ms: 10,
            release_ms: 100,
            sustain_level: 200,
        }
    }

    #[test]
    fn builds_a_playable_voice() {
        let handle = VoiceHandle {
            midi_note: 60,
            generation: 0,
        };
        let voice = make_voice(handle, 48_000, 127, params(), 255).unwrap();
        assert!(voice.is_active());
        assert_eq!(voice.handle(), handle);
    }

    #[test]
    fn extreme_pitch_rejected_before_reaching_a_voice() {
        let handle = VoiceHandle {
            midi_note: 127,
            generation: 0,
        };
        let err = make_voice(handle, 16_000, 127, params(), 255).unwrap_err();
        assert!(matches!(err, VoiceError::Oscillator(_)));
    }

    #[test]
    fn invalid_envelope_rejected() {
        let handle = VoiceHandle {
            midi_note: 60,
            generation: 0,
        };
        let mut bad = params();
        bad.sustain_level = 1000;
        let err = make_voice(handle, 48_000, 127, bad, 255).unwrap_err();
        assert!(matches!(err, VoiceError::Envelope(_)));
    }
}
