//! Envelope generators for amplitude shaping.
//!
//! This module provides traits and implementations for audio envelopes,
//! which control how a voice's volume changes over time.

mod adsr;

pub use adsr::{AdsrEnvelope, EnvelopeError};

use crate::sample::Volume;

/// Trait for envelope generators.
///
/// An envelope controls volume over time, triggered by note events, and
/// outputs values in `0..=V_MAX`.
pub trait Envelope {
    /// Triggers the envelope (note on / key down).
    fn key_down(&mut self);

    /// Releases the envelope (note off / key up).
    fn key_up(&mut self);

    /// Advances the envelope by one sample and returns the volume emitted
    /// for that sample.
    ///
    /// Call this once per sample in the audio processing loop.
    fn tick(&mut self) -> Volume;

    /// Returns `true` while the envelope has not yet returned to OFF.
    fn is_active(&self) -> bool;

    /// Resets the envelope to its initial OFF state.
    fn reset(&mut self);
}

/// The current stage of an ADSR envelope.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum AdsrStage {
    /// Envelope is inactive and outputting zero. Never ticked in this state.
    Off,
    /// Envelope is ramping up to `V_MAX`.
    Attack,
    /// Envelope is ramping down from `V_MAX` to the sustain level.
    Decay,
    /// Envelope is holding at the sustain level.
    Sustain,
    /// Envelope is ramping down to zero after key up.
    Release,
}
