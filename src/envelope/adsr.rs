use thiserror::Error;

use crate::envelope::{AdsrStage, Envelope};
use crate::sample::{Volume, V_MAX};

/// Errors produced constructing an [`AdsrEnvelope`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("sustain_level {0} out of range 0..={}", V_MAX)]
    InvalidEnvelope(u16),
}

/// Sample-accurate linear ADSR (Attack, Decay, Sustain, Release) envelope.
///
/// Unlike a rate-accumulated envelope, each stage is driven by an explicit
/// sample counter `i` against a precomputed stage length `N`, so a stage of
/// `N` samples always lasts exactly `N` ticks regardless of floating-point
/// drift. Output is an integer volume in `0..=V_MAX` (`V_MAX = 256`).
///
/// # Timing behavior
///
/// - **Attack**: `v = V_MAX * i / N`, ramping `0 -> V_MAX`.
/// - **Decay**: `v = V_MAX - (V_MAX - sustain_level) * i / N`, ramping
///   `V_MAX -> sustain_level`.
/// - **Sustain**: constant at `sustain_level` until key up.
/// - **Release**: `v = release_from * (1 - i / N)`, ramping from whatever
///   volume was current when key up was received down to zero. A key up
///   during Attack or Decay releases from the *instantaneous* volume at that
///   moment, never from a stale sustain level.
///
/// # Example
///
/// ```
/// use synthcore::envelope::{AdsrEnvelope, Envelope};
///
/// let mut env = AdsrEnvelope::new(48_000, 10, 100, 200, 300).unwrap();
/// env.key_down();
///
/// for _ in 0..48_000 {
///     let volume = env.tick();
///     // Multiply an oscillator amplitude by volume / V_MAX.
/// }
///
/// env.key_up(); // Start the release stage.
/// ```
pub struct AdsrEnvelope {
    num_attack_samples: u32,
    num_decay_samples: u32,
    num_release_samples: u32,
    sustain_level: Volume,

    stage: AdsrStage,
    /// In-stage sample counter, reset to 0 on every stage transition.
    counter: u32,
    /// Volume most recently emitted by `tick`.
    level: Volume,
    /// Volume release ramps down from; captured at the moment of key up.
    release_from: Volume,
}

impl AdsrEnvelope {
    /// Creates a new ADSR envelope.
    ///
    /// `attack_ms`/`decay_ms`/`release_ms` are non-negative durations
    /// converted to sample counts (`ms * sample_rate / 1000`), clamped to a
    /// minimum of 1 sample — an envelope with all stage times at 0ms is
    /// still driven by a one-sample state machine rather than a division by
    /// zero. `sustain_level` must be in `0..=V_MAX`.
    pub fn new(
        sample_rate: u32,
        attack_ms: u32,
        decay_ms: u32,
        release_ms: u32,
        sustain_level: Volume,
    ) -> Result<Self, EnvelopeError> {
        if sustain_level > V_MAX {
            return Err(EnvelopeError::InvalidEnvelope(sustain_level));
        }

        let samples_for = |ms: u32| -> u32 { ((ms as u64 * sample_rate as u64) / 1000).max(1) as u32 };

        Ok(Self {
            num_attack_samples: samples_for(attack_ms),
            num_decay_samples: samples_for(decay_ms),
            num_release_samples: samples_for(release_ms),
            sustain_level,
            stage: AdsrStage::Off,
            counter: 0,
            level: 0,
            release_from: 0,
        })
    }

    /// Returns the current envelope stage.
    pub fn stage(&self) -> AdsrStage {
        self.stage
    }

    /// Returns the volume most recently emitted by `tick`.
    pub fn level(&self) -> Volume {
        self.level
    }

    fn enter(&mut self, stage: AdsrStage) {
        self.stage = stage;
        self.counter = 0;
    }
}

impl Envelope for AdsrEnvelope {
    fn key_down(&mut self) {
        self.enter(AdsrStage::Attack);
    }

    fn key_up(&mut self) {
        if !matches!(self.stage, AdsrStage::Off | AdsrStage::Release) {
            self.release_from = self.level;
            self.enter(AdsrStage::Release);
        }
    }

    fn tick(&mut self) -> Volume {
        let v = match self.stage {
            AdsrStage::Off => 0,
            AdsrStage::Attack => {
                ((V_MAX as u64 * self.counter as u64) / self.num_attack_samples as u64) as Volume
            }
            AdsrStage::Decay => {
                let span = (V_MAX - self.sustain_level) as u64;
                V_MAX - ((span * self.counter as u64) / self.num_decay_samples as u64) as Volume
            }
            AdsrStage::Sustain => self.sustain_level,
            AdsrStage::Release => {
                let span = self.release_from as u64;
                let elapsed = (span * self.counter as u64) / self.num_release_samples as u64;
                self.release_from - elapsed as Volume
            }
        };
        self.level = v;

        self.counter += 1;
        match self.stage {
            AdsrStage::Attack if self.counter == self.num_attack_samples => {
                self.enter(AdsrStage::Decay);
            }
            AdsrStage::Decay if self.counter == self.num_decay_samples => {
                self.enter(AdsrStage::Sustain);
            }
            AdsrStage::Release if self.counter == self.num_release_samples => {
                self.enter(AdsrStage::Off);
            }
            _ => {}
        }

        v
    }

    fn is_active(&self) -> bool {
        self.stage != AdsrStage::Off
    }

    fn reset(&mut self) {
        self.stage = AdsrStage::Off;
        self.counter = 0;
        self.level = 0;
        self.release_from = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(attack: u32, decay: u32, release: u32, sustain: u16) -> AdsrEnvelope {
        AdsrEnvelope::new(48_000, attack, decay, release, sustain).unwrap()
    }

    #[test]
    fn invalid_sustain_rejected() {
        assert!(AdsrEnvelope::new(48_000, 10, 10, 10, V_MAX + 1).is_err());
    }

    #[test]
    fn full_lifecycle_state_order() {
        let mut e = env(100, 100, 100, 200);
        assert_eq!(e.stage(), AdsrStage::Off);
        e.key_down();
        assert_eq!(e.stage(), AdsrStage::Attack);

        let attack_samples = 48_000 * 100 / 1000;
        for _ in 0..attack_samples - 1 {
            e.tick();
        }
        e.tick(); // last attack sample, transitions to Decay
        assert_eq!(e.stage(), AdsrStage::Decay);

        let decay_samples = 48_000 * 100 / 1000;
        for _ in 0..decay_samples {
            e.tick();
        }
        assert_eq!(e.stage(), AdsrStage::Sustain);

        e.key_up();
        assert_eq!(e.stage(), AdsrStage::Release);

        let release_samples = 48_000 * 100 / 1000;
        for _ in 0..release_samples {
            e.tick();
        }
        assert_eq!(e.stage(), AdsrStage::Off);
        assert!(!e.is_active());
    }

    #[test]
    fn attack_is_monotone_nondecreasing_and_hits_vmax() {
        let mut e = env(50, 50, 50, 100);
        e.key_down();
        let n = 48_000 * 50 / 1000;
        let mut prev = 0;
        for i in 0..n {
            let v = e.tick();
            assert!(v >= prev, "attack volume decreased at sample {i}");
            prev = v;
        }
        assert_eq!(e.stage(), AdsrStage::Decay);
        // The first decay sample (i=0) equals V_MAX exactly.
        assert_eq!(e.tick(), V_MAX);
    }

    #[test]
    fn decay_is_monotone_nonincreasing_to_sustain() {
        let mut e = env(0, 50, 50, 100);
        e.key_down();
        e.tick(); // finish the (minimal) attack stage
        assert_eq!(e.stage(), AdsrStage::Decay);
        let n = 48_000 * 50 / 1000;
        let mut prev = V_MAX;
        for _ in 0..n {
            let v = e.tick();
            assert!(v <= prev);
            prev = v;
        }
        assert_eq!(e.stage(), AdsrStage::Sustain);
        // The first sustain sample is the constant sustain level.
        assert_eq!(e.tick(), 100);
    }

    #[test]
    fn sustain_is_constant_until_key_up() {
        let mut e = env(1, 1, 50, 150);
        e.key_down();
        for _ in 0..10 {
            e.tick();
        }
        assert_eq!(e.stage(), AdsrStage::Sustain);
        for _ in 0..1000 {
            assert_eq!(e.tick(), 150);
        }
    }

    #[test]
    fn key_up_during_attack_releases_from_instantaneous_volume() {
        let mut e = env(1000, 100, 100, 200);
        e.key_down();
        for _ in 0..100 {
            e.tick();
        }
        let instantaneous = e.level();
        assert!(instantaneous > 0 && instantaneous < V_MAX);
        e.key_up();
        assert_eq!(e.stage(), AdsrStage::Release);
        assert_eq!(e.release_from, instantaneous);
    }

    #[test]
    fn key_up_during_release_is_ignored() {
        let mut e = env(1, 1, 1000, 200);
        e.key_down();
        e.tick();
        e.tick();
        e.key_up();
        assert_eq!(e.stage(), AdsrStage::Release);
        let level_before = e.level();
        e.key_up();
        assert_eq!(e.stage(), AdsrStage::Release);
        assert_eq!(e.level(), level_before);
    }

    #[test]
    fn zero_duration_stages_clamp_to_one_sample() {
        let mut e = env(0, 0, 0, 0);
        e.key_down();
        // Attack should complete and transition after exactly one tick.
        e.tick();
        assert_eq!(e.stage(), AdsrStage::Decay);
        e.tick();
        assert_eq!(e.stage(), AdsrStage::Sustain);
        e.key_up();
        assert_eq!(e.stage(), AdsrStage::Release);
        e.tick();
        assert_eq!(e.stage(), AdsrStage::Off);
    }

    #[test]
    fn each_stage_lasts_exactly_n_ticks() {
        let mut e = env(37, 53, 61, 120);
        let attack_n = 48_000 * 37 / 1000;
        let decay_n = 48_000 * 53 / 1000;
        let release_n = 48_000 * 61 / 1000;

        e.key_down();
        for _ in 0..attack_n {
            assert_eq!(e.stage(), AdsrStage::Attack);
            e.tick();
        }
        for _ in 0..decay_n {
            assert_eq!(e.stage(), AdsrStage::Decay);
            e.tick();
        }
        assert_eq!(e.stage(), AdsrStage::Sustain);
        e.key_up();
        for _ in 0..release_n {
            assert_eq!(e.stage(), AdsrStage::Release);
            e.tick();
        }
        assert_eq!(e.stage(), AdsrStage::Off);
    }

    #[test]
    fn reset_returns_to_off() {
        let mut e = env(10, 10, 10, 50);
        e.key_down();
        e.tick();
        e.reset();
        assert_eq!(e.stage(), AdsrStage::Off);
        assert_eq!(e.level(), 0);
    }
}
