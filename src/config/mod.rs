//! Startup configuration: the only place invalid rate/depth/channel
//! combinations are rejected. Recognized once at [`crate::engine::Engine::new`]
//! and never touched again off the control thread.

use serde::Deserialize;
use thiserror::Error;

use crate::sample::BitDepth;
use crate::voice::factory::EnvelopeParams;

const VALID_SAMPLE_RATES: [u32; 5] = [16_000, 32_000, 48_000, 96_000, 192_000];

/// Errors rejecting an invalid [`Config`] at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sample_rate_hz {0} is not one of {VALID_SAMPLE_RATES:?}")]
    InvalidSampleRate(u32),
    #[error("sample_bit_depth {0} must be 8, 16, or 32")]
    InvalidBitDepth(u8),
    #[error("num_channels {0} must be 1 or 2")]
    InvalidChannels(u8),
    #[error("default_sustain_level {0} out of range 0..=256")]
    InvalidSustainLevel(u16),
}

/// Full set of recognized startup options (spec §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sample_rate_hz: u32,
    pub sample_bit_depth: u8,
    pub num_channels: u8,
    pub buffer_ms: u32,
    pub frames_per_callback: usize,
    pub event_queue_capacity: usize,
    pub default_attack_ms: u32,
    pub default_decay_ms: u32,
    pub default_release_ms: u32,
    pub default_sustain_level: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate_hz: 192_000,
            sample_bit_depth: 8,
            num_channels: 1,
            buffer_ms: 0,
            frames_per_callback: 512,
            event_queue_capacity: 127,
            default_attack_ms: 100,
            default_decay_ms: 100,
            default_release_ms: 100,
            default_sustain_level: 200,
        }
    }
}

impl Config {
    /// Validates every recognized option, returning the first violation
    /// found. `buffer_ms` of 0 is resolved to keep `buffer_samples >=
    /// frames_per_callback`, per spec's default sizing rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_SAMPLE_RATES.contains(&self.sample_rate_hz) {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate_hz));
        }
        if !matches!(self.sample_bit_depth, 8 | 16 | 32) {
            return Err(ConfigError::InvalidBitDepth(self.sample_bit_depth));
        }
        if !matches!(self.num_channels, 1 | 2) {
            return Err(ConfigError::InvalidChannels(self.num_channels));
        }
        if self.default_sustain_level > 256 {
            return Err(ConfigError::InvalidSustainLevel(self.default_sustain_level));
        }
        Ok(())
    }

    /// The [`BitDepth`] this config resolves to. Only valid after
    /// [`Self::validate`] has succeeded.
    pub fn bit_depth(&self) -> BitDepth {
        match self.sample_bit_depth {
            8 => BitDepth::Eight,
            16 => BitDepth::Sixteen,
            32 => BitDepth::ThirtyTwo,
            other => unreachable!("validate() should have rejected bit depth {other}"),
        }
    }

    /// The effective buffer size in milliseconds: `buffer_ms` if set,
    /// otherwise the minimum that keeps the ring at least one chunk deep.
    pub fn effective_buffer_ms(&self) -> u32 {
        if self.buffer_ms > 0 {
            return self.buffer_ms;
        }
        ((self.frames_per_callback as u64 * 1000).div_ceil(self.sample_rate_hz as u64)) as u32
    }

    /// The default envelope parameters new voices are built with unless
    /// overridden per-note.
    pub fn default_envelope(&self) -> EnvelopeParams {
        EnvelopeParams {
            attack_ms: self.default_attack_ms,
            decay_ms: self.default_decay_ms,
            release_ms: self.default_release_ms,
            sustain_level: self.default_sustain_level,
        }
    }
}
