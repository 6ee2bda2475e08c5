//! The live voice set and the per-sample combine rule.
//!
//! Owns every live [`Voice`], drains the event queue once per sample, and
//! folds all active voices into one output amplitude. This is the only
//! thing that runs on the audio/producer thread — no allocation and no
//! blocking in [`Mixer::tick`].

use std::collections::HashMap;

use crate::envelope::Envelope;
use crate::event::{EventReceiver, NoteEvent};
use crate::oscillator::Oscillator;
use crate::sample::{Amplitude, V_MAX};
use crate::voice::{Voice, VoiceHandle};

/// Owns the live voice set and combines their output into one sample at a
/// time.
///
/// `by_pitch` tracks only the most recently pressed voice at each pitch —
/// retriggering a pitch while the old voice is still live leaves the old
/// one in `voices` (releasing on its own) and simply overwrites the
/// `by_pitch` entry, so a NoteOff always targets the newest voice at that
/// pitch.
pub struct Mixer<O: Oscillator, E: Envelope> {
    voices: HashMap<VoiceHandle, Voice<O, E>>,
    by_pitch: HashMap<u8, VoiceHandle>,
    dead: Vec<VoiceHandle>,
    receiver: EventReceiver<O, E>,
}

impl<O: Oscillator, E: Envelope> Mixer<O, E> {
    /// Builds an empty mixer consuming events from `receiver`.
    pub fn new(receiver: EventReceiver<O, E>) -> Self {
        Self {
            voices: HashMap::new(),
            by_pitch: HashMap::new(),
            dead: Vec::new(),
            receiver,
        }
    }

    /// The number of voices currently live (including ones mid-release).
    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    /// Advances every live voice by one sample and returns the combined
    /// output, already offset by `midpoint` (0 for centered signed PCM,
    /// 128 for unsigned 8-bit).
    ///
    /// Runs, in order: drain queued events, purge voices that went OFF on
    /// the previous tick, sum the active voices weighted by volume, then
    /// apply the volume-weighted combine rule.
    pub fn tick(&mut self, midpoint: Amplitude) -> Amplitude {
        self.drain_events();
        self.purge_dead();

        let mut amp_sum: i64 = 0;
        let mut vol_sum: u64 = 0;
        let mut vol_max: u16 = 0;

        for (handle, voice) in self.voices.iter_mut() {
            match voice.next_sample() {
                Some(sample) => {
                    amp_sum += sample.amplitude as i64 * sample.volume as i64;
                    vol_sum += sample.volume as u64;
                    vol_max = vol_max.max(sample.volume);
                    if !voice.is_active() {
                        self.dead.push(*handle);
                    }
                }
                None => self.dead.push(*handle),
            }
        }

        if vol_sum == 0 {
            midpoint
        } else {
            let combined = (amp_sum * vol_max as i64) / (vol_sum as i64 * V_MAX as i64);
            combined as Amplitude + midpoint
        }
    }

    fn drain_events(&mut self) {
        let events: Vec<_> = self.receiver.drain().collect();
        for event in events {
            match event {
                NoteEvent::NoteOn(voice) => {
                    let handle = voice.handle();
                    self.voices.insert(handle, *voice);
                    self.by_pitch.insert(handle.midi_note, handle);
                }
                NoteEvent::NoteOff(handle) => {
                    // Looked up by pitch, not by the handle's generation:
                    // the event source may not know which generation is
                    // currently newest, and this always targets the
                    // latest voice at that pitch, matching retrigger
                    // semantics.
                    if let Some(target) = self.by_pitch.remove(&handle.midi_note) {
                        if let Some(voice) = self.voices.get_mut(&target) {
                            voice.key_up();
                        }
                    }
                }
            }
        }
    }

    fn purge_dead(&mut self) {
        for handle in self.dead.drain(..) {
            self.voices.remove(&handle);
        }
    }
}
