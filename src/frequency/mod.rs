//! MIDI note frequency table.
//!
//! Pure conversion from a MIDI note number to a frequency in Hz, memoized
//! over the 128 possible note numbers.

use std::sync::OnceLock;

use thiserror::Error;

/// Errors produced while parsing a letter-note name into a MIDI number.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrequencyError {
    #[error("empty note name")]
    EmptyNote,
    #[error("unrecognized note letter {0:?}")]
    UnknownLetter(char),
    #[error("invalid octave in note name {0:?}")]
    InvalidOctave(String),
}

/// Converts a MIDI note number (0-127) to a frequency in Hz.
///
/// `f = 27.5 * 2^((n - 21) / 12)`, per <http://glassarmonica.com/science/frequency_midi.php>.
pub fn freq(midi_note: u8) -> f64 {
    table()[midi_note as usize]
}

/// Bounded 128-entry memoization table, built once and shared for the life
/// of the process.
///
/// Replaces the "sum of argument hashes" cache from the original
/// implementation (collision-prone and unbounded) with a plain array indexed
/// by the only input that matters: the MIDI note number.
fn table() -> &'static [f64; 128] {
    static TABLE: OnceLock<[f64; 128]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0; 128];
        for (n, slot) in table.iter_mut().enumerate() {
            *slot = 27.5 * 2f64.powf((n as f64 - 21.0) / 12.0);
        }
        table
    })
}

/// Parses a letter note name (e.g. `"A4"`, `"C#5"`, `"Db3"`) into a MIDI
/// note number.
///
/// `C5` is middle C (MIDI 60) and `A4` is concert pitch (MIDI 69, 440 Hz):
/// octaves are 12 semitones apart, measured from each letter's own
/// reference octave (5 for C through G, 4 for A and B — see
/// [`base_letter_midi`]), and `#`/`♯` sharpens while `b`/`♭` flattens the
/// base letter before the octave shift is applied.
pub fn letter_to_midi(letter_note: &str) -> Result<u8, FrequencyError> {
    let mut chars = letter_note.chars();
    let base = chars.next().ok_or(FrequencyError::EmptyNote)?;

    let (mut midi, reference_octave) = base_letter_midi(base.to_ascii_uppercase())
        .ok_or(FrequencyError::UnknownLetter(base))?;

    let mut octave_digits = String::new();
    for modifier in chars {
        match modifier {
            'b' | '♭' => midi -= 1,
            '#' | '♯' => midi += 1,
            digit => octave_digits.push(digit),
        }
    }

    if !octave_digits.is_empty() {
        let octave: i32 = octave_digits
            .parse()
            .map_err(|_| FrequencyError::InvalidOctave(letter_note.to_string()))?;
        midi += (12 * octave) - (12 * reference_octave);
    }

    u8::try_from(midi).map_err(|_| FrequencyError::InvalidOctave(letter_note.to_string()))
}

/// Each base letter's MIDI value at its own reference octave, paired with
/// that reference octave.
///
/// C through G anchor at octave 5 (`C5` = 60, the repo's middle-C
/// convention). A and B anchor one octave lower, at octave 4 — this is
/// what keeps `letter_to_midi("A4")` on the universally recognized 440 Hz
/// concert pitch (MIDI 69) rather than inheriting the same +1 shift the
/// C-G group uses.
fn base_letter_midi(letter: char) -> Option<(i32, i32)> {
    Some(match letter {
        'C' => (60, 5),
        'D' => (62, 5),
        'E' => (64, 5),
        'F' => (65, 5),
        'G' => (67, 5),
        'A' => (69, 4),
        'B' => (71, 4),
        _ => return None,
    })
}
