//! Text to Morse signal encoding and time resolution.

use serde::Serialize;

/// Length of a dot in milliseconds.
/// Every other timing is some multiple of this.
pub const DOT_TIME: u64 = 200;
/// Length of a dash, three dots per convention.
pub const DASH_TIME: u64 = 600;
/// Gap between pulses of the same character.
pub const INTRA_GAP: u64 = 200;
/// Gap between two characters of the same word.
pub const CHAR_GAP: u64 = 600;
/// Gap between words, emitted for each space.
pub const WORD_GAP: u64 = 1400;

/// One timed unit of a transmission.
/// Only dots and dashes are audible, the gaps are silent spacers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Signal {
    pub kind: SignalKind,
    /// Duration in milliseconds.
    pub duration: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Dot,
    Dash,
    CharGap,
    WordGap,
}

/// A dot or dash within a character's pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulse {
    Dot,
    Dash,
}

/// The signal current at some elapsed time, with its fractional progress.
/// A finished (or empty) transmission resolves to [`Resolved::DONE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub index: Option<usize>,
    pub signal: Option<Signal>,
    /// How far through the current signal, 0 to 1.
    pub progress: f32,
    /// Whether the current signal is a dot or dash.
    pub active: bool,
}

impl SignalKind {
    pub fn active(&self) -> bool {
        matches!(self, SignalKind::Dot | SignalKind::Dash)
    }
}

impl Signal {
    fn dot() -> Self {
        Self {
            kind: SignalKind::Dot,
            duration: DOT_TIME,
        }
    }

    fn dash() -> Self {
        Self {
            kind: SignalKind::Dash,
            duration: DASH_TIME,
        }
    }

    fn gap(duration: u64) -> Self {
        Self {
            kind: SignalKind::CharGap,
            duration,
        }
    }

    fn word_gap() -> Self {
        Self {
            kind: SignalKind::WordGap,
            duration: WORD_GAP,
        }
    }
}

impl Resolved {
    /// Terminal state, returned at or past the end of the sequence.
    pub const DONE: Resolved = Resolved {
        index: None,
        signal: None,
        progress: 1.0,
        active: false,
    };
}

/// Encodes a message into an ordered signal sequence.
///
/// Characters without a table entry are dropped without complaint, spaces
/// become a single word gap with no character gap on either side, and no
/// trailing gap is emitted at the end of the message.
pub fn encode(message: &str) -> Vec<Signal> {
    let chars = message.to_uppercase().chars().collect::<Vec<_>>();
    let mut signals = Vec::new();

    for (i, &chr) in chars.iter().enumerate() {
        if chr == ' ' {
            signals.push(Signal::word_gap());
            continue;
        }

        let Some(pulses) = pattern(chr) else { continue };
        for (j, pulse) in pulses.iter().enumerate() {
            signals.push(match pulse {
                Pulse::Dot => Signal::dot(),
                Pulse::Dash => Signal::dash(),
            });

            if j + 1 < pulses.len() {
                signals.push(Signal::gap(INTRA_GAP));
            }
        }

        // No gap before a word break or at the end of the message
        if i + 1 < chars.len() && chars[i + 1] != ' ' {
            signals.push(Signal::gap(CHAR_GAP));
        }
    }

    signals
}

/// Total length of a signal sequence in milliseconds.
pub fn total_duration(signals: &[Signal]) -> u64 {
    signals.iter().map(|x| x.duration).sum()
}

/// Finds the signal current at `elapsed` milliseconds into a sequence.
///
/// Pure and monotonic: for a fixed sequence a later elapsed time never
/// resolves to an earlier index, so it can be sampled at whatever irregular
/// cadence the caller manages. Negative elapsed times act like zero.
pub fn resolve_at(signals: &[Signal], elapsed: i64) -> Resolved {
    let elapsed = elapsed.max(0) as u64;
    let mut start = 0;

    for (index, &signal) in signals.iter().enumerate() {
        let end = start + signal.duration;
        if elapsed < end {
            return Resolved {
                index: Some(index),
                signal: Some(signal),
                progress: (elapsed - start) as f32 / signal.duration as f32,
                active: signal.kind.active(),
            };
        }

        start = end;
    }

    Resolved::DONE
}

/// Looks up the pulse pattern for a character.
/// Space is not in the table, it marks a word boundary instead.
pub fn pattern(chr: char) -> Option<&'static [Pulse]> {
    SYMBOL_TABLE
        .iter()
        .find(|(c, _)| *c == chr)
        .map(|(_, pulses)| *pulses)
}

use Pulse::*;
const SYMBOL_TABLE: [(char, &[Pulse]); 53] = [
    ('A', &[Dot, Dash]),
    ('B', &[Dash, Dot, Dot, Dot]),
    ('C', &[Dash, Dot, Dash, Dot]),
    ('D', &[Dash, Dot, Dot]),
    ('E', &[Dot]),
    ('F', &[Dot, Dot, Dash, Dot]),
    ('G', &[Dash, Dash, Dot]),
    ('H', &[Dot, Dot, Dot, Dot]),
    ('I', &[Dot, Dot]),
    ('J', &[Dot, Dash, Dash, Dash]),
    ('K', &[Dash, Dot, Dash]),
    ('L', &[Dot, Dash, Dot, Dot]),
    ('M', &[Dash, Dash]),
    ('N', &[Dash, Dot]),
    ('O', &[Dash, Dash, Dash]),
    ('P', &[Dot, Dash, Dash, Dot]),
    ('Q', &[Dash, Dash, Dot, Dash]),
    ('R', &[Dot, Dash, Dot]),
    ('S', &[Dot, Dot, Dot]),
    ('T', &[Dash]),
    ('U', &[Dot, Dot, Dash]),
    ('V', &[Dot, Dot, Dot, Dash]),
    ('W', &[Dot, Dash, Dash]),
    ('X', &[Dash, Dot, Dot, Dash]),
    ('Y', &[Dash, Dot, Dash, Dash]),
    ('Z', &[Dash, Dash, Dot, Dot]),
    ('0', &[Dash, Dash, Dash, Dash, Dash]),
    ('1', &[Dot, Dash, Dash, Dash, Dash]),
    ('2', &[Dot, Dot, Dash, Dash, Dash]),
    ('3', &[Dot, Dot, Dot, Dash, Dash]),
    ('4', &[Dot, Dot, Dot, Dot, Dash]),
    ('5', &[Dot, Dot, Dot, Dot, Dot]),
    ('6', &[Dash, Dot, Dot, Dot, Dot]),
    ('7', &[Dash, Dash, Dot, Dot, Dot]),
    ('8', &[Dash, Dash, Dash, Dot, Dot]),
    ('9', &[Dash, Dash, Dash, Dash, Dot]),
    ('.', &[Dot, Dash, Dot, Dash, Dot, Dash]),
    (',', &[Dash, Dash, Dot, Dot, Dash, Dash]),
    ('?', &[Dot, Dot, Dash, Dash, Dot, Dot]),
    ('\'', &[Dot, Dash, Dash, Dash, Dash, Dot]),
    ('!', &[Dash, Dot, Dash, Dot, Dash, Dash]),
    ('/', &[Dash, Dot, Dot, Dash, Dot]),
    ('(', &[Dash, Dot, Dash, Dash, Dot]),
    (')', &[Dash, Dot, Dash, Dash, Dot, Dash]),
    ('&', &[Dot, Dash, Dot, Dot, Dot]),
    (':', &[Dash, Dash, Dash, Dot, Dot, Dot]),
    (';', &[Dash, Dot, Dash, Dot, Dash, Dot]),
    ('=', &[Dash, Dot, Dot, Dot, Dash]),
    ('+', &[Dot, Dash, Dot, Dash, Dot]),
    ('-', &[Dash, Dot, Dot, Dot, Dot, Dash]),
    ('_', &[Dot, Dot, Dash, Dash, Dot, Dash]),
    ('"', &[Dot, Dash, Dot, Dot, Dash, Dot]),
    ('@', &[Dot, Dash, Dash, Dot, Dash, Dot]),
];
