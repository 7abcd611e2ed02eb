//! Wall-clock playback of an encoded signal sequence.
//!
//! A [`Transmission`] is armed with a start instant and then sampled with the
//! current time, usually once per rendered frame. Resolution itself is pure
//! ([`morse::resolve_at`]), the driver only tracks which signal was last seen
//! so dots and dashes trigger their beep exactly once no matter how often a
//! frame samples them. A sampling gap longer than the shortest signal (200ms)
//! can step over a pulse entirely and its beep is lost; callers are expected
//! to sample well below that.

use std::time::Instant;

use super::morse::{self, Resolved, Signal, SignalKind};

pub struct Transmission {
    signals: Vec<Signal>,
    started: Instant,
    total: u64,
    last_index: Option<usize>,
    completed: bool,
}

/// Outcome of a single sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub resolved: Resolved,
    /// Set exactly once per dot or dash, the first time it is current.
    pub fire: Option<SignalKind>,
    /// Set exactly once, on the first sample at or past the end.
    pub completed: bool,
}

impl Transmission {
    /// Arms a transmission starting at `started`.
    pub fn new(signals: Vec<Signal>, started: Instant) -> Self {
        Self {
            total: morse::total_duration(&signals),
            signals,
            started,
            last_index: None,
            completed: false,
        }
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn total_duration(&self) -> u64 {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Milliseconds since the transmission started, zero if `now` somehow
    /// precedes the start.
    pub fn elapsed(&self, now: Instant) -> i64 {
        now.saturating_duration_since(self.started).as_millis() as i64
    }

    /// Fraction of the whole transmission played so far, 0 to 1.
    pub fn fraction(&self, now: Instant) -> f32 {
        if self.total == 0 {
            return 1.0;
        }

        (self.elapsed(now) as f32 / self.total as f32).min(1.0)
    }

    /// Resolves the current signal and reports one-shot events.
    ///
    /// Safe to call at any cadence; a signal that stays current across many
    /// samples fires on the first of them only, and completion is reported
    /// on exactly one sample per transmission.
    pub fn sample(&mut self, now: Instant) -> Tick {
        let resolved = morse::resolve_at(&self.signals, self.elapsed(now));

        let mut fire = None;
        if let Some(index) = resolved.index {
            if self.last_index != Some(index) {
                self.last_index = Some(index);
                if resolved.active {
                    fire = resolved.signal.map(|x| x.kind);
                }
            }
        }

        let mut completed = false;
        if resolved.index.is_none() && !self.completed {
            self.completed = true;
            completed = true;
        }

        Tick {
            resolved,
            fire,
            completed,
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::coding::morse::encode;

    fn sample_at(tx: &mut Transmission, start: Instant, ms: u64) -> Tick {
        tx.sample(start + Duration::from_millis(ms))
    }

    #[test]
    fn test_fires_once_per_pulse() {
        let signals = encode("HI");
        let expected = signals.iter().filter(|x| x.kind.active()).count();
        let total = morse::total_duration(&signals);

        let start = Instant::now();
        let mut tx = Transmission::new(signals, start);

        let mut fires = Vec::new();
        let mut completions = 0;
        for ms in (0..=total + 20).step_by(10) {
            let tick = sample_at(&mut tx, start, ms);
            if let Some(kind) = tick.fire {
                fires.push((ms, kind));
            }

            completions += tick.completed as u32;
        }

        // H and I are six dots, each fired exactly once
        assert_eq!(fires.len(), expected);
        assert_eq!(expected, 6);
        assert!(fires.iter().all(|(_, kind)| *kind == SignalKind::Dot));
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_repeat_sample_does_not_refire() {
        let start = Instant::now();
        let mut tx = Transmission::new(encode("T"), start);

        assert_eq!(sample_at(&mut tx, start, 0).fire, Some(SignalKind::Dash));
        assert_eq!(sample_at(&mut tx, start, 0).fire, None);
        assert_eq!(sample_at(&mut tx, start, 100).fire, None);
    }

    #[test]
    fn test_irregular_sampling() {
        // A = dot, gap, dash
        let start = Instant::now();
        let mut tx = Transmission::new(encode("A"), start);

        assert_eq!(sample_at(&mut tx, start, 5).fire, Some(SignalKind::Dot));
        // Lands in the intra gap, observes it, fires nothing
        assert_eq!(sample_at(&mut tx, start, 250).fire, None);
        assert_eq!(sample_at(&mut tx, start, 430).fire, Some(SignalKind::Dash));

        let end = sample_at(&mut tx, start, 2000);
        assert!(end.completed);
        assert_eq!(end.resolved, Resolved::DONE);
    }

    #[test]
    fn test_empty_transmission_completes_immediately() {
        let start = Instant::now();
        let mut tx = Transmission::new(encode(""), start);
        assert_eq!(tx.total_duration(), 0);

        let tick = sample_at(&mut tx, start, 0);
        assert!(tick.completed);
        assert_eq!(tick.fire, None);

        // Idempotent afterwards
        let tick = sample_at(&mut tx, start, 50);
        assert!(!tick.completed);
        assert_eq!(tick.fire, None);
        assert!(tx.is_complete());
    }

    #[test]
    fn test_fraction() {
        let start = Instant::now();
        let signals = encode("E");
        let tx = Transmission::new(signals, start);

        assert_eq!(tx.fraction(start + Duration::from_millis(100)), 0.5);
        assert_eq!(tx.fraction(start + Duration::from_millis(9999)), 1.0);
    }
}
