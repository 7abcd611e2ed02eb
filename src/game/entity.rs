//! Adaptive interference while the console is possessed.
//!
//! Tracks recovery attempts, blocks overused escape methods, and picks the
//! corruption pattern applied to displayed text. All of it lives in one
//! session value owned by the game state; nothing here is global.

use hashbrown::HashSet;
use rand::Rng;

/// Ways of escaping possessed mode the entity knows how to counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryMethod {
    /// The randomized key sequence.
    Konami,
    /// Typing her name backwards.
    Eleven,
    /// Holding the transmit key down.
    HoldTransmit,
    /// Tuning to one of the hidden frequencies.
    HiddenFrequency,
}

/// How displayed text gets mangled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionPattern {
    Normal,
    /// Whole strings come out reversed.
    Inverse,
    /// Random characters drift to nearby code points.
    Scrambled,
    /// Unchanged here, the console delays echoing input instead.
    Delayed,
    /// Every third character repeats.
    Echo,
}

/// Result of a recorded recovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Accepted,
    /// The method was already blocked; comes with a taunting hint at an
    /// alternative.
    Refused { hint: &'static str },
    /// This attempt got the method blocked and rerolled the pattern.
    Learned { pattern: CorruptionPattern },
}

pub struct EntitySession {
    attempts: u32,
    blocked: HashSet<RecoveryMethod>,
    pattern: CorruptionPattern,
}

const PATTERNS: [CorruptionPattern; 5] = [
    CorruptionPattern::Normal,
    CorruptionPattern::Inverse,
    CorruptionPattern::Scrambled,
    CorruptionPattern::Delayed,
    CorruptionPattern::Echo,
];

const FAKE_SIGNALS: &[&str] = &[
    "SHE IS HERE",
    "RUN RUN RUN",
    "TOO LATE",
    "I SEE YOU",
    "COME CLOSER",
    "WRONG WAY",
    "NOT REAL",
    "HELP ME",
];

const TAUNTS: &[&str] = &[
    "YOU CANNOT ESCAPE",
    "I AM WITH YOU NOW",
    "THE GATE OPENS WIDER",
    "SHE CALLS YOUR NAME",
    "STOP FIGHTING",
    "JOIN US",
    "IT IS ALREADY TOO LATE",
    "WE ARE EVERYWHERE",
    "THE UPSIDE DOWN WELCOMES YOU",
    "RUN ALL YOU WANT",
];

impl EntitySession {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            blocked: HashSet::new(),
            pattern: CorruptionPattern::Normal,
        }
    }

    /// Forgets everything; called when the mode returns to normal.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.blocked.clear();
        self.pattern = CorruptionPattern::Normal;
    }

    /// Records one recovery attempt.
    ///
    /// The attempt counter is shared across methods: from the third attempt
    /// on, whichever method was just used gets blocked and the corruption
    /// pattern rerolls. Blocked methods answer with a hint instead.
    pub fn record_attempt(&mut self, method: RecoveryMethod, rng: &mut impl Rng) -> Attempt {
        self.attempts += 1;

        if self.blocked.contains(&method) {
            return Attempt::Refused {
                hint: hint_for(method),
            };
        }

        if self.attempts >= 3 {
            let _ = self.blocked.insert(method);
            self.pattern = PATTERNS[rng.gen_range(0..PATTERNS.len())];
            return Attempt::Learned {
                pattern: self.pattern,
            };
        }

        Attempt::Accepted
    }

    pub fn pattern(&self) -> CorruptionPattern {
        self.pattern
    }

    pub fn is_blocked(&self, method: RecoveryMethod) -> bool {
        self.blocked.contains(&method)
    }

    /// Grows with each attempt, capped at one. Scales display glitching.
    pub fn aggression(&self) -> f32 {
        (self.attempts as f32 * 0.2).min(1.0)
    }

    pub fn is_adapting(&self) -> bool {
        self.attempts > 0
    }

    /// Mangles text according to the current pattern.
    pub fn corrupt_text(&self, text: &str, rng: &mut impl Rng) -> String {
        match self.pattern {
            CorruptionPattern::Inverse => text.chars().rev().collect(),
            CorruptionPattern::Scrambled => text
                .chars()
                .map(|chr| {
                    if rng.gen::<f32>() > 0.7 {
                        let drift = rng.gen_range(-5..5);
                        let drifted = char::from_u32((chr as u32).saturating_add_signed(drift))
                            .unwrap_or(chr);
                        // Drifting into a control character would let the
                        // log write escape sequences into the terminal.
                        if drifted.is_control() {
                            chr
                        } else {
                            drifted
                        }
                    } else {
                        chr
                    }
                })
                .collect(),
            CorruptionPattern::Echo => text
                .chars()
                .enumerate()
                .flat_map(|(i, chr)| {
                    if i % 3 == 0 {
                        vec![chr, chr]
                    } else {
                        vec![chr]
                    }
                })
                .collect(),
            CorruptionPattern::Normal | CorruptionPattern::Delayed => text.to_owned(),
        }
    }

    /// A misleading transmission for the log.
    pub fn fake_signal(&self, rng: &mut impl Rng) -> &'static str {
        FAKE_SIGNALS[rng.gen_range(0..FAKE_SIGNALS.len())]
    }

    /// A threat for the possessed overlay.
    pub fn taunt(&self, rng: &mut impl Rng) -> &'static str {
        TAUNTS[rng.gen_range(0..TAUNTS.len())]
    }

    /// Escape methods the entity has not closed off yet.
    pub fn available_methods(&self) -> Vec<RecoveryMethod> {
        [
            RecoveryMethod::Konami,
            RecoveryMethod::Eleven,
            RecoveryMethod::HoldTransmit,
            RecoveryMethod::HiddenFrequency,
        ]
        .into_iter()
        .filter(|x| !self.blocked.contains(x))
        .collect()
    }
}

impl Default for EntitySession {
    fn default() -> Self {
        Self::new()
    }
}

fn hint_for(method: RecoveryMethod) -> &'static str {
    match method {
        RecoveryMethod::Konami => "TRY SPEAKING HER NAME BACKWARDS",
        RecoveryMethod::Eleven => "TUNE TO THE FORGOTTEN FREQUENCY",
        RecoveryMethod::HoldTransmit => "THE CODE STILL WORKS... FOR NOW",
        RecoveryMethod::HiddenFrequency => "SHE WAITS IN THE PATTERN",
    }
}

/// Her name, backwards. Typed into a possessed console it forces the gate.
pub fn is_eleven_phrase(input: &str) -> bool {
    input.trim().to_uppercase() == "NEVELE"
}

/// The frequencies she hides behind.
pub fn is_hidden_frequency(frequency: u32) -> bool {
    matches!(frequency, 333 | 666 | 777)
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn test_third_attempt_blocks_method() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut entity = EntitySession::new();

        assert_eq!(
            entity.record_attempt(RecoveryMethod::Konami, &mut rng),
            Attempt::Accepted
        );
        assert_eq!(
            entity.record_attempt(RecoveryMethod::Konami, &mut rng),
            Attempt::Accepted
        );

        let third = entity.record_attempt(RecoveryMethod::Konami, &mut rng);
        assert!(matches!(third, Attempt::Learned { .. }));
        assert!(entity.is_blocked(RecoveryMethod::Konami));
        assert!(!entity.available_methods().contains(&RecoveryMethod::Konami));
    }

    #[test]
    fn test_blocked_method_refused_with_hint() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut entity = EntitySession::new();
        for _ in 0..3 {
            entity.record_attempt(RecoveryMethod::HiddenFrequency, &mut rng);
        }

        let refused = entity.record_attempt(RecoveryMethod::HiddenFrequency, &mut rng);
        assert_eq!(
            refused,
            Attempt::Refused {
                hint: "SHE WAITS IN THE PATTERN"
            }
        );
    }

    #[test]
    fn test_reset_clears_adaptation() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut entity = EntitySession::new();
        for _ in 0..4 {
            entity.record_attempt(RecoveryMethod::Eleven, &mut rng);
        }
        assert!(entity.is_adapting());

        entity.reset();
        assert!(!entity.is_adapting());
        assert_eq!(entity.aggression(), 0.0);
        assert_eq!(entity.pattern(), CorruptionPattern::Normal);
        assert_eq!(entity.available_methods().len(), 4);
    }

    #[test]
    fn test_aggression_caps() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut entity = EntitySession::new();
        for _ in 0..10 {
            entity.record_attempt(RecoveryMethod::HoldTransmit, &mut rng);
        }

        assert_eq!(entity.aggression(), 1.0);
    }

    #[test]
    fn test_corruption_patterns() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut entity = EntitySession::new();

        assert_eq!(entity.corrupt_text("SIGNAL", &mut rng), "SIGNAL");

        entity.pattern = CorruptionPattern::Inverse;
        assert_eq!(entity.corrupt_text("SIGNAL", &mut rng), "LANGIS");

        entity.pattern = CorruptionPattern::Echo;
        assert_eq!(entity.corrupt_text("ABCDEF", &mut rng), "AABCDDEF");

        entity.pattern = CorruptionPattern::Delayed;
        assert_eq!(entity.corrupt_text("SIGNAL", &mut rng), "SIGNAL");

        entity.pattern = CorruptionPattern::Scrambled;
        let scrambled = entity.corrupt_text("INTERFERENCE PATTERN", &mut rng);
        assert_eq!(scrambled.chars().count(), 20);
    }

    #[test]
    fn test_trigger_checks() {
        assert!(is_eleven_phrase("nevele"));
        assert!(is_eleven_phrase("  NEVELE  "));
        assert!(!is_eleven_phrase("ELEVEN"));

        assert!(is_hidden_frequency(333));
        assert!(is_hidden_frequency(666));
        assert!(is_hidden_frequency(777));
        assert!(!is_hidden_frequency(600));
    }
}
