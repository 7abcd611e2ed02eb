//! Randomized key-sequence gate for leaving possessed mode.
//!
//! The same ordered-sequence-resolution problem as signal playback, driven
//! by key tokens instead of a clock: a cursor walks the target sequence and
//! one wrong token forfeits all progress.

use rand::Rng;

/// Input tokens the matcher understands.
/// Key events outside this alphabet never reach [`RecoverySequence::feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Up,
    Down,
    Left,
    Right,
    KeyS,
    KeyT,
}

/// Result of feeding one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Feed {
    pub advanced: bool,
    pub completed: bool,
}

pub struct RecoverySequence {
    sequence: Vec<Token>,
    cursor: usize,
}

const MOVES: [Token; 4] = [Token::Up, Token::Down, Token::Left, Token::Right];

impl RecoverySequence {
    /// Rolls a fresh sequence: six to eight random movement tokens followed
    /// by the fixed S, T terminator.
    pub fn generate(rng: &mut impl Rng) -> Self {
        let length = rng.gen_range(6..=8);
        let mut sequence = (0..length)
            .map(|_| MOVES[rng.gen_range(0..MOVES.len())])
            .collect::<Vec<_>>();
        sequence.extend([Token::KeyS, Token::KeyT]);

        Self {
            sequence,
            cursor: 0,
        }
    }

    /// Swaps in a new random sequence and forgets all progress.
    pub fn regenerate(&mut self, rng: &mut impl Rng) {
        *self = Self::generate(rng);
    }

    /// Matches one token against the cursor position.
    ///
    /// A mismatch resets the cursor outright. That holds even when the bad
    /// token equals the sequence's first element; there is no restart
    /// credit.
    pub fn feed(&mut self, token: Token) -> Feed {
        if self.sequence.get(self.cursor) == Some(&token) {
            self.cursor += 1;

            if self.cursor == self.sequence.len() {
                self.cursor = 0;
                return Feed {
                    advanced: true,
                    completed: true,
                };
            }

            return Feed {
                advanced: true,
                completed: false,
            };
        }

        self.cursor = 0;
        Feed::default()
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Fraction of the sequence matched so far.
    pub fn progress(&self) -> f32 {
        self.cursor as f32 / self.sequence.len() as f32
    }

    pub fn tokens(&self) -> &[Token] {
        &self.sequence
    }

    #[cfg(test)]
    fn from_tokens(sequence: Vec<Token>) -> Self {
        Self {
            sequence,
            cursor: 0,
        }
    }
}

impl Token {
    /// Glyph shown in the recovery overlay.
    pub fn symbol(&self) -> char {
        match self {
            Token::Up => '▲',
            Token::Down => '▼',
            Token::Left => '◀',
            Token::Right => '▶',
            Token::KeyS => 'S',
            Token::KeyT => 'T',
        }
    }
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn test_generated_shape() {
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let seq = RecoverySequence::generate(&mut rng);
            let tokens = seq.tokens();

            assert!((8..=10).contains(&tokens.len()));
            assert_eq!(tokens[tokens.len() - 2], Token::KeyS);
            assert_eq!(tokens[tokens.len() - 1], Token::KeyT);
            assert!(tokens[..tokens.len() - 2]
                .iter()
                .all(|x| MOVES.contains(x)));
        }
    }

    #[test]
    fn test_exact_sequence_completes_once() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seq = RecoverySequence::generate(&mut rng);
        let tokens = seq.tokens().to_vec();

        let mut completions = 0;
        for (i, token) in tokens.iter().enumerate() {
            let feed = seq.feed(*token);
            assert!(feed.advanced);
            assert_eq!(feed.completed, i == tokens.len() - 1);
            completions += feed.completed as u32;
        }

        assert_eq!(completions, 1);
        assert_eq!(seq.progress(), 0.0);
    }

    #[test]
    fn test_mismatch_forfeits_progress() {
        let mut seq = RecoverySequence::from_tokens(vec![
            Token::Up,
            Token::Down,
            Token::Left,
            Token::KeyS,
            Token::KeyT,
        ]);

        seq.feed(Token::Up);
        seq.feed(Token::Down);
        assert_eq!(seq.progress(), 2.0 / 5.0);

        assert_eq!(seq.feed(Token::Right), Feed::default());
        assert_eq!(seq.progress(), 0.0);

        // Matching restarts from the top afterwards
        for token in [
            Token::Up,
            Token::Down,
            Token::Left,
            Token::KeyS,
            Token::KeyT,
        ] {
            assert!(seq.feed(token).advanced);
        }
    }

    #[test]
    fn test_no_restart_credit_on_mismatch() {
        let mut seq = RecoverySequence::from_tokens(vec![
            Token::Up,
            Token::Down,
            Token::KeyS,
            Token::KeyT,
        ]);

        // Up matches position 0, then a second Up mismatches Down. The
        // cursor drops to zero and the bad token is not replayed there,
        // so a full new pass is required.
        seq.feed(Token::Up);
        let feed = seq.feed(Token::Up);
        assert!(!feed.advanced);
        assert_eq!(seq.progress(), 0.0);

        seq.feed(Token::Down);
        assert_eq!(seq.progress(), 0.0, "mismatch must not bank the token");
    }

    #[test]
    fn test_regenerate_resets() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut seq = RecoverySequence::generate(&mut rng);
        let first = seq.tokens()[0];
        seq.feed(first);
        assert!(seq.progress() > 0.0);

        seq.regenerate(&mut rng);
        assert_eq!(seq.progress(), 0.0);
    }
}
