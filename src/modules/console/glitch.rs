//! Display-layer text mangling.

use rand::Rng;

const GLYPHS: &[char] = &['█', '▓', '▒', '░', '#', '%', '&', '@'];

/// Mirror-alphabet substitution (A↔Z, B↔Y, ...). Possessed keyboards type
/// through this.
pub fn mirror(chr: char) -> char {
    match chr {
        'A'..='Z' => (b'Z' - (chr as u8 - b'A')) as char,
        'a'..='z' => (b'z' - (chr as u8 - b'a')) as char,
        _ => chr,
    }
}

/// Swaps characters for block glyphs, more of them as intensity rises.
pub fn corrupt(text: &str, intensity: f32, rng: &mut impl Rng) -> String {
    text.chars()
        .map(|chr| {
            if !chr.is_whitespace() && rng.gen::<f32>() < intensity * 0.3 {
                GLYPHS[rng.gen_range(0..GLYPHS.len())]
            } else {
                chr
            }
        })
        .collect()
}
