//! Audio synthesis.
//! Tone generation, noise, and the shared output mixer.

pub mod noise;
pub mod sink;
pub mod tone;
