//! One-shot white noise burst.

use rand::{rngs::StdRng, Rng, SeedableRng};

pub struct Noise {
    rng: StdRng,
    remaining: usize,
    amplitude: f32,
}

impl Noise {
    pub fn new(duration_ms: u64, amplitude: f32, sample_rate: u32) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            remaining: (sample_rate as f32 * duration_ms as f32 / 1000.0) as usize,
            amplitude,
        }
    }
}

impl Iterator for Noise {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        self.remaining -= 1;
        Some(self.rng.gen_range(-1.0..1.0) * self.amplitude)
    }
}

#[cfg(test)]
mod test {
    use super::Noise;

    #[test]
    fn test_burst_length_and_bounds() {
        let samples = Noise::new(100, 0.1, 44100).collect::<Vec<_>>();
        assert_eq!(samples.len(), 4410);
        assert!(samples.iter().all(|x| x.abs() <= 0.1));
    }
}
