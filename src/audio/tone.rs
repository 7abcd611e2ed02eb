//! Oscillator iterators.
//! Endless [`Tone`] at the bottom, [`SmoothTone`] on top to bound the
//! duration and ramp the edges so keying doesn't click.

use std::f32::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
}

#[derive(Clone, Copy, Debug)]
pub struct Tone {
    i: usize,
    frequency: f32,
    sample_rate: f32,
    waveform: Waveform,
}

impl Tone {
    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        Self {
            i: 0,
            frequency,
            sample_rate: sample_rate as f32,
            waveform: Waveform::Sine,
        }
    }

    pub fn waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }
}

impl Iterator for Tone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        self.i += 1;
        let raw = (self.i as f32 * self.frequency * 2.0 * PI / self.sample_rate).sin();

        Some(match self.waveform {
            Waveform::Sine => raw,
            // A sine hard-clipped to its sign is the classic buzzy key tone.
            Waveform::Square => raw.signum(),
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SmoothTone {
    inner: Tone,
    duration: usize,
    ramp: usize,
    amplitude: f32,
}

impl SmoothTone {
    pub fn new(tone: Tone, duration_ms: u64) -> Self {
        let sample_rate = tone.sample_rate;
        Self {
            inner: tone,
            duration: (sample_rate * duration_ms as f32 / 1000.0) as usize,
            // 5ms edges are short enough to stay inaudible as fades.
            ramp: (sample_rate * 0.005) as usize,
            amplitude: 1.0,
        }
    }

    pub fn amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }
}

impl Iterator for SmoothTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.inner.i >= self.duration {
            return None;
        }

        let mut raw = self.inner.next()? * self.amplitude;

        let i = self.inner.i;
        if i < self.ramp {
            raw *= i as f32 / self.ramp as f32;
        }

        let from_end = self.duration - i;
        if from_end < self.ramp {
            raw *= from_end as f32 / self.ramp as f32;
        }

        Some(raw)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tone_is_endless() {
        let mut tone = Tone::new(600.0, 44100);
        for _ in 0..100_000 {
            let sample = tone.next().unwrap();
            assert!((-1.0..=1.0).contains(&sample));
        }
    }

    #[test]
    fn test_square_saturates() {
        let tone = Tone::new(600.0, 44100).waveform(Waveform::Square);
        for sample in tone.take(1000) {
            assert!(sample == 1.0 || sample == -1.0);
        }
    }

    #[test]
    fn test_smooth_tone_bounds() {
        let tone = Tone::new(600.0, 44100).waveform(Waveform::Square);
        let samples = SmoothTone::new(tone, 200).amplitude(0.3).collect::<Vec<_>>();

        // 200ms at 44.1kHz.
        assert_eq!(samples.len(), 8820);
        assert!(samples.iter().all(|x| x.abs() <= 0.3 + f32::EPSILON));

        // The edges ramp, the middle does not.
        assert!(samples[1].abs() < 0.01);
        assert!(samples.iter().any(|x| x.abs() > 0.29));
    }
}
