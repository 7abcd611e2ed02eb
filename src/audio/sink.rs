//! The output mixer.
//!
//! Everything audible goes through one [`AudioSink`]: modules push voices
//! from their own threads, the cpal callback pulls mixed samples. The sink
//! also taps its mono output into a ring buffer so the console can draw a
//! waveform and spectrum from what is actually playing.

use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use rand::{thread_rng, Rng};

use crate::audio::noise::Noise;
use crate::audio::tone::{SmoothTone, Tone, Waveform};
use crate::coding::morse::{SignalKind, DASH_TIME, DOT_TIME};
use crate::misc::ring_buffer::RingBuffer;

const BEEP_AMPLITUDE: f32 = 0.3;
const NOISE_AMPLITUDE: f32 = 0.1;
/// Frequency drift on corrupted beeps.
const DETUNE: f32 = 100.0;
pub const TAP_SIZE: usize = 2048;

enum Voice {
    Tone(SmoothTone),
    Noise(Noise),
}

impl Iterator for Voice {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Voice::Tone(tone) => tone.next(),
            Voice::Noise(noise) => noise.next(),
        }
    }
}

pub struct AudioSink {
    sample_rate: u32,
    channels: u16,
    voices: Mutex<Vec<Voice>>,
    tap: Mutex<RingBuffer<f32, TAP_SIZE>>,
    drained_tx: Sender<()>,
    drained_rx: Receiver<()>,
}

impl AudioSink {
    pub fn new(sample_rate: u32, channels: u16) -> Arc<Self> {
        let (drained_tx, drained_rx) = channel::bounded(1);
        Arc::new(Self {
            sample_rate,
            channels,
            voices: Mutex::new(Vec::new()),
            tap: Mutex::new(RingBuffer::new()),
            drained_tx,
            drained_rx,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Keys one element of a message. Gaps are silence, not voices.
    pub fn beep(&self, kind: SignalKind, frequency: f32, corrupted: bool) {
        let duration = match kind {
            SignalKind::Dot => DOT_TIME,
            SignalKind::Dash => DASH_TIME,
            SignalKind::CharGap | SignalKind::WordGap => return,
        };

        let mut frequency = frequency;
        let mut voices = self.voices.lock();
        if corrupted {
            frequency += thread_rng().gen_range(-DETUNE..DETUNE);
            voices.push(Voice::Noise(Noise::new(
                duration / 2,
                NOISE_AMPLITUDE,
                self.sample_rate,
            )));
        }

        let tone = Tone::new(frequency, self.sample_rate).waveform(Waveform::Square);
        voices.push(Voice::Tone(
            SmoothTone::new(tone, duration).amplitude(BEEP_AMPLITUDE),
        ));
    }

    /// A short burst of interference with no information in it.
    pub fn static_burst(&self) {
        let duration = thread_rng().gen_range(100..=300);
        self.voices.lock().push(Voice::Noise(Noise::new(
            duration,
            NOISE_AMPLITUDE,
            self.sample_rate,
        )));
    }

    pub fn is_idle(&self) -> bool {
        self.voices.lock().is_empty()
    }

    /// Receives one message each time the last live voice finishes.
    pub fn drained(&self) -> &Receiver<()> {
        &self.drained_rx
    }

    /// Recent mono output, oldest first.
    pub fn tap(&self) -> Vec<f32> {
        self.tap.lock().iter().copied().collect()
    }

    /// The output stream callback. Each frame gets one mixed mono sample
    /// written to all of its channels.
    pub fn write(&self, output: &mut [f32]) {
        let mut voices = self.voices.lock();
        let mut tap = self.tap.lock();
        let had_voices = !voices.is_empty();
        let mut last = 0.0;

        for (i, e) in output.iter_mut().enumerate() {
            if i % self.channels as usize == 0 {
                last = mix(&mut voices);
                tap.push(last);
            }

            *e = last;
        }

        if had_voices && voices.is_empty() {
            let _ = self.drained_tx.try_send(());
        }
    }
}

fn mix(voices: &mut Vec<Voice>) -> f32 {
    let mut sample = 0.0;
    voices.retain_mut(|voice| match voice.next() {
        Some(x) => {
            sample += x;
            true
        }
        None => false,
    });

    sample.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_beep_plays_and_drains() {
        let sink = AudioSink::new(44100, 2);
        sink.beep(SignalKind::Dot, 600.0, false);
        assert!(!sink.is_idle());

        // Half a second of stereo frames, well past the 200ms dot.
        let mut output = vec![0.0; 44100];
        sink.write(&mut output);

        assert!(output.iter().any(|x| *x != 0.0));
        assert!(sink.is_idle());
        assert!(sink.drained().try_recv().is_ok());
        assert!(sink.drained().try_recv().is_err());
    }

    #[test]
    fn test_channels_get_the_same_sample() {
        let sink = AudioSink::new(44100, 2);
        sink.beep(SignalKind::Dash, 600.0, false);

        let mut output = vec![0.0; 1024];
        sink.write(&mut output);
        for frame in output.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn test_gaps_are_silent() {
        let sink = AudioSink::new(44100, 2);
        sink.beep(SignalKind::CharGap, 600.0, false);
        sink.beep(SignalKind::WordGap, 600.0, false);
        assert!(sink.is_idle());
    }

    #[test]
    fn test_mix_saturates() {
        let sink = AudioSink::new(44100, 1);
        for _ in 0..8 {
            sink.beep(SignalKind::Dot, 600.0, false);
        }

        let mut output = vec![0.0; 8820];
        sink.write(&mut output);
        assert!(output.iter().all(|x| x.abs() <= 1.0));
    }

    #[test]
    fn test_corrupted_beep_finishes() {
        let sink = AudioSink::new(44100, 2);
        sink.beep(SignalKind::Dot, 600.0, true);
        assert!(!sink.is_idle());

        let mut output = vec![0.0; 44100];
        sink.write(&mut output);
        assert!(sink.is_idle());
    }

    #[test]
    fn test_tap_keeps_recent_mono() {
        let sink = AudioSink::new(44100, 2);
        sink.beep(SignalKind::Dot, 600.0, false);

        let mut output = vec![0.0; 44100];
        sink.write(&mut output);
        assert_eq!(sink.tap().len(), TAP_SIZE);
    }
}
