use std::{sync::Arc, thread};

use clap::ArgMatches;
use cpal::SupportedStreamConfig;

use crate::audio::sink::AudioSink;

pub mod console;
pub mod send;

pub trait Module {
    fn name(&self) -> &'static str;
    /// Runs once before the output stream starts.
    fn init(&self) {}
    /// Takes over the main thread after setup.
    fn block(&self) -> ! {
        loop {
            thread::park()
        }
    }
}

pub struct InitContext {
    pub args: ArgMatches,
    pub output: SupportedStreamConfig,
    pub sink: Arc<AudioSink>,
}

impl InitContext {
    pub fn sample_rate(&self) -> u32 {
        self.output.sample_rate().0
    }
}
