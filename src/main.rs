use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio::sink::AudioSink;

mod args;
mod audio;
mod coding;
mod game;
mod misc;
mod modules;

fn main() -> anyhow::Result<()> {
    // Setup audio output
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no output device available")?;
    let config = device
        .default_output_config()
        .context("error while querying configs")?;

    println!(
        "[*] Output hooked into `{}` ({})",
        device.name()?,
        config.sample_rate().0
    );

    let sink = AudioSink::new(config.sample_rate().0, config.channels());
    let module = args::parse_args(config.clone(), sink.clone());
    println!("[*] Running module `{}`", module.name());
    module.init();

    let stream = {
        let sink = sink.clone();
        device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| sink.write(data),
            |err| eprintln!("[-] Error: {err}"),
            None,
        )?
    };
    stream.play()?;

    module.block()
}
