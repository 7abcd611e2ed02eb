//! One-shot transmitter.
//! Keys a message out against the real clock, then exits. None of the
//! console theatrics live here, just the encoder and the sink.

use std::{
    process,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::{
    coding::morse::{self, Signal, SignalKind},
    coding::Transmission,
    modules::{InitContext, Module},
};

pub struct SendText {
    ctx: InitContext,
    text: String,
    frequency: u32,
    timeline: bool,
    signals: Vec<Signal>,
}

/// Shape of the `--timeline` dump.
#[derive(Serialize)]
struct Timeline<'a> {
    text: &'a str,
    total_ms: u64,
    signals: &'a [Signal],
}

impl SendText {
    pub fn new(ctx: InitContext) -> Arc<Self> {
        let text = ctx.args.get_one::<String>("text").unwrap().to_owned();
        let frequency = *ctx.args.get_one::<u32>("frequency").unwrap();
        let timeline = ctx.args.get_flag("timeline");
        let signals = morse::encode(&text);

        Arc::new(Self {
            ctx,
            text,
            frequency,
            timeline,
            signals,
        })
    }
}

impl Module for SendText {
    fn name(&self) -> &'static str {
        "send"
    }

    fn init(&self) {
        if self.signals.is_empty() {
            eprintln!("[-] Nothing to key in `{}`", self.text);
            process::exit(1);
        }

        if self.timeline {
            let timeline = Timeline {
                text: &self.text,
                total_ms: morse::total_duration(&self.signals),
                signals: &self.signals,
            };
            println!("{}", serde_json::to_string_pretty(&timeline).unwrap());
            process::exit(0);
        }

        println!("[I] Message: {}", self.text.trim().to_uppercase());
        println!("[I] Frequency: {} Hz", self.frequency);
        println!(
            "[I] Signals: {} ({}ms)",
            self.signals.len(),
            morse::total_duration(&self.signals)
        );
    }

    fn block(&self) -> ! {
        let started = Instant::now();
        let mut transmission = Transmission::new(self.signals.clone(), started);

        loop {
            let tick = transmission.sample(Instant::now());
            if let Some(kind) = tick.fire {
                self.ctx.sink.beep(kind, self.frequency as f32, false);
                println!(
                    "[*] {}",
                    match kind {
                        SignalKind::Dot => "dot",
                        SignalKind::Dash => "dash",
                        SignalKind::CharGap | SignalKind::WordGap => unreachable!(),
                    }
                );
            }

            if tick.completed {
                break;
            }

            thread::sleep(Duration::from_millis(10));
        }

        // The sink drains between pulses too, so clear stale signals before
        // waiting out the tail of the final beep.
        while self.ctx.sink.drained().try_recv().is_ok() {}
        if !self.ctx.sink.is_idle() {
            let _ = self
                .ctx
                .sink
                .drained()
                .recv_timeout(Duration::from_secs(2));
        }

        println!(
            "[I] Transmission complete ({:.1}s)",
            started.elapsed().as_secs_f32()
        );
        process::exit(0)
    }
}
