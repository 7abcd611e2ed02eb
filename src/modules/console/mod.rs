//! Interactive transmitter dashboard.
//!
//! Single-threaded event loop over a crossterm alternate screen. Each
//! iteration advances the session clocks, drains its events into the sink
//! and the log, redraws, then waits on terminal input for the rest of the
//! frame budget.

use std::{
    collections::VecDeque,
    f32::consts::PI,
    io::stdout,
    panic, process,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};
use crossterm::{
    cursor,
    event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyModifiers},
    execute, terminal,
};
use num_complex::Complex;
use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};
use rustfft::{Fft, FftPlanner};

use crate::{
    game::{recovery::Token, Event, Mode, Session},
    misc::ring_buffer::RingBuffer,
    modules::{InitContext, Module},
};

mod glitch;
mod render;

const FFT_SIZE: usize = 1024;
/// Text rows of spectrum; each row holds two frames via half blocks.
const SPECTRUM_ROWS: usize = 5;
/// Top of the displayed band in Hz.
const SPECTRUM_RANGE: u32 = 2000;
const WAVEFORM_WIDTH: usize = 64;
const MESSAGE_LIMIT: usize = 48;
const LOG_KEEP: usize = 50;
const TAUNT_REFRESH: Duration = Duration::from_secs(4);
const PRESETS: [&str; 4] = ["HELP", "SOS", "WHO ARE YOU", "WHERE AM I"];

pub struct Console {
    ctx: InitContext,
    frame_budget: Duration,
    state: Mutex<State>,
}

struct State {
    session: Session,
    rng: StdRng,
    message: String,
    log: Vec<(DateTime<Local>, String)>,
    taunt: &'static str,
    taunt_refresh: Option<Instant>,
    next_fast: Instant,
    next_slow: Instant,
    waveform: RingBuffer<f32, WAVEFORM_WIDTH>,
    spectra: VecDeque<Vec<f32>>,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    bins: usize,
}

impl Console {
    pub fn new(ctx: InitContext) -> Arc<Self> {
        let frequency = *ctx.args.get_one::<u32>("frequency").unwrap();
        let fps = *ctx.args.get_one::<u32>("fps").unwrap();
        let hidden = ctx.args.get_flag("hidden");

        let mut rng = StdRng::from_entropy();
        let mut session = Session::new(&mut rng);
        let now = Instant::now();
        session.tune(
            frequency as i32 - session.instruments().dial() as i32,
            now,
            &mut rng,
        );
        if hidden {
            session.toggle_hidden();
        }

        let fft = FftPlanner::new().plan_fft_forward(FFT_SIZE);
        let window = (0..FFT_SIZE)
            .map(|i| (PI * i as f32 / (FFT_SIZE - 1) as f32).sin().powi(2))
            .collect();
        let bins = (SPECTRUM_RANGE * FFT_SIZE as u32 / ctx.sample_rate())
            .clamp(16, FFT_SIZE as u32 / 2) as usize;

        Arc::new(Self {
            ctx,
            frame_budget: Duration::from_millis((1000 / fps.max(1)) as u64),
            state: Mutex::new(State {
                session,
                rng,
                message: String::new(),
                log: Vec::new(),
                taunt: "",
                taunt_refresh: None,
                next_fast: now,
                next_slow: now + Duration::from_secs(1),
                waveform: RingBuffer::new(),
                spectra: VecDeque::new(),
                fft,
                window,
                bins,
            }),
        })
    }

    fn handle_events(&self) {
        if !event::poll(self.frame_budget).unwrap() {
            return;
        }

        match event::read().unwrap() {
            TermEvent::Key(key) => self.handle_key(key),
            // Clear the screen if the terminal is resized
            TermEvent::Resize(..) => {
                execute!(stdout(), terminal::Clear(terminal::ClearType::All)).unwrap()
            }
            _ => {}
        }
    }

    fn handle_key(&self, key: KeyEvent) {
        let now = Instant::now();
        let state = &mut *self.state.lock();
        let possessed = state.session.mode() == Mode::Possessed;
        let stage3 = possessed && state.session.stage() == 3;

        match key.code {
            KeyCode::Esc => {
                if state.session.is_transmitting() {
                    state.session.emergency_stop();
                } else {
                    exit();
                    process::exit(0);
                }
            }
            KeyCode::F(n @ 1..=4) => state.message = PRESETS[n as usize - 1].to_owned(),
            KeyCode::F(5) => state.session.vent(now),
            KeyCode::F(6) => state.session.toggle_hidden(),
            KeyCode::Up if stage3 => state.session.feed_key(Token::Up, now, &mut state.rng),
            KeyCode::Down if stage3 => state.session.feed_key(Token::Down, now, &mut state.rng),
            KeyCode::Left if stage3 => state.session.feed_key(Token::Left, now, &mut state.rng),
            KeyCode::Right if stage3 => state.session.feed_key(Token::Right, now, &mut state.rng),
            KeyCode::Left => state.session.tune(-tune_step(key.modifiers), now, &mut state.rng),
            KeyCode::Right => state.session.tune(tune_step(key.modifiers), now, &mut state.rng),
            KeyCode::Up => state.session.power_up(now, &mut state.rng),
            KeyCode::Down => state.session.power_down(),
            KeyCode::Enter if possessed => {
                // The CLEAR inversion: Enter wipes the buffer, though her
                // name still gets through.
                let text = std::mem::take(&mut state.message);
                state.session.attempt_eleven(&text, now, &mut state.rng);
            }
            KeyCode::Enter => {
                let text = state.message.trim().to_owned();
                if text.is_empty() {
                    return;
                }

                match state.session.begin_transmit(&text, now, &mut state.rng) {
                    Ok(()) => state.message.clear(),
                    Err(reason) => state.push_log(reason.to_owned()),
                }
            }
            KeyCode::Backspace => {
                state.message.pop();
            }
            KeyCode::Char(chr) if stage3 && chr.eq_ignore_ascii_case(&'s') => {
                state.session.feed_key(Token::KeyS, now, &mut state.rng)
            }
            KeyCode::Char(chr) if stage3 && chr.eq_ignore_ascii_case(&'t') => {
                state.session.feed_key(Token::KeyT, now, &mut state.rng)
            }
            KeyCode::Char(chr) => {
                if state.message.len() >= MESSAGE_LIMIT {
                    return;
                }

                let chr = chr.to_ascii_uppercase();
                state
                    .message
                    .push(if possessed { glitch::mirror(chr) } else { chr });
            }
            _ => {}
        }
    }
}

fn tune_step(modifiers: KeyModifiers) -> i32 {
    if modifiers.contains(KeyModifiers::CONTROL) {
        1
    } else {
        10
    }
}

impl State {
    fn advance(&mut self, now: Instant, ctx: &InitContext) {
        if now >= self.next_slow {
            self.session.slow_tick(now, &mut self.rng);
            self.next_slow = now + Duration::from_secs(1);
        }

        if now >= self.next_fast {
            self.session.fast_tick(&mut self.rng);
            self.next_fast = now + Duration::from_millis(100);
        }

        self.session.poll(now);

        for event in self.session.take_events() {
            match event {
                Event::Beep {
                    kind,
                    frequency,
                    corrupted,
                } => ctx.sink.beep(kind, frequency, corrupted),
                Event::Static => ctx.sink.static_burst(),
                Event::Log(line) => self.push_log(line),
            }
        }

        if self.session.mode() == Mode::Possessed {
            if self.taunt_refresh.map_or(true, |x| now >= x) {
                self.taunt = self.session.entity().taunt(&mut self.rng);
                self.taunt_refresh = Some(now + TAUNT_REFRESH);
            }
        } else {
            self.taunt_refresh = None;
        }

        self.sample_sink(ctx);
    }

    /// Waveform level and one spectrum frame from the sink tap.
    fn sample_sink(&mut self, ctx: &InitContext) {
        let tap = ctx.sink.tap();

        let frame = ctx.sample_rate() as usize / 30;
        let recent = &tap[tap.len().saturating_sub(frame)..];
        let level = if recent.is_empty() {
            0.0
        } else {
            (recent.iter().map(|x| x * x).sum::<f32>() / recent.len() as f32).sqrt()
        };
        self.waveform.push(level);

        let mut buf = vec![Complex::new(0.0, 0.0); FFT_SIZE];
        let samples = &tap[tap.len().saturating_sub(FFT_SIZE)..];
        let pad = FFT_SIZE - samples.len();
        for (i, &sample) in samples.iter().enumerate() {
            buf[pad + i] = Complex::new(sample * self.window[pad + i], 0.0);
        }

        self.fft.process(&mut buf);
        let spectrum = buf[..self.bins].iter().map(|x| x.norm()).collect();

        self.spectra.push_back(spectrum);
        while self.spectra.len() > SPECTRUM_ROWS * 2 {
            self.spectra.pop_front();
        }
    }

    fn push_log(&mut self, line: String) {
        self.log.push((Local::now(), line));
        let overflow = self.log.len().saturating_sub(LOG_KEEP);
        if overflow > 0 {
            self.log.drain(..overflow);
        }
    }
}

impl Module for Console {
    fn name(&self) -> &'static str {
        "console"
    }

    fn init(&self) {
        {
            let state = self.state.lock();
            println!("[I] Dial: {} Hz", state.session.instruments().dial());
            println!("[I] Frame budget: {}ms", self.frame_budget.as_millis());
            println!(
                "[I] Hidden layer: {}",
                if state.session.hidden_enabled() {
                    "armed"
                } else {
                    "off"
                }
            );
        }

        // Without this hook a panic would leave the terminal in raw mode
        // with no visible cursor.
        panic::set_hook(Box::new(|info| {
            exit();
            eprintln!("{info}");
            process::exit(0)
        }));

        terminal::enable_raw_mode().unwrap();
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            terminal::DisableLineWrap,
            cursor::Hide
        )
        .unwrap();
    }

    fn block(&self) -> ! {
        loop {
            {
                let now = Instant::now();
                let state = &mut *self.state.lock();
                state.advance(now, &self.ctx);
                render::draw(state, now);
            }

            self.handle_events();
        }
    }
}

/// Cleans up the terminal and disables raw mode before exiting.
fn exit() {
    execute!(
        stdout(),
        terminal::LeaveAlternateScreen,
        terminal::EnableLineWrap,
        cursor::Show
    )
    .unwrap();
    terminal::disable_raw_mode().unwrap();
}
