//! Dashboard rendering.
//!
//! Full repaint every frame into a [`FrameWriter`], flushed once. Base
//! panels first, then whatever overlays the session state calls for, so
//! leftovers from the previous frame never survive.

use std::{
    f32::consts::E,
    io::{stdout, Write},
    time::Instant,
};

use chrono::Local;
use crossterm::{cursor, queue, style, terminal};
use rand::Rng;

use crate::{
    coding::hidden::{self, LayerStatus},
    coding::morse::{self, SignalKind},
    game::{eggs::Visuals, Mode, Session},
    misc::frame::FrameWriter,
};

use super::{glitch, State, SPECTRUM_ROWS};

const ROW_STABILITY: u16 = 1;
const ROW_INSTRUMENTS: u16 = 2;
const ROW_SIGNAL: u16 = 3;
const ROW_WAVE: u16 = 4;
const ROW_SPECTRUM: u16 = 5;
const ROW_LAYER: u16 = ROW_SPECTRUM + SPECTRUM_ROWS as u16;
const ROW_TRAFFIC: u16 = ROW_LAYER + 1;
const ROW_LOG: u16 = ROW_TRAFFIC + 1;

const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 18;

const HALF_CHAR: char = '▀';
const BLOCKS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPECTRUM_GAIN: f32 = 0.05;

const COLOR_SCHEME: &[Color] = &[
    Color::hex(0x000000),
    Color::hex(0x1A0510),
    Color::hex(0x6B0F1A),
    Color::hex(0xC9162C),
    Color::hex(0xFF6A3D),
    Color::hex(0xFFE8C2),
];

const LIGHT_COLORS: [style::Color; 5] = [
    style::Color::Red,
    style::Color::Green,
    style::Color::Yellow,
    style::Color::Blue,
    style::Color::Magenta,
];

pub(super) fn draw(state: &mut State, now: Instant) {
    let State {
        session,
        rng,
        message,
        log,
        taunt,
        waveform,
        spectra,
        ..
    } = state;

    let mut out = FrameWriter::new(stdout());
    let (width, height) = terminal::size().unwrap();
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        queue!(
            out,
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0),
            style::Print("TERMINAL TOO SMALL")
        )
        .unwrap();
        out.flush().unwrap();
        return;
    }

    let w = width as usize;
    let corrupted = session.corrupted();
    let visuals = session.reaction().map(|x| x.visuals).unwrap_or(Visuals::empty());
    let intensity = 0.25 + session.entity().aggression() * 0.5;
    let jitter = if visuals.contains(Visuals::SHAKE) {
        rng.gen_range(0..=2u16)
    } else {
        0
    };

    let chrome = if session.mode() == Mode::Possessed || visuals.contains(Visuals::RED_TINT) {
        style::Color::Red
    } else if visuals.contains(Visuals::WARM_GLOW) {
        style::Color::Yellow
    } else {
        style::Color::DarkGrey
    };

    // == Header ==
    let mode_text = match session.mode() {
        Mode::Normal => "NORMAL",
        Mode::Transmitting => "TRANSMITTING",
        Mode::Possessed => "POSSESSED",
        Mode::Recovered => "PURGED",
    };
    let mode_text = mangle(mode_text, corrupted, session, rng, intensity);
    let title = " SPIRIT BOX TRANSMITTER ";
    let tail = format!("[ {mode_text} ]══");
    let fill = w.saturating_sub(2 + title.chars().count() + tail.chars().count());
    put(
        &mut out,
        0,
        0,
        &pad(&format!("══{title}{}{tail}", "═".repeat(fill)), w),
        chrome,
    );

    if visuals.contains(Visuals::LIGHTS) {
        for (i, x) in (0..width).step_by(4).enumerate() {
            put(&mut out, x, 0, "•", LIGHT_COLORS[i % LIGHT_COLORS.len()]);
        }
    }

    // == Stability ==
    let sanity = session.sanity();
    let status = stability_status(session);
    let status = mangle(status, corrupted, session, rng, intensity);
    let line = format!(
        "STABILITY [{}] {:>3.0}% {}",
        meter(sanity / 100.0, 20),
        sanity,
        status
    );
    put(
        &mut out,
        0,
        ROW_STABILITY,
        &pad(&line, w),
        sanity_color(sanity, session.mode()),
    );

    // == Instruments ==
    let inst = session.instruments();
    put(
        &mut out,
        0,
        ROW_INSTRUMENTS,
        &pad(&format!("FREQ {:>3} Hz", inst.dial()), w),
        style::Color::White,
    );
    put(
        &mut out,
        12,
        ROW_INSTRUMENTS,
        &format!("{:<16}", inst.tuning_status().label()),
        tuning_color(inst.tuning_status()),
    );
    put(
        &mut out,
        29,
        ROW_INSTRUMENTS,
        &format!(
            "PWR {:<7} VOLT {:>3.0}% TEMP {:>3.0}C",
            inst.power().label(),
            inst.voltage(),
            inst.temperature()
        ),
        style::Color::White,
    );
    if session.venting() && width >= 70 {
        put(&mut out, 62, ROW_INSTRUMENTS, "VENTING", style::Color::Yellow);
    }

    // == Signal LEDs ==
    draw_signal_row(&mut out, session, now, w);

    // == Waveform ==
    queue!(out, cursor::MoveTo(0, ROW_WAVE)).unwrap();
    queue!(out, style::SetForegroundColor(style::Color::DarkGrey)).unwrap();
    queue!(out, style::Print("WAVE ")).unwrap();
    let peak = waveform.max().max(0.05);
    for level in waveform.iter() {
        let norm = (level / peak).clamp(0.0, 1.0);
        let glyph = BLOCKS[(norm * 8.0).round() as usize];
        queue!(
            out,
            style::SetForegroundColor(color(norm).into()),
            style::Print(glyph)
        )
        .unwrap();
    }
    queue!(
        out,
        style::ResetColor,
        style::Print(" ".repeat(w.saturating_sub(5 + waveform.len())))
    )
    .unwrap();

    // == Spectrum waterfall ==
    let flicker_out = visuals.contains(Visuals::FLICKER) && rng.gen::<f32>() < 0.15;
    let mut frames: Vec<Option<&Vec<f32>>> =
        vec![None; (SPECTRUM_ROWS * 2).saturating_sub(spectra.len())];
    frames.extend(spectra.iter().map(Some));

    for row in 0..SPECTRUM_ROWS {
        queue!(out, cursor::MoveTo(0, ROW_SPECTRUM + row as u16)).unwrap();
        if flicker_out {
            queue!(out, style::ResetColor, style::Print(" ".repeat(w))).unwrap();
            continue;
        }

        let upper = frames[row * 2];
        let lower = frames[row * 2 + 1];
        for col in 0..w {
            queue!(
                out,
                style::SetForegroundColor(column_color(upper, col, w).into()),
                style::SetBackgroundColor(column_color(lower, col, w).into()),
                style::Print(HALF_CHAR)
            )
            .unwrap();
        }
        queue!(out, style::ResetColor).unwrap();
    }

    if visuals.contains(Visuals::STATIC_BURST) {
        for _ in 0..40 {
            let x = rng.gen_range(0..width);
            let y = ROW_SPECTRUM + rng.gen_range(0..SPECTRUM_ROWS as u16);
            let glyph = ['░', '▒', '▓'][rng.gen_range(0..3)];
            put(&mut out, x, y, &glyph.to_string(), style::Color::White);
        }
    }

    if visuals.contains(Visuals::PARTICLES) {
        for _ in 0..12 {
            let x = rng.gen_range(0..width);
            let y = ROW_SPECTRUM + rng.gen_range(0..SPECTRUM_ROWS as u16);
            put(&mut out, x, y, "·", style::Color::White);
        }
    }

    if visuals.contains(Visuals::GATE_OVERLAY) {
        let x = (width / 2).saturating_sub(5) + jitter;
        put(&mut out, x, ROW_SPECTRUM + 1, "◜▔▔▔▔▔▔◝", style::Color::Red);
        put(&mut out, x, ROW_SPECTRUM + 2, "▏░▒▓▓▒░▕", style::Color::Red);
        put(&mut out, x, ROW_SPECTRUM + 3, "◟▁▁▁▁▁▁◞", style::Color::Red);
    }

    // == Layer indicator ==
    draw_layer_row(&mut out, session, w);

    // == Traffic log ==
    put(
        &mut out,
        0,
        ROW_TRAFFIC,
        &pad(&format!("── TRAFFIC {}", "─".repeat(w.saturating_sub(11))), w),
        chrome,
    );

    let log_rows = (height - 2).saturating_sub(ROW_LOG) as usize;
    let skip = log.len().saturating_sub(log_rows);
    for row in 0..log_rows {
        let y = ROW_LOG + row as u16;
        match log.get(skip + row) {
            Some((stamp, line)) => {
                let text = mangle(line, corrupted, session, rng, intensity);
                put(
                    &mut out,
                    0,
                    y,
                    &pad(&format!("{} {}", stamp.format("%H:%M:%S"), text), w),
                    log_color(line),
                );
            }
            None => put(&mut out, 0, y, &pad("", w), style::Color::Reset),
        }
    }

    // == Prompt and key hints ==
    let blink = Local::now().timestamp_subsec_millis() < 500;
    let shown = mangle(message, corrupted, session, rng, intensity * 0.5);
    let prompt = format!("> {}{}", shown, if blink { '█' } else { ' ' });
    let prompt_color = if session.mode() == Mode::Possessed {
        style::Color::Red
    } else {
        style::Color::White
    };
    put(&mut out, 0, height - 2, &pad(&prompt, w), prompt_color);

    put(
        &mut out,
        0,
        height - 1,
        &pad(
            "F1-F4 PRESET  ←→ TUNE (CTRL FINE)  ↑↓ POWER  F5 VENT  F6 LAYER  ENTER SEND  ESC STOP/QUIT",
            w,
        ),
        style::Color::DarkGrey,
    );

    // == Overlays ==
    if let Some(text) = session.popup() {
        banner(&mut out, width, 2 + jitter % 2, text, style::Color::Black, style::Color::Yellow);
    }

    if let Some(egg) = session.reaction() {
        banner(
            &mut out,
            width,
            ROW_WAVE,
            &format!("░▒ {} ▒░", egg.banner),
            style::Color::White,
            style::Color::DarkRed,
        );
    }

    if session.mode() == Mode::Possessed {
        draw_possessed_overlay(&mut out, session, taunt, rng, intensity, width, now, jitter);
    }

    if session.mode() == Mode::Recovered {
        let lines = ["".into(), "SYSTEM PURGED".into(), "REALITY STABILIZED".into(), "".into()];
        draw_box(&mut out, width / 2 - 13, 6, 26, &lines, style::Color::Green);
    }

    out.flush().unwrap();
}

fn draw_signal_row(out: &mut impl Write, session: &Session, now: Instant, w: usize) {
    queue!(out, cursor::MoveTo(0, ROW_SIGNAL)).unwrap();

    match session.transmission() {
        Some(transmission) => {
            let resolved = morse::resolve_at(transmission.signals(), transmission.elapsed(now));
            queue!(
                out,
                style::SetForegroundColor(style::Color::White),
                style::Print("SIGNAL ")
            )
            .unwrap();

            let budget = w.saturating_sub(14);
            for (i, signal) in transmission.signals().iter().enumerate().take(budget) {
                let glyph = match signal.kind {
                    SignalKind::Dot => '•',
                    SignalKind::Dash => '▬',
                    SignalKind::CharGap => '·',
                    SignalKind::WordGap => '/',
                };

                let fg = if resolved.index == Some(i) && resolved.active {
                    style::Color::Yellow
                } else if resolved.index.map_or(false, |x| i < x) {
                    style::Color::DarkYellow
                } else {
                    style::Color::DarkGrey
                };
                queue!(out, style::SetForegroundColor(fg), style::Print(glyph)).unwrap();
            }

            let pct = format!(" {:>3.0}%", transmission.fraction(now) * 100.0);
            let used = 7 + transmission.signals().len().min(budget) + pct.len();
            queue!(
                out,
                style::SetForegroundColor(style::Color::White),
                style::Print(pct),
                style::ResetColor,
                style::Print(" ".repeat(w.saturating_sub(used)))
            )
            .unwrap();
        }
        None => put(out, 0, ROW_SIGNAL, &pad("SIGNAL (idle)", w), style::Color::DarkGrey),
    }
}

fn draw_layer_row(out: &mut impl Write, session: &Session, w: usize) {
    let status = hidden::layer_status(
        session.is_transmitting(),
        session.hidden_enabled(),
        session.corrupted(),
    );

    let (text, fg) = match status {
        LayerStatus::Inactive => ("LAYER A: IDLE".to_owned(), style::Color::DarkGrey),
        LayerStatus::LayerA => ("LAYER A: CARRIER ACTIVE".to_owned(), style::Color::Cyan),
        LayerStatus::Dual => {
            let mut text = "DUAL LAYER: CARRIER + EMBEDDED".to_owned();
            if let Some(hidden) = session.hidden() {
                let bits = hidden
                    .bits()
                    .iter()
                    .take(24)
                    .map(|x| if x.bit { '▪' } else { '▫' })
                    .collect::<String>();
                text = format!("{} [{}] {}", text, hidden.message(), bits);
            }
            (text, style::Color::Magenta)
        }
        LayerStatus::Corrupted => ("LAYER ?: IN?ERF?REN?E".to_owned(), style::Color::Red),
    };

    put(out, 0, ROW_LAYER, &pad(&text, w), fg);
}

#[allow(clippy::too_many_arguments)]
fn draw_possessed_overlay(
    out: &mut impl Write,
    session: &Session,
    taunt: &str,
    rng: &mut impl Rng,
    intensity: f32,
    width: u16,
    now: Instant,
    jitter: u16,
) {
    let box_width = 48;
    let x = (width.saturating_sub(box_width)) / 2 + jitter;

    let stage_line = match session.stage() {
        1 => format!(
            "STAGE 1: STABILIZE CARRIER ({} Hz)",
            session.instruments().dial()
        ),
        2 => "STAGE 2: DIVERT FULL POWER".to_owned(),
        _ => "STAGE 3: KEY THE PURGE SEQUENCE".to_owned(),
    };

    let mut lines = vec![
        String::new(),
        glitch::corrupt("SIGNAL HIJACKED", intensity, rng),
        session.entity().corrupt_text(taunt, rng),
        stage_line,
    ];

    if session.stage() == 3 {
        let sequence = session.sequence();
        let total = sequence.tokens().len();
        let done = (sequence.progress() * total as f32).round() as usize;
        let symbols = sequence
            .tokens()
            .iter()
            .map(|x| x.symbol())
            .collect::<Vec<_>>();
        let shown = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| if i < done { *s } else { glitch_dim(*s) })
            .map(|s| format!("{s} "))
            .collect::<String>();
        lines.push(shown.trim_end().to_owned());
        lines.push(format!("[{done}/{total}]"));
    }

    if let Some(remaining) = session.auto_recovery_remaining(now) {
        lines.push(format!("AUTO PURGE IN {}s", remaining.as_secs()));
    }
    lines.push(String::new());

    draw_box(out, x, ROW_WAVE, box_width as usize, &lines, style::Color::Red);
}

/// Pending sequence tokens render hollow so progress reads at a glance.
fn glitch_dim(symbol: char) -> char {
    match symbol {
        '▲' => '△',
        '▼' => '▽',
        '◀' => '◁',
        '▶' => '▷',
        other => other,
    }
}

fn draw_box(
    out: &mut impl Write,
    x: u16,
    y: u16,
    width: usize,
    lines: &[String],
    fg: style::Color,
) {
    put(out, x, y, &format!("╔{}╗", "═".repeat(width - 2)), fg);
    for (i, line) in lines.iter().enumerate() {
        put(
            out,
            x,
            y + 1 + i as u16,
            &format!("║{}║", center(line, width - 2)),
            fg,
        );
    }
    put(
        out,
        x,
        y + 1 + lines.len() as u16,
        &format!("╚{}╝", "═".repeat(width - 2)),
        fg,
    );
}

fn banner(out: &mut impl Write, width: u16, y: u16, text: &str, fg: style::Color, bg: style::Color) {
    let text = format!(" {text} ");
    let x = (width.saturating_sub(text.chars().count() as u16)) / 2;
    queue!(
        out,
        cursor::MoveTo(x, y),
        style::SetForegroundColor(fg),
        style::SetBackgroundColor(bg),
        style::Print(text),
        style::ResetColor
    )
    .unwrap();
}

fn put(out: &mut impl Write, x: u16, y: u16, text: &str, fg: style::Color) {
    queue!(
        out,
        cursor::MoveTo(x, y),
        style::SetForegroundColor(fg),
        style::Print(text),
        style::ResetColor
    )
    .unwrap();
}

fn mangle(
    text: &str,
    corrupted: bool,
    session: &Session,
    rng: &mut impl Rng,
    intensity: f32,
) -> String {
    if !corrupted {
        return text.to_owned();
    }

    glitch::corrupt(&session.entity().corrupt_text(text, rng), intensity, rng)
}

fn meter(frac: f32, width: usize) -> String {
    let filled = (frac.clamp(0.0, 1.0) * width as f32).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn pad(text: &str, width: usize) -> String {
    let mut out = text.chars().take(width).collect::<String>();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width - len));
    out
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count().min(width);
    let left = (width - len) / 2;
    let mut out = " ".repeat(left);
    out.extend(text.chars().take(width));
    out.extend(std::iter::repeat(' ').take(width - left - len));
    out
}

fn stability_status(session: &Session) -> &'static str {
    match session.mode() {
        Mode::Possessed => "LOST",
        Mode::Recovered => "PURGED",
        _ => match session.sanity() {
            x if x >= 70.0 => "STABLE",
            x if x >= 40.0 => "UNSTEADY",
            x if x >= 15.0 => "CRITICAL",
            _ => "FAILING",
        },
    }
}

fn sanity_color(sanity: f32, mode: Mode) -> style::Color {
    if mode == Mode::Possessed {
        return style::Color::Red;
    }

    match sanity {
        x if x >= 70.0 => style::Color::Green,
        x if x >= 40.0 => style::Color::Yellow,
        _ => style::Color::Red,
    }
}

fn tuning_color(status: crate::game::instruments::TuningStatus) -> style::Color {
    use crate::game::instruments::TuningStatus::*;
    match status {
        Hidden => style::Color::Magenta,
        Stable => style::Color::Green,
        Partial => style::Color::Yellow,
        Ghost => style::Color::DarkYellow,
        HeavyCorruption => style::Color::Red,
    }
}

fn log_color(line: &str) -> style::Color {
    if line.starts_with(">>") || line.starts_with("RESPONSE") {
        style::Color::Yellow
    } else if line.starts_with("!!") || line.starts_with("INTERCEPTED") || line.starts_with("THIS PATH") {
        style::Color::Red
    } else {
        style::Color::Grey
    }
}

/// Average of the column's share of the bins, squashed and mapped onto the
/// scheme.
fn column_color(frame: Option<&Vec<f32>>, col: usize, width: usize) -> Color {
    let Some(frame) = frame else {
        return COLOR_SCHEME[0];
    };

    let bins = frame.len();
    let lo = col * bins / width;
    let hi = ((col + 1) * bins / width).clamp(lo + 1, bins);
    let avg = frame[lo..hi].iter().sum::<f32>() / (hi - lo) as f32;

    color(1.0 - E.powf(-avg * SPECTRUM_GAIN))
}

/// Takes in a value between 0 and 1 and returns a color from the scheme.
fn color(val: f32) -> Color {
    debug_assert!((0. ..=1.).contains(&val));
    let sections = COLOR_SCHEME.len() - 2;
    let section = (sections as f32 * val).floor() as usize;

    COLOR_SCHEME[section].lerp(
        &COLOR_SCHEME[section + 1],
        val * sections as f32 - section as f32,
    )
}

/// RGB color
#[derive(Copy, Clone)]
struct Color {
    r: u8,
    g: u8,
    b: u8,
}

impl Color {
    const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Creates a new color from a hex value (no alpha)
    const fn hex(hex: u32) -> Self {
        Self::new(
            ((hex >> 16) & 0xff) as u8,
            ((hex >> 8) & 0xff) as u8,
            (hex & 0xff) as u8,
        )
    }

    /// Linearly interpolates between two colors.
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self::new(
            (self.r as f32 + (other.r as f32 - self.r as f32) * t) as u8,
            (self.g as f32 + (other.g as f32 - self.g as f32) * t) as u8,
            (self.b as f32 + (other.b as f32 - self.b as f32) * t) as u8,
        )
    }
}

impl From<Color> for style::Color {
    fn from(color: Color) -> Self {
        style::Color::Rgb {
            r: color.r,
            g: color.g,
            b: color.b,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_meter_bounds() {
        assert_eq!(meter(0.0, 4), "░░░░");
        assert_eq!(meter(1.0, 4), "████");
        assert_eq!(meter(0.5, 4), "██░░");
        assert_eq!(meter(7.0, 4), "████");
    }

    #[test]
    fn test_pad_and_center() {
        assert_eq!(pad("AB", 4), "AB  ");
        assert_eq!(pad("ABCDEF", 4), "ABCD");
        assert_eq!(center("AB", 6), "  AB  ");
        assert_eq!(center("ABC", 6), " ABC  ");
    }

    #[test]
    fn test_color_lerp_endpoints() {
        let floor = color(0.0);
        assert_eq!((floor.r, floor.g, floor.b), (0, 0, 0));

        let ceil = color(1.0);
        assert_eq!((ceil.r, ceil.g, ceil.b), (0xFF, 0x6A, 0x3D));
    }
}
