//! Session state for the console.
//!
//! One `Session` owns the whole game: sanity, possession and its staged
//! recovery, the armed transmission, instruments and the interference
//! entity. Callers drive it with explicit clocks (`Instant` passed in)
//! so every transition is testable without sleeping.
//!
//! Side effects never happen inside the session. Anything the outside
//! world should do (play a beep, append a log line) is queued as an
//! [`Event`] and drained by the caller each frame.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::coding::hidden::{self, HiddenLayer};
use crate::coding::morse::{self, SignalKind};
use crate::coding::playback::Transmission;

use self::eggs::Egg;
use self::entity::{Attempt, EntitySession, RecoveryMethod};
use self::instruments::{Instruments, PowerLevel};
use self::recovery::{RecoverySequence, Token};

pub mod eggs;
pub mod entity;
pub mod instruments;
pub mod recovery;

const TRANSMIT_DRAIN: f32 = 2.0;
const IDLE_DRAIN: f32 = 0.5;
const LOW_SANITY: f32 = 30.0;
const STATIC_CHANCE: f32 = 0.1;
const FAKE_SIGNAL_CHANCE: f32 = 0.15;

const AUTO_RECOVERY: Duration = Duration::from_secs(30);
const RECOVERED_HOLD: Duration = Duration::from_secs(3);
const POPUP_TIME: Duration = Duration::from_secs(2);
const MANUAL_VENT: Duration = Duration::from_secs(3);
const OVERHEAT_VENT: Duration = Duration::from_secs(5);

/// Stage 1 escape band around the optimum frequency.
const RECOVERY_BAND: std::ops::RangeInclusive<u32> = 590..=610;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Transmitting,
    Possessed,
    Recovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VentKind {
    Manual,
    Overheat,
}

/// Something the caller should act on, drained with [`Session::take_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A dot or dash went active; key the oscillator.
    Beep {
        kind: SignalKind,
        frequency: f32,
        corrupted: bool,
    },
    /// A burst of interference noise.
    Static,
    /// A line for the transmission log.
    Log(String),
}

pub struct Session {
    mode: Mode,
    sanity: f32,
    stage: u8,
    instruments: Instruments,
    entity: EntitySession,
    sequence: RecoverySequence,
    transmission: Option<Transmission>,
    hidden: Option<HiddenLayer>,
    hidden_enabled: bool,
    auto_recovery: Option<Instant>,
    recovered_until: Option<Instant>,
    popup: Option<(&'static str, Instant)>,
    vent: Option<(VentKind, Instant)>,
    reaction: Option<(&'static Egg, Instant)>,
    events: Vec<Event>,
}

impl Session {
    pub fn new(rng: &mut impl Rng) -> Self {
        Self {
            mode: Mode::Normal,
            sanity: 100.0,
            stage: 0,
            instruments: Instruments::new(),
            entity: EntitySession::new(),
            sequence: RecoverySequence::generate(rng),
            transmission: None,
            hidden: None,
            hidden_enabled: false,
            auto_recovery: None,
            recovered_until: None,
            popup: None,
            vent: None,
            reaction: None,
            events: Vec::new(),
        }
    }

    // == Accessors ==

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn sanity(&self) -> f32 {
        self.sanity
    }

    pub fn stage(&self) -> u8 {
        self.stage
    }

    pub fn instruments(&self) -> &Instruments {
        &self.instruments
    }

    pub fn entity(&self) -> &EntitySession {
        &self.entity
    }

    pub fn sequence(&self) -> &RecoverySequence {
        &self.sequence
    }

    pub fn transmission(&self) -> Option<&Transmission> {
        self.transmission.as_ref()
    }

    pub fn hidden(&self) -> Option<&HiddenLayer> {
        self.hidden.as_ref()
    }

    pub fn hidden_enabled(&self) -> bool {
        self.hidden_enabled
    }

    pub fn toggle_hidden(&mut self) {
        self.hidden_enabled = !self.hidden_enabled;
    }

    pub fn popup(&self) -> Option<&'static str> {
        self.popup.map(|x| x.0)
    }

    pub fn reaction(&self) -> Option<&'static Egg> {
        self.reaction.map(|x| x.0)
    }

    pub fn venting(&self) -> bool {
        self.vent.is_some()
    }

    pub fn auto_recovery_remaining(&self, now: Instant) -> Option<Duration> {
        self.auto_recovery.map(|x| x.saturating_duration_since(now))
    }

    pub fn is_transmitting(&self) -> bool {
        self.transmission.is_some()
    }

    /// Display glitches and detuned beeps both hang off this.
    pub fn corrupted(&self) -> bool {
        self.mode == Mode::Possessed || self.sanity < LOW_SANITY
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // == Transmission ==

    /// Checks the message for trigger phrases, then keys it out. Refused
    /// with a reason when the transmitter isn't available.
    pub fn begin_transmit(
        &mut self,
        text: &str,
        now: Instant,
        rng: &mut impl Rng,
    ) -> Result<(), &'static str> {
        if self.mode != Mode::Normal {
            return Err("TRANSMITTER BUSY");
        }

        if self.vent.is_some() {
            return Err("VENTING IN PROGRESS");
        }

        if let Some(egg) = eggs::check(text) {
            self.apply_egg(egg, now, rng);
            if egg.force_possess {
                return Ok(());
            }
        }

        let signals = morse::encode(text);
        if signals.is_empty() {
            return Err("NOTHING TO KEY");
        }

        self.hidden = self
            .hidden_enabled
            .then(|| HiddenLayer::encode(hidden::location_data(rng), signals.len()));
        self.log(format!("TRANSMITTING: {}", text.trim().to_uppercase()));
        self.transmission = Some(Transmission::new(signals, now));
        self.mode = Mode::Transmitting;
        Ok(())
    }

    /// Drops the armed transmission on the spot.
    pub fn emergency_stop(&mut self) {
        if self.transmission.take().is_some() {
            self.hidden = None;
            self.log("EMERGENCY STOP");
        }

        if self.mode == Mode::Transmitting {
            self.mode = Mode::Normal;
        }
    }

    fn apply_egg(&mut self, egg: &'static Egg, now: Instant, rng: &mut impl Rng) {
        self.log(format!(">> {}", egg.banner));
        if let Some(secret) = egg.secret {
            self.log(format!("RESPONSE: {secret}"));
        }

        self.sanity = (self.sanity + egg.sanity_boost).min(100.0);
        if egg.clear_corruption {
            self.sanity = self.sanity.max(LOW_SANITY);
        }

        self.reaction = Some((egg, now + egg.duration));
        if egg.force_possess {
            self.possess(now, rng);
        }
    }

    // == Controls ==

    pub fn tune(&mut self, delta: i32, now: Instant, rng: &mut impl Rng) {
        self.instruments.tune(delta);

        if self.mode != Mode::Possessed || self.stage != 1 {
            return;
        }

        let dial = self.instruments.dial();
        if RECOVERY_BAND.contains(&dial) {
            self.advance_stage(2, "SIGNAL STABILIZED", now, rng);
        } else if entity::is_hidden_frequency(dial) {
            match self.entity.record_attempt(RecoveryMethod::HiddenFrequency, rng) {
                Attempt::Accepted => self.advance_stage(2, "SIGNAL STABILIZED", now, rng),
                Attempt::Learned { .. } => self.log("THE ENTITY LEARNS YOUR TRICKS"),
                Attempt::Refused { hint } => {
                    self.log("THIS PATH IS CLOSED TO YOU");
                    self.log(hint);
                }
            }
        }
    }

    pub fn power_up(&mut self, now: Instant, rng: &mut impl Rng) {
        self.instruments.power_up();

        if self.mode == Mode::Possessed
            && self.stage == 2
            && self.instruments.power() == PowerLevel::Maximum
        {
            self.advance_stage(3, "POWER SURGE ACTIVE", now, rng);
        }
    }

    pub fn power_down(&mut self) {
        self.instruments.power_down();
    }

    pub fn vent(&mut self, now: Instant) {
        if self.vent.is_none() {
            self.vent = Some((VentKind::Manual, now + MANUAL_VENT));
            self.log("VENTING HEAT");
        }
    }

    // == Recovery ==

    /// Stage 3 key input. Anything outside stage 3 is ignored.
    pub fn feed_key(&mut self, token: Token, now: Instant, rng: &mut impl Rng) {
        if self.mode != Mode::Possessed || self.stage != 3 {
            return;
        }

        let had_progress = self.sequence.progress() > 0.0;
        let feed = self.sequence.feed(token);

        if feed.completed {
            self.recover(now);
        } else if !feed.advanced && had_progress {
            self.log("SEQUENCE BROKEN");
            match self.entity.record_attempt(RecoveryMethod::Konami, rng) {
                Attempt::Accepted => {}
                Attempt::Learned { .. } => self.log("THE ENTITY ADAPTS"),
                Attempt::Refused { hint } => {
                    self.log("THIS PATH IS CLOSED TO YOU");
                    self.log(hint);
                }
            }
        }
    }

    /// Her name, spoken backwards into a possessed console. Returns whether
    /// the text was claimed as a recovery attempt.
    pub fn attempt_eleven(&mut self, text: &str, now: Instant, rng: &mut impl Rng) -> bool {
        if self.mode != Mode::Possessed || !entity::is_eleven_phrase(text) {
            return false;
        }

        match self.entity.record_attempt(RecoveryMethod::Eleven, rng) {
            Attempt::Accepted => {
                self.log("SHE HEARD YOU");
                self.recover(now);
            }
            Attempt::Learned { .. } => self.log("THE ENTITY LEARNS YOUR TRICKS"),
            Attempt::Refused { hint } => {
                self.log("THIS PATH IS CLOSED TO YOU");
                self.log(hint);
            }
        }
        true
    }

    // == Ticks ==

    /// Frame regime. Expires deadlines and samples the armed transmission.
    pub fn poll(&mut self, now: Instant) {
        if matches!(self.popup, Some((_, deadline)) if now >= deadline) {
            self.popup = None;
        }

        if matches!(self.reaction, Some((_, deadline)) if now >= deadline) {
            self.reaction = None;
        }

        if matches!(self.recovered_until, Some(deadline) if now >= deadline) {
            self.recovered_until = None;
            self.mode = Mode::Normal;
        }

        if matches!(self.auto_recovery, Some(deadline) if now >= deadline) {
            self.auto_recovery = None;
            self.mode = Mode::Normal;
            self.stage = 0;
            self.sanity = LOW_SANITY;
            self.entity.reset();
            self.sequence.reset();
            self.log("THE PRESENCE WITHDRAWS");
        }

        if let Some((kind, deadline)) = self.vent {
            if now >= deadline {
                self.vent = None;
                if kind == VentKind::Manual {
                    self.instruments.vent_complete();
                }
                self.log("VENT CYCLE COMPLETE");
            }
        }

        let Some(transmission) = &mut self.transmission else {
            return;
        };

        let tick = transmission.sample(now);
        if let Some(kind) = tick.fire {
            let offset = match (&self.hidden, tick.resolved.index) {
                (Some(hidden), Some(index)) => hidden.frequency_offset(index),
                _ => 0.0,
            };

            let corrupted = self.mode == Mode::Possessed || self.sanity < LOW_SANITY;
            self.events.push(Event::Beep {
                kind,
                frequency: self.instruments.dial() as f32 + offset,
                corrupted,
            });
        }

        if tick.completed {
            self.transmission = None;
            self.hidden = None;
            if self.mode == Mode::Transmitting {
                self.mode = Mode::Normal;
            }
            self.log("TRANSMISSION COMPLETE");
        }
    }

    /// 1s regime. Sanity drain, thermals, possessed interference.
    pub fn slow_tick(&mut self, now: Instant, rng: &mut impl Rng) {
        match self.mode {
            Mode::Normal | Mode::Transmitting => {
                let drain = if self.is_transmitting() {
                    TRANSMIT_DRAIN
                } else {
                    IDLE_DRAIN
                };
                self.sanity = (self.sanity - drain).max(0.0);

                if self.sanity <= 0.0 {
                    self.possess(now, rng);
                } else if self.sanity < LOW_SANITY && rng.gen::<f32>() < STATIC_CHANCE {
                    self.events.push(Event::Static);
                }
            }
            Mode::Possessed => {
                if rng.gen::<f32>() < FAKE_SIGNAL_CHANCE {
                    let fake = self.entity.fake_signal(rng);
                    self.log(format!("INTERCEPTED: {fake}"));
                }
            }
            Mode::Recovered => {}
        }

        let overheated = self.instruments.slow_tick(
            self.is_transmitting(),
            self.corrupted(),
            self.vent.is_some(),
        );

        if overheated {
            self.emergency_stop();
            self.vent = Some((VentKind::Overheat, now + OVERHEAT_VENT));
            self.log("THERMAL OVERLOAD, AUTO VENT ENGAGED");
        }
    }

    /// 100ms regime. Gauge movement only.
    pub fn fast_tick(&mut self, rng: &mut impl Rng) {
        self.instruments
            .fast_tick(self.is_transmitting(), self.mode == Mode::Possessed, rng);
    }

    // == Transitions ==

    fn possess(&mut self, now: Instant, rng: &mut impl Rng) {
        self.transmission = None;
        self.hidden = None;
        self.mode = Mode::Possessed;
        self.stage = 1;
        self.sanity = 0.0;
        self.auto_recovery = Some(now + AUTO_RECOVERY);
        self.instruments.scramble(rng);
        self.log("!! CARRIER HIJACKED !!");
        self.log("FREQUENCY SCRAMBLED");
    }

    fn advance_stage(&mut self, stage: u8, popup: &'static str, now: Instant, rng: &mut impl Rng) {
        self.stage = stage;
        self.popup = Some((popup, now + POPUP_TIME));
        if stage == 3 {
            self.sequence.regenerate(rng);
        }
    }

    fn recover(&mut self, now: Instant) {
        self.mode = Mode::Recovered;
        self.stage = 0;
        self.sanity = 100.0;
        self.auto_recovery = None;
        self.recovered_until = Some(now + RECOVERED_HOLD);
        self.popup = Some(("SYSTEM PURGED", now + POPUP_TIME));
        self.entity.reset();
        self.sequence.reset();
        self.log("REALITY STABILIZED");
    }

    fn log(&mut self, line: impl Into<String>) {
        self.events.push(Event::Log(line.into()));
    }
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn session(seed: u64) -> (Session, StdRng, Instant) {
        let mut rng = StdRng::seed_from_u64(seed);
        let session = Session::new(&mut rng);
        (session, rng, Instant::now())
    }

    fn logs(events: &[Event]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|x| match x {
                Event::Log(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_idle_drain_reaches_possession() {
        let (mut session, mut rng, start) = session(1);

        // 0.5 per second idle. 199 ticks leave a sliver, the 200th pins it.
        for i in 1..=199 {
            session.slow_tick(start + Duration::from_secs(i), &mut rng);
        }
        assert_eq!(session.mode(), Mode::Normal);
        assert!(session.sanity() > 0.0);

        session.slow_tick(start + Duration::from_secs(200), &mut rng);
        assert_eq!(session.mode(), Mode::Possessed);
        assert_eq!(session.stage(), 1);
        assert!(!(550..=650).contains(&session.instruments().dial()));
    }

    #[test]
    fn test_auto_recovery_deadline() {
        let (mut session, mut rng, start) = session(2);
        for i in 1..=200 {
            session.slow_tick(start + Duration::from_secs(i), &mut rng);
        }
        assert_eq!(session.mode(), Mode::Possessed);

        session.poll(start + Duration::from_secs(231));
        assert_eq!(session.mode(), Mode::Normal);
        assert_eq!(session.stage(), 0);
        assert_eq!(session.sanity(), 30.0);
    }

    #[test]
    fn test_demogorgon_forces_possession() {
        let (mut session, mut rng, start) = session(3);

        assert!(session.begin_transmit("DEMOGORGON", start, &mut rng).is_ok());
        assert_eq!(session.mode(), Mode::Possessed);
        assert!(session.transmission().is_none());
        assert!(session.corrupted());
        assert!(session.auto_recovery_remaining(start).is_some());
    }

    #[test]
    fn test_full_recovery_path() {
        let (mut session, mut rng, start) = session(4);
        session.begin_transmit("DEMOGORGON", start, &mut rng).unwrap();
        assert_eq!(session.stage(), 1);

        // Stage 1: drag the scrambled dial back into the escape band.
        let delta = 600 - session.instruments().dial() as i32;
        session.tune(delta, start, &mut rng);
        assert_eq!(session.stage(), 2);
        assert_eq!(session.popup(), Some("SIGNAL STABILIZED"));

        // Stage 2: slam the power to maximum.
        let t1 = start + Duration::from_secs(3);
        session.power_up(t1, &mut rng);
        session.power_up(t1, &mut rng);
        assert_eq!(session.stage(), 3);
        assert_eq!(session.popup(), Some("POWER SURGE ACTIVE"));

        // Stage 3: play back the revealed sequence.
        let tokens = session.sequence().tokens().to_vec();
        for token in tokens {
            session.feed_key(token, t1, &mut rng);
        }
        assert_eq!(session.mode(), Mode::Recovered);
        assert_eq!(session.sanity(), 100.0);
        assert_eq!(session.popup(), Some("SYSTEM PURGED"));

        // The modal holds for three seconds, then the console is ours again.
        session.poll(t1 + Duration::from_secs(4));
        assert_eq!(session.mode(), Mode::Normal);
    }

    #[test]
    fn test_hidden_frequency_shortcut() {
        let (mut session, mut rng, start) = session(5);
        session.begin_transmit("DEMOGORGON", start, &mut rng).unwrap();

        let delta = 666 - session.instruments().dial() as i32;
        session.tune(delta, start, &mut rng);
        assert_eq!(session.stage(), 2);
    }

    #[test]
    fn test_eleven_phrase_recovers() {
        let (mut session, mut rng, start) = session(6);
        session.begin_transmit("DEMOGORGON", start, &mut rng).unwrap();

        assert!(!session.attempt_eleven("ELEVEN", start, &mut rng));
        assert_eq!(session.mode(), Mode::Possessed);

        assert!(session.attempt_eleven("NEVELE", start, &mut rng));
        assert_eq!(session.mode(), Mode::Recovered);
    }

    #[test]
    fn test_beeps_and_completion() {
        let (mut session, mut rng, start) = session(7);
        session.begin_transmit("E", start, &mut rng).unwrap();
        assert_eq!(session.mode(), Mode::Transmitting);

        session.poll(start + Duration::from_millis(10));
        let events = session.take_events();
        assert!(events.iter().any(|x| matches!(
            x,
            Event::Beep {
                kind: SignalKind::Dot,
                corrupted: false,
                ..
            }
        )));

        session.poll(start + Duration::from_millis(300));
        assert_eq!(session.mode(), Mode::Normal);
        assert!(session.transmission().is_none());
        assert!(logs(&session.take_events()).contains(&"TRANSMISSION COMPLETE"));
    }

    #[test]
    fn test_busy_transmitter_refuses() {
        let (mut session, mut rng, start) = session(8);
        session.begin_transmit("SOS", start, &mut rng).unwrap();

        assert_eq!(
            session.begin_transmit("HELLO", start, &mut rng),
            Err("TRANSMITTER BUSY")
        );
        assert_eq!(session.begin_transmit("", start, &mut rng), Err("TRANSMITTER BUSY"));
    }

    #[test]
    fn test_egg_boost_caps_sanity() {
        let (mut session, mut rng, start) = session(9);
        for i in 1..=20 {
            session.slow_tick(start + Duration::from_secs(i), &mut rng);
        }
        assert_eq!(session.sanity(), 90.0);

        let t = start + Duration::from_secs(21);
        session.begin_transmit("TELL ELEVEN I SAID HI", t, &mut rng).unwrap();
        assert_eq!(session.sanity(), 100.0);
        assert_eq!(session.mode(), Mode::Transmitting);
        assert!(session.reaction().is_some());
    }

    #[test]
    fn test_overheat_stops_transmission() {
        let (mut session, mut rng, start) = session(10);
        session.tune(200, start, &mut rng);
        session
            .begin_transmit("HELLO HELLO HELLO HELLO", start, &mut rng)
            .unwrap();

        // Off-band and keyed: +3 per second from ambient 20.
        for i in 1..=30 {
            session.slow_tick(start + Duration::from_secs(i), &mut rng);
        }

        assert!(session.transmission().is_none());
        assert_eq!(session.mode(), Mode::Normal);
        assert!(session.venting());
        assert!(logs(&session.take_events())
            .contains(&"THERMAL OVERLOAD, AUTO VENT ENGAGED"));
    }

    #[test]
    fn test_manual_vent_cycle() {
        let (mut session, mut rng, start) = session(11);
        session.vent(start);
        assert!(session.venting());
        assert_eq!(
            session.begin_transmit("SOS", start, &mut rng),
            Err("VENTING IN PROGRESS")
        );

        session.poll(start + Duration::from_secs(4));
        assert!(!session.venting());
        assert_eq!(session.instruments().temperature(), 30.0);
    }

    #[test]
    fn test_hidden_layer_armed_per_transmission() {
        let (mut session, mut rng, start) = session(12);
        session.toggle_hidden();
        session.begin_transmit("SOS", start, &mut rng).unwrap();
        assert!(session.hidden().is_some());

        session.poll(start + Duration::from_secs(20));
        assert!(session.hidden().is_none());
    }
}
