//! Simulated front-panel instruments.
//!
//! Gauges don't snap to their targets, they drift there with exponential
//! smoothing the way a needle would. Targets are recomputed on the fast
//! (100ms) tick, temperature moves on the slow (1s) tick.

use rand::Rng;

use crate::game::entity::is_hidden_frequency;

pub const DIAL_MIN: u32 = 100;
pub const DIAL_MAX: u32 = 900;
pub const DIAL_OPTIMUM: u32 = 600;

const STRENGTH_SMOOTHING: f32 = 0.2;
const VOLTAGE_SMOOTHING: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PowerLevel {
    Low,
    Medium,
    High,
    Maximum,
}

impl PowerLevel {
    pub fn label(self) -> &'static str {
        match self {
            PowerLevel::Low => "LOW",
            PowerLevel::Medium => "MEDIUM",
            PowerLevel::High => "HIGH",
            PowerLevel::Maximum => "MAXIMUM",
        }
    }

    pub fn up(self) -> Self {
        match self {
            PowerLevel::Low => PowerLevel::Medium,
            PowerLevel::Medium => PowerLevel::High,
            PowerLevel::High | PowerLevel::Maximum => PowerLevel::Maximum,
        }
    }

    pub fn down(self) -> Self {
        match self {
            PowerLevel::Maximum => PowerLevel::High,
            PowerLevel::High => PowerLevel::Medium,
            PowerLevel::Medium | PowerLevel::Low => PowerLevel::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningStatus {
    Hidden,
    Stable,
    Partial,
    Ghost,
    HeavyCorruption,
}

impl TuningStatus {
    pub fn label(self) -> &'static str {
        match self {
            TuningStatus::Hidden => "HIDDEN",
            TuningStatus::Stable => "STABLE",
            TuningStatus::Partial => "PARTIAL SIGNAL",
            TuningStatus::Ghost => "GHOST SIGNAL",
            TuningStatus::HeavyCorruption => "HEAVY CORRUPTION",
        }
    }
}

pub struct Instruments {
    dial: u32,
    power: PowerLevel,
    strength: f32,
    voltage: f32,
    temperature: f32,
}

impl Instruments {
    pub fn new() -> Self {
        Self {
            dial: DIAL_OPTIMUM,
            power: PowerLevel::Medium,
            strength: 10.0,
            voltage: 45.0,
            temperature: 20.0,
        }
    }

    pub fn dial(&self) -> u32 {
        self.dial
    }

    pub fn power(&self) -> PowerLevel {
        self.power
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn tune(&mut self, delta: i32) {
        self.dial = self
            .dial
            .saturating_add_signed(delta)
            .clamp(DIAL_MIN, DIAL_MAX);
    }

    pub fn power_up(&mut self) {
        self.power = self.power.up();
    }

    /// Possession throws the dial somewhere well off the optimum.
    pub fn scramble(&mut self, rng: &mut impl Rng) {
        self.dial = loop {
            let dial = rng.gen_range(DIAL_MIN..=DIAL_MAX);
            if !(550..=650).contains(&dial) {
                break dial;
            }
        };
    }

    pub fn power_down(&mut self) {
        self.power = self.power.down();
    }

    fn offset(&self) -> u32 {
        self.dial.abs_diff(DIAL_OPTIMUM)
    }

    /// How much of the keyed signal actually gets through at this dial
    /// setting. The hidden frequencies cut through better than their
    /// distance from the optimum would suggest.
    pub fn multiplier(&self) -> f32 {
        if is_hidden_frequency(self.dial) {
            return 0.6;
        }

        match self.offset() {
            0..=20 => 1.0,
            21..=100 => 0.7,
            101..=200 => 0.4,
            _ => 0.2,
        }
    }

    pub fn tuning_status(&self) -> TuningStatus {
        if is_hidden_frequency(self.dial) {
            return TuningStatus::Hidden;
        }

        match self.offset() {
            0..=20 => TuningStatus::Stable,
            21..=100 => TuningStatus::Partial,
            101..=200 => TuningStatus::Ghost,
            _ => TuningStatus::HeavyCorruption,
        }
    }

    /// 100ms tick. Picks fresh gauge targets and eases the needles toward
    /// them.
    pub fn fast_tick(&mut self, transmitting: bool, possessed: bool, rng: &mut impl Rng) {
        let (strength_target, voltage_target) = if possessed {
            (rng.gen::<f32>() * 100.0, 30.0 + rng.gen::<f32>() * 60.0)
        } else if transmitting {
            let mut strength = (70.0 + rng.gen::<f32>() * 30.0) * self.multiplier();
            if self.offset() > 100 {
                strength += rng.gen_range(-15.0..15.0);
            }

            let mut voltage = 60.0 + rng.gen::<f32>() * 25.0;
            if self.dial > 700 {
                voltage += 15.0;
            }

            (strength, voltage)
        } else {
            (10.0 + rng.gen::<f32>() * 10.0, 45.0 + rng.gen::<f32>() * 10.0)
        };

        self.strength += (strength_target - self.strength) * STRENGTH_SMOOTHING;
        self.voltage += (voltage_target - self.voltage) * VOLTAGE_SMOOTHING;
        self.strength = self.strength.clamp(0.0, 100.0);
        self.voltage = self.voltage.clamp(0.0, 100.0);
    }

    /// 1s tick. Moves the temperature and reports the moment it pins at the
    /// top of the scale.
    pub fn slow_tick(&mut self, transmitting: bool, agitated: bool, venting: bool) -> bool {
        let delta = if venting {
            -5.0
        } else {
            let base = if transmitting {
                if self.dial > 700 {
                    3.0
                } else {
                    2.0
                }
            } else {
                -1.0
            };
            base + if agitated { 2.0 } else { 0.0 }
        };

        let next = (self.temperature + delta).clamp(20.0, 100.0);
        let overheated = !venting && self.temperature < 100.0 && next >= 100.0;
        self.temperature = next;
        overheated
    }

    /// A finished vent leaves the chassis warm, not cold.
    pub fn vent_complete(&mut self) {
        self.temperature = 30.0;
    }
}

impl Default for Instruments {
    fn default() -> Self {
        Self::new()
    }
}
