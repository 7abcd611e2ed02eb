//! Secondary "hidden layer" encoding.
//!
//! Rides along with a primary transmission: the message is flattened to
//! MSB-first bits and each primary signal index picks up one bit, expressed
//! as a small frequency offset for the audio layer and a brightness level
//! for the panel LEDs. Pure steganographic set dressing, but a consistent
//! one.

use bitvec::prelude::*;
use rand::Rng;

/// Frequency swing around the carrier for a set/unset bit, in Hz.
pub const FREQ_OFFSET: f32 = 50.0;

/// Canned payloads attached to transmissions when no explicit hidden
/// message is given.
const LOCATIONS: &[&str] = &[
    "LAT:39.1N LON:86.5W",
    "SECTOR:7-G DEPTH:40M",
    "GATE:ALPHA STATUS:ACTIVE",
    "PORTAL:UNSTABLE FLUX:HIGH",
    "COORDINATES:CLASSIFIED",
];

/// One encoded bit with its audio and display projections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HiddenBit {
    pub bit: bool,
    /// Added to the carrier frequency while this bit is current.
    pub frequency_offset: f32,
    /// LED brightness, 0.5 or 1.0.
    pub brightness: f32,
    /// LED color intensity, 0.3 or 1.0.
    pub intensity: f32,
}

/// A message encoded against a primary signal sequence.
pub struct HiddenLayer {
    message: String,
    bits: Vec<HiddenBit>,
}

/// What the layer indicator should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerStatus {
    Inactive,
    LayerA,
    Dual,
    Corrupted,
}

impl HiddenBit {
    fn new(bit: bool) -> Self {
        Self {
            bit,
            frequency_offset: if bit { FREQ_OFFSET } else { -FREQ_OFFSET },
            brightness: if bit { 1.0 } else { 0.5 },
            intensity: if bit { 1.0 } else { 0.3 },
        }
    }
}

impl HiddenLayer {
    /// Encodes `message`, padded (by cycling) or extended to cover at least
    /// `primary_len` signals so every signal index resolves to a bit.
    pub fn encode(message: &str, primary_len: usize) -> Self {
        let message = message.to_uppercase();
        let bits = message.as_bytes().view_bits::<Msb0>();
        let target = primary_len.max(bits.len());

        let bits = (0..target)
            .map(|i| {
                let bit = !bits.is_empty() && bits[i % bits.len()];
                HiddenBit::new(bit)
            })
            .collect();

        Self { message, bits }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn bits(&self) -> &[HiddenBit] {
        &self.bits
    }

    /// Bit carried by the given primary signal index, cycling past the end.
    pub fn bit(&self, index: usize) -> Option<HiddenBit> {
        (!self.bits.is_empty()).then(|| self.bits[index % self.bits.len()])
    }

    /// Carrier offset for the given primary signal index, 0 when empty.
    pub fn frequency_offset(&self, index: usize) -> f32 {
        self.bit(index).map(|x| x.frequency_offset).unwrap_or(0.0)
    }
}

/// Picks a random canned location payload.
pub fn location_data(rng: &mut impl Rng) -> &'static str {
    LOCATIONS[rng.gen_range(0..LOCATIONS.len())]
}

/// Resolves the layer indicator state from the transmission state.
pub fn layer_status(transmitting: bool, hidden_enabled: bool, corrupted: bool) -> LayerStatus {
    if corrupted {
        LayerStatus::Corrupted
    } else if !transmitting {
        LayerStatus::Inactive
    } else if hidden_enabled {
        LayerStatus::Dual
    } else {
        LayerStatus::LayerA
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bits_msb_first() {
        // 'A' is 0x41
        let layer = HiddenLayer::encode("A", 0);
        let bits = layer.bits().iter().map(|x| x.bit).collect::<Vec<_>>();
        assert_eq!(bits, [false, true, false, false, false, false, false, true]);
    }

    #[test]
    fn test_projections() {
        let layer = HiddenLayer::encode("A", 0);
        let one = layer.bit(1).unwrap();
        let zero = layer.bit(0).unwrap();

        assert_eq!(one.frequency_offset, FREQ_OFFSET);
        assert_eq!(zero.frequency_offset, -FREQ_OFFSET);
        assert_eq!(one.brightness, 1.0);
        assert_eq!(zero.brightness, 0.5);
        assert_eq!(one.intensity, 1.0);
        assert_eq!(zero.intensity, 0.3);
    }

    #[test]
    fn test_pads_to_primary_length() {
        let layer = HiddenLayer::encode("A", 20);
        assert_eq!(layer.bits().len(), 20);

        // Padding cycles the message bits
        assert_eq!(layer.bits()[8], layer.bits()[0]);
        assert_eq!(layer.bits()[19], layer.bits()[3]);
    }

    #[test]
    fn test_cycles_past_end() {
        let layer = HiddenLayer::encode("A", 0);
        assert_eq!(layer.bit(8), layer.bit(0));
        assert_eq!(layer.bit(17), layer.bit(1));
    }

    #[test]
    fn test_uppercases_message() {
        let layer = HiddenLayer::encode("hawkins", 0);
        assert_eq!(layer.message(), "HAWKINS");

        let upper = HiddenLayer::encode("HAWKINS", 0);
        assert_eq!(layer.bits(), upper.bits());
    }

    #[test]
    fn test_empty_message() {
        let layer = HiddenLayer::encode("", 10);
        assert_eq!(layer.bits().len(), 10);
        assert!(layer.bits().iter().all(|x| !x.bit));

        let empty = HiddenLayer::encode("", 0);
        assert_eq!(empty.bit(0), None);
        assert_eq!(empty.frequency_offset(3), 0.0);
    }

    #[test]
    fn test_layer_status() {
        assert_eq!(layer_status(true, true, true), LayerStatus::Corrupted);
        assert_eq!(layer_status(false, true, false), LayerStatus::Inactive);
        assert_eq!(layer_status(true, true, false), LayerStatus::Dual);
        assert_eq!(layer_status(true, false, false), LayerStatus::LayerA);
    }
}
