//! Accelerometer sensor frame decoding.
//!
//! The band pushes raw accelerometer packets on the sensor data
//! characteristic: a 16-bit little-endian sequence counter followed by
//! any number of 6-byte sample slots, one per measurement. Each slot
//! carries three axes as 16-bit little-endian words with a packed
//! sign/type header in the high byte:
//!
//! ```text
//! high byte:  7   6   5   4   3   2   1   0
//!           [ type  ][ sign  ][ raw bits 11..8 ]
//! low byte:   raw bits 7..0
//! ```
//!
//! The magnitude is the low 12 bits of the word. A nonzero sign field
//! selects the negative branch, `magnitude - 4097`. The 4097 offset is
//! the band's calibration convention, not two's complement; 4096 would
//! decode every negative reading off by one.
//!
//! Decoding is pure and has no dependency on session state.

use crate::error::{Error, Result};

/// Size of the leading sequence counter in bytes.
const COUNTER_SIZE: usize = 2;
/// Size of one three-axis sample slot in bytes.
const SLOT_SIZE: usize = 6;
/// Mask selecting the 12 magnitude bits of an axis word.
const AXIS_MASK: u16 = 0x0FFF;
/// Offset applied to masked values on the negative branch.
const NEGATIVE_OFFSET: i32 = 4097;
/// Raw units per g before gravity scaling.
const SCALE_FACTOR: f64 = 1000.0;
/// Standard gravity in m/s².
const GRAVITY: f64 = 9.81;

/// One calibrated tri-axial acceleration sample in m/s².
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccelerationSample {
    /// X-axis acceleration in m/s².
    pub x: f64,
    /// Y-axis acceleration in m/s².
    pub y: f64,
    /// Z-axis acceleration in m/s².
    pub z: f64,
    /// The 2-bit "type" field of each axis word (x, y, z order).
    ///
    /// Current firmware does not assign these bits a meaning on the
    /// decoded side; they are preserved for forward compatibility.
    pub axis_types: [u8; 3],
}

/// A decoded sensor notification: a sequence counter plus the ordered
/// samples it carried.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorFrame {
    /// Little-endian 16-bit sequence counter from the packet header.
    pub counter: u16,
    /// Samples in packet order, one per 6-byte slot.
    pub samples: Vec<AccelerationSample>,
}

impl SensorFrame {
    /// Decode a raw sensor notification payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the payload is shorter than
    /// the 2-byte counter or its remainder is not a whole number of
    /// 6-byte slots. No partial frame is produced.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < COUNTER_SIZE || (data.len() - COUNTER_SIZE) % SLOT_SIZE != 0 {
            return Err(Error::MalformedFrame { length: data.len() });
        }

        let counter = u16::from_le_bytes([data[0], data[1]]);

        let samples = data[COUNTER_SIZE..]
            .chunks_exact(SLOT_SIZE)
            .map(|slot| {
                let (x, x_type) = decode_axis(slot[0], slot[1]);
                let (y, y_type) = decode_axis(slot[2], slot[3]);
                let (z, z_type) = decode_axis(slot[4], slot[5]);
                AccelerationSample {
                    x,
                    y,
                    z,
                    axis_types: [x_type, y_type, z_type],
                }
            })
            .collect();

        Ok(Self { counter, samples })
    }

    /// Number of samples in the frame.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the frame carried no samples (a bare counter is valid).
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decode one axis word into a physical value and its type field.
fn decode_axis(low: u8, high: u8) -> (f64, u8) {
    let raw = u16::from_le_bytes([low, high]);
    let sign = (high & 0x30) >> 4;
    let axis_type = (high & 0xC0) >> 6;

    let magnitude = if sign == 0 {
        i32::from(raw & AXIS_MASK)
    } else {
        i32::from(raw & AXIS_MASK) - NEGATIVE_OFFSET
    };

    ((f64::from(magnitude) / SCALE_FACTOR) * GRAVITY, axis_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_zero_frame_single_slot() {
        let payload = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let frame = SensorFrame::parse(&payload).unwrap();

        assert_eq!(frame.counter, 1);
        assert_eq!(frame.len(), 1);
        assert_eq!(
            frame.samples[0],
            AccelerationSample {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                axis_types: [0, 0, 0],
            }
        );
    }

    #[test]
    fn test_negative_branch_exact_offset() {
        // low 0xFF, high 0x1F: raw16 = 0x1FFF, masked = 0x0FFF = 4095,
        // sign bits = 01 so magnitude = 4095 - 4097 = -2.
        let payload = [0x00, 0x00, 0xFF, 0x1F, 0xFF, 0x1F, 0xFF, 0x1F];
        let frame = SensorFrame::parse(&payload).unwrap();
        let sample = frame.samples[0];

        let expected = (-2.0 / 1000.0) * 9.81;
        assert_eq!(sample.x, expected);
        assert_eq!(sample.y, expected);
        assert_eq!(sample.z, expected);
        assert!((sample.x - (-0.01962)).abs() < 1e-12);
    }

    #[test]
    fn test_positive_branch_masks_to_12_bits() {
        // high 0x0F keeps sign bits zero while setting raw bits 11..8
        let payload = [0x00, 0x00, 0xFF, 0x0F, 0x01, 0x00, 0xE8, 0x03];
        let frame = SensorFrame::parse(&payload).unwrap();
        let sample = frame.samples[0];

        assert_eq!(sample.x, (4095.0 / 1000.0) * 9.81);
        assert_eq!(sample.y, (1.0 / 1000.0) * 9.81);
        // 0x03E8 = 1000 raw = exactly one g
        assert_eq!(sample.z, 9.81);
    }

    #[test]
    fn test_type_bits_preserved() {
        // high bytes 0x40, 0x80, 0xC0: type fields 1, 2, 3, sign 0
        let payload = [0x00, 0x00, 0x00, 0x40, 0x00, 0x80, 0x00, 0xC0];
        let frame = SensorFrame::parse(&payload).unwrap();

        assert_eq!(frame.samples[0].axis_types, [1, 2, 3]);
        // type bits sit above the magnitude mask and do not affect values
        assert_eq!(frame.samples[0].x, 0.0);
        assert_eq!(frame.samples[0].y, 0.0);
        assert_eq!(frame.samples[0].z, 0.0);
    }

    #[test]
    fn test_multi_slot_frame_preserves_order() {
        let payload = [
            0x34, 0x12, // counter 0x1234
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, // x = 1 raw
            0x00, 0x00, 0x02, 0x00, 0x00, 0x00, // y = 2 raw
            0x00, 0x00, 0x00, 0x00, 0x03, 0x00, // z = 3 raw
        ];
        let frame = SensorFrame::parse(&payload).unwrap();

        assert_eq!(frame.counter, 0x1234);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.samples[0].x, (1.0 / 1000.0) * 9.81);
        assert_eq!(frame.samples[1].y, (2.0 / 1000.0) * 9.81);
        assert_eq!(frame.samples[2].z, (3.0 / 1000.0) * 9.81);
    }

    #[test]
    fn test_counter_only_frame_is_valid() {
        let frame = SensorFrame::parse(&[0xFF, 0xFF]).unwrap();
        assert_eq!(frame.counter, 0xFFFF);
        assert!(frame.is_empty());
    }

    #[test]
    fn test_malformed_lengths_rejected() {
        for len in [0usize, 1, 3, 4, 5, 6, 7, 9, 13] {
            let payload = vec![0u8; len];
            match SensorFrame::parse(&payload) {
                Err(Error::MalformedFrame { length }) => assert_eq!(length, len),
                other => panic!("length {} should be malformed, got {:?}", len, other),
            }
        }
    }

    proptest! {
        // prop_assume below keeps only 1 in 6 generated lengths, so the
        // default global reject limit aborts before enough cases pass.
        #![proptest_config(ProptestConfig {
            max_global_rejects: 8192,
            ..ProptestConfig::default()
        })]

        #[test]
        fn prop_length_validity(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let valid = data.len() >= 2 && (data.len() - 2) % 6 == 0;
            match SensorFrame::parse(&data) {
                Ok(frame) => {
                    prop_assert!(valid);
                    prop_assert_eq!(frame.len(), (data.len() - 2) / 6);
                }
                Err(Error::MalformedFrame { length }) => {
                    prop_assert!(!valid);
                    prop_assert_eq!(length, data.len());
                }
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }

        #[test]
        fn prop_decoded_values_in_calibrated_range(
            data in proptest::collection::vec(any::<u8>(), 2..50)
        ) {
            prop_assume!((data.len() - 2) % 6 == 0);
            let frame = SensorFrame::parse(&data).unwrap();
            for sample in &frame.samples {
                for value in [sample.x, sample.y, sample.z] {
                    // positive branch tops out at 4095, negative at -4097
                    prop_assert!(value <= (4095.0 / 1000.0) * 9.81);
                    prop_assert!(value >= (-4097.0 / 1000.0) * 9.81);
                }
                for t in sample.axis_types {
                    prop_assert!(t <= 3);
                }
            }
        }
    }
}
