//! Realtime step count decoding.

use crate::error::{Error, Result};

/// Exact payload length of a realtime step count notification.
const STEP_PAYLOAD_LEN: usize = 4;

/// Decode a realtime step count payload.
///
/// The band reports the running step total as a little-endian signed
/// 32-bit integer in a fixed 4-byte payload.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedPayload`] for any other length. This is
/// not a protocol violation: the step characteristic also carries other
/// notification shapes, which callers drop without comment.
pub fn parse_step_count(data: &[u8]) -> Result<i32> {
    if data.len() != STEP_PAYLOAD_LEN {
        return Err(Error::UnrecognizedPayload { length: data.len() });
    }

    Ok(i32::from_le_bytes([data[0], data[1], data[2], data[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_count_little_endian() {
        assert_eq!(parse_step_count(&[0x01, 0x00, 0x00, 0x00]).unwrap(), 1);
        assert_eq!(parse_step_count(&[0x00, 0x01, 0x00, 0x00]).unwrap(), 256);
        assert_eq!(
            parse_step_count(&[0x78, 0x56, 0x34, 0x12]).unwrap(),
            0x12345678
        );
    }

    #[test]
    fn test_step_count_twos_complement_wraparound() {
        assert_eq!(parse_step_count(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap(), -1);
        assert_eq!(
            parse_step_count(&[0x00, 0x00, 0x00, 0x80]).unwrap(),
            i32::MIN
        );
    }

    #[test]
    fn test_other_lengths_unrecognized() {
        for len in [0usize, 1, 2, 3, 5, 8, 20] {
            let payload = vec![0u8; len];
            match parse_step_count(&payload) {
                Err(Error::UnrecognizedPayload { length }) => assert_eq!(length, len),
                other => panic!("length {} should be unrecognized, got {:?}", len, other),
            }
        }
    }
}
