//! 7-bit packing helpers.
//!
//! Firmata data bytes carry 7 bits each (bit 7 is reserved for command bytes), so multi-byte
//! values are split into 7-bit groups, least significant group first. The vendor extension
//! frames are the only exception and send their groups most significant first.

/// Splits `value` into `count` 7-bit groups, least significant group first.
pub fn encode_7bit(value: u32, count: usize) -> Vec<u8> {
    (0..count)
        .map(|i| {
            let shift = 7 * i as u32;
            match shift < u32::BITS {
                true => ((value >> shift) & 0x7F) as u8,
                false => 0,
            }
        })
        .collect()
}

/// Splits `value` into `count` 7-bit groups, most significant group first.
pub fn encode_7bit_msb_first(value: u32, count: usize) -> Vec<u8> {
    let mut bytes = encode_7bit(value, count);
    bytes.reverse();
    bytes
}

/// Rebuilds a value from 7-bit groups sent least significant group first.
///
/// Only the first five groups are used (35 bits), the result is truncated to 32 bits.
pub fn decode_7bit(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(5)
        .enumerate()
        .fold(0u64, |acc, (i, byte)| acc | (((*byte & 0x7F) as u64) << (7 * i)))
        as u32
}

/// Splits a 14-bit value into its `[lsb, msb]` pair.
pub fn encode_u14(value: u16) -> [u8; 2] {
    [(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
}

/// Rebuilds a 14-bit value from its `lsb` and `msb` bytes.
pub fn decode_u14(lsb: u8, msb: u8) -> u16 {
    ((msb as u16 & 0x7F) << 7) | (lsb as u16 & 0x7F)
}

/// Sends each byte of `data` as an `[lsb, msb]` pair.
pub fn encode_pairs(data: &[u8]) -> Vec<u8> {
    data.iter()
        .flat_map(|byte| encode_u14(*byte as u16))
        .collect()
}

/// Combines consecutive `[lsb, msb]` pairs. A trailing odd byte is ignored.
pub fn decode_pairs(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2)
        .map(|pair| decode_u14(pair[0], pair[1]))
        .collect()
}

/// Decodes a string sent as 14-bit characters (firmware name, string data).
pub fn decode_string(data: &[u8]) -> String {
    decode_pairs(data)
        .into_iter()
        .filter(|c| *c != 0)
        .filter_map(|c| char::from_u32(c as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_7bit() {
        assert_eq!(encode_7bit(0, 2), vec![0x00, 0x00]);
        assert_eq!(encode_7bit(1000, 2), vec![0x68, 0x07]);
        assert_eq!(encode_7bit(17000, 3), vec![0x68, 0x04, 0x01]);
        // Groups above 32 bits are zero.
        assert_eq!(encode_7bit(u32::MAX, 6)[5], 0);
    }

    #[test]
    fn test_encode_7bit_msb_first() {
        assert_eq!(encode_7bit_msb_first(1000, 2), vec![0x07, 0x68]);
        assert_eq!(
            encode_7bit_msb_first(0xFF0000, 4),
            vec![0x07, 0x7C, 0x00, 0x00]
        );
    }

    #[test]
    fn test_decode_7bit() {
        assert_eq!(decode_7bit(&[]), 0);
        assert_eq!(decode_7bit(&[0x68, 0x07]), 1000);
        assert_eq!(decode_7bit(&[0x68, 0x04, 0x01]), 17000);
        // High bits are never taken into account.
        assert_eq!(decode_7bit(&[0xE8, 0x87]), 1000);
    }

    #[test]
    fn test_u14() {
        assert_eq!(encode_u14(170), [0x2A, 0x01]);
        assert_eq!(decode_u14(0x2A, 0x01), 170);
        assert_eq!(decode_u14(0x7F, 0x7F), 16383);
    }

    #[test]
    fn test_pairs() {
        assert_eq!(encode_pairs(&[0xA5, 0x01]), vec![0x25, 0x01, 0x01, 0x00]);
        assert_eq!(decode_pairs(&[0x25, 0x01, 0x01, 0x00, 0x42]), vec![0xA5, 0x01]);
    }

    #[test]
    fn test_decode_string() {
        let data = [0x48, 0x00, 0x69, 0x00, 0x00, 0x00, 0x21, 0x00];
        assert_eq!(decode_string(&data), "Hi!");
    }

    proptest! {
        #[test]
        fn prop_7bit_round_trip(value in any::<u32>()) {
            let encoded = encode_7bit(value, 5);
            prop_assert!(encoded.iter().all(|byte| *byte < 0x80));
            prop_assert_eq!(decode_7bit(&encoded), value);
        }

        #[test]
        fn prop_u14_round_trip(value in 0u16..(1 << 14)) {
            let [lsb, msb] = encode_u14(value);
            prop_assert_eq!(decode_u14(lsb, msb), value);
        }
    }
}
