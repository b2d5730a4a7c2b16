// Sign-magnitude 64-bit integers as used throughout the BSDIFF40 format
// (the classic `offtin`/`offtout` encoding).
//
// Eight bytes, little-endian: the magnitude occupies bytes 0..7 plus the
// low seven bits of byte 7; the high bit of byte 7 is a sign flag. This is
// not two's complement. Zero is positive, and a set sign bit over a zero
// magnitude (`-0`) is a legal, non-canonical encoding of zero that decoders
// must accept.

use byteorder::{ByteOrder, LE};

/// Width of one encoded integer.
pub const WIDTH: usize = 8;

const SIGN_BIT: u64 = 1 << 63;

/// Decodes a sign-magnitude integer from the first eight bytes of `b`.
///
/// Total over the encoding space; `-0` decodes to `0`.
#[inline]
pub fn decode(b: &[u8]) -> i64 {
    let raw = LE::read_u64(b);
    let magnitude = (raw & !SIGN_BIT) as i64;
    if raw & SIGN_BIT == 0 {
        magnitude
    } else {
        -magnitude
    }
}

/// Encodes `v` into the first eight bytes of `b`, emitting canonical `+0`
/// for zero.
///
/// The codec's domain is `[-(2^63 - 1), 2^63 - 1]`; `i64::MIN` has no
/// representation and encodes as `-0`.
#[inline]
pub fn encode(v: i64, b: &mut [u8]) {
    if v < 0 {
        LE::write_u64(b, v.unsigned_abs() | SIGN_BIT);
    } else {
        LE::write_u64(b, v as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(v: i64) -> i64 {
        let mut b = [0u8; WIDTH];
        encode(v, &mut b);
        decode(&b)
    }

    #[test]
    fn roundtrip_identity() {
        for v in [
            0,
            1,
            -1,
            255,
            -255,
            256,
            i64::MAX,
            -i64::MAX,
            0x0123_4567_89AB_CDEF,
        ] {
            assert_eq!(roundtrip(v), v, "roundtrip failed for {v}");
        }
    }

    #[test]
    fn negative_zero_decodes_to_zero() {
        let mut b = [0u8; WIDTH];
        b[7] = 0x80;
        assert_eq!(decode(&b), 0);
    }

    #[test]
    fn zero_encodes_canonically() {
        let mut b = [0xFFu8; WIDTH];
        encode(0, &mut b);
        assert_eq!(b, [0u8; WIDTH]);
    }

    #[test]
    fn sign_flag_is_high_bit_of_last_byte() {
        let mut b = [0u8; WIDTH];
        encode(-2, &mut b);
        assert_eq!(b[0], 2);
        assert_eq!(b[7], 0x80);
    }

    #[test]
    fn little_endian_magnitude() {
        let mut b = [0u8; WIDTH];
        encode(0x0102, &mut b);
        assert_eq!(&b[..3], &[0x02, 0x01, 0x00]);
    }
}
