//! Frame checksum used by the navX register protocol.
//!
//! The device protects every command and response with an 8-bit CRC. The
//! algorithm is consumed from the [`crc`] crate; the transport only stores a
//! plain function pointer so a different checksum can be substituted.

use crc::{Algorithm, Crc};

/// Pure checksum function over a byte slice.
pub type Checksum = fn(&[u8]) -> u8;

/// CRC-8 parameters used by the navX firmware (reflected polynomial `0x12`).
pub const CRC_8_NAVX: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x12,
    init: 0x00,
    refin: true,
    refout: true,
    xorout: 0x00,
    check: 0x25,
    residue: 0x00,
};

const NAVX_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_NAVX);

/// Computes the navX CRC-8 over `bytes`.
pub fn crc8(bytes: &[u8]) -> u8 {
    NAVX_CRC.checksum(bytes)
}

#[cfg(test)]
mod tests {
    use super::crc8;

    #[test]
    fn matches_catalog_check_value() {
        assert_eq!(crc8(b"123456789"), 0x25);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc8(&[]), 0x00);
    }

    #[test]
    fn appending_the_checksum_leaves_zero_residue() {
        let mut frame = [0x82, 0x05, 0x00];
        frame[2] = crc8(&frame[..2]);
        assert_eq!(crc8(&frame), 0x00);
    }
}
