//! Command and response frames of the navX register protocol.
#![allow(unused_parens)]

use modular_bitfield::prelude::*;

use crate::checksum::Checksum;

/// Length of every command frame in bytes.
pub const COMMAND_LEN: usize = 3;
/// Largest payload a single read may request.
pub const MAX_READ_LEN: usize = 255;
/// Largest addressable register.
pub const MAX_REGISTER: u8 = 0x7F;

/// Bitfield representation of the first byte of a command frame.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandAddress {
    // Register address (bits 0..=6).
    pub register: B7,
    // Write marker (bit 7).
    pub write: bool,
}

impl From<u8> for CommandAddress {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<CommandAddress> for u8 {
    fn from(value: CommandAddress) -> Self {
        value.into_bytes()[0]
    }
}

/// Fixed-size command sent at the start of every register transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: [u8; COMMAND_LEN],
}

impl CommandFrame {
    /// Builds `[0x80 | register, value, checksum]`.
    ///
    /// `register` must not exceed [`MAX_REGISTER`].
    pub fn write(register: u8, value: u8, checksum: Checksum) -> Self {
        let address = CommandAddress::new()
            .with_register(register & MAX_REGISTER)
            .with_write(true);
        Self::seal(u8::from(address), value, checksum)
    }

    /// Builds `[register, len, checksum]`.
    ///
    /// `register` must not exceed [`MAX_REGISTER`].
    pub fn read(register: u8, len: u8, checksum: Checksum) -> Self {
        let address = CommandAddress::new()
            .with_register(register & MAX_REGISTER)
            .with_write(false);
        Self::seal(u8::from(address), len, checksum)
    }

    fn seal(first: u8, second: u8, checksum: Checksum) -> Self {
        let mut bytes = [first, second, 0];
        bytes[2] = checksum(&bytes[..2]);
        Self { bytes }
    }

    /// Raw bytes to put on the bus.
    pub fn as_bytes(&self) -> &[u8; COMMAND_LEN] {
        &self.bytes
    }
}

/// Checksum mismatch detected while validating a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumMismatch {
    /// Checksum computed over the received payload.
    pub expected: u8,
    /// Trailing byte received from the device.
    pub received: u8,
}

/// Splits a `payload + checksum` response and returns the validated payload.
///
/// An empty response has no checksum byte and is always rejected.
pub fn verify_response(
    response: &[u8],
    checksum: Checksum,
) -> core::result::Result<&[u8], ChecksumMismatch> {
    let Some((&received, payload)) = response.split_last() else {
        return Err(ChecksumMismatch {
            expected: checksum(&[]),
            received: 0,
        });
    };

    let expected = checksum(payload);
    if expected != received {
        return Err(ChecksumMismatch { expected, received });
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::crc8;

    #[test]
    fn write_frame_sets_marker_and_checksum() {
        let frame = CommandFrame::write(0x02, 0x05, crc8);
        let bytes = frame.as_bytes();
        assert_eq!(bytes[0], 0x82);
        assert_eq!(bytes[1], 0x05);
        assert_eq!(bytes[2], crc8(&[0x82, 0x05]));
    }

    #[test]
    fn read_frame_carries_length_and_checksum() {
        let frame = CommandFrame::read(0x10, 4, crc8);
        assert_eq!(frame.as_bytes(), &[0x10, 0x04, crc8(&[0x10, 0x04])]);
    }

    #[test]
    fn command_checksum_holds_for_every_register() {
        for register in 0..=MAX_REGISTER {
            for value in [0x00, 0x01, 0x7F, 0x80, 0xFF] {
                let write = CommandFrame::write(register, value, crc8);
                let bytes = write.as_bytes();
                assert_eq!(bytes[2], crc8(&bytes[..2]));
                assert_eq!(bytes[0], 0x80 | register);

                let read = CommandFrame::read(register, value.max(1), crc8);
                let bytes = read.as_bytes();
                assert_eq!(bytes[2], crc8(&bytes[..2]));
                assert_eq!(bytes[0], register);
            }
        }
    }

    #[test]
    fn command_address_decodes_marker() {
        let address = CommandAddress::from(0x9A);
        assert!(address.write());
        assert_eq!(address.register(), 0x1A);
        assert_eq!(u8::from(address), 0x9A);
    }

    #[test]
    fn verify_response_returns_payload() {
        let payload = [0x11, 0x22, 0x33, 0x44];
        let response = [0x11, 0x22, 0x33, 0x44, crc8(&payload)];
        assert_eq!(verify_response(&response, crc8), Ok(&payload[..]));
    }

    #[test]
    fn verify_response_reports_mismatch() {
        let payload = [0x11, 0x22];
        let good = crc8(&payload);
        let response = [0x11, 0x22, good ^ 0xFF];
        assert_eq!(
            verify_response(&response, crc8),
            Err(ChecksumMismatch {
                expected: good,
                received: good ^ 0xFF
            })
        );
    }

    #[test]
    fn verify_response_rejects_empty_frame() {
        assert!(verify_response(&[], crc8).is_err());
    }
}
