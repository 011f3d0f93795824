//! Error handling primitives for the navX SPI transport.

/// Crate-wide result type alias.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error variants produced by the transport and the register protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// Any error reported by the underlying bus channel during a transfer.
    Interface(E),
    /// The bus channel rejected the configuration applied at init.
    BusConfig(E),
    /// Reopening the bus channel during a bus reset failed.
    Reset(E),
    /// The provided configuration parameters are invalid.
    InvalidConfig,
    /// The link has not been initialized, was shut down, or is faulted.
    NotReady,
    /// Register addresses are limited to 7 bits.
    InvalidAddress,
    /// Read requests must cover between 1 and 255 bytes.
    InvalidLength,
    /// The channel transferred fewer command bytes than requested.
    ShortWrite {
        /// Bytes actually written.
        written: usize,
    },
    /// The channel returned fewer response bytes than requested.
    ShortRead {
        /// Bytes actually read.
        read: usize,
    },
    /// The trailing checksum of a response did not match its payload.
    Checksum {
        /// Checksum computed over the received payload.
        expected: u8,
        /// Checksum byte received from the device.
        received: u8,
    },
}

impl<E> Error<E> {
    /// Returns `true` when the channel is left in an unknown state and the
    /// link must be initialized again before further use.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::BusConfig(_) | Self::Reset(_))
    }
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Self::Interface(err)
    }
}
