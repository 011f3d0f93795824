//! Bus channel abstraction consumed by the transport.

pub mod spi;

use crate::config::BusConfig;

/// Raw access to the physical bus channel the navX is attached to.
///
/// Every `write`/`read` call is one bus transaction, with chip select asserted
/// for its duration. Implementations report how many bytes were actually
/// transferred so the protocol can detect short transfers.
pub trait BusChannel {
    /// Error type produced by the concrete channel implementation.
    type Error;

    /// Applies clock rate and framing parameters to the channel.
    fn configure(&mut self, config: &BusConfig) -> core::result::Result<(), Self::Error>;

    /// Writes `data` in a single transaction, returning the bytes transferred.
    fn write(&mut self, data: &[u8]) -> core::result::Result<usize, Self::Error>;

    /// Clocks in `buf.len()` bytes in a single transaction, returning the bytes received.
    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, Self::Error>;

    /// Releases the channel at the hardware level.
    fn close(&mut self);

    /// Reopens a closed channel with the configuration it had before closing.
    fn open(&mut self) -> core::result::Result<(), Self::Error>;
}
