//! Byte-level transport over a [`BusChannel`], with no protocol semantics.

use embedded_hal::delay::DelayNs;

use crate::config::BusConfig;
use crate::error::{Error, Result};
use crate::interface::BusChannel;

// Time the device needs between a command and sourcing its response (milliseconds).
pub(crate) const COMMAND_TO_RESPONSE_DELAY_MS: u32 = 1;
// Settle time after closing the channel, before reopening it (milliseconds).
pub(crate) const RESET_CLOSE_DELAY_MS: u32 = 1;
// Settle time after reopening the channel (milliseconds).
pub(crate) const RESET_OPEN_DELAY_MS: u32 = 10;

/// Raw write/read access to the bus plus the timing the link needs.
pub struct BusTransport<CH, D> {
    channel: CH,
    delay: D,
}

impl<CH, D> BusTransport<CH, D> {
    /// Wraps a bus channel and the delay provider used for settle times.
    pub const fn new(channel: CH, delay: D) -> Self {
        Self { channel, delay }
    }

    /// Consumes the transport and returns the owned channel and delay.
    pub fn release(self) -> (CH, D) {
        (self.channel, self.delay)
    }
}

impl<CH, D> BusTransport<CH, D>
where
    CH: BusChannel,
    D: DelayNs,
{
    /// Validates `config` and applies it to the channel.
    pub fn configure(&mut self, config: &BusConfig) -> Result<(), CH::Error> {
        config.validate().map_err(|_| Error::InvalidConfig)?;
        self.channel.configure(config).map_err(Error::BusConfig)
    }

    /// Writes `data` in a single transaction and returns the bytes transferred.
    pub fn write_bytes(&mut self, data: &[u8]) -> core::result::Result<usize, CH::Error> {
        self.channel.write(data)
    }

    /// Reads into `buf` in a single transaction and returns the bytes received.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> core::result::Result<usize, CH::Error> {
        self.channel.read(buf)
    }

    /// Waits for the device to prepare a response after a command.
    pub fn settle(&mut self) {
        self.delay.delay_ms(COMMAND_TO_RESPONSE_DELAY_MS);
    }

    /// Closes and reopens the channel to recover from lost framing.
    pub fn reinitialize(&mut self) -> Result<(), CH::Error> {
        self.channel.close();
        self.delay.delay_ms(RESET_CLOSE_DELAY_MS);
        self.channel.open().map_err(Error::Reset)?;
        self.delay.delay_ms(RESET_OPEN_DELAY_MS);
        Ok(())
    }
}
