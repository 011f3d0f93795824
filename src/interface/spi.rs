//! Bus channel implementation built on top of `embedded-hal` `SpiDevice`.

use embedded_hal::spi::{ErrorType, Mode, SpiDevice};

use super::BusChannel;
use crate::config::BusConfig;
use crate::params::{BitOrder, ChipSelectPolarity};

/// Errors reported by [`SpiChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiChannelError<E> {
    /// Error reported by the wrapped SPI device.
    Spi(E),
    /// The requested framing differs from the one the device was built with.
    ModeMismatch,
    /// The requested clock rate differs from the one the device was built with.
    ClockRateMismatch {
        /// Clock rate the SPI device runs at.
        device_hz: u32,
        /// Clock rate requested by the bus configuration.
        requested_hz: u32,
    },
    /// LSB-first or active-high chip select cannot be expressed through `embedded-hal`.
    Unsupported,
    /// A transfer was attempted while the channel was closed.
    Closed,
}

/// Hook run when a closed channel is reopened.
pub type ReopenFn<SPI> = fn(&mut SPI) -> core::result::Result<(), <SPI as ErrorType>::Error>;

/// SPI-based bus channel for the navX link.
///
/// `embedded-hal` devices receive their clock mode and rate when the HAL
/// peripheral is created, so [`BusChannel::configure`] only checks that the
/// requested framing and clock rate match the ones passed to
/// [`SpiChannel::new`].
///
/// Without a hook installed through [`SpiChannel::with_reopen`], closing and
/// reopening the channel only blocks transfers in between; the SPI peripheral
/// itself is left untouched.
pub struct SpiChannel<SPI: ErrorType> {
    spi: SPI,
    mode: Mode,
    clock_rate_hz: u32,
    reopen: Option<ReopenFn<SPI>>,
    open: bool,
}

impl<SPI: ErrorType> SpiChannel<SPI> {
    /// Creates a new channel from an SPI device running in `mode` at `clock_rate_hz`.
    pub const fn new(spi: SPI, mode: Mode, clock_rate_hz: u32) -> Self {
        Self {
            spi,
            mode,
            clock_rate_hz,
            reopen: None,
            open: true,
        }
    }

    /// Installs a hook that reinitializes the SPI peripheral on reopen.
    pub fn with_reopen(mut self, reopen: ReopenFn<SPI>) -> Self {
        self.reopen = Some(reopen);
        self
    }

    /// Returns `true` unless the channel was closed by a bus reset in progress.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Provides mutable access to the wrapped SPI device.
    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Consumes the channel and returns the owned SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> BusChannel for SpiChannel<SPI>
where
    SPI: SpiDevice,
{
    type Error = SpiChannelError<SPI::Error>;

    fn configure(&mut self, config: &BusConfig) -> core::result::Result<(), Self::Error> {
        if config.bit_order != BitOrder::MsbFirst
            || config.chip_select_polarity != ChipSelectPolarity::ActiveLow
        {
            return Err(SpiChannelError::Unsupported);
        }

        if config.spi_mode() != self.mode {
            return Err(SpiChannelError::ModeMismatch);
        }

        if config.clock_rate_hz != self.clock_rate_hz {
            return Err(SpiChannelError::ClockRateMismatch {
                device_hz: self.clock_rate_hz,
                requested_hz: config.clock_rate_hz,
            });
        }

        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> core::result::Result<usize, Self::Error> {
        if !self.open {
            return Err(SpiChannelError::Closed);
        }

        self.spi.write(data).map_err(SpiChannelError::Spi)?;
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, Self::Error> {
        if !self.open {
            return Err(SpiChannelError::Closed);
        }

        buf.fill(0);
        self.spi.read(buf).map_err(SpiChannelError::Spi)?;
        Ok(buf.len())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn open(&mut self) -> core::result::Result<(), Self::Error> {
        if let Some(reopen) = self.reopen {
            reopen(&mut self.spi).map_err(SpiChannelError::Spi)?;
        }

        self.open = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{SpiChannel, SpiChannelError};
    use crate::config::BusConfig;
    use crate::interface::BusChannel;
    use crate::params::{BitOrder, ChipSelectPolarity, SampleEdge};
    use crate::error::Error;
    use crate::register_io::RegisterIo;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_hal::spi::{ErrorKind, MODE_0, MODE_3, SpiDevice};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    fn wake(spi: &mut SpiMock<u8>) -> Result<(), ErrorKind> {
        spi.write(&[0xFF])
    }

    fn refuse(_spi: &mut SpiMock<u8>) -> Result<(), ErrorKind> {
        Err(ErrorKind::Other)
    }

    #[test]
    fn write_issues_one_transaction() {
        let expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x82, 0x05, 0x54]),
            SpiTransaction::transaction_end(),
        ];
        let mut spi = SpiMock::new(&expectations);
        let mut channel = SpiChannel::new(spi.clone(), MODE_3, 500_000);

        assert_eq!(channel.write(&[0x82, 0x05, 0x54]), Ok(3));
        spi.done();
    }

    #[test]
    fn read_fills_buffer_in_one_transaction() {
        let expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::read_vec(vec![0xAA, 0x55, 0x01]),
            SpiTransaction::transaction_end(),
        ];
        let mut spi = SpiMock::new(&expectations);
        let mut channel = SpiChannel::new(spi.clone(), MODE_3, 500_000);

        let mut buffer = [0u8; 3];
        assert_eq!(channel.read(&mut buffer), Ok(3));
        assert_eq!(buffer, [0xAA, 0x55, 0x01]);
        spi.done();
    }

    #[test]
    fn default_config_matches_mode_3_device() {
        let expectations: [SpiTransaction<u8>; 0] = [];
        let mut spi = SpiMock::new(&expectations);
        let mut channel = SpiChannel::new(spi.clone(), MODE_3, 500_000);

        assert_eq!(channel.configure(&BusConfig::default()), Ok(()));
        spi.done();
    }

    #[test]
    fn mismatched_mode_is_rejected() {
        let expectations: [SpiTransaction<u8>; 0] = [];
        let mut spi = SpiMock::new(&expectations);
        let mut channel = SpiChannel::new(spi.clone(), MODE_0, 500_000);

        assert_eq!(
            channel.configure(&BusConfig::default()),
            Err(SpiChannelError::ModeMismatch)
        );

        let leading = BusConfig::new().sample_edge(SampleEdge::Leading).build();
        assert_eq!(
            channel.configure(&leading),
            Err(SpiChannelError::ModeMismatch)
        );
        spi.done();
    }

    #[test]
    fn unsupported_framing_is_rejected() {
        let expectations: [SpiTransaction<u8>; 0] = [];
        let mut spi = SpiMock::new(&expectations);
        let mut channel = SpiChannel::new(spi.clone(), MODE_3, 500_000);

        let lsb = BusConfig::new().bit_order(BitOrder::LsbFirst).build();
        assert_eq!(channel.configure(&lsb), Err(SpiChannelError::Unsupported));

        let cs_high = BusConfig::new()
            .chip_select_polarity(ChipSelectPolarity::ActiveHigh)
            .build();
        assert_eq!(channel.configure(&cs_high), Err(SpiChannelError::Unsupported));
        spi.done();
    }

    #[test]
    fn closed_channel_refuses_transfers_until_reopened() {
        let expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x01]),
            SpiTransaction::transaction_end(),
        ];
        let mut spi = SpiMock::new(&expectations);
        let mut channel = SpiChannel::new(spi.clone(), MODE_3, 500_000);

        channel.close();
        assert!(!channel.is_open());
        assert_eq!(channel.write(&[0x01]), Err(SpiChannelError::Closed));
        assert_eq!(channel.read(&mut [0u8; 1]), Err(SpiChannelError::Closed));

        channel.open().unwrap();
        assert_eq!(channel.write(&[0x01]), Ok(1));
        spi.done();
    }

    #[test]
    fn mismatched_clock_rate_is_rejected() {
        let expectations: [SpiTransaction<u8>; 0] = [];
        let mut spi = SpiMock::new(&expectations);
        let mut channel = SpiChannel::new(spi.clone(), MODE_3, 500_000);

        let fast = BusConfig::new().clock_rate_hz(8_000_000).build();
        assert_eq!(
            channel.configure(&fast),
            Err(SpiChannelError::ClockRateMismatch {
                device_hz: 500_000,
                requested_hz: 8_000_000
            })
        );
        spi.done();
    }

    #[test]
    fn bitrate_override_must_match_the_device() {
        let expectations: [SpiTransaction<u8>; 0] = [];
        let mut spi = SpiMock::new(&expectations);
        let io: RegisterIo<NoopRawMutex, _, _> = RegisterIo::with_bitrate(
            SpiChannel::new(spi.clone(), MODE_3, 500_000),
            NoopDelay::new(),
            8_000_000,
        );

        assert_eq!(
            io.init(),
            Err(Error::BusConfig(SpiChannelError::ClockRateMismatch {
                device_hz: 500_000,
                requested_hz: 8_000_000
            }))
        );
        spi.done();
    }

    #[test]
    fn reopen_hook_runs_against_the_device() {
        let expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0xFF]),
            SpiTransaction::transaction_end(),
        ];
        let mut spi = SpiMock::new(&expectations);
        let mut channel = SpiChannel::new(spi.clone(), MODE_3, 500_000).with_reopen(wake);

        channel.close();
        assert_eq!(channel.open(), Ok(()));
        assert!(channel.is_open());
        spi.done();
    }

    #[test]
    fn failed_reopen_hook_keeps_the_channel_closed() {
        let expectations: [SpiTransaction<u8>; 0] = [];
        let mut spi = SpiMock::new(&expectations);
        let mut channel = SpiChannel::new(spi.clone(), MODE_3, 500_000).with_reopen(refuse);

        channel.close();
        assert_eq!(channel.open(), Err(SpiChannelError::Spi(ErrorKind::Other)));
        assert!(!channel.is_open());
        spi.done();
    }
}
