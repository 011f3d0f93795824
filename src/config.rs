//! Bus configuration applied when the register link is initialized.

use embedded_hal::spi::Mode;

use crate::params::{BitOrder, ChipSelectPolarity, ClockPolarity, SampleEdge};

/// Default SPI clock rate used by the navX (500 kHz).
pub const DEFAULT_CLOCK_RATE_HZ: u32 = 500_000;

/// SPI framing parameters for the navX link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Serial clock rate in hertz.
    pub clock_rate_hz: u32,
    /// Bit order on the data lines.
    pub bit_order: BitOrder,
    /// Clock edge on which data is sampled.
    pub sample_edge: SampleEdge,
    /// Active level of the serial clock.
    pub clock_polarity: ClockPolarity,
    /// Active level of the chip-select line.
    pub chip_select_polarity: ChipSelectPolarity,
}

impl BusConfig {
    /// Begins building a [`BusConfig`] using the builder pattern.
    pub fn new() -> BusConfigBuilder {
        BusConfigBuilder::new()
    }

    /// Checks whether this configuration can be applied to a bus.
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        if self.clock_rate_hz == 0 {
            return Err(ConfigError::ZeroClockRate);
        }

        Ok(())
    }

    /// Returns the `embedded-hal` SPI mode described by the clock settings.
    pub const fn spi_mode(&self) -> Mode {
        Mode {
            polarity: self.clock_polarity.polarity(),
            phase: self.sample_edge.phase(),
        }
    }
}

/// Builder for [`BusConfig`] allowing piecemeal construction.
#[derive(Debug, Clone, Copy)]
pub struct BusConfigBuilder {
    config: BusConfig,
}

impl BusConfigBuilder {
    /// Creates a new builder seeded with [`BusConfig::default()`].
    pub fn new() -> Self {
        Self {
            config: BusConfig::default(),
        }
    }

    /// Overrides the serial clock rate.
    pub fn clock_rate_hz(mut self, clock_rate_hz: u32) -> Self {
        self.config.clock_rate_hz = clock_rate_hz;
        self
    }

    /// Overrides the bit order.
    pub fn bit_order(mut self, bit_order: BitOrder) -> Self {
        self.config.bit_order = bit_order;
        self
    }

    /// Overrides the sampling edge.
    pub fn sample_edge(mut self, sample_edge: SampleEdge) -> Self {
        self.config.sample_edge = sample_edge;
        self
    }

    /// Overrides the clock polarity.
    pub fn clock_polarity(mut self, clock_polarity: ClockPolarity) -> Self {
        self.config.clock_polarity = clock_polarity;
        self
    }

    /// Overrides the chip-select polarity.
    pub fn chip_select_polarity(mut self, chip_select_polarity: ChipSelectPolarity) -> Self {
        self.config.chip_select_polarity = chip_select_polarity;
        self
    }

    /// Finalizes the builder and returns the [`BusConfig`].
    pub fn build(self) -> BusConfig {
        self.config
    }
}

impl Default for BusConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            clock_rate_hz: DEFAULT_CLOCK_RATE_HZ,
            bit_order: BitOrder::MsbFirst,
            sample_edge: SampleEdge::Trailing,
            clock_polarity: ClockPolarity::ActiveLow,
            chip_select_polarity: ChipSelectPolarity::ActiveLow,
        }
    }
}

/// Validation errors generated while verifying a [`BusConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A clock rate of zero cannot drive the bus.
    ZeroClockRate,
}
