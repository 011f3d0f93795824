//! Strongly typed SPI bus parameters.
//!
//! These enums describe the electrical framing the navX expects and are
//! combined into a [`BusConfig`](crate::config::BusConfig). Prefer them over raw
//! booleans so a configuration reads the same way the wiring diagram does.
//!
//! # Examples
//!
//! ```rust
//! use navx_spi::params::{BitOrder, ClockPolarity, SampleEdge};
//!
//! let order = BitOrder::MsbFirst;
//! let edge = SampleEdge::Trailing;
//! let clock = ClockPolarity::ActiveLow;
//! let _ = (order, edge, clock);
//! ```

use embedded_hal::spi::{Phase, Polarity};

/// Order in which the bits of each byte are shifted out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Most significant bit first.
    MsbFirst,
    /// Least significant bit first.
    LsbFirst,
}

/// Clock edge on which data is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleEdge {
    /// Sample on the first clock transition.
    Leading,
    /// Sample on the second clock transition.
    Trailing,
}

impl SampleEdge {
    /// Returns the matching `embedded-hal` clock phase.
    pub const fn phase(self) -> Phase {
        match self {
            Self::Leading => Phase::CaptureOnFirstTransition,
            Self::Trailing => Phase::CaptureOnSecondTransition,
        }
    }
}

/// Active level of the clock line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPolarity {
    /// Clock pulses high, idles low.
    ActiveHigh,
    /// Clock pulses low, idles high.
    ActiveLow,
}

impl ClockPolarity {
    /// Returns the matching `embedded-hal` clock polarity.
    pub const fn polarity(self) -> Polarity {
        match self {
            Self::ActiveHigh => Polarity::IdleLow,
            Self::ActiveLow => Polarity::IdleHigh,
        }
    }
}

/// Active level of the chip-select line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipSelectPolarity {
    /// Device selected while chip select is high.
    ActiveHigh,
    /// Device selected while chip select is low.
    ActiveLow,
}
