//! Diagnostic events emitted by the register link while tracing is enabled.

use core::fmt;

use crate::frame::COMMAND_LEN;

/// Event reported to a [`DiagnosticSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Diagnostic {
    /// Configuration was applied to the bus.
    Initialized {
        /// Clock rate applied to the bus.
        clock_rate_hz: u32,
    },
    /// A register write transferred fewer bytes than its command frame.
    WriteFailed {
        /// Bytes actually written.
        written: usize,
    },
    /// A response could not be read completely.
    ReadFailed {
        /// Consecutive failed reads including this one.
        consecutive: u32,
        /// Later failures are being omitted until the next report.
        suppressing: bool,
    },
    /// A response failed checksum validation and the bus was reset.
    ChecksumFailed {
        /// Consecutive failed reads including this one.
        consecutive: u32,
        /// Later failures are being omitted until the next report.
        suppressing: bool,
    },
}

impl Diagnostic {
    /// Returns `true` for events describing a failed transfer.
    pub const fn is_failure(&self) -> bool {
        !matches!(self, Self::Initialized { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Initialized { clock_rate_hz } => {
                write!(f, "navX SPI: initialized at bitrate {clock_rate_hz} Hz")
            }
            Self::WriteFailed { written } => {
                write!(f, "navX SPI write: wrote {written} of {COMMAND_LEN} bytes")
            }
            Self::ReadFailed { suppressing, .. } => {
                f.write_str("navX SPI read: read error")?;
                if suppressing {
                    f.write_str(" (repeated errors omitted)")?;
                }
                Ok(())
            }
            Self::ChecksumFailed { suppressing, .. } => {
                f.write_str("navX SPI read: CRC error")?;
                if suppressing {
                    f.write_str(" (repeated errors omitted)")?;
                }
                Ok(())
            }
        }
    }
}

/// Receiver for the diagnostics of a register link.
pub trait DiagnosticSink {
    /// Handles one diagnostic event.
    fn emit(&self, diagnostic: &Diagnostic);
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn emit(&self, diagnostic: &Diagnostic) {
        (**self).emit(diagnostic)
    }
}

/// Sink forwarding diagnostics to the crate's `defmt`/`log` backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        if diagnostic.is_failure() {
            warn!("{}", diagnostic);
        } else {
            info!("{}", diagnostic);
        }
    }
}
