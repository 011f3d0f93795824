//! Checksummed register protocol shared by every caller of one navX link.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;

use crate::checksum::{self, Checksum};
use crate::config::BusConfig;
use crate::diagnostic::{Diagnostic, DiagnosticSink, LogSink};
use crate::error::{Error, Result};
use crate::frame::{self, COMMAND_LEN, CommandFrame, MAX_READ_LEN, MAX_REGISTER};
use crate::interface::BusChannel;
use crate::transport::BusTransport;

// Only every Nth consecutive read failure is reported while tracing.
const NUM_IGNORED_SUCCESSIVE_ERRORS: u32 = 50;

/// Lifecycle of a register link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Bus configuration has not been applied yet.
    Uninitialized,
    /// Transactions are accepted.
    Ready,
    /// A bus reset is in progress. Only held while the link is locked, so
    /// [`RegisterIo::state`] never reports it.
    Recovering,
    /// A bus reset failed; the link must be initialized again.
    Faulted,
    /// The link was shut down.
    Terminated,
}

struct Link<CH, D> {
    transport: BusTransport<CH, D>,
    state: LinkState,
    consecutive_errors: u32,
}

enum ReadFailure {
    Transfer,
    Checksum,
}

/// Register read/write engine for a navX attached over SPI.
///
/// Every `write`, and the command/settle/response sequence of every `read`,
/// runs while holding one exclusive lock, so the link can be shared between
/// callers through `&self`. The lock flavor is chosen with `M`.
pub struct RegisterIo<M: RawMutex, CH, D, S = LogSink> {
    link: Mutex<M, RefCell<Link<CH, D>>>,
    config: BusConfig,
    checksum: Checksum,
    sink: S,
    logging: AtomicBool,
}

impl<M, CH, D> RegisterIo<M, CH, D, LogSink>
where
    M: RawMutex,
{
    // ==================================================================
    // == Construction ==================================================
    // ==================================================================
    /// Creates a link running at the default 500 kHz clock.
    pub fn new(channel: CH, delay: D) -> Self {
        Self::with_config(channel, delay, BusConfig::default(), LogSink)
    }

    /// Creates a link with the default framing and a custom clock rate.
    pub fn with_bitrate(channel: CH, delay: D, clock_rate_hz: u32) -> Self {
        let config = BusConfig::new().clock_rate_hz(clock_rate_hz).build();
        Self::with_config(channel, delay, config, LogSink)
    }
}

impl<M, CH, D, S> RegisterIo<M, CH, D, S>
where
    M: RawMutex,
{
    /// Creates a link with explicit bus configuration and diagnostic sink.
    pub fn with_config(channel: CH, delay: D, config: BusConfig, sink: S) -> Self {
        Self {
            link: Mutex::new(RefCell::new(Link {
                transport: BusTransport::new(channel, delay),
                state: LinkState::Uninitialized,
                consecutive_errors: 0,
            })),
            config,
            checksum: checksum::crc8,
            sink,
            logging: AtomicBool::new(false),
        }
    }

    /// Replaces the frame checksum function.
    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = checksum;
        self
    }

    /// Consumes the link and returns the owned channel and delay.
    pub fn release(self) -> (CH, D) {
        self.link.into_inner().into_inner().transport.release()
    }

    /// Bus configuration applied by [`RegisterIo::init`].
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Enables or disables diagnostic output.
    pub fn set_logging(&self, enabled: bool) {
        self.logging.store(enabled, Ordering::Relaxed);
    }

    /// Returns whether diagnostic output is enabled.
    pub fn logging_enabled(&self) -> bool {
        self.logging.load(Ordering::Relaxed)
    }

    /// Number of failed reads since the last validated one.
    pub fn consecutive_errors(&self) -> u32 {
        self.link.lock(|link| link.borrow().consecutive_errors)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        self.link.lock(|link| link.borrow().state)
    }
}

impl<M, CH, D, S> RegisterIo<M, CH, D, S>
where
    M: RawMutex,
    CH: BusChannel,
    D: DelayNs,
    S: DiagnosticSink,
{
    // ==================================================================
    // == Lifecycle =====================================================
    // ==================================================================
    /// Applies the bus configuration. Calling it again reapplies it.
    pub fn init(&self) -> Result<(), CH::Error> {
        self.link.lock(|link| -> Result<(), CH::Error> {
            let mut link = link.borrow_mut();
            link.transport.configure(&self.config)?;
            link.state = LinkState::Ready;
            Ok(())
        })?;

        self.trace(&Diagnostic::Initialized {
            clock_rate_hz: self.config.clock_rate_hz,
        });
        Ok(())
    }

    /// Stops accepting transactions. Always succeeds.
    pub fn shutdown(&self) -> Result<(), CH::Error> {
        self.link.lock(|link| link.borrow_mut().state = LinkState::Terminated);
        Ok(())
    }

    // ==================================================================
    // == Register Access ===============================================
    // ==================================================================
    /// Writes one register.
    ///
    /// Fails with [`Error::ShortWrite`] unless the whole command frame was
    /// transferred. Retrying is left to the caller.
    pub fn write(&self, address: u8, value: u8) -> Result<(), CH::Error> {
        if address > MAX_REGISTER {
            return Err(Error::InvalidAddress);
        }

        let command = CommandFrame::write(address, value, self.checksum);
        let (result, diagnostic) = self.link.lock(|link| -> (Result<(), CH::Error>, Option<Diagnostic>) {
            let mut link = link.borrow_mut();
            if let Err(err) = link.ensure_ready() {
                return (Err(err), None);
            }

            match link.transport.write_bytes(command.as_bytes()) {
                Ok(COMMAND_LEN) => (Ok(()), None),
                Ok(written) => (
                    Err(Error::ShortWrite { written }),
                    Some(Diagnostic::WriteFailed { written }),
                ),
                Err(err) => (Err(Error::Interface(err)), None),
            }
        });

        self.emit(diagnostic);
        result
    }

    /// Reads `buf.len()` consecutive registers starting at `address`.
    ///
    /// On a checksum mismatch the bus is reset before returning. Short reads
    /// are reported without a reset. `buf` is left untouched on failure.
    pub fn read(&self, address: u8, buf: &mut [u8]) -> Result<(), CH::Error> {
        if address > MAX_REGISTER {
            return Err(Error::InvalidAddress);
        }

        let len = buf.len();
        if len == 0 || len > MAX_READ_LEN {
            return Err(Error::InvalidLength);
        }

        let command = CommandFrame::read(address, len as u8, self.checksum);
        let (result, diagnostic) = self.link.lock(|link| -> (Result<(), CH::Error>, Option<Diagnostic>) {
            let mut link = link.borrow_mut();
            if let Err(err) = link.ensure_ready() {
                return (Err(err), None);
            }

            match link.transport.write_bytes(command.as_bytes()) {
                Ok(COMMAND_LEN) => {}
                Ok(written) => return (Err(Error::ShortWrite { written }), None),
                Err(err) => return (Err(Error::Interface(err)), None),
            }

            link.transport.settle();

            let mut response = [0u8; MAX_READ_LEN + 1];
            let response = &mut response[..=len];
            let read = match link.transport.read_bytes(response) {
                Ok(read) => read,
                Err(err) => {
                    let diagnostic = link.record_failure(ReadFailure::Transfer);
                    return (Err(Error::Interface(err)), diagnostic);
                }
            };

            if read != response.len() {
                let diagnostic = link.record_failure(ReadFailure::Transfer);
                return (Err(Error::ShortRead { read }), diagnostic);
            }

            match frame::verify_response(response, self.checksum) {
                Ok(payload) => {
                    link.consecutive_errors = 0;
                    buf.copy_from_slice(payload);
                    (Ok(()), None)
                }
                Err(mismatch) => {
                    let diagnostic = link.record_failure(ReadFailure::Checksum);
                    let result = match link.recover() {
                        Ok(()) => Err(Error::Checksum {
                            expected: mismatch.expected,
                            received: mismatch.received,
                        }),
                        Err(err) => Err(err),
                    };
                    (result, diagnostic)
                }
            }
        });

        self.emit(diagnostic);
        result
    }

    // ==================================================================
    // == Internal Helpers ==============================================
    // ==================================================================
    // Called with the link unlocked so sinks may query the engine.
    fn emit(&self, diagnostic: Option<Diagnostic>) {
        if let Some(diagnostic) = diagnostic {
            self.trace(&diagnostic);
        }
    }

    fn trace(&self, diagnostic: &Diagnostic) {
        if self.logging_enabled() {
            self.sink.emit(diagnostic);
        }
    }
}

impl<CH, D> Link<CH, D>
where
    CH: BusChannel,
    D: DelayNs,
{
    fn ensure_ready(&self) -> Result<(), CH::Error> {
        match self.state {
            LinkState::Ready => Ok(()),
            _ => Err(Error::NotReady),
        }
    }

    fn record_failure(&mut self, failure: ReadFailure) -> Option<Diagnostic> {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);

        let consecutive = self.consecutive_errors;
        if consecutive % NUM_IGNORED_SUCCESSIVE_ERRORS != 1 {
            return None;
        }

        let suppressing = consecutive >= NUM_IGNORED_SUCCESSIVE_ERRORS;
        Some(match failure {
            ReadFailure::Transfer => Diagnostic::ReadFailed {
                consecutive,
                suppressing,
            },
            ReadFailure::Checksum => Diagnostic::ChecksumFailed {
                consecutive,
                suppressing,
            },
        })
    }

    fn recover(&mut self) -> Result<(), CH::Error> {
        self.state = LinkState::Recovering;
        match self.transport.reinitialize() {
            Ok(()) => {
                self.state = LinkState::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = LinkState::Faulted;
                Err(err)
            }
        }
    }
}
