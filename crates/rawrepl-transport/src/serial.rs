//! Serial device nodes driven through the reactor.
//!
//! `tokio::fs::File` runs reads on the blocking pool and allows one operation
//! at a time, so a read parked on a silent tty would hold back every write.
//! The node is opened with `O_NONBLOCK` and polled with `tokio::io::unix::AsyncFd` instead.

/// Line settings applied when a serial node is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerialConfig {
    /// Put the line in raw mode at this speed. `None` leaves the node as
    /// configured (e.g. by `stty`), which also allows FIFOs and ptys.
    pub baud_rate: Option<u32>,
}

#[cfg(unix)]
mod port;

#[cfg(unix)]
pub use port::SerialPort;
