//! Raw REPL session management.
//!
//! This is the protocol layer: bring a device into raw REPL mode, push code
//! in device-sized chunks, and read back the stdout/stderr pair framed by
//! `0x04` sentinels. Remote exceptions are surfaced as [`RemoteError`] with a
//! [`RemoteErrorKind`] derived from the traceback text.

pub mod config;
pub mod error;
pub mod exec;
pub mod handshake;
pub mod protocol;
pub mod remote;
pub mod session;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use config::SessionConfig;
pub use error::{ProtocolError, Result, SessionError};
pub use exec::ExecResult;
pub use handshake::ReplState;
pub use rawrepl_frame::{DataSink, ReadOutcome};
pub use remote::{classify_remote_error, remote_errno, RemoteError, RemoteErrorKind};
pub use session::{RawRepl, Session};
