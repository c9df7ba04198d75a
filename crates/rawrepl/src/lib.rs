//! Drive MicroPython boards over the raw REPL.
//!
//! rawrepl puts a board into raw REPL mode over a byte stream (serial device
//! node, TCP serial bridge, Unix socket), executes code on it and moves files
//! to and from its filesystem.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-duplex transports and the capability trait
//! - [`frame`]: pattern-delimited reads over the device output
//! - [`session`]: raw REPL handshake and code execution
//! - [`fs`]: remote filesystem operations
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rawrepl::fs::{Files, ListOptions};
//! use rawrepl::session::Session;
//! use rawrepl::transport::StreamTransport;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(StreamTransport::open_device("/dev/ttyACM0").await?);
//! let mut files = Files::new(Session::new(transport));
//! for entry in files.ls("/", ListOptions::default()).await? {
//!     println!("{entry}");
//! }
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use rawrepl_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use rawrepl_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use rawrepl_session::*;
}

/// Re-export filesystem types.
pub mod fs {
    pub use rawrepl_fs::*;
}
