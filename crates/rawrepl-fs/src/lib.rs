//! Remote filesystem operations for MicroPython-style devices.
//!
//! Every operation is a small Python program generated on the host, executed
//! through a raw REPL [`Session`](rawrepl_session::Session), with its printed
//! output decoded locally. Remote `OSError`s are mapped to [`FsError`]
//! variants by errno.

pub mod error;
pub mod files;
pub mod snippet;

pub use error::{FsError, Result};
pub use files::{parse_listing, Files, ListOptions, RunMode};
