//! Byte queue and read-until engine for raw REPL streams.
//!
//! The device answers in free-form text delimited by banners and sentinel
//! bytes rather than length-prefixed frames. This layer turns the incoming
//! byte stream into pattern-delimited pieces:
//! - received chunks are appended to a FIFO [`ByteQueue`]
//! - [`ReplReader::read_until`] waits for a pattern or a timeout, whichever
//!   comes first, and hands back the consumed prefix
//!
//! Timeouts are an outcome, not an error: callers decide whether a missing
//! pattern is fatal.

pub mod error;
pub mod queue;
pub mod reader;

pub use error::{FrameError, Result};
pub use queue::ByteQueue;
pub use reader::{DataSink, ReadOutcome, ReplReader};
