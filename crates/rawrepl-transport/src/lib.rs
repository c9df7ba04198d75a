//! Byte-duplex transport abstraction for raw REPL sessions.
//!
//! Provides the capability interface the protocol engine depends on:
//! - `write` raw bytes towards the device
//! - `subscribe` to chunks of received bytes, and `unsubscribe` again
//!
//! This is the lowest layer of rawrepl. Two implementations ship here:
//! [`StreamTransport`] over any tokio byte stream (serial device node,
//! TCP serial bridge, Unix socket) and [`MemoryTransport`] for simulated
//! devices.

pub mod error;
pub mod memory;
pub mod serial;
pub mod stream;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use serial::SerialConfig;
#[cfg(unix)]
pub use serial::SerialPort;
pub use stream::StreamTransport;
pub use traits::{DataCallback, SubscriptionHandle, Subscribers, Transport};
