/// Errors that can occur while reading from a raw REPL stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] rawrepl_transport::TransportError),

    /// The transport stopped delivering data (closed or dropped subscription).
    /// Carries whatever had been queued before the pattern could match.
    #[error("connection closed while waiting for device output ({} bytes received)", received.len())]
    Disconnected { received: bytes::Bytes },
}

pub type Result<T> = std::result::Result<T, FrameError>;
