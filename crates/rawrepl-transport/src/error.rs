/// Errors that can occur in raw REPL transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open or connect to the specified target.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The platform cannot open this kind of target.
    #[error("not supported on this platform: {0}")]
    Unsupported(&'static str),

    /// The transport has been closed.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
