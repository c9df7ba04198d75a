use crate::remote::RemoteError;

/// Fatal raw REPL protocol failures.
///
/// These mean the device did not follow the protocol in time; they are
/// distinct from exceptions raised by the executed code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The raw REPL banner never appeared.
    #[error("could not enter raw repl after {attempts} attempts")]
    RawReplUnavailable { attempts: u32 },

    /// The soft reboot banner never appeared.
    #[error("could not enter raw repl: soft reboot not acknowledged")]
    SoftRebootMissing,

    /// The raw REPL banner did not reappear after the soft reboot.
    #[error("could not enter raw repl: device not ready after soft reboot")]
    NotReadyAfterReboot,

    /// The `>` prompt did not appear before sending code.
    #[error("could not enter raw repl: no prompt")]
    PromptMissing,

    /// The device did not acknowledge the code block with `OK`.
    #[error("could not exec command")]
    ExecNotAcknowledged,

    /// The stdout sentinel did not arrive in time.
    #[error("timeout waiting for first EOF reception")]
    FirstEofTimeout,

    /// The stderr sentinel did not arrive in time.
    #[error("timeout waiting for second EOF reception")]
    SecondEofTimeout,
}

/// Errors that can occur in raw REPL session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] rawrepl_transport::TransportError),

    /// Stream-level error.
    #[error("stream error: {0}")]
    Frame(#[from] rawrepl_frame::FrameError),

    /// The device broke the raw REPL protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Local I/O error (e.g. reading a script to execute).
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The executed code raised an exception on the device.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl SessionError {
    /// The remote exception, if this error carries one.
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            SessionError::Remote(remote) => Some(remote),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
