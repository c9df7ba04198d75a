use std::fmt;
use std::io;

use rawrepl_frame::FrameError;
use rawrepl_fs::FsError;
use rawrepl_session::{ProtocolError, RemoteErrorKind, SessionError};
use rawrepl_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const NOT_FOUND: i32 = 2;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::NotFound => NOT_FOUND,
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        io::ErrorKind::InvalidInput => USAGE,
        _ => INTERNAL,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(err.kind()), format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { target, source } => CliError::new(
            io_code(source.kind()),
            format!("{context}: {target}: {source}"),
        ),
        TransportError::Io(source) => io_error(context, source),
        TransportError::Closed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        TransportError::Unsupported(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Disconnected { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::Protocol(
            ProtocolError::FirstEofTimeout | ProtocolError::SecondEofTimeout,
        ) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        SessionError::Protocol(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        SessionError::Io(source) => io_error(context, source),
        SessionError::Remote(remote) => {
            let code = match remote.kind {
                RemoteErrorKind::NotFound => NOT_FOUND,
                _ => FAILURE,
            };
            CliError::new(code, format!("{context}: {remote}"))
        }
    }
}

pub fn fs_error(context: &str, err: FsError) -> CliError {
    match err {
        FsError::Session(err) => session_error(context, err),
        FsError::NotFound { .. } => CliError::new(NOT_FOUND, format!("{context}: {err}")),
        FsError::AlreadyExists { .. } | FsError::NotEmpty { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        FsError::Decode(_) | FsError::Listing(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use rawrepl_session::RemoteError;

    use super::*;

    #[test]
    fn missing_remote_path_maps_to_not_found() {
        let err = fs_error(
            "get failed",
            FsError::NotFound {
                path: "/main.py".to_string(),
            },
        );
        assert_eq!(err.code, NOT_FOUND);
        assert_eq!(err.message, "get failed: no such file or directory: /main.py");
    }

    #[test]
    fn sentinel_timeouts_map_to_timeout() {
        let err = session_error("run failed", ProtocolError::FirstEofTimeout.into());
        assert_eq!(err.code, TIMEOUT);

        let err = session_error("run failed", ProtocolError::ExecNotAcknowledged.into());
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn remote_exception_keeps_summary() {
        let remote = RemoteError::new(
            String::new(),
            "Traceback (most recent call last):\r\nZeroDivisionError: divide by zero\r\n"
                .to_string(),
        );
        let err = fs_error("run failed", FsError::Session(remote.into()));
        assert_eq!(err.code, FAILURE);
        assert!(err.message.ends_with("ZeroDivisionError: divide by zero"));
    }

    #[test]
    fn refused_connection_is_a_failure() {
        let err = transport_error(
            "connect failed",
            TransportError::Connect {
                target: "127.0.0.1:2217".to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            },
        );
        assert_eq!(err.code, FAILURE);
        assert!(err.message.starts_with("connect failed: 127.0.0.1:2217:"));
    }

    #[test]
    fn disconnect_maps_to_transport_code() {
        assert_eq!(
            frame_error(
                "read failed",
                FrameError::Disconnected {
                    received: Default::default()
                }
            )
            .code,
            TRANSPORT_ERROR
        );
    }

    #[test]
    fn undecodable_payload_is_data_invalid() {
        let err = fs_error("get failed", FsError::Decode("odd length".to_string()));
        assert_eq!(err.code, DATA_INVALID);
    }
}
