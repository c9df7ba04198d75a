use rawrepl_session::{RemoteErrorKind, SessionError};

/// Errors that can occur in remote filesystem operations.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Session-level error, including unclassified remote exceptions.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The remote path does not exist.
    #[error("no such file or directory: {path}")]
    NotFound { path: String },

    /// The remote path already exists.
    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    /// The remote directory still has entries.
    #[error("directory is not empty: {path}")]
    NotEmpty { path: String },

    /// File content came back in an undecodable form.
    #[error("invalid file payload: {0}")]
    Decode(String),

    /// A directory listing could not be parsed.
    #[error("invalid listing: {0}")]
    Listing(#[from] serde_json::Error),
}

impl FsError {
    /// Map a session error to a path error when its remote errno is one of
    /// `handled`; anything else is passed through unchanged.
    pub(crate) fn for_path(err: SessionError, path: &str, handled: &[RemoteErrorKind]) -> Self {
        let kind = err.as_remote().map(|remote| remote.kind);
        let path = path.to_string();
        match kind {
            Some(kind) if !handled.contains(&kind) => err.into(),
            Some(RemoteErrorKind::NotFound) => FsError::NotFound { path },
            Some(RemoteErrorKind::AlreadyExists) => FsError::AlreadyExists { path },
            Some(RemoteErrorKind::NotEmpty) => FsError::NotEmpty { path },
            _ => err.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
