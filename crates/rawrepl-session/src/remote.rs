use std::fmt;

/// Category of a remote exception, derived from its traceback text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// `OSError` with errno 2 (ENOENT).
    NotFound,
    /// `OSError` with errno 17 (EEXIST).
    AlreadyExists,
    /// `OSError` with errno 13 (EACCES), reported when removing a
    /// directory that still has entries.
    NotEmpty,
    /// Anything else.
    Generic,
}

/// An exception raised by code executed on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    /// Output printed before the exception.
    pub stdout: String,
    /// The full traceback.
    pub stderr: String,
}

impl RemoteError {
    /// Build a remote error, classifying `stderr`.
    pub fn new(stdout: String, stderr: String) -> Self {
        Self {
            kind: classify_remote_error(&stderr),
            stdout,
            stderr,
        }
    }

    /// The exception line, normally the last non-empty line of the traceback.
    pub fn summary(&self) -> &str {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote exception: {}", self.summary())
    }
}

impl std::error::Error for RemoteError {}

const OS_ERROR: &str = "OSError";

const SYMBOLIC_ERRNOS: [(&str, u32); 3] = [("ENOENT", 2), ("EEXIST", 17), ("EACCES", 13)];

/// Map a remote traceback to a [`RemoteErrorKind`].
///
/// Looks for an `OSError` line and its errno, accepting the forms MicroPython
/// ports print: `OSError: [Errno 2] ENOENT`, `OSError: 2`, `OSError: ENOENT`.
pub fn classify_remote_error(stderr: &str) -> RemoteErrorKind {
    match remote_errno(stderr) {
        Some(2) => RemoteErrorKind::NotFound,
        Some(17) => RemoteErrorKind::AlreadyExists,
        Some(13) => RemoteErrorKind::NotEmpty,
        _ => RemoteErrorKind::Generic,
    }
}

/// Extract the errno of the last `OSError` in a remote traceback.
pub fn remote_errno(stderr: &str) -> Option<u32> {
    let line = stderr.lines().rev().find(|line| line.contains(OS_ERROR))?;
    let start = line.find(OS_ERROR)? + OS_ERROR.len();
    let rest = &line[start..];

    if let Some(errno) = first_number(rest) {
        return Some(errno);
    }
    SYMBOLIC_ERRNOS
        .iter()
        .find(|(name, _)| rest.contains(name))
        .map(|&(_, errno)| errno)
}

fn first_number(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENOENT_TRACEBACK: &str = "Traceback (most recent call last):\r\n  File \"<stdin>\", line 4, in <module>\r\nOSError: [Errno 2] ENOENT\r\n";
    const EEXIST_TRACEBACK: &str = "Traceback (most recent call last):\r\n  File \"<stdin>\", line 5, in <module>\r\nOSError: [Errno 17] EEXIST\r\n";
    const EACCES_TRACEBACK: &str = "Traceback (most recent call last):\r\n  File \"<stdin>\", line 5, in <module>\r\nOSError: [Errno 13] EACCES\r\n";
    const BARE_ERRNO_TRACEBACK: &str = "Traceback (most recent call last):\r\n  File \"<stdin>\", line 1, in <module>\r\nOSError: 2\r\n";
    const NAME_ERROR_TRACEBACK: &str = "Traceback (most recent call last):\r\n  File \"<stdin>\", line 2, in <module>\r\nNameError: name 'pyb' isn't defined\r\n";

    #[test]
    fn classifies_errno_forms() {
        assert_eq!(classify_remote_error(ENOENT_TRACEBACK), RemoteErrorKind::NotFound);
        assert_eq!(classify_remote_error(EEXIST_TRACEBACK), RemoteErrorKind::AlreadyExists);
        assert_eq!(classify_remote_error(EACCES_TRACEBACK), RemoteErrorKind::NotEmpty);
        assert_eq!(classify_remote_error(BARE_ERRNO_TRACEBACK), RemoteErrorKind::NotFound);
    }

    #[test]
    fn symbolic_errno_without_number() {
        assert_eq!(remote_errno("OSError: ENOENT"), Some(2));
        assert_eq!(remote_errno("OSError: EEXIST\r\n"), Some(17));
        assert_eq!(classify_remote_error("OSError: EACCES"), RemoteErrorKind::NotEmpty);
    }

    #[test]
    fn line_numbers_in_traceback_are_ignored() {
        // "line 2" must not be mistaken for errno 2.
        assert_eq!(classify_remote_error(NAME_ERROR_TRACEBACK), RemoteErrorKind::Generic);
        assert_eq!(remote_errno(NAME_ERROR_TRACEBACK), None);
    }

    #[test]
    fn unknown_errno_is_generic() {
        let traceback = "Traceback (most recent call last):\r\nOSError: [Errno 28] ENOSPC\r\n";
        assert_eq!(remote_errno(traceback), Some(28));
        assert_eq!(classify_remote_error(traceback), RemoteErrorKind::Generic);
    }

    #[test]
    fn empty_stderr_is_generic() {
        assert_eq!(classify_remote_error(""), RemoteErrorKind::Generic);
    }

    #[test]
    fn summary_is_last_line() {
        let err = RemoteError::new(String::new(), ENOENT_TRACEBACK.to_string());
        assert_eq!(err.kind, RemoteErrorKind::NotFound);
        assert_eq!(err.summary(), "OSError: [Errno 2] ENOENT");
        assert_eq!(err.to_string(), "remote exception: OSError: [Errno 2] ENOENT");
    }
}
