use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

use super::SerialConfig;

/// A non-blocking serial device node.
#[derive(Debug)]
pub struct SerialPort {
    fd: AsyncFd<File>,
}

impl SerialPort {
    /// Open `path` read/write without becoming its controlling terminal.
    /// Must be called from within a tokio runtime.
    pub fn open(path: &Path, config: &SerialConfig) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
            .open(path)?;

        if let Some(baud) = config.baud_rate {
            set_raw_line(file.as_raw_fd(), baud)?;
            debug!(path = %path.display(), baud, "serial line configured");
        }

        Ok(Self {
            fd: AsyncFd::new(file)?,
        })
    }
}

impl AsyncRead for SerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.fd.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| {
                let mut file = inner.get_ref();
                file.read(unfilled)
            }) {
                Ok(Ok(n)) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(err)) => return Poll::Ready(Err(err)),
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsyncWrite for SerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = ready!(self.fd.poll_write_ready(cx))?;
            match guard.try_io(|inner| {
                let mut file = inner.get_ref();
                file.write(data)
            }) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Map a numeric baud rate to its termios constant.
fn speed_for(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}

/// Raw 8N1 line at `baud`, receiver enabled, modem control lines ignored.
fn set_raw_line(fd: RawFd, baud: u32) -> io::Result<()> {
    let speed = speed_for(baud).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported baud rate: {baud}"),
        )
    })?;

    let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
    // SAFETY: fd is an open descriptor and termios points to writable storage.
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: tcgetattr succeeded, so the struct is initialized.
    let mut termios = unsafe { termios.assume_init() };

    // SAFETY: termios is a valid, initialized struct owned by this frame.
    unsafe {
        libc::cfmakeraw(&mut termios);
        if libc::cfsetispeed(&mut termios, speed) != 0
            || libc::cfsetospeed(&mut termios, speed) != 0
        {
            return Err(io::Error::last_os_error());
        }
    }
    termios.c_cflag |= libc::CLOCAL | libc::CREAD;

    // SAFETY: fd is open and termios is fully initialized.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_baud_rates_are_supported() {
        assert_eq!(speed_for(115200), Some(libc::B115200));
        assert_eq!(speed_for(9600), Some(libc::B9600));
        assert_eq!(speed_for(12345), None);
    }

    #[tokio::test]
    async fn line_settings_need_a_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notatty");
        std::fs::write(&path, b"").unwrap();

        let config = SerialConfig {
            baud_rate: Some(115200),
        };
        assert!(SerialPort::open(&path, &config).is_err());
    }

    #[tokio::test]
    async fn unsupported_baud_rate_is_invalid_input() {
        let config = SerialConfig {
            baud_rate: Some(12345),
        };
        let err = SerialPort::open(Path::new("/dev/null"), &config).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
