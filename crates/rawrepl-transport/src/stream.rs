use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TransportError};
use crate::serial::SerialConfig;
#[cfg(unix)]
use crate::serial::SerialPort;
use crate::traits::{DataCallback, SubscriptionHandle, Subscribers, Transport};

const READ_CHUNK_SIZE: usize = 4 * 1024;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

type FailureSlot = Arc<Mutex<Option<std::io::Error>>>;

/// Transport over any tokio byte stream.
///
/// A reader task forwards received chunks to subscribers and a writer task
/// drains queued writes, so [`Transport::write`] never blocks. An I/O failure
/// on either side closes the transport; a write failure is reported by the
/// next call to `write`.
pub struct StreamTransport {
    label: String,
    subscribers: Arc<Subscribers>,
    outgoing: mpsc::UnboundedSender<Bytes>,
    failure: FailureSlot,
    cancel: CancellationToken,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl StreamTransport {
    /// Wrap an already-open stream. Must be called from within a tokio runtime.
    pub fn from_stream<S>(stream: S, label: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let label = label.into();
        let (reader, writer) = tokio::io::split(stream);
        let subscribers = Arc::new(Subscribers::new());
        let failure: FailureSlot = Arc::new(Mutex::new(None));
        let cancel = CancellationToken::new();
        let (outgoing, queued) = mpsc::unbounded_channel();

        tokio::spawn(read_loop(
            reader,
            Arc::clone(&subscribers),
            Arc::clone(&failure),
            cancel.clone(),
        ));
        let writer = tokio::spawn(write_loop(
            writer,
            queued,
            Arc::clone(&failure),
            cancel.clone(),
        ));

        debug!(%label, "stream transport started");

        Self {
            label,
            subscribers,
            outgoing,
            failure,
            cancel,
            writer: Mutex::new(Some(writer)),
        }
    }

    /// Open a serial device node (e.g. `/dev/ttyACM0`) with its line settings
    /// left as they are.
    pub async fn open_device(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_serial(path, &SerialConfig::default()).await
    }

    /// Open a serial device node, applying `config` first.
    #[cfg(unix)]
    pub async fn open_serial(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref();
        let port = SerialPort::open(path, config).map_err(|source| TransportError::Connect {
            target: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), baud = ?config.baud_rate, "opened serial device");
        Ok(Self::from_stream(port, path.display().to_string()))
    }

    #[cfg(not(unix))]
    pub async fn open_serial(_path: impl AsRef<Path>, _config: &SerialConfig) -> Result<Self> {
        Err(TransportError::Unsupported(
            "serial device nodes; use a TCP serial bridge",
        ))
    }

    /// Connect to a TCP serial bridge (e.g. ser2net, ESP telnet bridge).
    pub async fn connect_tcp(addr: &str) -> Result<Self> {
        let stream = tokio::net::TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect {
                target: addr.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;
        info!(%addr, "connected to tcp serial bridge");
        Ok(Self::from_stream(stream, addr))
    }

    /// Connect to a Unix domain socket exposing the device stream.
    #[cfg(unix)]
    pub async fn connect_unix(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = tokio::net::UnixStream::connect(path)
            .await
            .map_err(|source| TransportError::Connect {
                target: path.display().to_string(),
                source,
            })?;
        info!(path = %path.display(), "connected to unix domain socket");
        Ok(Self::from_stream(stream, path.display().to_string()))
    }

    /// Stop both I/O tasks and detach every subscriber.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!(label = %self.label, "closing stream transport");
        }
        self.cancel.cancel();
        self.subscribers.clear();
    }

    /// Close the transport once the writes queued so far have been flushed.
    ///
    /// Waits at most one second for a stalled stream.
    pub async fn shutdown(&self) {
        self.close();
        let writer = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(writer) = writer else { return };
        match tokio::time::timeout(SHUTDOWN_GRACE, writer).await {
            Ok(Ok(())) => debug!(label = %self.label, "stream transport shut down"),
            Ok(Err(err)) => warn!(error = %err, "writer task failed"),
            Err(_) => warn!(label = %self.label, "pending writes abandoned"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Human-readable description of the underlying stream.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Transport for StreamTransport {
    fn write(&self, data: &[u8]) -> Result<()> {
        if let Some(err) = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(TransportError::Io(err));
        }
        if self.cancel.is_cancelled() {
            return Err(TransportError::Closed);
        }
        trace!(len = data.len(), "queue write");
        self.outgoing
            .send(Bytes::copy_from_slice(data))
            .map_err(|_| TransportError::Closed)
    }

    fn subscribe(&self, callback: DataCallback) -> SubscriptionHandle {
        self.subscribers.add(callback)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.subscribers.remove(handle);
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTransport")
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn read_loop<R>(
    mut reader: R,
    subscribers: Arc<Subscribers>,
    failure: FailureSlot,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let read = tokio::select! {
            () = cancel.cancelled() => break,
            read = reader.read(&mut buf) => read,
        };
        match read {
            Ok(0) => {
                debug!("stream closed by peer");
                break;
            }
            Ok(n) => {
                trace!(len = n, "received chunk");
                subscribers.dispatch(&buf[..n]);
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(error = %err, "stream read failed");
                *failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
                break;
            }
        }
    }
    cancel.cancel();
    subscribers.clear();
}

async fn write_loop<W>(
    mut writer: W,
    mut queued: mpsc::UnboundedReceiver<Bytes>,
    failure: FailureSlot,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let chunk = tokio::select! {
            () = cancel.cancelled() => break,
            chunk = queued.recv() => chunk,
        };
        let Some(chunk) = chunk else { break };

        let written = async {
            writer.write_all(&chunk).await?;
            writer.flush().await
        }
        .await;

        if let Err(err) = written {
            warn!(error = %err, "stream write failed");
            *failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
            cancel.cancel();
            return;
        }
    }

    // Writes queued before the close still go out.
    while let Ok(chunk) = queued.try_recv() {
        if writer.write_all(&chunk).await.is_err() {
            break;
        }
    }
    let _ = writer.flush().await;
    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn writes_reach_the_peer() {
        let (local, mut remote) = tokio::io::duplex(256);
        let transport = StreamTransport::from_stream(local, "duplex");

        transport.write(b"\r\x01").unwrap();
        transport.write(b"print(1)").unwrap();

        let mut buf = vec![0u8; 10];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"\r\x01print(1)");
    }

    #[tokio::test]
    async fn received_bytes_are_dispatched() {
        let (local, mut remote) = tokio::io::duplex(256);
        let transport = StreamTransport::from_stream(local, "duplex");

        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.subscribe(Arc::new(move |data: &[u8]| {
            let _ = tx.send(data.to_vec());
        }));

        remote.write_all(b"soft reboot\r\n").await.unwrap();

        let mut received = Vec::new();
        while received.len() < 13 {
            let chunk = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("chunk should arrive")
                .expect("channel open");
            received.extend_from_slice(&chunk);
        }
        assert_eq!(received, b"soft reboot\r\n");
    }

    #[tokio::test]
    async fn close_rejects_writes_and_clears_subscribers() {
        let (local, _remote) = tokio::io::duplex(64);
        let transport = StreamTransport::from_stream(local, "duplex");
        transport.subscribe(Arc::new(|_: &[u8]| {}));

        transport.close();

        assert!(transport.is_closed());
        assert!(matches!(transport.write(b"x"), Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn shutdown_flushes_queued_writes() {
        let (local, mut remote) = tokio::io::duplex(256);
        let transport = StreamTransport::from_stream(local, "duplex");

        transport.write(b"x = 1").unwrap();
        transport.write(b"\r\x02").unwrap();
        transport.shutdown().await;

        let mut received = Vec::new();
        remote.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"x = 1\r\x02");
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn peer_hangup_closes_transport() {
        let (local, remote) = tokio::io::duplex(64);
        let transport = StreamTransport::from_stream(local, "duplex");
        drop(remote);

        tokio::time::timeout(Duration::from_secs(1), async {
            while !transport.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("transport should observe hangup");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn serial_node_takes_writes_while_device_is_silent() {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        // A FIFO stands in for a board that says nothing until spoken to.
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("ttyFAKE0");
        let c_path = CString::new(node.as_os_str().as_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) }, 0);

        let transport = StreamTransport::open_device(&node).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.subscribe(Arc::new(move |data: &[u8]| {
            let _ = tx.send(data.to_vec());
        }));

        // Let the reader park on the empty node first.
        tokio::time::sleep(Duration::from_millis(100)).await;
        transport.write(b"\r\x03").unwrap();

        let mut received = Vec::new();
        while received.len() < 2 {
            let chunk = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("interrupt should reach the node")
                .expect("channel open");
            received.extend_from_slice(&chunk);
        }
        assert_eq!(received, b"\r\x03");

        transport.shutdown().await;
        assert!(transport.is_closed());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_device_node_reports_target() {
        let err = StreamTransport::open_device("/dev/rawrepl-no-such-tty")
            .await
            .unwrap_err();
        assert!(
            matches!(err, TransportError::Connect { ref target, .. } if target == "/dev/rawrepl-no-such-tty")
        );
    }

    #[tokio::test]
    async fn connect_tcp_reports_target_on_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = StreamTransport::connect_tcp(&addr).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { ref target, .. } if *target == addr));
    }
}
