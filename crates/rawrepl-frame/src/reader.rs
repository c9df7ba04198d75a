use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rawrepl_transport::{SubscriptionHandle, Transport};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, trace};

use crate::error::{FrameError, Result};
use crate::queue::ByteQueue;

/// Incremental consumer of device output.
///
/// Invoked with the full queued content each time new bytes arrive.
pub type DataSink<'a> = dyn FnMut(&[u8]) + Send + 'a;

/// How a [`ReplReader::read_until`] call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The pattern was found; holds everything up to and including it.
    Matched(Bytes),
    /// The timeout elapsed first; holds whatever had been queued.
    TimedOut(Bytes),
}

impl ReadOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, ReadOutcome::Matched(_))
    }

    pub fn bytes(&self) -> &Bytes {
        match self {
            ReadOutcome::Matched(bytes) | ReadOutcome::TimedOut(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            ReadOutcome::Matched(bytes) | ReadOutcome::TimedOut(bytes) => bytes,
        }
    }
}

/// Reads pattern-delimited output from a transport.
///
/// Subscribes to the transport when attached and unsubscribes on drop.
/// Bytes received between calls stay queued for the next call. Taking
/// `&mut self` for every read guarantees a single pending read.
pub struct ReplReader<T: Transport> {
    transport: Arc<T>,
    subscription: SubscriptionHandle,
    incoming: mpsc::UnboundedReceiver<Bytes>,
    queue: ByteQueue,
    closed: bool,
}

impl<T: Transport> ReplReader<T> {
    /// Subscribe to `transport` and start queueing its output.
    pub fn attach(transport: Arc<T>) -> Self {
        let (tx, incoming) = mpsc::unbounded_channel();
        let subscription = transport.subscribe(Arc::new(move |data: &[u8]| {
            let _ = tx.send(Bytes::copy_from_slice(data));
        }));
        trace!(subscription = subscription.id(), "reader attached");

        Self {
            transport,
            subscription,
            incoming,
            queue: ByteQueue::new(),
            closed: false,
        }
    }

    /// The transport this reader is attached to.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Bytes queued so far, including any that arrived since the last read.
    pub fn buffered(&mut self) -> &[u8] {
        self.absorb_pending();
        self.queue.as_bytes()
    }

    /// Drop everything queued so far and return it.
    pub fn discard(&mut self) -> Bytes {
        self.absorb_pending();
        self.queue.drain()
    }

    /// Wait until `pattern` appears in the device output or `timeout` elapses.
    ///
    /// On a match, everything up to and including the first occurrence is
    /// removed from the queue and returned; the rest stays queued. On timeout
    /// the whole queue is drained and returned. `on_data` sees the full queue
    /// content when the call starts and after every arrival, before matching.
    /// `min_bytes` only sizes the queue ahead of the read.
    pub async fn read_until(
        &mut self,
        min_bytes: usize,
        pattern: &[u8],
        timeout: Duration,
        mut on_data: Option<&mut DataSink<'_>>,
    ) -> Result<ReadOutcome> {
        self.queue.reserve(min_bytes);
        self.absorb_pending();

        if let Some(sink) = on_data.as_deref_mut() {
            sink(self.queue.as_bytes());
        }

        let overlap = pattern.len().saturating_sub(1);
        if let Some(found) = self.queue.take_through(pattern, 0) {
            trace!(pattern = %pattern.escape_ascii(), len = found.len(), "pattern already queued");
            return Ok(ReadOutcome::Matched(found));
        }
        if self.closed {
            return Err(self.disconnected());
        }
        let mut scanned = self.queue.len();

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                chunk = self.incoming.recv() => {
                    let Some(chunk) = chunk else {
                        self.closed = true;
                        return Err(self.disconnected());
                    };
                    self.queue.push(&chunk);

                    if let Some(sink) = on_data.as_deref_mut() {
                        sink(self.queue.as_bytes());
                    }

                    let from = scanned.saturating_sub(overlap);
                    if let Some(found) = self.queue.take_through(pattern, from) {
                        trace!(pattern = %pattern.escape_ascii(), len = found.len(), "pattern matched");
                        return Ok(ReadOutcome::Matched(found));
                    }
                    scanned = self.queue.len();
                }
                () = &mut deadline => {
                    let drained = self.queue.drain();
                    debug!(
                        pattern = %pattern.escape_ascii(),
                        ?timeout,
                        len = drained.len(),
                        "read_until timed out"
                    );
                    return Ok(ReadOutcome::TimedOut(drained));
                }
            }
        }
    }

    fn disconnected(&mut self) -> FrameError {
        let received = self.queue.drain();
        debug!(len = received.len(), "transport closed mid-read");
        FrameError::Disconnected { received }
    }

    fn absorb_pending(&mut self) {
        loop {
            match self.incoming.try_recv() {
                Ok(chunk) => self.queue.push(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
    }
}

impl<T: Transport> Drop for ReplReader<T> {
    fn drop(&mut self) {
        self.transport.unsubscribe(self.subscription);
        trace!(subscription = self.subscription.id(), "reader detached");
    }
}
