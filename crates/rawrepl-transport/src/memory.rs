use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{DataCallback, SubscriptionHandle, Subscribers, Transport};

type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

/// In-process transport backed by memory.
///
/// Every write is recorded. An optional responder sees each write and returns
/// the chunks the simulated device sends back; those are delivered to
/// subscribers synchronously, one dispatch per chunk, so tests can model
/// replies split across arbitrary boundaries.
#[derive(Default)]
pub struct MemoryTransport {
    subscribers: Subscribers,
    written: Mutex<Vec<Vec<u8>>>,
    responder: Mutex<Option<Responder>>,
    closed: AtomicBool,
}

impl MemoryTransport {
    /// Create a transport that records writes and never answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport answering each write through `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        let transport = Self::new();
        transport.set_responder(responder);
        transport
    }

    /// Replace the responder.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        *self
            .responder
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(responder));
    }

    /// Push bytes to subscribers as if the device had sent them.
    pub fn inject(&self, data: &[u8]) {
        trace!(len = data.len(), "memory transport inject");
        self.subscribers.dispatch(data);
    }

    /// Every write performed so far, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All written bytes concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.writes().concat()
    }

    /// Number of writes exactly equal to `data`.
    pub fn count_writes(&self, data: &[u8]) -> usize {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|w| w.as_slice() == data)
            .count()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Close the transport: later writes fail and subscribers are dropped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Transport for MemoryTransport {
    fn write(&self, data: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        trace!(len = data.len(), "memory transport write");
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data.to_vec());

        let replies = match self
            .responder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            Some(responder) => responder(data),
            None => Vec::new(),
        };

        for reply in replies {
            self.subscribers.dispatch(&reply);
        }
        Ok(())
    }

    fn subscribe(&self, callback: DataCallback) -> SubscriptionHandle {
        self.subscribers.add(callback)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.subscribers.remove(handle);
    }
}

impl fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("subscribers", &self.subscribers)
            .field("closed", &self.is_closed())
            .finish()
    }
}
