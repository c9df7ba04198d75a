use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;

/// Callback invoked with every chunk of bytes received from the device.
pub type DataCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Token returned by [`Transport::subscribe`], used to detach the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Raw numeric identifier, for diagnostics.
    pub fn id(self) -> u64 {
        self.0
    }
}

/// A byte-duplex connection to a device.
///
/// The protocol engine depends only on this contract. Writes are
/// fire-and-forget from the caller's point of view: implementations queue the
/// bytes and report failures they already know about. Received bytes are
/// pushed to every subscribed callback in arrival order.
pub trait Transport: Send + Sync {
    /// Queue `data` for transmission to the device.
    fn write(&self, data: &[u8]) -> Result<()>;

    /// Register a callback for received bytes.
    fn subscribe(&self, callback: DataCallback) -> SubscriptionHandle;

    /// Detach a callback. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn write(&self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn subscribe(&self, callback: DataCallback) -> SubscriptionHandle {
        (**self).subscribe(callback)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        (**self).unsubscribe(handle)
    }
}

/// Subscriber registry shared by transport implementations.
///
/// Callbacks are cloned out of the lock before being invoked, so a callback
/// may itself subscribe or unsubscribe without deadlocking.
#[derive(Default)]
pub struct Subscribers {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionHandle, DataCallback)>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback and return its handle.
    pub fn add(&self, callback: DataCallback) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((handle, callback));
        handle
    }

    /// Remove a callback. Returns `false` if the handle was not registered.
    pub fn remove(&self, handle: SubscriptionHandle) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(h, _)| *h != handle);
        entries.len() != before
    }

    /// Drop every registered callback.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a received chunk to every callback.
    pub fn dispatch(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let callbacks: Vec<DataCallback> = self.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback(data);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionHandle, DataCallback)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.len())
            .finish()
    }
}
