//! Fan-out of job snapshots to registered listeners.
//!
//! Unlike a `tokio::sync::broadcast` channel the bus never drops events for a
//! slow consumer: callbacks run inline on the publishing task, and stream
//! subscribers get an unbounded queue of their own.

use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;

/// Handle returned by [`UpdateBus::on_update`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct BusInner<T> {
    listeners: RwLock<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> BusInner<T> {
    fn read(&self) -> RwLockReadGuard<'_, Vec<(ListenerId, Listener<T>)>> {
        match self.listeners.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Update bus lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<(ListenerId, Listener<T>)>> {
        match self.listeners.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Update bus lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}

/// Broadcasts events to every registered listener, in registration order.
pub struct UpdateBus<T> {
    inner: Arc<BusInner<T>>,
}

impl<T> Clone for UpdateBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> UpdateBus<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a callback that receives every event published from now on.
    pub fn on_update<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.write().push((id, Arc::new(listener)));
        id
    }

    /// Unregisters a callback. Returns false if the id was not registered.
    pub fn off_update(&self, id: ListenerId) -> bool {
        self.inner.remove(id)
    }

    /// Registers a callback that is unregistered when the guard is dropped.
    pub fn listen<F>(&self, listener: F) -> ListenerGuard<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.on_update(listener);
        ListenerGuard {
            bus: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Creates a stream receiving a copy of every event published from now on.
    pub fn subscribe(&self) -> UpdateStream<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let guard = self.listen(move |event: &T| {
            // Receiver gone means the stream is being dropped; its guard
            // removes this listener right after.
            let _ = sender.send(event.clone());
        });

        UpdateStream {
            receiver,
            _guard: guard,
        }
    }

    /// Delivers `event` to each listener in registration order.
    ///
    /// The listener list is copied before delivery, so listeners may register
    /// or unregister (themselves included) from inside a callback. A panicking
    /// listener is logged and skipped.
    pub fn publish(&self, event: &T) {
        let listeners: Vec<Listener<T>> = self
            .inner
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                log::error!("Update listener panicked; continuing delivery");
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.read().len()
    }
}

impl<T: Clone + Send + 'static> Default for UpdateBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Unregisters its listener on drop.
pub struct ListenerGuard<T> {
    bus: Weak<BusInner<T>>,
    id: ListenerId,
}

impl<T> ListenerGuard<T> {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl<T> Drop for ListenerGuard<T> {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}

/// Stream of published events. Ends once the bus itself is dropped.
pub struct UpdateStream<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    _guard: ListenerGuard<T>,
}

impl<T> UpdateStream<T> {
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Returns the next already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}

impl<T> Stream for UpdateStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_recv(cx)
    }
}
