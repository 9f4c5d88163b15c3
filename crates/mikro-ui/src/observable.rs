//! A value with change notification.
//!
//! [`Subject`] follows the store contract of reactive UI frameworks:
//! subscribing calls back immediately with the current value, and later
//! callbacks fire only when the value actually changes.

use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, ReentrantMutex, RwLock};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Entry<T> {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Callback<T>,
}

struct Inner<T> {
    value: RwLock<T>,
    subscribers: Mutex<Vec<Entry<T>>>,
    next_id: AtomicU64,
    // Serializes notification rounds; reentrant so callbacks may set.
    emit: ReentrantMutex<()>,
}

impl<T> Inner<T> {
    fn remove(&self, id: u64) {
        self.subscribers.lock().retain(|e| e.id != id);
    }
}

/// Shared observable value. Clones share the value and subscribers.
pub struct Subject<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("value", &*self.inner.value.read())
            .field("subscribers", &self.inner.subscribers.lock().len())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + Send + Sync + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Subject<T> {
    /// Subject holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(initial),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                emit: ReentrantMutex::new(()),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Replace the value, notifying subscribers if it changed.
    ///
    /// Returns whether the value changed. Callbacks run on the calling
    /// thread before this returns.
    pub fn set(&self, value: T) -> bool {
        let _emit = self.inner.emit.lock();
        {
            let mut current = self.inner.value.write();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.notify(&value);
        true
    }

    /// Apply `f` to a copy of the value and store the result.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let _emit = self.inner.emit.lock();
        let next = f(&self.get());
        self.set(next)
    }

    /// Register `callback`. It runs once right away with the current value,
    /// then after every change until the [`Subscription`] is dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let _emit = self.inner.emit.lock();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        let callback: Callback<T> = Arc::new(callback);

        self.inner.subscribers.lock().push(Entry {
            id,
            active: Arc::clone(&active),
            callback: Arc::clone(&callback),
        });

        let current = self.get();
        callback(&current);

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            active,
            remove: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.remove(id);
                }
            })),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    fn notify(&self, value: &T) {
        let snapshot: Vec<(Arc<AtomicBool>, Callback<T>)> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|e| (Arc::clone(&e.active), Arc::clone(&e.callback)))
            .collect();

        for (active, callback) in snapshot {
            // A callback earlier in this round may have unsubscribed it.
            if active.load(Ordering::Acquire) {
                callback(value);
            }
        }
    }
}

/// Keeps a callback registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    active: Arc<AtomicBool>,
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Stop receiving notifications.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Whether the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn release(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
