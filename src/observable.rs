//! Single-slot broadcast cells.
//!
//! An [`Observable`] keeps only the latest published value. Subscribers get
//! that value immediately on attach and every later publish after that.
//! The cell holds observers weakly: dropping the [`Subscription`] detaches
//! the observer and later publishes skip it.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;

type Observer<T> = dyn Fn(&T) + Send + Sync;

struct Slot<T> {
    value: Option<T>,
    observers: Vec<Weak<Observer<T>>>,
}

pub struct Observable<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps an observer attached for as long as it lives.
#[must_use = "dropping a subscription detaches the observer"]
pub struct Subscription<T> {
    _observer: Arc<Observer<T>>,
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                value: None,
                observers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // A panicking observer must not wedge every other subscriber.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Overwrite the slot and notify every attached observer.
    ///
    /// Observers run on the publishing task while the slot is locked, so an
    /// observer must not publish to or subscribe on the same cell.
    pub fn publish(&self, value: T) {
        let mut slot = self.lock();
        slot.observers.retain(|weak| weak.strong_count() > 0);
        for observer in slot.observers.iter().filter_map(Weak::upgrade) {
            observer(&value);
        }
        slot.value = Some(value);
    }

    /// Attach an observer, replaying the current value if there is one.
    pub fn subscribe<F>(&self, observer: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let observer: Arc<Observer<T>> = Arc::new(observer);
        let mut slot = self.lock();
        if let Some(value) = &slot.value {
            observer(value);
        }
        slot.observers.push(Arc::downgrade(&observer));
        Subscription {
            _observer: observer,
        }
    }

    /// Subscribe through a channel so a foreground loop can drain values
    /// on its own schedule.
    pub fn subscribe_channel(&self) -> Receiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |value: &T| {
            let _ = tx.send(value.clone());
        });
        Receiver {
            rx,
            _subscription: subscription,
        }
    }

    pub fn get(&self) -> Option<T> {
        self.lock().value.clone()
    }

    #[allow(dead_code)]
    pub fn subscriber_count(&self) -> usize {
        self.lock()
            .observers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

/// Channel end of a subscription. Dropping it detaches the observer.
pub struct Receiver<T> {
    rx: mpsc::UnboundedReceiver<T>,
    _subscription: Subscription<T>,
}

impl<T> Receiver<T> {
    #[allow(dead_code)]
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drain everything queued and keep only the newest value.
    pub fn latest(&mut self) -> Option<T> {
        let mut latest = None;
        while let Ok(value) = self.rx.try_recv() {
            latest = Some(value);
        }
        latest
    }
}
