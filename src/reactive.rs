//! Current-value cells with fan-out to subscribers.
//!
//! A [`Subject`] always holds a value. Subscribing delivers that value first,
//! then every later value that differs from the one before it. Delivery goes
//! through unbounded channels so publishing never blocks.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

#[derive(Debug)]
pub struct Subject<T> {
    value: T,
    subscribers: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone + PartialEq> Subject<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = unbounded();
        // A fresh receiver is alive, so this cannot fail.
        let _ = tx.send(self.value.clone());
        self.subscribers.lock().push(tx);
        Subscription { rx }
    }

    /// Replaces the value. Returns `true` and notifies subscribers only if it changed.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        let current = &self.value;
        self.subscribers
            .get_mut()
            .retain(|tx| tx.send(current.clone()).is_ok());
        true
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// Receiving end of a [`Subject`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Next undelivered value, if any.
    pub fn try_next(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drains pending values and keeps only the newest.
    pub fn latest(&self) -> Option<T> {
        self.rx.try_iter().last()
    }

    pub fn pending(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }
}
