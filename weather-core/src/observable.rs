//! Observable state: a current value plus an ordered stream of changes.

use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct Observable<T> {
    current: Mutex<T>,
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { current: Mutex::new(initial), tx }
    }

    pub fn get(&self) -> T {
        self.current.lock().clone()
    }

    pub fn set(&self, value: T) {
        let mut current = self.current.lock();
        *current = value.clone();
        // no subscribers is fine
        let _ = self.tx.send(value);
    }

    /// Publish `value` only if `pred` holds for the current value, as one step.
    pub fn set_if(&self, pred: impl FnOnce(&T) -> bool, value: T) -> bool {
        let mut current = self.current.lock();
        if !pred(&*current) {
            return false;
        }
        *current = value.clone();
        let _ = self.tx.send(value);
        true
    }

    /// New subscribers see the latest value first, then every later change.
    pub fn subscribe(&self) -> Subscription<T> {
        let current = self.current.lock();
        Subscription { pending: Some(current.clone()), rx: self.tx.subscribe() }
    }
}

/// Values are buffered per subscriber up to a fixed capacity. A subscriber
/// that falls further behind loses the oldest unread values and resumes at
/// the oldest one still buffered.
#[derive(Debug)]
pub struct Subscription<T> {
    pending: Option<T>,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Waits for the next value; `None` once the observable is gone.
    pub async fn next(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "observer fell behind, skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::next`].
    pub fn try_next(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "observer fell behind, skipping ahead");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Everything published so far that this subscriber has not seen yet.
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
