//! Subscription points for the playback lifecycle.
//!
//! The clock and the sequence loader live outside this crate; they publish
//! through [`PlaybackHooks`] and every component subscribes here instead of
//! holding a reference to its owner.

use crate::events::TimePoint;
use crate::sequence::ParsedSequence;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::debug;

type OpenListener = Arc<dyn Fn(&Arc<ParsedSequence>) + Send + Sync>;
type ClockListener = Arc<dyn Fn(TimePoint) + Send + Sync>;
type Closeable = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct PlaybackHooks {
    open_listeners: RwLock<Vec<OpenListener>>,
    clock_listeners: RwLock<Vec<ClockListener>>,
    closeables: Mutex<Vec<Closeable>>,
}

impl PlaybackHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_open_listener(&self, listener: impl Fn(&Arc<ParsedSequence>) + Send + Sync + 'static) {
        self.open_listeners.write().push(Arc::new(listener));
    }

    pub fn add_clock_listener(&self, listener: impl Fn(TimePoint) + Send + Sync + 'static) {
        self.clock_listeners.write().push(Arc::new(listener));
    }

    /// Registers cleanup to run on [`close`](Self::close).
    pub fn add_closeable(&self, closeable: impl FnOnce() + Send + 'static) {
        self.closeables.lock().push(Box::new(closeable));
    }

    /// Notifies open listeners in registration order, on the calling thread.
    pub fn open_sequence(&self, sequence: Arc<ParsedSequence>) {
        debug!("Opening sequence {:?}", sequence);
        let listeners = self.open_listeners.read().clone();
        for listener in listeners {
            listener(&sequence);
        }
    }

    /// Notifies clock listeners in registration order, on the calling thread.
    pub fn advance_clock(&self, time: TimePoint) {
        let listeners = self.clock_listeners.read().clone();
        for listener in listeners {
            listener(time);
        }
    }

    /// Runs registered cleanup once, most recent first.
    pub fn close(&self) {
        let closeables = std::mem::take(&mut *self.closeables.lock());
        for closeable in closeables.into_iter().rev() {
            closeable();
        }
    }
}

impl Drop for PlaybackHooks {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn test_clock_listeners_in_order() {
        let hooks = PlaybackHooks::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let log = Arc::clone(&log);
            hooks.add_clock_listener(move |time| log.lock().push((id, time)));
        }
        hooks.advance_clock(42);

        assert_eq!(*log.lock(), vec![(0, 42), (1, 42), (2, 42)]);
    }

    #[test]
    fn test_listener_may_subscribe_while_notified() {
        let hooks = Arc::new(PlaybackHooks::new());
        let inner = Arc::clone(&hooks);
        let last = Arc::new(AtomicI64::new(-1));
        let seen = Arc::clone(&last);

        hooks.add_open_listener(move |_| {
            let seen = Arc::clone(&seen);
            inner.add_clock_listener(move |time| seen.store(time, Ordering::SeqCst));
        });
        hooks.open_sequence(Arc::new(ParsedSequence::empty()));
        hooks.advance_clock(7);

        assert_eq!(last.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_close_runs_once_in_reverse() {
        let order = Arc::new(Mutex::new(Vec::new()));
        {
            let hooks = PlaybackHooks::new();
            for id in 0..3 {
                let order = Arc::clone(&order);
                hooks.add_closeable(move || order.lock().push(id));
            }
            hooks.close();
        }

        assert_eq!(*order.lock(), vec![2, 1, 0]);
    }
}
