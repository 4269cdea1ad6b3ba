use super::IntervalIndex;
use crate::events::{EventPair, TimePoint, TimedEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest a stream operation waits for the stream lock before giving up.
pub const LOCK_WAIT: Duration = Duration::from_millis(20);

/// Pairs the on/off events of one stream (notes or pedals) and answers
/// windowed queries over the resulting pairs.
///
/// The open-event table and the pair index sit behind a single lock, so every
/// operation on one pairer observes them as one unit. Two pairers never share
/// a lock.
#[derive(Debug)]
pub struct EventPairer<E: TimedEvent> {
    state: Mutex<PairerState<E>>,
}

#[derive(Debug)]
struct PairerState<E: TimedEvent> {
    open: HashMap<E::Slot, E>,
    pairs: IntervalIndex<EventPair<E>>,
}

impl<E: TimedEvent> EventPairer<E> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PairerState {
                open: HashMap::new(),
                pairs: IntervalIndex::new(),
            }),
        }
    }

    /// Routes `event` to [`on_event`](Self::on_event) or
    /// [`off_event`](Self::off_event).
    pub fn apply(&self, event: E) {
        if event.is_on() {
            self.on_event(event);
        } else {
            self.off_event(event);
        }
    }

    /// Opens the event's slot. An event already open on that slot is dropped.
    pub fn on_event(&self, event: E) {
        let Some(mut state) = self.state.try_lock_for(LOCK_WAIT) else {
            warn!("Stream lock busy, dropping on event {:?}", event);
            return;
        };
        if let Some(stale) = state.open.insert(event.slot(), event) {
            debug!("Slot {:?} was already open, superseding {:?}", stale.slot(), stale);
        }
    }

    /// Closes the event's slot and stores the finished pair. An off event with
    /// nothing open on its slot is dropped.
    pub fn off_event(&self, event: E) {
        let Some(mut state) = self.state.try_lock_for(LOCK_WAIT) else {
            warn!("Stream lock busy, dropping off event {:?}", event);
            return;
        };
        match state.open.remove(&event.slot()) {
            Some(on) => {
                let pair = EventPair::new(on, event);
                state.pairs.insert(pair.on_time(), pair.off_time(), pair);
            }
            None => debug!("Stray off event {:?}", event),
        }
    }

    /// Finished pairs overlapping `[low, high)`, followed by a synthetic pair
    /// ending at `now` for every slot still open.
    ///
    /// Returns an empty list if the stream lock cannot be taken in time.
    pub fn get_pairs(&self, low: TimePoint, high: TimePoint, now: TimePoint) -> Vec<EventPair<E>> {
        let Some(state) = self.state.try_lock_for(LOCK_WAIT) else {
            warn!("Stream lock busy, skipping query [{}, {})", low, high);
            return Vec::new();
        };

        let mut result: Vec<EventPair<E>> = state.pairs.query_overlap(low, high).cloned().collect();

        let first_open = result.len();
        result.extend(
            state
                .open
                .values()
                .map(|on| EventPair::new(on.clone(), on.closed_at(now))),
        );
        result[first_open..].sort_by_key(|pair| pair.on_time());

        result
    }

    /// Forgets every open event and every finished pair.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.open.clear();
        state.pairs.clear();
    }

    #[cfg(test)]
    fn open_count(&self) -> usize {
        self.state.lock().open.len()
    }
}

impl<E: TimedEvent> Default for EventPairer<E> {
    fn default() -> Self {
        Self::new()
    }
}
