use super::{EventPairer, Track};
use crate::events::{EventPair, NoteEvent, PedalEvent, RawEvent, TimePoint};
use crate::hooks::PlaybackHooks;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

type EventListener = Box<dyn Fn(&RawEvent) + Send + Sync>;

/// The live performance input: pairs incoming note and pedal events and stamps
/// them with the latest playback time.
///
/// Mutation happens only here, on the producer's thread. Readers go through
/// [`TimelineQuery`].
pub struct InputModel {
    notes: Arc<EventPairer<NoteEvent>>,
    pedals: Arc<EventPairer<PedalEvent>>,
    clock: Arc<AtomicI64>,
    listeners: RwLock<Vec<EventListener>>,
}

impl InputModel {
    pub fn new() -> Self {
        Self {
            notes: Arc::new(EventPairer::new()),
            pedals: Arc::new(EventPairer::new()),
            clock: Arc::new(AtomicI64::new(0)),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Clears both streams whenever a sequence is opened and follows the
    /// playback clock.
    pub fn attach(self: &Arc<Self>, hooks: &PlaybackHooks) {
        let input = Arc::clone(self);
        hooks.add_open_listener(move |_| input.clear());

        let input = Arc::clone(self);
        hooks.add_clock_listener(move |time| input.set_current_time(time));
    }

    pub fn set_current_time(&self, time: TimePoint) {
        self.clock.store(time, Ordering::Relaxed);
    }

    pub fn current_time(&self) -> TimePoint {
        self.clock.load(Ordering::Relaxed)
    }

    /// Entry point for a MIDI transport callback. The device timestamp is not
    /// used; events are stamped with the current playback time.
    pub fn receive_midi(&self, bytes: &[u8]) {
        match RawEvent::from_midi(bytes, self.current_time()) {
            Some(event) => self.push(event),
            None => debug!("Ignoring MIDI message {:02X?}", bytes),
        }
    }

    /// Applies an already recognized event, then forwards it to listeners.
    pub fn push(&self, event: RawEvent) {
        match event {
            RawEvent::Note(note) => self.notes.apply(note),
            RawEvent::Pedal(pedal) => self.pedals.apply(pedal),
        }

        for listener in self.listeners.read().iter() {
            listener(&event);
        }
    }

    /// Registers a callback invoked on the producer thread for every applied
    /// event.
    pub fn add_listener(&self, listener: impl Fn(&RawEvent) + Send + Sync + 'static) {
        self.listeners.write().push(Box::new(listener));
    }

    pub fn clear(&self) {
        self.notes.clear();
        self.pedals.clear();
    }

    pub fn timeline(&self) -> TimelineQuery {
        TimelineQuery {
            notes: Arc::clone(&self.notes),
            pedals: Arc::clone(&self.pedals),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl Default for InputModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view over the live note and pedal streams. Open events are
/// reported as pairs ending at the latest playback time.
#[derive(Clone)]
pub struct TimelineQuery {
    notes: Arc<EventPairer<NoteEvent>>,
    pedals: Arc<EventPairer<PedalEvent>>,
    clock: Arc<AtomicI64>,
}

impl TimelineQuery {
    pub fn get_note_pairs(&self, low: TimePoint, high: TimePoint) -> Vec<EventPair<NoteEvent>> {
        self.notes.get_pairs(low, high, self.now())
    }

    pub fn get_pedal_pairs(&self, low: TimePoint, high: TimePoint) -> Vec<EventPair<PedalEvent>> {
        self.pedals.get_pairs(low, high, self.now())
    }

    pub fn now(&self) -> TimePoint {
        self.clock.load(Ordering::Relaxed)
    }
}

impl Track for TimelineQuery {
    fn note_pairs(&self, low: TimePoint, high: TimePoint) -> Vec<EventPair<NoteEvent>> {
        self.get_note_pairs(low, high)
    }

    fn pedal_pairs(&self, low: TimePoint, high: TimePoint) -> Vec<EventPair<PedalEvent>> {
        self.get_pedal_pairs(low, high)
    }
}
