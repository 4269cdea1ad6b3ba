use super::{EventPairer, IntervalIndex};
use crate::events::{EventPair, NoteEvent, PedalEvent, RawEvent, TimePoint, TimedEvent};

/// Windowed access to the note and pedal pairs of one track.
pub trait Track: Send + Sync {
    fn note_pairs(&self, low: TimePoint, high: TimePoint) -> Vec<EventPair<NoteEvent>>;
    fn pedal_pairs(&self, low: TimePoint, high: TimePoint) -> Vec<EventPair<PedalEvent>>;
}

/// An immutable track built from a recorded list of events.
#[derive(Debug, Default)]
pub struct StaticTrack {
    notes: IntervalIndex<EventPair<NoteEvent>>,
    pedals: IntervalIndex<EventPair<PedalEvent>>,
}

impl StaticTrack {
    /// Pairs `events` in order. Events still open after the last one are
    /// closed at the latest timestamp seen.
    pub fn from_events(events: impl IntoIterator<Item = RawEvent>) -> Self {
        let notes = EventPairer::new();
        let pedals = EventPairer::new();
        let mut end = 0;

        for event in events {
            end = end.max(event.time());
            match event {
                RawEvent::Note(note) => notes.apply(note),
                RawEvent::Pedal(pedal) => pedals.apply(pedal),
            }
        }

        Self {
            notes: freeze(&notes, end),
            pedals: freeze(&pedals, end),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.pedals.is_empty()
    }
}

fn freeze<E: TimedEvent>(pairer: &EventPairer<E>, end: TimePoint) -> IntervalIndex<EventPair<E>> {
    let mut index = IntervalIndex::new();
    for pair in pairer.get_pairs(TimePoint::MIN, TimePoint::MAX, end) {
        index.insert(pair.on_time(), pair.off_time(), pair);
    }
    index
}

impl Track for StaticTrack {
    fn note_pairs(&self, low: TimePoint, high: TimePoint) -> Vec<EventPair<NoteEvent>> {
        self.notes.query_overlap(low, high).cloned().collect()
    }

    fn pedal_pairs(&self, low: TimePoint, high: TimePoint) -> Vec<EventPair<PedalEvent>> {
        self.pedals.query_overlap(low, high).cloned().collect()
    }
}
