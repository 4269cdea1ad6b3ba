use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Microseconds since the start of the loaded sequence.
pub type TimePoint = i64;

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const CONTROL_CHANGE: u8 = 0xB0;

pub const SUSTAIN_PEDAL: u8 = 64;
pub const SOSTENUTO_PEDAL: u8 = 66;
pub const SOFT_PEDAL: u8 = 67;

/// Controller values at or above this threshold hold a pedal down.
const PEDAL_ON_THRESHOLD: u8 = 64;

/// An on/off event that can be paired with its counterpart on the same slot.
pub trait TimedEvent: Clone + Debug + Send + Sync + 'static {
    type Slot: Copy + Eq + Hash + Debug + Send + Sync;

    fn slot(&self) -> Self::Slot;
    fn time(&self) -> TimePoint;
    fn is_on(&self) -> bool;

    /// Same event, moved to `time`.
    fn with_time(&self, time: TimePoint) -> Self;

    /// The "off" event that would terminate this event at `time`.
    fn closed_at(&self, time: TimePoint) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteSlot {
    pub channel: u8,
    pub key: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PedalSlot {
    pub channel: u8,
    pub controller: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub time: TimePoint,
    pub channel: u8,
    pub key: u8,
    pub velocity: u8,
    pub on: bool,
}

impl NoteEvent {
    pub fn on(time: TimePoint, channel: u8, key: u8, velocity: u8) -> Self {
        Self {
            time,
            channel,
            key,
            velocity,
            on: true,
        }
    }

    pub fn off(time: TimePoint, channel: u8, key: u8) -> Self {
        Self {
            time,
            channel,
            key,
            velocity: 0,
            on: false,
        }
    }
}

impl TimedEvent for NoteEvent {
    type Slot = NoteSlot;

    fn slot(&self) -> NoteSlot {
        NoteSlot {
            channel: self.channel,
            key: self.key,
        }
    }

    fn time(&self) -> TimePoint {
        self.time
    }

    fn is_on(&self) -> bool {
        self.on
    }

    fn with_time(&self, time: TimePoint) -> Self {
        Self { time, ..*self }
    }

    fn closed_at(&self, time: TimePoint) -> Self {
        Self::off(time, self.channel, self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedalEvent {
    pub time: TimePoint,
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

impl PedalEvent {
    pub fn new(time: TimePoint, channel: u8, controller: u8, value: u8) -> Self {
        Self {
            time,
            channel,
            controller,
            value,
        }
    }
}

impl TimedEvent for PedalEvent {
    type Slot = PedalSlot;

    fn slot(&self) -> PedalSlot {
        PedalSlot {
            channel: self.channel,
            controller: self.controller,
        }
    }

    fn time(&self) -> TimePoint {
        self.time
    }

    fn is_on(&self) -> bool {
        self.value >= PEDAL_ON_THRESHOLD
    }

    fn with_time(&self, time: TimePoint) -> Self {
        Self { time, ..*self }
    }

    fn closed_at(&self, time: TimePoint) -> Self {
        Self::new(time, self.channel, self.controller, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Note,
    Pedal,
}

/// A single event from a performance input, before pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawEvent {
    Note(NoteEvent),
    Pedal(PedalEvent),
}

impl RawEvent {
    /// Recognizes note and pedal events in a raw MIDI message. Every other
    /// message yields `None`.
    pub fn from_midi(bytes: &[u8], time: TimePoint) -> Option<Self> {
        let &[status, data1, data2, ..] = bytes else {
            return None;
        };
        if data1 > 0x7F || data2 > 0x7F {
            return None;
        }

        let channel = status & 0x0F;
        match status & 0xF0 {
            NOTE_ON if data2 > 0 => Some(RawEvent::Note(NoteEvent::on(time, channel, data1, data2))),
            NOTE_ON | NOTE_OFF => Some(RawEvent::Note(NoteEvent::off(time, channel, data1))),
            CONTROL_CHANGE if matches!(data1, SUSTAIN_PEDAL | SOSTENUTO_PEDAL | SOFT_PEDAL) => {
                Some(RawEvent::Pedal(PedalEvent::new(time, channel, data1, data2)))
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            RawEvent::Note(_) => EventKind::Note,
            RawEvent::Pedal(_) => EventKind::Pedal,
        }
    }

    pub fn time(&self) -> TimePoint {
        match self {
            RawEvent::Note(e) => e.time,
            RawEvent::Pedal(e) => e.time,
        }
    }

    pub fn is_on(&self) -> bool {
        match self {
            RawEvent::Note(e) => e.is_on(),
            RawEvent::Pedal(e) => e.is_on(),
        }
    }
}

/// A matched on/off pair. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPair<E> {
    on: E,
    off: E,
}

impl<E: TimedEvent> EventPair<E> {
    /// An `off` earlier than `on` is moved up to `on`, so durations are never
    /// negative.
    pub fn new(on: E, off: E) -> Self {
        let off = if off.time() < on.time() {
            off.with_time(on.time())
        } else {
            off
        };
        Self { on, off }
    }

    pub fn on(&self) -> &E {
        &self.on
    }

    pub fn off(&self) -> &E {
        &self.off
    }

    pub fn on_time(&self) -> TimePoint {
        self.on.time()
    }

    pub fn off_time(&self) -> TimePoint {
        self.off.time()
    }

    pub fn duration(&self) -> TimePoint {
        self.off_time() - self.on_time()
    }
}

impl EventPair<NoteEvent> {
    pub fn key(&self) -> u8 {
        self.off.key
    }
}
