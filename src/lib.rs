//! Pairs live note and pedal events into timed intervals and lights the keys
//! of a lighted keyboard ahead of the song.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod hooks;
pub mod lighting;
pub mod sequence;
pub mod timeline;

pub use config::{Config, LookaheadConfig};
pub use engine::{EngineCommand, EngineHandle, EngineUpdate, spawn_engine};
pub use error::{Error, Result};
pub use events::{EventKind, EventPair, NoteEvent, PedalEvent, RawEvent, TimePoint, TimedEvent};
pub use hooks::PlaybackHooks;
pub use sequence::ParsedSequence;
