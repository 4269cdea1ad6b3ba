mod log;
mod record;
mod recorder;

pub use log::HistoryLog;
pub use record::LogRecord;
pub use recorder::{RecordedSession, SessionRecorder};

use crate::events::RawEvent;

/// Receives history records, first from the replayed log and then live.
pub trait HistoryVisitor: Send + Sync {
    fn on_sequence_opened(&self, _name: &str) {}

    fn on_input(&self, _event: &RawEvent) {}
}
