use super::HistoryVisitor;
use crate::events::RawEvent;
use crate::timeline::StaticTrack;
use parking_lot::Mutex;

/// What the performer played while one sequence was open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedSession {
    pub name: String,
    pub events: Vec<RawEvent>,
}

impl RecordedSession {
    pub fn track(&self) -> StaticTrack {
        StaticTrack::from_events(self.events.iter().copied())
    }
}

/// Visitor that rebuilds past sessions from the history log, one per opened
/// sequence. Input logged before any sequence opens goes to an unnamed
/// session.
#[derive(Debug, Default)]
pub struct SessionRecorder {
    sessions: Mutex<Vec<RecordedSession>>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> Vec<RecordedSession> {
        self.sessions.lock().clone()
    }

    pub fn latest(&self) -> Option<RecordedSession> {
        self.sessions.lock().last().cloned()
    }
}

impl HistoryVisitor for SessionRecorder {
    fn on_sequence_opened(&self, name: &str) {
        self.sessions.lock().push(RecordedSession {
            name: name.to_string(),
            events: Vec::new(),
        });
    }

    fn on_input(&self, event: &RawEvent) {
        let mut sessions = self.sessions.lock();
        if sessions.is_empty() {
            sessions.push(RecordedSession::default());
        }
        if let Some(session) = sessions.last_mut() {
            session.events.push(*event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoteEvent;
    use crate::timeline::Track;

    #[test]
    fn test_splits_sessions_on_open() {
        let recorder = SessionRecorder::new();
        recorder.on_input(&RawEvent::Note(NoteEvent::on(0, 0, 60, 100)));
        recorder.on_sequence_opened("Minuet");
        recorder.on_input(&RawEvent::Note(NoteEvent::on(100, 0, 62, 100)));
        recorder.on_input(&RawEvent::Note(NoteEvent::off(900, 0, 62)));

        let sessions = recorder.sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].name, "");
        assert_eq!(sessions[1].name, "Minuet");

        let track = recorder.latest().unwrap().track();
        let notes = track.note_pairs(500, 500);
        assert_eq!(notes.len(), 1);
        assert_eq!((notes[0].on_time(), notes[0].off_time()), (100, 900));
    }
}
