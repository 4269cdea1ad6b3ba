//! Integration tests for the history log: single-writer locking, replay
//! followed by live delivery, damaged files, and unregistration.

use keyglow::history::{HistoryLog, HistoryVisitor, LogRecord, SessionRecorder};
use keyglow::timeline::{InputModel, Track};
use keyglow::{NoteEvent, ParsedSequence, PlaybackHooks, RawEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::mpsc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
struct Collector {
    seen: Mutex<Vec<String>>,
}

impl HistoryVisitor for Collector {
    fn on_sequence_opened(&self, name: &str) {
        self.seen.lock().push(format!("open {}", name));
    }

    fn on_input(&self, event: &RawEvent) {
        self.seen.lock().push(format!("input {}", event.time()));
    }
}

fn note_on(time: i64) -> LogRecord {
    LogRecord::Input {
        event: RawEvent::Note(NoteEvent::on(time, 0, 60, 100)),
    }
}

#[test]
fn test_replay_then_live() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.log");

    {
        let history = HistoryLog::open(&path);
        assert!(history.is_enabled());
        history.append(&LogRecord::SequenceOpened { name: "Minuet".into() });
        history.append(&note_on(10));
    }

    let history = HistoryLog::open(&path);
    let collector = Arc::new(Collector::default());
    history.start_reading(collector.clone()).unwrap();
    assert_eq!(*collector.seen.lock(), vec!["open Minuet", "input 10"]);

    history.append(&note_on(20));
    assert_eq!(*collector.seen.lock(), vec!["open Minuet", "input 10", "input 20"]);
}

fn line(record: &LogRecord) -> Vec<u8> {
    let mut bytes = record.to_line().unwrap().into_bytes();
    bytes.push(b'\n');
    bytes
}

#[test]
fn test_replay_skips_unreadable_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.log");

    let mut contents = line(&note_on(1));
    contents.extend_from_slice(b"\xFF\xFE\n");
    contents.extend(line(&note_on(2)));
    contents.extend_from_slice(b"Input(event: Bogus)\n\n");
    contents.extend(line(&note_on(3)));
    std::fs::write(&path, contents).unwrap();

    let history = HistoryLog::open(&path);
    let collector = Arc::new(Collector::default());
    history.start_reading(collector.clone()).unwrap();
    assert_eq!(*collector.seen.lock(), vec!["input 1", "input 2", "input 3"]);

    history.append(&note_on(4));
    assert_eq!(collector.seen.lock().last().map(String::as_str), Some("input 4"));
}

#[test]
fn test_torn_tail_does_not_swallow_next_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.log");

    let mut contents = line(&note_on(1));
    let torn = line(&note_on(2));
    contents.extend_from_slice(&torn[..torn.len() / 2]);
    std::fs::write(&path, contents).unwrap();

    {
        let history = HistoryLog::open(&path);
        assert!(history.is_enabled());
        history.append(&note_on(3));
        history.append(&note_on(4));
    }

    let history = HistoryLog::open(&path);
    let collector = Arc::new(Collector::default());
    history.start_reading(collector.clone()).unwrap();
    assert_eq!(*collector.seen.lock(), vec!["input 1", "input 3", "input 4"]);

    history.append(&note_on(5));
    assert_eq!(collector.seen.lock().len(), 4);
}

#[test]
fn test_second_writer_is_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.log");

    let first = HistoryLog::open(&path);
    let second = HistoryLog::open(&path);
    assert!(first.is_enabled());
    assert!(!second.is_enabled());

    let collector = Arc::new(Collector::default());
    second.start_reading(collector.clone()).unwrap();
    second.append(&note_on(1));
    assert!(collector.seen.lock().is_empty());

    drop(first);
    assert!(HistoryLog::open(&path).is_enabled());
}

#[test]
fn test_unopenable_log_is_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let history = HistoryLog::open(&dir.path().join("missing").join("history.log"));

    assert!(!history.is_enabled());
    let collector = Arc::new(Collector::default());
    history.start_reading(collector.clone()).unwrap();
    history.append(&note_on(1));
    assert!(collector.seen.lock().is_empty());
}

#[test]
fn test_stop_reading_stops_delivery() {
    let dir = tempfile::tempdir().unwrap();
    let history = HistoryLog::open(&dir.path().join("history.log"));

    let collector = Arc::new(Collector::default());
    let visitor: Arc<dyn HistoryVisitor> = collector.clone();
    history.start_reading(visitor.clone()).unwrap();
    history.append(&note_on(1));
    history.stop_reading(&visitor);
    history.append(&note_on(2));

    assert_eq!(*collector.seen.lock(), vec!["input 1"]);
}

/// Unregisters itself from inside its first callback.
struct StopsItself {
    history: Arc<HistoryLog>,
    me: Mutex<Option<Arc<dyn HistoryVisitor>>>,
    calls: AtomicUsize,
}

impl HistoryVisitor for StopsItself {
    fn on_input(&self, _event: &RawEvent) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(me) = self.me.lock().take() {
            self.history.stop_reading(&me);
        }
    }
}

#[test]
fn test_stop_reading_mid_replay() {
    let dir = tempfile::tempdir().unwrap();
    let history = Arc::new(HistoryLog::open(&dir.path().join("history.log")));
    for time in 0..5 {
        history.append(&note_on(time));
    }

    let visitor = Arc::new(StopsItself {
        history: Arc::clone(&history),
        me: Mutex::new(None),
        calls: AtomicUsize::new(0),
    });
    let as_dyn: Arc<dyn HistoryVisitor> = visitor.clone();
    *visitor.me.lock() = Some(as_dyn.clone());

    history.start_reading(as_dyn).unwrap();
    history.append(&note_on(5));

    assert_eq!(visitor.calls.load(Ordering::SeqCst), 1);
}

/// Parks inside its first callback until released.
struct Parked {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
    calls: AtomicUsize,
}

impl HistoryVisitor for Parked {
    fn on_input(&self, _event: &RawEvent) {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.entered.lock().send(()).unwrap();
            self.release.lock().recv().unwrap();
        }
    }
}

#[test]
fn test_stop_reading_lets_running_callback_finish() {
    let dir = tempfile::tempdir().unwrap();
    let history = HistoryLog::open(&dir.path().join("history.log"));
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let parked = Arc::new(Parked {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
        calls: AtomicUsize::new(0),
    });
    let visitor: Arc<dyn HistoryVisitor> = parked.clone();
    history.start_reading(visitor.clone()).unwrap();

    std::thread::scope(|s| {
        let appender = s.spawn(|| history.append(&note_on(1)));
        entered_rx.recv().unwrap();

        // Returns while the callback is still parked.
        history.stop_reading(&visitor);
        release_tx.send(()).unwrap();
        appender.join().unwrap();
    });

    history.append(&note_on(2));
    assert_eq!(parked.calls.load(Ordering::SeqCst), 1);
}

/// Fails the test if two callbacks ever overlap.
#[derive(Default)]
struct Exclusive {
    busy: AtomicBool,
    calls: AtomicUsize,
}

impl HistoryVisitor for Exclusive {
    fn on_input(&self, _event: &RawEvent) {
        assert!(!self.busy.swap(true, Ordering::SeqCst), "callbacks overlapped");
        std::thread::yield_now();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.busy.store(false, Ordering::SeqCst);
    }
}

#[test]
fn test_callbacks_never_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let history = HistoryLog::open(&dir.path().join("history.log"));
    let first = Arc::new(Exclusive::default());
    let second = Arc::new(Exclusive::default());
    let shared: Arc<dyn HistoryVisitor> = first.clone();
    history.start_reading(Arc::clone(&shared)).unwrap();
    history.start_reading(second.clone()).unwrap();

    std::thread::scope(|s| {
        for thread in 0..4 {
            let history = &history;
            s.spawn(move || {
                for i in 0..100 {
                    history.append(&note_on(thread * 1_000 + i));
                }
            });
        }
    });

    assert_eq!(first.calls.load(Ordering::SeqCst), 400);
    assert_eq!(second.calls.load(Ordering::SeqCst), 400);
}

#[test]
fn test_input_is_recorded_and_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.log");

    {
        let hooks = PlaybackHooks::new();
        let input = Arc::new(InputModel::new());
        input.attach(&hooks);
        let history = HistoryLog::create(&path, &hooks, &input);
        assert!(history.is_enabled());

        hooks.open_sequence(Arc::new(ParsedSequence::new("Etude", Vec::new())));
        hooks.advance_clock(1_000);
        input.receive_midi(&[0x90, 60, 100]);
        hooks.advance_clock(250_000);
        input.receive_midi(&[0x80, 60, 0]);
        input.receive_midi(&[0xC0, 1, 0]);

        hooks.close();
        assert!(!history.is_enabled());
    }

    let history = HistoryLog::open(&path);
    let recorder = Arc::new(SessionRecorder::new());
    history.start_reading(recorder.clone()).unwrap();

    let session = recorder.latest().unwrap();
    assert_eq!(session.name, "Etude");
    assert_eq!(session.events.len(), 2);

    let notes = session.track().note_pairs(100_000, 100_000);
    assert_eq!(notes.len(), 1);
    assert_eq!((notes[0].on_time(), notes[0].off_time()), (1_000, 250_000));
}
