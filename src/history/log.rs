use super::{HistoryVisitor, LogRecord};
use crate::error::{Error, Result};
use crate::hooks::PlaybackHooks;
use crate::timeline::InputModel;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions, TryLockError};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// A log of everything the performer played.
///
/// Only one process may write the log. If the file cannot be opened or is
/// locked by another process, the history is disabled for the whole session:
/// every operation returns immediately and no visitor is ever called.
pub struct HistoryLog {
    writer: Option<LogWriter>,
}

struct LogWriter {
    /// Held while appending and notifying, and while replaying, so that no two
    /// visitor callbacks ever run at the same time.
    file: Mutex<Option<File>>,
    visitors: Mutex<Vec<Arc<Registration>>>,
}

struct Registration {
    visitor: Arc<dyn HistoryVisitor>,
    active: AtomicBool,
    /// Held from the `active` check until the callback returns.
    delivering: Mutex<()>,
}

impl HistoryLog {
    /// Opens the log at `path` and records every input event and opened
    /// sequence from then on. The file is released when `hooks` close.
    pub fn create(path: &Path, hooks: &PlaybackHooks, input: &InputModel) -> Arc<Self> {
        let history = Arc::new(Self::open(path));
        if !history.is_enabled() {
            return history;
        }

        let log = Arc::clone(&history);
        input.add_listener(move |event| log.append(&LogRecord::Input { event: *event }));

        let log = Arc::clone(&history);
        hooks.add_open_listener(move |sequence| {
            log.append(&LogRecord::SequenceOpened {
                name: sequence.name.clone(),
            })
        });

        let log = Arc::clone(&history);
        hooks.add_closeable(move || log.close());

        history
    }

    /// Opens the log at `path` without subscribing to anything.
    pub fn open(path: &Path) -> Self {
        match LogWriter::open(path) {
            Ok(writer) => {
                info!("Recording history to {}", path.display());
                Self {
                    writer: Some(writer),
                }
            }
            Err(e) => {
                warn!("History disabled for {}: {}", path.display(), e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { writer: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.writer
            .as_ref()
            .is_some_and(|writer| writer.file.lock().is_some())
    }

    /// Replays the existing log into `visitor` on the calling thread, then keeps
    /// forwarding new records to it from whichever thread appends them.
    ///
    /// Blocks until the replay is finished. Visitor callbacks never run
    /// concurrently with each other, and must not append to this log.
    pub fn start_reading(&self, visitor: Arc<dyn HistoryVisitor>) -> Result<()> {
        let Some(writer) = &self.writer else {
            return Ok(());
        };
        let guard = writer.file.lock();
        let Some(file) = &*guard else {
            return Ok(());
        };

        let registration = Arc::new(Registration {
            visitor,
            active: AtomicBool::new(true),
            delivering: Mutex::new(()),
        });
        writer.visitors.lock().push(Arc::clone(&registration));

        if let Err(e) = replay(file, &registration) {
            writer.remove(&registration.visitor);
            return Err(e);
        }

        Ok(())
    }

    /// Unregisters `visitor`. No callback starts after this returns, though
    /// one already in flight may still finish. Safe to call from inside a
    /// callback, and never waits for one.
    ///
    /// A callback is in flight from the moment its delivery takes the
    /// registration's delivery lock, which happens before the registration is
    /// checked. When that lock is free the flag flips under it, so nothing can
    /// slip between the check and the call.
    pub fn stop_reading(&self, visitor: &Arc<dyn HistoryVisitor>) {
        if let Some(writer) = &self.writer {
            writer.remove(visitor);
        }
    }

    /// Writes `record` and forwards it to every registered visitor.
    pub fn append(&self, record: &LogRecord) {
        let Some(writer) = &self.writer else {
            return;
        };
        let mut file = writer.file.lock();
        let Some(handle) = &mut *file else {
            return;
        };

        let line = match record.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("Could not encode history record {:?}: {}", record, e);
                return;
            }
        };
        if let Err(e) = writeln!(handle, "{}", line) {
            warn!("History write failed, disabling history: {}", e);
            *file = None;
            return;
        }

        let visitors = writer.visitors.lock().clone();
        for registration in visitors {
            registration.deliver(record);
        }
    }

    /// Releases the file and its lock. Later operations do nothing.
    pub fn close(&self) {
        if let Some(writer) = &self.writer {
            writer.file.lock().take();
            writer.visitors.lock().clear();
        }
    }
}

impl LogWriter {
    fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| Error::TransportUnavailable(e.to_string()))?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(Error::TransportUnavailable(
                    "log is in use by another process".into(),
                ));
            }
            Err(TryLockError::Error(e)) => return Err(Error::TransportUnavailable(e.to_string())),
        }
        terminate_last_line(&file)?;

        Ok(Self {
            file: Mutex::new(Some(file)),
            visitors: Mutex::new(Vec::new()),
        })
    }

    fn remove(&self, visitor: &Arc<dyn HistoryVisitor>) {
        let target = Arc::as_ptr(visitor) as *const ();
        self.visitors.lock().retain(|registration| {
            let same = Arc::as_ptr(&registration.visitor) as *const () == target;
            if same {
                // Busy means a callback is in flight, possibly on this thread.
                let _idle = registration.delivering.try_lock();
                registration.active.store(false, Ordering::SeqCst);
            }
            !same
        });
    }
}

impl Registration {
    /// Returns `false` once the visitor has been unregistered.
    fn deliver(&self, record: &LogRecord) -> bool {
        let _delivering = self.delivering.lock();
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        match record {
            LogRecord::SequenceOpened { name } => self.visitor.on_sequence_opened(name),
            LogRecord::Input { event } => self.visitor.on_input(event),
        }
        true
    }
}

/// A crash can leave half a record without its newline. Ends it so the next
/// append starts on a line of its own.
fn terminate_last_line(mut file: &File) -> Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        warn!("History ends with a torn record, starting a new line");
        file.write_all(b"\n")?;
    }
    Ok(())
}

fn replay(mut file: &File, registration: &Registration) -> Result<()> {
    file.seek(SeekFrom::Start(0))?;

    for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
        let bytes = line?;
        let line = match std::str::from_utf8(&bytes) {
            Ok(line) => line,
            Err(e) => {
                warn!("Skipping unreadable history line {}: {}", index + 1, e);
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match LogRecord::from_line(line) {
            Ok(record) => {
                if !registration.deliver(&record) {
                    break;
                }
            }
            Err(e) => warn!("Skipping unreadable history line {}: {}", index + 1, e),
        }
    }

    Ok(())
}
