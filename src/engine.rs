use crate::history::HistoryLog;
use crate::hooks::PlaybackHooks;
use crate::lighting::{LightMessage, LightSink, LookaheadScheduler};
use crate::timeline::{InputModel, TimelineQuery};
use crate::{Config, ParsedSequence, TimePoint};
use crossbeam::channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum EngineCommand {
    OpenSequence(Arc<ParsedSequence>),
    AdvanceClock(TimePoint),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    KeyLight(LightMessage),
    SequenceOpened { name: String },
    Stopped,
}

/// Handle to a running engine. The producer side feeds `input` directly; the
/// clock and sequence loader send commands.
pub struct EngineHandle {
    pub command_tx: Sender<EngineCommand>,
    pub update_rx: Receiver<EngineUpdate>,
    pub input: Arc<InputModel>,
    pub history: Arc<HistoryLog>,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn timeline(&self) -> TimelineQuery {
        self.input.timeline()
    }

    /// Stops the engine thread and waits for it to finish cleanup.
    pub fn shutdown(mut self) {
        let _ = self.command_tx.send(EngineCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct UpdateSink(Sender<EngineUpdate>);

impl LightSink for UpdateSink {
    fn send(&self, message: LightMessage) {
        let _ = self.0.send(EngineUpdate::KeyLight(message));
    }
}

pub fn spawn_engine(config: &Config) -> EngineHandle {
    let (command_tx, command_rx) = crossbeam::channel::unbounded();
    let (update_tx, update_rx) = crossbeam::channel::unbounded();

    let hooks = PlaybackHooks::new();

    let input = Arc::new(InputModel::new());
    input.attach(&hooks);

    let scheduler = Arc::new(LookaheadScheduler::new(
        config.lookahead.clone(),
        Arc::new(UpdateSink(update_tx.clone())),
    ));
    scheduler.attach(&hooks);

    let history = match &config.history_path {
        Some(path) => HistoryLog::create(path, &hooks, &input),
        None => Arc::new(HistoryLog::disabled()),
    };

    let thread = std::thread::spawn(move || {
        engine_thread(command_rx, update_tx, hooks, scheduler);
    });

    EngineHandle {
        command_tx,
        update_rx,
        input,
        history,
        thread: Some(thread),
    }
}

fn engine_thread(
    command_rx: Receiver<EngineCommand>,
    update_tx: Sender<EngineUpdate>,
    hooks: PlaybackHooks,
    scheduler: Arc<LookaheadScheduler>,
) {
    info!("Engine started");

    loop {
        match command_rx.recv() {
            Ok(EngineCommand::OpenSequence(sequence)) => {
                info!("Opened sequence {:?}", sequence.name);
                let name = sequence.name.clone();
                hooks.open_sequence(sequence);
                let _ = update_tx.send(EngineUpdate::SequenceOpened { name });
            }
            Ok(EngineCommand::AdvanceClock(time)) => hooks.advance_clock(time),
            Ok(EngineCommand::Shutdown) => break,
            Err(crossbeam::channel::RecvError) => {
                debug!("All engine handles dropped");
                break;
            }
        }
    }

    scheduler.reset();
    hooks.close();
    let _ = update_tx.send(EngineUpdate::Stopped);
    info!("Engine stopped");
}
