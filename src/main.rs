use clap::Parser;
use keyglow::history::{HistoryVisitor, SessionRecorder};
use keyglow::lighting::LightSink;
use keyglow::timeline::{InputModel, Track};
use keyglow::{Config, EngineCommand, EngineUpdate, Error, ParsedSequence, Result, spawn_engine};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "keyglow", about = "Light keyboard keys ahead of the song")]
struct Args {
    /// RON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input port name filter, overrides the config.
    #[arg(short, long)]
    input: Option<String>,

    /// Output port name filter, overrides the config.
    #[arg(short, long)]
    output: Option<String>,

    /// History log file, overrides the config.
    #[arg(long)]
    history: Option<PathBuf>,

    /// Practice against the last session recorded in the history log.
    #[arg(long)]
    replay: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("keyglow: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if args.input.is_some() {
        config.input_port = args.input;
    }
    if args.output.is_some() {
        config.output_port = args.output;
    }
    if args.history.is_some() {
        config.history_path = args.history;
    }

    let engine = spawn_engine(&config);

    let sequence = if args.replay {
        let recorder = Arc::new(SessionRecorder::new());
        let visitor: Arc<dyn HistoryVisitor> = recorder.clone();
        if let Err(e) = engine.history.start_reading(visitor.clone()) {
            warn!("Could not read the history log: {}", e);
        }
        engine.history.stop_reading(&visitor);

        match recorder.latest() {
            Some(session) => {
                let track: Arc<dyn Track> = Arc::new(session.track());
                ParsedSequence::new(format!("replay of {:?}", session.name), vec![track])
            }
            None => {
                warn!("History has no recorded session to replay");
                ParsedSequence::new("live", Vec::new())
            }
        }
    } else {
        ParsedSequence::new("live", Vec::new())
    };
    let _ = engine
        .command_tx
        .send(EngineCommand::OpenSequence(Arc::new(sequence)));

    // Connections stay open for as long as they are alive.
    let _input = connect_input(config.input_port.as_deref(), Arc::clone(&engine.input))
        .inspect_err(|e| warn!("Playing without MIDI input: {}", e))
        .ok();
    let lights: Option<Arc<dyn LightSink>> = connect_output(config.output_port.as_deref())
        .inspect_err(|e| warn!("Playing without key lights: {}", e))
        .ok()
        .map(|connection| Arc::new(Mutex::new(connection)) as Arc<dyn LightSink>);

    let running = Arc::new(AtomicBool::new(true));

    let clock = {
        let command_tx = engine.command_tx.clone();
        let running = Arc::clone(&running);
        let interval = Duration::from_millis(config.tick_interval_ms);
        std::thread::spawn(move || {
            let start = Instant::now();
            while running.load(Ordering::Relaxed) {
                let now = start.elapsed().as_micros() as i64;
                if command_tx.send(EngineCommand::AdvanceClock(now)).is_err() {
                    break;
                }
                std::thread::sleep(interval);
            }
        })
    };

    let forwarder = {
        let update_rx = engine.update_rx.clone();
        std::thread::spawn(move || {
            for update in update_rx {
                match update {
                    EngineUpdate::KeyLight(message) => {
                        if let Some(lights) = &lights {
                            lights.send(message);
                        }
                    }
                    EngineUpdate::SequenceOpened { name } => info!("Now playing {:?}", name),
                    EngineUpdate::Stopped => break,
                }
            }
        })
    };

    info!("Press Enter to quit");
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    running.store(false, Ordering::Relaxed);
    let _ = clock.join();
    engine.shutdown();
    let _ = forwarder.join();

    Ok(())
}

fn connect_input(filter: Option<&str>, input: Arc<InputModel>) -> Result<MidiInputConnection<()>> {
    let midi_in = MidiInput::new("keyglow-input").map_err(|e| Error::TransportUnavailable(e.to_string()))?;

    let ports = midi_in.ports();
    let port = ports
        .iter()
        .find(|port| matches_filter(midi_in.port_name(port).ok(), filter))
        .ok_or_else(|| Error::TransportUnavailable("no matching MIDI input port".into()))?;
    let name = midi_in.port_name(port).unwrap_or_default();

    let connection = midi_in
        .connect(
            port,
            "keyglow-input",
            move |_timestamp, message, _| input.receive_midi(message),
            (),
        )
        .map_err(|e| Error::TransportUnavailable(e.to_string()))?;

    info!("Listening to {}", name);
    Ok(connection)
}

fn connect_output(filter: Option<&str>) -> Result<MidiOutputConnection> {
    let midi_out = MidiOutput::new("keyglow-output").map_err(|e| Error::TransportUnavailable(e.to_string()))?;

    let ports = midi_out.ports();
    let port = ports
        .iter()
        .find(|port| matches_filter(midi_out.port_name(port).ok(), filter))
        .ok_or_else(|| Error::TransportUnavailable("no matching MIDI output port".into()))?;
    let name = midi_out.port_name(port).unwrap_or_default();

    let connection = midi_out
        .connect(port, "keyglow-lights")
        .map_err(|e| Error::TransportUnavailable(e.to_string()))?;

    info!("Lighting keys on {}", name);
    Ok(connection)
}

fn matches_filter(name: Option<String>, filter: Option<&str>) -> bool {
    match (name, filter) {
        (Some(name), Some(filter)) => name.to_lowercase().contains(&filter.to_lowercase()),
        (Some(_), None) => true,
        (None, _) => false,
    }
}
