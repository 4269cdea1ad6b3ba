use crate::error::{Error, Result};
use crate::events::{NOTE_OFF, NOTE_ON};
use crossbeam::channel::Sender;
use midir::MidiOutputConnection;
use parking_lot::Mutex;
use tracing::warn;

const LIGHT_ON_VELOCITY: u8 = 1;
const LIGHT_OFF_VELOCITY: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    On,
    Off,
}

/// A key light command for a lighted keyboard, sent on a channel reserved
/// for navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightMessage {
    kind: LightKind,
    channel: u8,
    key: u8,
}

impl LightMessage {
    pub fn new(kind: LightKind, channel: u8, key: u8) -> Result<Self> {
        if channel > 15 {
            return Err(Error::InvalidMessage {
                field: "channel",
                value: channel,
            });
        }
        if key > 127 {
            return Err(Error::InvalidMessage {
                field: "key",
                value: key,
            });
        }

        Ok(Self { kind, channel, key })
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        match self.kind {
            LightKind::On => [NOTE_ON | self.channel, self.key, LIGHT_ON_VELOCITY],
            LightKind::Off => [NOTE_OFF | self.channel, self.key, LIGHT_OFF_VELOCITY],
        }
    }
}

/// Destination for key light commands.
pub trait LightSink: Send + Sync {
    fn send(&self, message: LightMessage);
}

impl LightSink for Sender<LightMessage> {
    fn send(&self, message: LightMessage) {
        // A closed channel means nobody is watching the lights anymore.
        let _ = Sender::send(self, message);
    }
}

impl LightSink for Mutex<MidiOutputConnection> {
    fn send(&self, message: LightMessage) {
        if let Err(e) = self.lock().send(&message.to_bytes()) {
            warn!("Failed to send key light {:?}: {}", message, e);
        }
    }
}
