use super::{KeySet, LightKind, LightMessage, LightSink};
use crate::config::LookaheadConfig;
use crate::events::TimePoint;
use crate::hooks::PlaybackHooks;
use crate::sequence::ParsedSequence;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Lights keys on a lighted keyboard slightly ahead of the song so the
/// player has time to react.
///
/// On every clock tick the notes sounding at `time + offset` decide which keys
/// should be lit, and only the differences against the currently lit keys are
/// sent to the hardware.
pub struct LookaheadScheduler {
    config: LookaheadConfig,
    sink: Arc<dyn LightSink>,
    sequence: ArcSwap<ParsedSequence>,
    keys: Mutex<LitState>,
}

#[derive(Default)]
struct LitState {
    lit: KeySet,
    to_light: KeySet,
}

impl LookaheadScheduler {
    pub fn new(config: LookaheadConfig, sink: Arc<dyn LightSink>) -> Self {
        Self {
            config,
            sink,
            sequence: ArcSwap::from_pointee(ParsedSequence::empty()),
            keys: Mutex::new(LitState::default()),
        }
    }

    /// Follows opened sequences and the playback clock.
    pub fn attach(self: &Arc<Self>, hooks: &PlaybackHooks) {
        let scheduler = Arc::clone(self);
        hooks.add_open_listener(move |sequence| scheduler.set_sequence(Arc::clone(sequence)));

        let scheduler = Arc::clone(self);
        hooks.add_clock_listener(move |time| scheduler.on_clock(time));
    }

    pub fn set_sequence(&self, sequence: Arc<ParsedSequence>) {
        self.sequence.store(sequence);
    }

    pub fn on_clock(&self, time: TimePoint) {
        let mut keys = self.keys.lock();
        self.collect_keys_to_light(time, &mut keys.to_light);
        self.update_lit_keys(&mut keys);
    }

    /// Turns every lit key off.
    pub fn reset(&self) {
        let mut keys = self.keys.lock();
        keys.to_light.clear();
        self.update_lit_keys(&mut keys);
    }

    pub fn lit_keys(&self) -> KeySet {
        self.keys.lock().lit
    }

    fn collect_keys_to_light(&self, time: TimePoint, to_light: &mut KeySet) {
        let offset_time = time + self.config.offset_us;
        let sequence = self.sequence.load();

        for track in &sequence.tracks {
            for note in track.note_pairs(offset_time, offset_time) {
                // Grace notes would only flicker.
                if note.duration() <= self.config.min_duration_us {
                    continue;
                }
                // The key is about to be released anyway.
                if offset_time >= note.off_time() - self.config.gap_us {
                    continue;
                }

                to_light.insert(note.key());
            }
        }
    }

    fn update_lit_keys(&self, keys: &mut LitState) {
        for key in keys.lit.difference(&keys.to_light).iter() {
            self.send(LightKind::Off, key);
            keys.lit.remove(key);
        }

        for key in keys.to_light.difference(&keys.lit).iter() {
            self.send(LightKind::On, key);
            keys.lit.insert(key);
        }

        keys.to_light.clear();
    }

    fn send(&self, kind: LightKind, key: u8) {
        match LightMessage::new(kind, self.config.channel, key) {
            Ok(message) => self.sink.send(message),
            // Channel is validated with the config and keys come from a KeySet.
            Err(e) => panic!("Unreachable key light message: {}", e),
        }
    }
}
