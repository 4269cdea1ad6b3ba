use crate::error::{Error, Result};
use crate::events::TimePoint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookaheadConfig {
    /// How far ahead of playback keys are lit, in microseconds.
    pub offset_us: TimePoint,
    /// Notes ending within this gap after the lookahead instant stay dark.
    pub gap_us: TimePoint,
    /// Notes this short or shorter never light.
    pub min_duration_us: TimePoint,
    /// Channel reserved for key lights, 0-15.
    pub channel: u8,
}

impl Default for LookaheadConfig {
    fn default() -> Self {
        Self {
            offset_us: 500_000,
            gap_us: 100_000,
            min_duration_us: 10_000,
            channel: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub lookahead: LookaheadConfig,
    pub history_path: Option<PathBuf>,
    /// Case-insensitive substring of the MIDI input port name.
    pub input_port: Option<String>,
    /// Case-insensitive substring of the MIDI output port name.
    pub output_port: Option<String>,
    pub tick_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lookahead: LookaheadConfig::default(),
            history_path: None,
            input_port: None,
            output_port: None,
            tick_interval_ms: 10,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let ron_string = fs::read_to_string(path)?;
        let config: Config = ron::from_str(&ron_string)?;
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, ron_string)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let lookahead = &self.lookahead;
        if lookahead.channel > 15 {
            return Err(Error::Config(format!(
                "lookahead channel {} is not a MIDI channel (0-15)",
                lookahead.channel
            )));
        }
        if lookahead.offset_us < 0 || lookahead.gap_us < 0 || lookahead.min_duration_us < 0 {
            return Err(Error::Config("lookahead times must not be negative".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be positive".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyglow.ron");
        fs::write(&path, "(lookahead: (offset_us: 250000), input_port: Some(\"Piano\"))").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.lookahead.offset_us, 250_000);
        assert_eq!(config.lookahead.gap_us, 100_000);
        assert_eq!(config.input_port.as_deref(), Some("Piano"));
        assert_eq!(config.tick_interval_ms, 10);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyglow.ron");
        let config = Config {
            history_path: Some(dir.path().join("history.log")),
            ..Config::default()
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_rejects_out_of_range_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyglow.ron");
        fs::write(&path, "(lookahead: (channel: 16))").unwrap();

        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }
}
