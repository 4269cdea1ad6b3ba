use crate::error::Result;
use crate::events::RawEvent;
use serde::{Deserialize, Serialize};

/// One entry of the history log. Stored as a single RON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogRecord {
    SequenceOpened { name: String },
    Input { event: RawEvent },
}

impl LogRecord {
    pub fn to_line(&self) -> Result<String> {
        Ok(ron::to_string(self)?)
    }

    pub fn from_line(line: &str) -> Result<Self> {
        Ok(ron::from_str(line)?)
    }
}
