use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A log file or MIDI port could not be acquired.
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Invalid MIDI message: {field} = {value} is out of range")]
    InvalidMessage { field: &'static str, value: u8 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    #[error("RON serialization error: {0}")]
    RonSerialize(#[from] ron::Error),
}
