use crate::timeline::Track;
use std::fmt;
use std::sync::Arc;

/// A loaded piece: a name and the tracks the lookahead reads from.
#[derive(Clone)]
pub struct ParsedSequence {
    pub name: String,
    pub tracks: Vec<Arc<dyn Track>>,
}

impl ParsedSequence {
    pub fn new(name: impl Into<String>, tracks: Vec<Arc<dyn Track>>) -> Self {
        Self {
            name: name.into(),
            tracks,
        }
    }

    /// The sequence in effect before anything has been opened.
    pub fn empty() -> Self {
        Self::new("", Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for ParsedSequence {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ParsedSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedSequence")
            .field("name", &self.name)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}
