mod input;
mod interval_index;
mod pairer;
mod track;

pub use input::{InputModel, TimelineQuery};
pub use interval_index::IntervalIndex;
pub use pairer::{EventPairer, LOCK_WAIT};
pub use track::{StaticTrack, Track};
