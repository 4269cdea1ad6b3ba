use crate::events::TimePoint;
use std::collections::BTreeMap;

/// Maps half-open time ranges `[low, high)` to values.
///
/// Entries are kept ordered by `low`. An overlap query only scans entries whose
/// `low` falls in `[query_low - longest_span, query_high)`, which bounds the
/// work by `O(log n + m)` where `m` counts entries starting inside that window.
/// A single very long entry widens the window for every later query.
///
/// TODO: switch to an interval-augmented balanced tree if held pedals spanning
/// whole pieces make the scan window too wide in practice.
#[derive(Debug)]
pub struct IntervalIndex<V> {
    entries: BTreeMap<(TimePoint, u64), Entry<V>>,
    longest_span: TimePoint,
    next_id: u64,
}

#[derive(Debug)]
struct Entry<V> {
    high: TimePoint,
    value: V,
}

impl<V> IntervalIndex<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            longest_span: 0,
            next_id: 0,
        }
    }

    /// Inserts `value` over `[low, high)`. Ranges may overlap or repeat freely.
    /// A `high` below `low` is treated as an empty range at `low`.
    pub fn insert(&mut self, low: TimePoint, high: TimePoint, value: V) {
        let high = high.max(low);
        self.longest_span = self.longest_span.max(high - low);
        self.entries.insert((low, self.next_id), Entry { high, value });
        self.next_id += 1;
    }

    /// Every value whose range overlaps `[low, high)`, that is
    /// `low < entry_high && high > entry_low`, in order of `entry_low`.
    pub fn query_overlap(&self, low: TimePoint, high: TimePoint) -> impl Iterator<Item = &V> + '_ {
        let start = low.saturating_sub(self.longest_span);
        let window = (start < high).then(|| self.entries.range((start, 0)..(high, 0)));

        window
            .into_iter()
            .flatten()
            .filter(move |(_, entry)| entry.high > low)
            .map(|(_, entry)| &entry.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.longest_span = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for IntervalIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}
