/// A set of MIDI keys (0-127).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeySet {
    bits: u128,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the key was not already present.
    ///
    /// # Panics
    /// If `key` is not a MIDI key.
    pub fn insert(&mut self, key: u8) -> bool {
        assert!(key < 128, "key {} is not a MIDI key", key);
        let added = !self.contains(key);
        self.bits |= 1 << key;
        added
    }

    /// Returns `true` if the key was present.
    pub fn remove(&mut self, key: u8) -> bool {
        let present = self.contains(key);
        if present {
            self.bits &= !(1 << key);
        }
        present
    }

    pub fn contains(&self, key: u8) -> bool {
        key < 128 && self.bits & (1 << key) != 0
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Keys in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..128u8).filter(|&key| self.contains(key))
    }

    /// Keys in `self` but not in `other`.
    pub fn difference(&self, other: &KeySet) -> KeySet {
        KeySet {
            bits: self.bits & !other.bits,
        }
    }
}

impl FromIterator<u8> for KeySet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut keys = KeySet::new();
        for key in iter {
            keys.insert(key);
        }
        keys
    }
}
