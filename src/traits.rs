pub trait IntMapRead {
    /// the number of keys present in this map
    fn len(&self) -> usize;

    /// returns true if no keys are present
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// returns the value stored for `key`, if any
    fn get(&self, key: usize) -> Option<u32>;

    /// returns true if `key` is present
    fn contains(&self, key: usize) -> bool {
        self.get(key).is_some()
    }

    /// returns the value stored for `key`, or `default` if the key is absent
    fn get_or(&self, key: usize, default: u32) -> u32 {
        self.get(key).unwrap_or(default)
    }

    /// returns the largest present key
    fn max_key(&self) -> Option<usize>;

    /// returns the largest stored value
    fn max_value(&self) -> Option<u32> {
        self.iter().map(|(_, value)| value).max()
    }

    /// returns an iterator over all `(key, value)` pairs in ascending key order
    fn iter(&self) -> impl Iterator<Item = (usize, u32)>;

    /// calls `visit` once per `(key, value)` pair in ascending key order
    fn for_each<F: FnMut(usize, u32)>(&self, mut visit: F) {
        for (key, value) in self.iter() {
            visit(key, value);
        }
    }
}

pub trait IntMapWrite {
    /// Associates `value` with `key`, replacing any previous value.
    fn set(&mut self, key: usize, value: u32);

    /// Removes `key` from the map if it is present.
    /// Returns `true` if the removal occurred, `false` otherwise.
    fn unset(&mut self, key: usize) -> bool;
}
