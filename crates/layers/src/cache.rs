use std::collections::BTreeMap;

use foundation::math::TileCoord;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileKey {
    pub layer_id: String,
    pub tile: TileCoord,
}

impl TileKey {
    pub fn new(layer_id: impl Into<String>, tile: TileCoord) -> Self {
        Self {
            layer_id: layer_id.into(),
            tile,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TileState<T> {
    /// Requested, not yet answered.
    Loading,
    Ready(T),
    /// The request failed; not retried until evicted.
    Failed,
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    state: TileState<T>,
    last_used_tick: u64,
}

/// Bounded LRU of decoded tiles.
///
/// - Entries are keyed in a `BTreeMap` for stable traversal order.
/// - Eviction is LRU by `last_used_tick`, with a tie-break by key ordering.
/// - Loading entries are never evicted, so a late response always finds
///   its slot.
#[derive(Debug)]
pub struct TileCache<T> {
    max_entries: usize,
    tick: u64,
    entries: BTreeMap<TileKey, CacheEntry<T>>,
}

impl<T> TileCache<T> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            tick: 0,
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Marks the tile used. Returns `true` when the caller should start a
    /// fetch (the tile was unknown); the entry is then `Loading`.
    pub fn request(&mut self, key: &TileKey) -> bool {
        self.tick += 1;
        let tick = self.tick;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_used_tick = tick;
                false
            }
            None => {
                self.entries.insert(
                    key.clone(),
                    CacheEntry {
                        state: TileState::Loading,
                        last_used_tick: tick,
                    },
                );
                true
            }
        }
    }

    /// Looks a tile up and marks it used.
    pub fn get(&mut self, key: &TileKey) -> Option<&TileState<T>> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        entry.last_used_tick = tick;
        Some(&entry.state)
    }

    /// Stores a loaded tile; returns keys evicted to stay within budget.
    pub fn mark_ready(&mut self, key: &TileKey, value: T) -> Vec<TileKey> {
        self.finish(key, TileState::Ready(value))
    }

    pub fn mark_failed(&mut self, key: &TileKey) -> Vec<TileKey> {
        self.finish(key, TileState::Failed)
    }

    pub fn remove_layer(&mut self, layer_id: &str) {
        self.entries.retain(|k, _| k.layer_id != layer_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn finish(&mut self, key: &TileKey, state: TileState<T>) -> Vec<TileKey> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.entry(key.clone()).or_insert(CacheEntry {
            state: TileState::Loading,
            last_used_tick: tick,
        });
        entry.state = state;
        entry.last_used_tick = tick;
        self.evict_as_needed(key)
    }

    fn evict_as_needed(&mut self, protected: &TileKey) -> Vec<TileKey> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.max_entries {
            let candidate = self
                .entries
                .iter()
                .filter(|(k, e)| !matches!(e.state, TileState::Loading) && *k != protected)
                .min_by(|(ka, ea), (kb, eb)| {
                    ea.last_used_tick
                        .cmp(&eb.last_used_tick)
                        .then_with(|| ka.cmp(kb))
                })
                .map(|(k, _)| k.clone());
            let Some(key) = candidate else {
                break;
            };
            self.entries.remove(&key);
            evicted.push(key);
        }
        evicted
    }
}
