use crate::db::KeyValueStore;
use std::rc::Rc;
use tracing::{debug, warn};

const POSITION_KEY_PREFIX: &str = "versereader.position.";
const POSITION_ORDER_KEY: &str = "versereader.position.order";

fn position_key(chapter: u32) -> String {
    format!("{POSITION_KEY_PREFIX}{chapter}")
}

/// Last-viewed verse per chapter, kept across reloads.
///
/// Each chapter is stored as its own decimal string value. A separate order
/// list (least recently written first) bounds retention: when more than
/// `capacity` chapters are remembered, the oldest entries are evicted along
/// with their stored values.
pub struct PositionMemory {
    store: Rc<dyn KeyValueStore>,
    capacity: usize,
    order: Vec<u32>,
}

impl PositionMemory {
    pub fn new(store: Rc<dyn KeyValueStore>, capacity: usize) -> Self {
        let order = store
            .get(POSITION_ORDER_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<u32>>(&raw).ok())
            .unwrap_or_default();
        let mut memory = Self {
            store,
            capacity: capacity.max(1),
            order,
        };
        memory.dedupe_order();
        memory
    }

    /// Stored verse for `chapter`, clamped to `1..=verse_count`. Unparseable
    /// or non-positive values are treated as absent.
    pub fn recall(&self, chapter: u32, verse_count: u32) -> Option<u32> {
        if verse_count == 0 {
            return None;
        }
        let raw = self.store.get(&position_key(chapter))?;
        let stored = raw.trim().parse::<u32>().ok().filter(|v| *v >= 1)?;
        Some(stored.min(verse_count))
    }

    pub fn remember(&mut self, chapter: u32, verse: u32) {
        if let Err(err) = self.store.set(&position_key(chapter), &verse.to_string()) {
            warn!(%err, chapter, verse, "failed to persist reading position");
            return;
        }
        self.order.retain(|c| *c != chapter);
        self.order.push(chapter);
        while self.order.len() > self.capacity {
            let evicted = self.order.remove(0);
            self.store.remove(&position_key(evicted));
            debug!(chapter = evicted, "evicted remembered position");
        }
        self.save_order();
    }

    /// Chapter written most recently, if any.
    pub fn most_recent(&self) -> Option<u32> {
        self.order.last().copied()
    }

    fn dedupe_order(&mut self) {
        let mut seen = Vec::with_capacity(self.order.len());
        for chapter in self.order.iter().rev() {
            if !seen.contains(chapter) {
                seen.push(*chapter);
            }
        }
        seen.reverse();
        self.order = seen;
        while self.order.len() > self.capacity {
            let evicted = self.order.remove(0);
            self.store.remove(&position_key(evicted));
        }
    }

    fn save_order(&self) {
        let Ok(json) = serde_json::to_string(&self.order) else {
            return;
        };
        if let Err(err) = self.store.set(POSITION_ORDER_KEY, &json) {
            warn!(%err, "failed to persist position order");
        }
    }
}
