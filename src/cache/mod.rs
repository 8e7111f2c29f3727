// FIFO eviction: reads never reorder, and overwriting a key keeps its slot.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::clock::Clock;

struct Entry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
    seq: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    // (key, seq) in insertion order; stale pairs are skipped on eviction
    order: VecDeque<(K, u64)>,
    next_seq: u64,
}

pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            capacity: capacity.max(1),
            clock,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                next_seq: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            None => return None,
            Some(entry) => now - entry.inserted_at > self.ttl,
        };

        if expired {
            inner.entries.remove(key);
            return None;
        }

        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.value = value;
            entry.inserted_at = now;
            return;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.push_back((key.clone(), seq));
        inner.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                seq,
            },
        );

        if inner.entries.len() > self.capacity {
            evict_oldest(&mut inner);
        }

        if inner.order.len() > self.capacity * 2 {
            compact_order(&mut inner);
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict_oldest<K, V>(inner: &mut Inner<K, V>)
where
    K: Eq + Hash,
{
    while let Some((key, seq)) = inner.order.pop_front() {
        let current = inner.entries.get(&key).map(|entry| entry.seq);
        if current == Some(seq) {
            inner.entries.remove(&key);
            return;
        }
    }
}

fn compact_order<K, V>(inner: &mut Inner<K, V>)
where
    K: Eq + Hash,
{
    let Inner { entries, order, .. } = inner;
    order.retain(|(key, seq)| entries.get(key).map(|entry| entry.seq) == Some(*seq));
}
