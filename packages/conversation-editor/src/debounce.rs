//! Keyed trailing-edge debouncing.
//!
//! The editor has no timers of its own. Callers pass the current [`Instant`]
//! in and drain due tasks whenever their event loop ticks.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Pending<T> {
    deadline: Instant,
    sequence: u64,
    task: T,
}

/// Pending tasks, at most one per key.
///
/// Scheduling under a key that already has a pending task replaces the task
/// and restarts its delay, so only the last call of a burst runs.
#[derive(Debug)]
pub struct Debouncer<K, T> {
    pending: HashMap<K, Pending<T>>,
    next_sequence: u64,
}

impl<K: Eq + Hash + Clone, T> Debouncer<K, T> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            next_sequence: 0,
        }
    }

    pub fn schedule(&mut self, key: K, task: T, delay: Duration, now: Instant) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pending.insert(
            key,
            Pending {
                deadline: now + delay,
                sequence,
                task,
            },
        );
    }

    pub fn cancel(&mut self, key: &K) -> Option<T> {
        self.pending.remove(key).map(|pending| pending.task)
    }

    /// Remove and return every task whose delay has elapsed, earliest
    /// deadline first
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, T)> {
        let due_keys: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut due: Vec<(K, Pending<T>)> = due_keys
            .into_iter()
            .filter_map(|key| self.pending.remove(&key).map(|pending| (key, pending)))
            .collect();
        due.sort_by_key(|(_, pending)| (pending.deadline, pending.sequence));
        due.into_iter().map(|(key, pending)| (key, pending.task)).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|pending| pending.deadline).min()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<K: Eq + Hash + Clone, T> Default for Debouncer<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
