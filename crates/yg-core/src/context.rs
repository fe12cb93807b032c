//! Per-operation engine context and persisted counters

use serde_json::json;

use crate::notify::Notifier;
use crate::scheduler::Clock;
use crate::store::{self, KeyValueStore};

/// Collaborators handed to every engine operation.
pub struct Context<'a> {
    pub store: &'a mut dyn KeyValueStore,
    pub notifier: &'a mut dyn Notifier,
    pub clock: &'a dyn Clock,
    /// Tab the page lives in, for badge updates
    pub tab_id: Option<i32>,
}

impl<'a> Context<'a> {
    pub fn new(
        store: &'a mut dyn KeyValueStore,
        notifier: &'a mut dyn Notifier,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            tab_id: None,
        }
    }

    pub fn with_tab(mut self, tab_id: i32) -> Self {
        self.tab_id = Some(tab_id);
        self
    }

    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

/// Monotonic counter persisted under a fixed key after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    key: &'static str,
    value: u64,
}

impl Counter {
    /// Load the stored total (0 when absent).
    pub fn load(store: &dyn KeyValueStore, key: &'static str) -> Self {
        let values = store.get(&[key]);
        Self {
            key,
            value: store::read(&values, key).unwrap_or(0),
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Add `delta` and persist. Returns the new total.
    pub fn add(&mut self, store: &mut dyn KeyValueStore, delta: u64) -> u64 {
        self.value = self.value.saturating_add(delta);
        store::write_one(store, self.key, json!(self.value));
        self.value
    }

    /// Explicit user reset.
    pub fn reset(&mut self, store: &mut dyn KeyValueStore) {
        self.value = 0;
        store::write_one(store, self.key, json!(0));
    }
}
