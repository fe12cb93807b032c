//! Key/value persistence seam
//!
//! The browser side is `storage.local`; the CLI uses a JSON file. Writes are
//! fire-and-forget from the engine's point of view: a failed write is logged
//! and the in-memory state stays authoritative.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A batch of stored values.
pub type Values = Map<String, Value>;

/// Storage keys.
pub mod keys {
    pub const ADBLOCK_ENABLED: &str = "adblock_enabled";
    pub const ADBLOCK_NETWORK: &str = "adblock_network";
    pub const ADBLOCK_DOM: &str = "adblock_dom";
    pub const ADBLOCK_ANTI_ANTI: &str = "adblock_anti_anti";
    pub const ADBLOCK_WHITELIST: &str = "adblock_whitelist";
    pub const ADBLOCK_COUNT: &str = "adblock_count";
    pub const ADBLOCK_CUSTOM_FILTERS: &str = "adblock_custom_filters";

    pub const SPONSORBLOCK_ENABLED: &str = "sponsorblock_enabled";
    pub const SPONSORBLOCK_CATEGORIES: &str = "sponsorblock_categories";
    pub const SPONSORBLOCK_SKIPCOUNT: &str = "sponsorblock_skipcount";
    pub const SPONSORBLOCK_USERID: &str = "sponsorblock_userid";
}

/// Error type for storage writes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key/value persistence service.
pub trait KeyValueStore {
    /// Values for the requested keys; missing keys are absent from the map.
    fn get(&self, keys: &[&str]) -> Values;
    fn set(&mut self, values: Values) -> Result<(), StoreError>;
}

/// Write and log failures instead of returning them.
pub fn write(store: &mut dyn KeyValueStore, values: Values) {
    let keys: Vec<String> = values.keys().cloned().collect();
    if let Err(e) = store.set(values) {
        log::warn!("Failed to persist {:?}: {}", keys, e);
    }
}

/// Single-key convenience for [`write`].
pub fn write_one(store: &mut dyn KeyValueStore, key: &str, value: Value) {
    let mut values = Values::new();
    values.insert(key.to_string(), value);
    write(store, values);
}

/// Decode a stored value, treating absent or malformed values as None.
pub fn read<T: DeserializeOwned>(values: &Values, key: &str) -> Option<T> {
    let value = values.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            log::warn!("Ignoring malformed stored value for '{}': {}", key, e);
            None
        }
    }
}

/// Switches are on unless explicitly stored as `false`.
pub fn read_switch(values: &Values, key: &str) -> bool {
    values.get(key).and_then(Value::as_bool) != Some(false)
}

// =============================================================================
// In-memory Store
// =============================================================================

/// Store backed by a map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Values,
    writes: usize,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: Values) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    /// Make every subsequent write fail.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Number of successful `set` calls.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Values {
        keys.iter()
            .filter_map(|key| self.values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect()
    }

    fn set(&mut self, values: Values) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::Unavailable("store is read-only".to_string()));
        }
        self.values.extend(values);
        self.writes += 1;
        Ok(())
    }
}
