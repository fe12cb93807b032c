//! Host collaborators: staged storage, wall clock and console logging

use serde::Serialize;
use wasm_bindgen::JsValue;
use yg_core::notify::{EngineEvent, Notification, RecordingNotifier};
use yg_core::scheduler::Clock;
use yg_core::store::{KeyValueStore, StoreError, Values};

/// Store seeded from `storage.local` at startup. Writes apply immediately
/// and are staged until the extension side flushes them.
#[derive(Debug, Default)]
pub struct StagedStore {
    values: Values,
    pending: Values,
}

impl StagedStore {
    pub fn new(values: Values) -> Self {
        Self {
            values,
            pending: Values::new(),
        }
    }

    /// Writes since the last call, later writes to a key replacing earlier ones.
    pub fn take_pending(&mut self) -> Values {
        std::mem::take(&mut self.pending)
    }
}

impl KeyValueStore for StagedStore {
    fn get(&self, keys: &[&str]) -> Values {
        keys.iter()
            .filter_map(|key| self.values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect()
    }

    fn set(&mut self, values: Values) -> Result<(), StoreError> {
        for (key, value) in values {
            self.values.insert(key.clone(), value.clone());
            self.pending.insert(key, value);
        }
        Ok(())
    }
}

/// Everything the extension side must act on after a call.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outbox {
    pub notifications: Vec<Notification>,
    pub badge: Option<BadgeUpdate>,
    pub events: Vec<EngineEvent>,
    pub writes: Values,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeUpdate {
    pub tab_id: Option<i32>,
    pub count: u64,
}

impl Outbox {
    /// Collect and clear. Only the latest badge value matters.
    pub fn collect(notifier: &mut RecordingNotifier, store: &mut StagedStore) -> Self {
        let recorded = notifier.drain();
        Self {
            notifications: recorded.notifications,
            badge: recorded
                .badges
                .last()
                .map(|&(tab_id, count)| BadgeUpdate { tab_id, count }),
            events: recorded.events,
            writes: store.take_pending(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && self.badge.is_none() && self.events.is_empty() && self.writes.is_empty()
    }
}

/// `Date.now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

/// `log` backend writing to the browser console.
pub struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[ytguard] {}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

/// Install the console logger. Later calls only change the level.
pub fn init_logging(level: log::LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

pub fn parse_level(level: &str) -> log::LevelFilter {
    level.parse().unwrap_or(log::LevelFilter::Info)
}
