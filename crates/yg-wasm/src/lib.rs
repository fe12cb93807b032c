//! WebAssembly bindings for ytguard
//!
//! The content script owns one engine per page. Calls that change persisted
//! state or produce user-visible output leave their effects in an outbox the
//! script drains with [`drain_outbox`] and forwards to `storage.local` and
//! the background page.

pub mod dom;
pub mod host;

use std::cell::RefCell;

use serde::Serialize;
use wasm_bindgen::prelude::*;
use yg_core::api::{self, ApiError};
use yg_core::dom::MutationRecord;
use yg_core::notify::RecordingNotifier;
use yg_core::player::{MediaState, Player};
use yg_core::segments::{FetchTicket, LoadOutcome, SkipSettingsPatch};
use yg_core::store::Values;
use yg_core::suppressor::{RequestKind, SettingsPatch, BLOCK_REASON};
use yg_core::types::{CategoryPolicy, SegmentCategory};
use yg_core::{Context, EngineConfig, SkipController, Suppressor};
use yg_rules::{build_selector_set, optimize_rules, parse_filter_list};

use crate::dom::{WebDom, WebPlayer};
use crate::host::{init_logging, parse_level, JsClock, Outbox, StagedStore};

struct Engine {
    suppressor: Suppressor,
    skipper: SkipController,
    store: StagedStore,
    notifier: RecordingNotifier,
    clock: JsClock,
    tab_id: Option<i32>,
    dom: Option<WebDom>,
    pending_fetch: Option<FetchTicket>,
}

impl Engine {
    fn finish_load(&mut self, item_id: &str, status: u16, body: &str) -> bool {
        let ticket = match self.pending_fetch.take() {
            Some(ticket) if ticket.item_id == item_id => ticket,
            other => {
                self.pending_fetch = other;
                log::debug!("No pending fetch for {}", item_id);
                return false;
            }
        };
        let result = if status == 0 {
            Err(ApiError::Network(body.to_string()))
        } else {
            api::segments_from_response(status, body)
        };
        match self.dom.as_mut() {
            Some(dom) => {
                let duration = WebPlayer::find(dom.document())
                    .map(|p| Player::duration(&p))
                    .unwrap_or(f64::NAN);
                self.skipper.complete_load(&ticket, result, dom, &MediaState::new(duration))
            }
            // Nothing to draw markers on; the segments still drive skipping
            None => self.skipper.complete_load(
                &ticket,
                result,
                &mut yg_core::Document::new(),
                &MediaState::new(f64::NAN),
            ),
        }
    }
}

thread_local! {
    static ENGINE: RefCell<Option<Engine>> = const { RefCell::new(None) };
}

/// Run `f` against the engine, or return `default` before `init`.
fn with_engine<R>(default: R, f: impl FnOnce(&mut Engine) -> R) -> R {
    ENGINE.with(|cell| match cell.borrow_mut().as_mut() {
        Some(engine) => f(engine),
        None => default,
    })
}

macro_rules! context {
    ($engine:expr) => {{
        let mut ctx = Context::new(&mut $engine.store, &mut $engine.notifier, &$engine.clock);
        ctx.tab_id = $engine.tab_id;
        ctx
    }};
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    match serde_json::to_string(value) {
        Ok(json) => js_sys::JSON::parse(&json).unwrap_or(JsValue::NULL),
        Err(e) => {
            log::error!("Failed to encode result: {}", e);
            JsValue::NULL
        }
    }
}

fn js_error(message: &str) -> JsValue {
    js_sys::Error::new(message).into()
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Create the engine.
///
/// `config_json` is an `EngineConfig` (may be empty); `stored_json` is the
/// object read from `storage.local`. Returns the rejected configured
/// selectors as strings.
#[wasm_bindgen]
pub fn init(config_json: &str, stored_json: &str, tab_id: Option<i32>, log_level: Option<String>) -> Result<JsValue, JsValue> {
    init_logging(parse_level(log_level.as_deref().unwrap_or("info")));

    if ENGINE.with(|cell| cell.borrow().is_some()) {
        return Err(js_error("Already initialized. Reload the page to reinitialize."));
    }

    let config = EngineConfig::from_json(config_json).map_err(|e| js_error(&e.to_string()))?;
    let stored: Values = if stored_json.trim().is_empty() {
        Values::new()
    } else {
        serde_json::from_str(stored_json).map_err(|e| js_error(&format!("Invalid stored settings: {}", e)))?
    };
    let store = StagedStore::new(stored);

    let build = build_selector_set(&config.extra_selectors);
    let rejected: Vec<String> = build.rejected.iter().map(ToString::to_string).collect();

    let dom = web_sys::window()
        .and_then(|window| window.document())
        .and_then(WebDom::new);
    match &dom {
        Some(dom) => {
            if !dom.inject_stylesheet(&yg_core::selectors::hiding_stylesheet()) {
                log::warn!("Could not inject hiding stylesheet");
            }
        }
        None => log::warn!("No document; DOM suppression unavailable"),
    }

    let engine = Engine {
        suppressor: Suppressor::load(&config, build.set, &store),
        skipper: SkipController::load(&config, &store),
        store,
        notifier: RecordingNotifier::new(),
        clock: JsClock,
        tab_id,
        dom,
        pending_fetch: None,
    };
    ENGINE.with(|cell| *cell.borrow_mut() = Some(engine));

    Ok(to_js(&rejected))
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    ENGINE.with(|cell| cell.borrow().is_some())
}

#[wasm_bindgen]
pub fn set_log_level(level: &str) {
    log::set_max_level(parse_level(level));
}

/// Effects produced since the last drain:
/// `{notifications, badge, events, writes}`.
#[wasm_bindgen]
pub fn drain_outbox() -> JsValue {
    with_engine(JsValue::NULL, |engine| {
        to_js(&Outbox::collect(&mut engine.notifier, &mut engine.store))
    })
}

// =============================================================================
// Suppressor
// =============================================================================

/// Full document scan. Returns the number of elements hidden.
#[wasm_bindgen]
pub fn scan() -> u32 {
    with_engine(0, |engine| {
        let Some(dom) = engine.dom.as_mut() else {
            return 0;
        };
        let mut player = WebPlayer::find(dom.document());
        let mut ctx = context!(engine);
        engine
            .suppressor
            .scan(dom, player.as_mut().map(|p| p as &mut dyn Player), &mut ctx) as u32
    })
}

/// Mutation observer callback. `records` is the observer's record list
/// (or objects with the same `type`, `target`, `addedNodes` and
/// `attributeName` fields).
#[wasm_bindgen]
pub fn on_mutations(records: js_sys::Array) -> u32 {
    with_engine(0, |engine| {
        let Some(dom) = engine.dom.as_mut() else {
            return 0;
        };
        let records = mutation_records(dom, &records);
        let mut ctx = context!(engine);
        engine.suppressor.on_mutations(dom, &mut ctx, &records) as u32
    })
}

fn mutation_records(dom: &WebDom, records: &js_sys::Array) -> Vec<MutationRecord> {
    let field = |record: &JsValue, name: &str| {
        js_sys::Reflect::get(record, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED)
    };
    records
        .iter()
        .filter_map(|record| match field(&record, "type").as_string().as_deref() {
            Some("childList") => {
                let nodes = field(&record, "addedNodes");
                if nodes.is_undefined() || nodes.is_null() {
                    return None;
                }
                let added = js_sys::Array::from(&nodes)
                    .iter()
                    .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
                    .map(|element| dom.id_of(&element))
                    .collect();
                Some(MutationRecord::ChildList { added })
            }
            Some("attributes") => {
                let target = field(&record, "target").dyn_into::<web_sys::Element>().ok()?;
                Some(MutationRecord::Attributes {
                    target: dom.id_of(&target),
                    name: field(&record, "attributeName").as_string().unwrap_or_default(),
                })
            }
            _ => None,
        })
        .collect()
}

/// Host timer. Returns `{removed, scanned, released}`. Detached elements
/// are released from the node registry after each periodic scan.
#[wasm_bindgen]
pub fn tick() -> JsValue {
    #[derive(Serialize)]
    struct Report {
        removed: usize,
        scanned: Option<usize>,
        released: usize,
    }

    with_engine(JsValue::NULL, |engine| {
        let Some(dom) = engine.dom.as_mut() else {
            return JsValue::NULL;
        };
        let mut player = WebPlayer::find(dom.document());
        let mut ctx = context!(engine);
        let report = engine.suppressor.tick(
            dom,
            player.as_mut().map(|p| p as &mut dyn Player),
            &mut ctx,
        );
        let released = if report.scanned.is_some() { dom.prune() } else { 0 };
        to_js(&Report {
            removed: report.removed,
            scanned: report.scanned,
            released,
        })
    })
}

#[wasm_bindgen]
pub fn should_block(url: &str) -> bool {
    with_engine(false, |engine| engine.suppressor.should_block(url))
}

/// Interceptor hook. `kind` is `fetch`, `xhr` or `media`. Throws an `Error`
/// with the block reason when the request must not be sent.
#[wasm_bindgen]
pub fn intercept(kind: &str, url: &str) -> Result<(), JsValue> {
    let kind = match kind {
        "fetch" => RequestKind::Fetch,
        "xhr" | "xmlhttprequest" => RequestKind::XmlHttpRequest,
        _ => RequestKind::MediaSource,
    };
    with_engine(Ok(()), |engine| {
        let mut ctx = context!(engine);
        engine
            .suppressor
            .intercept(&mut ctx, kind, url)
            .map_err(|_| js_error(BLOCK_REASON))
    })
}

#[wasm_bindgen]
pub fn adblock_detected() -> bool {
    with_engine(false, |engine| engine.suppressor.adblock_detected())
}

/// Computed style value to report to page code for `element`.
#[wasm_bindgen]
pub fn reported_style(element: web_sys::Element, property: &str) -> Option<String> {
    with_engine(None, |engine| {
        let dom = engine.dom.as_ref()?;
        let node = dom.id_of(&element);
        Some(engine.suppressor.reported_style(dom, node, property))
    })
}

/// Channel of the current page, if a channel link is present.
#[wasm_bindgen]
pub fn current_channel() -> Option<String> {
    with_engine(None, |engine| {
        let dom = engine.dom.as_ref()?;
        engine.suppressor.page_channel(dom)
    })
}

#[wasm_bindgen]
pub fn toggle_whitelist(channel: &str) -> bool {
    with_engine(false, |engine| {
        let mut ctx = context!(engine);
        engine.suppressor.toggle_whitelist(&mut ctx, channel)
    })
}

#[wasm_bindgen]
pub fn update_adblock_settings(
    enabled: Option<bool>,
    dom_blocking: Option<bool>,
    network_blocking: Option<bool>,
    anti_detection: Option<bool>,
) {
    with_engine((), |engine| {
        let patch = SettingsPatch {
            enabled,
            dom_blocking,
            network_blocking,
            anti_detection,
        };
        let mut ctx = context!(engine);
        match engine.dom.as_mut() {
            Some(dom) => engine.suppressor.update_settings(dom, &mut ctx, patch),
            None => engine
                .suppressor
                .update_settings(&mut yg_core::Document::new(), &mut ctx, patch),
        }
    })
}

/// Replace the custom filter list with filter-list text. Returns the number
/// of rules kept.
#[wasm_bindgen]
pub fn set_custom_filters(text: &str) -> u32 {
    with_engine(0, |engine| {
        let mut rules = parse_filter_list(text).rules;
        optimize_rules(&mut rules, engine.suppressor.filters().list(yg_core::ListName::Builtin));
        let raw: Vec<String> = rules.iter().map(|rule| rule.raw().to_string()).collect();
        let mut ctx = context!(engine);
        engine.suppressor.set_custom_filters(&mut ctx, raw) as u32
    })
}

#[wasm_bindgen]
pub fn reset_count() {
    with_engine((), |engine| {
        let mut ctx = context!(engine);
        engine.suppressor.reset_count(&mut ctx);
    })
}

#[wasm_bindgen]
pub fn adblock_stats() -> JsValue {
    with_engine(JsValue::NULL, |engine| to_js(&engine.suppressor.stats()))
}

// =============================================================================
// Skip controller
// =============================================================================

/// Switch to `item_id`. Returns the URL to GET, or `undefined` when no fetch
/// is needed.
#[wasm_bindgen]
pub fn load_segments(item_id: &str) -> Option<String> {
    with_engine(None, |engine| match engine.skipper.load_segments(item_id) {
        LoadOutcome::Fetch(ticket) => {
            let url = ticket.url.clone();
            engine.pending_fetch = Some(ticket);
            Some(url)
        }
        LoadOutcome::Empty => {
            engine.pending_fetch = None;
            if let Some(dom) = engine.dom.as_mut() {
                engine.skipper.clear_markers(dom);
            }
            None
        }
        LoadOutcome::Cached => None,
    })
}

/// Complete the fetch for `item_id`. `status` 0 means the request failed
/// before a response arrived. Returns false if the result was stale.
#[wasm_bindgen]
pub fn finish_load(item_id: &str, status: u16, body: &str) -> bool {
    with_engine(false, |engine| engine.finish_load(item_id, status, body))
}

/// Skip the segment under the playhead. Returns the skipped segment.
#[wasm_bindgen]
pub fn poll_segments() -> JsValue {
    with_engine(JsValue::NULL, |engine| {
        let Some(mut player) = engine.dom.as_ref().and_then(|dom| WebPlayer::find(dom.document())) else {
            return JsValue::NULL;
        };
        let mut ctx = context!(engine);
        match engine.skipper.poll(&mut player, &mut ctx) {
            Some(segment) => to_js(&segment),
            None => JsValue::NULL,
        }
    })
}

#[wasm_bindgen]
pub fn check_position(time: f64) -> JsValue {
    with_engine(JsValue::NULL, |engine| match engine.skipper.check_position(time) {
        Some(segment) => to_js(segment),
        None => JsValue::NULL,
    })
}

/// Redraw timeline markers for the given media duration.
#[wasm_bindgen]
pub fn render_markers(duration: f64) -> u32 {
    with_engine(0, |engine| match engine.dom.as_mut() {
        Some(dom) => engine.skipper.render_markers(dom, duration) as u32,
        None => 0,
    })
}

#[wasm_bindgen]
pub fn marker_layout(duration: f64) -> JsValue {
    with_engine(JsValue::NULL, |engine| to_js(&engine.skipper.marker_layout(duration)))
}

/// Build a submission. Returns `{url, body}` where `body` is the JSON text
/// to POST.
#[wasm_bindgen]
pub fn prepare_submission(start: f64, end: f64, category: &str) -> Result<JsValue, JsValue> {
    #[derive(Serialize)]
    struct Request {
        url: String,
        body: String,
    }

    with_engine(Err(js_error("Not initialized")), |engine| {
        let mut ctx = context!(engine);
        let submission = engine
            .skipper
            .prepare_submission(&mut ctx, start, end, SegmentCategory::parse(category))
            .map_err(|e| js_error(&e.to_string()))?;
        let body = submission.to_json().map_err(|e| js_error(&e.to_string()))?;
        Ok(to_js(&Request {
            url: submission.url,
            body,
        }))
    })
}

/// Report the POST outcome; `error` is set when it failed.
#[wasm_bindgen]
pub fn finish_submission(error: Option<String>) -> bool {
    with_engine(false, |engine| {
        let result = match error {
            Some(message) => Err(ApiError::Network(message)),
            None => Ok(()),
        };
        let mut ctx = context!(engine);
        engine.skipper.finish_submission(&mut ctx, result)
    })
}

/// `categories_json` maps category names to `{enabled, color}`.
#[wasm_bindgen]
pub fn update_skip_settings(enabled: Option<bool>, categories_json: Option<String>) -> Result<(), JsValue> {
    let mut patch = SkipSettingsPatch {
        enabled,
        ..SkipSettingsPatch::default()
    };
    if let Some(json) = categories_json {
        let parsed: std::collections::BTreeMap<String, CategoryPolicy> =
            serde_json::from_str(&json).map_err(|e| js_error(&e.to_string()))?;
        patch.categories = parsed
            .into_iter()
            .map(|(name, policy)| (SegmentCategory::parse(&name), policy))
            .filter(|(category, _)| *category != SegmentCategory::Unknown)
            .collect();
    }
    with_engine(Ok(()), |engine| {
        let mut ctx = context!(engine);
        engine.skipper.update_settings(&mut ctx, patch);
        Ok(())
    })
}

#[wasm_bindgen]
pub fn skip_stats() -> JsValue {
    with_engine(JsValue::NULL, |engine| to_js(&engine.skipper.stats()))
}

// =============================================================================
// Helpers
// =============================================================================

#[wasm_bindgen]
pub fn video_id(url: &str) -> Option<String> {
    yg_core::url::video_id(url).map(str::to_string)
}

#[wasm_bindgen]
pub fn channel_id(href: &str) -> Option<String> {
    yg_core::url::channel_id(href).map(str::to_string)
}

#[wasm_bindgen]
pub fn is_watch_page(url: &str) -> bool {
    yg_core::url::is_watch_page(url)
}

#[wasm_bindgen]
pub fn format_time(seconds: f64) -> String {
    yg_core::scheduler::format_time(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yg_core::SelectorSet;

    fn engine() -> Engine {
        let config = EngineConfig::default();
        let store = StagedStore::default();
        Engine {
            suppressor: Suppressor::load(&config, SelectorSet::builtin(), &store),
            skipper: SkipController::load(&config, &store),
            store,
            notifier: RecordingNotifier::new(),
            clock: JsClock,
            tab_id: None,
            dom: None,
            pending_fetch: None,
        }
    }

    fn start_fetch(engine: &mut Engine, item_id: &str) {
        match engine.skipper.load_segments(item_id) {
            LoadOutcome::Fetch(ticket) => engine.pending_fetch = Some(ticket),
            other => panic!("expected a fetch, got {:?}", other),
        }
    }

    #[test]
    fn test_finish_load_without_document_keeps_segments() {
        let mut engine = engine();
        start_fetch(&mut engine, "abc");

        let body = r#"[{"segment":[10,20],"category":"sponsor","UUID":"u1"}]"#;
        assert!(engine.finish_load("abc", 200, body));
        assert!(engine.pending_fetch.is_none());
        assert_eq!(engine.skipper.segments().len(), 1);
        assert_eq!(engine.skipper.check_position(12.0).map(|s| s.id.as_str()), Some("u1"));
    }

    #[test]
    fn test_finish_load_for_other_item_keeps_ticket() {
        let mut engine = engine();
        start_fetch(&mut engine, "abc");

        assert!(!engine.finish_load("xyz", 200, "[]"));
        assert_eq!(engine.pending_fetch.as_ref().map(|t| t.item_id.as_str()), Some("abc"));

        assert!(engine.finish_load("abc", 0, "connection reset"));
        assert!(engine.skipper.segments().is_empty());
    }
}
