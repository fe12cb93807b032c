//! DOM Ad Suppressor
//!
//! Hides ad-bearing elements found by the categorized selectors, handles
//! playing video ads, and decides which outbound requests to reject.
//!
//! Three entry points feed the selector pass:
//! - [`Suppressor::scan`]: full document pass (startup, periodic fallback)
//! - [`Suppressor::on_mutations`]: throttled pass over changed subtrees
//! - [`Suppressor::tick`]: host timer; flushes delayed removals and runs the
//!   periodic scan when due

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::context::{Context, Counter};
use crate::dom::{DomTree, MutationRecord, NodeId, Selector};
use crate::filter::{FilterRule, FilterSet, ListName};
use crate::notify::EngineEvent;
use crate::player::{is_known_duration, Player};
use crate::scheduler::{IntervalGate, Throttle, TimerQueue};
use crate::selectors::{
    SelectorSet, AD_PLAYING_MARKERS, CATEGORY_ATTRIBUTE, CHANNEL_LINK, HIDDEN_CLASS, SKIP_BUTTON,
};
use crate::store::{self, keys, KeyValueStore, Values};
use crate::types::{BlockCategory, BlockEvent, Features, SelectorCategory};
use crate::url::channel_id;

/// Rejection reason seen by page code for a blocked request.
pub const BLOCK_REASON: &str = "Request blocked by ytguard";

/// Value of the detection signal exposed to the page.
pub const ADBLOCK_DETECTED: bool = false;

/// Inline styles applied by [`Suppressor::hide`].
const HIDDEN_STYLE: &[(&str, &str)] = &[
    ("display", "none"),
    ("visibility", "hidden"),
    ("opacity", "0"),
    ("height", "0"),
    ("width", "0"),
    ("overflow", "hidden"),
    ("position", "absolute"),
    ("left", "-9999px"),
];

// =============================================================================
// Request Interception
// =============================================================================

/// Entry point a request came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `fetch()`
    Fetch,
    /// `XMLHttpRequest.open()`
    XmlHttpRequest,
    /// Assignment to a media element's `src`
    MediaSource,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::XmlHttpRequest => "xhr",
            Self::MediaSource => "media source",
        }
    }
}

/// A request rejected before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", BLOCK_REASON)]
pub struct RequestBlocked {
    pub url: String,
    pub rule: String,
    pub list: ListName,
}

/// Media `src` slot whose writes go through the filter.
///
/// A rejected write is dropped; the getter keeps returning the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardedSource {
    value: Option<String>,
}

impl GuardedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns true if the value was applied.
    pub fn assign(&mut self, suppressor: &mut Suppressor, ctx: &mut Context<'_>, value: &str) -> bool {
        match suppressor.intercept(ctx, RequestKind::MediaSource, value) {
            Ok(()) => {
                self.value = Some(value.to_string());
                true
            }
            Err(_) => false,
        }
    }
}

// =============================================================================
// Settings / Stats
// =============================================================================

/// Partial settings update; `None` leaves a switch unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub dom_blocking: Option<bool>,
    pub network_blocking: Option<bool>,
    pub anti_detection: Option<bool>,
}

/// Snapshot for the popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppressorStats {
    pub enabled: bool,
    pub blocked_count: u64,
    pub network_blocking: bool,
    pub dom_blocking: bool,
    pub anti_anti_adblock: bool,
    pub whitelisted_channels: Vec<String>,
    pub filter_count: usize,
}

/// What video-ad handling did on this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoAdAction {
    /// No ad playing, or nothing left to do
    None,
    /// Clicked the skip control
    Skipped,
    /// Seeked a short ad to its end (and muted it)
    SeekedToEnd,
    /// Muted an ad that could not be skipped
    Muted,
    /// The ad we muted is over; sound is back on
    Unmuted,
}

/// Result of a host timer tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Hidden elements detached from the document
    pub removed: usize,
    /// Elements hidden by the periodic scan, if it ran
    pub scanned: Option<usize>,
}

// =============================================================================
// Suppressor
// =============================================================================

/// The DOM ad suppressor.
#[derive(Debug)]
pub struct Suppressor {
    selectors: SelectorSet,
    filters: FilterSet,
    whitelist: BTreeSet<String>,
    enabled: bool,
    features: Features,
    blocked: Counter,
    throttle: Throttle,
    rescan: IntervalGate,
    removals: TimerQueue<NodeId>,
    removal_grace_ms: u64,
    short_ad_threshold_secs: f64,
    ad_markers: Selector,
    skip_button: Selector,
    channel_link: Selector,
}

impl Suppressor {
    /// Build from configuration and the persisted settings.
    pub fn load(config: &EngineConfig, selectors: SelectorSet, store: &dyn KeyValueStore) -> Self {
        let values = store.get(&[
            keys::ADBLOCK_ENABLED,
            keys::ADBLOCK_NETWORK,
            keys::ADBLOCK_DOM,
            keys::ADBLOCK_ANTI_ANTI,
            keys::ADBLOCK_WHITELIST,
            keys::ADBLOCK_CUSTOM_FILTERS,
        ]);

        let mut features = Features::empty();
        features.set(Features::DOM, store::read_switch(&values, keys::ADBLOCK_DOM));
        features.set(Features::NETWORK, store::read_switch(&values, keys::ADBLOCK_NETWORK));
        features.set(Features::ANTI_DETECTION, store::read_switch(&values, keys::ADBLOCK_ANTI_ANTI));

        let whitelist: Vec<String> = store::read(&values, keys::ADBLOCK_WHITELIST).unwrap_or_default();
        let custom: Vec<String> = store::read(&values, keys::ADBLOCK_CUSTOM_FILTERS).unwrap_or_default();

        let mut filters = FilterSet::builtin();
        if !config.extra_filters.is_empty() {
            let mut builtin = filters.list(ListName::Builtin).to_vec();
            builtin.extend(config.extra_filters.iter().filter_map(|raw| FilterRule::parse(raw)));
            filters.set_list(ListName::Builtin, builtin);
        }
        filters.set_list(ListName::Custom, parse_rules(&custom));

        log::info!(
            "Suppressor initialized: {} selectors, {} filters",
            selectors.len(),
            filters.len()
        );

        Self {
            selectors,
            filters,
            whitelist: whitelist.into_iter().collect(),
            enabled: store::read_switch(&values, keys::ADBLOCK_ENABLED),
            features,
            blocked: Counter::load(store, keys::ADBLOCK_COUNT),
            throttle: Throttle::new(config.throttle_ms),
            rescan: IntervalGate::new(config.rescan_interval_ms),
            removals: TimerQueue::new(),
            removal_grace_ms: config.removal_grace_ms,
            short_ad_threshold_secs: config.short_ad_threshold_secs,
            ad_markers: Selector::parse_or_empty(AD_PLAYING_MARKERS),
            skip_button: Selector::parse_or_empty(SKIP_BUTTON),
            channel_link: Selector::parse_or_empty(CHANNEL_LINK),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn blocked_count(&self) -> u64 {
        self.blocked.value()
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn selectors(&self) -> &SelectorSet {
        &self.selectors
    }

    pub fn pending_removals(&self) -> usize {
        self.removals.len()
    }

    fn dom_active(&self) -> bool {
        self.enabled && self.features.contains(Features::DOM)
    }

    /// Channel owning the current media item, from the page's channel link.
    pub fn page_channel<D: DomTree>(&self, dom: &D) -> Option<String> {
        let link = dom.query(&self.channel_link)?;
        let href = dom.attribute(link, "href")?;
        channel_id(&href).map(str::to_string)
    }

    fn is_whitelisted_page<D: DomTree>(&self, dom: &D) -> bool {
        if self.whitelist.is_empty() {
            return false;
        }
        match self.page_channel(dom) {
            Some(channel) if self.whitelist.contains(&channel) => {
                log::debug!("Channel '{}' is whitelisted, skipping suppression", channel);
                true
            }
            _ => false,
        }
    }

    // -------------------------------------------------------------------------
    // Hiding
    // -------------------------------------------------------------------------

    /// Hide an element and schedule its removal. Returns false if it was
    /// already hidden by this component.
    pub fn hide<D: DomTree>(&mut self, dom: &mut D, node: NodeId, category: SelectorCategory, now_ms: u64) -> bool {
        if dom.has_class(node, HIDDEN_CLASS) {
            return false;
        }
        for (property, value) in HIDDEN_STYLE {
            dom.set_inline_style(node, property, value);
        }
        dom.add_class(node, HIDDEN_CLASS);
        dom.set_attribute(node, CATEGORY_ATTRIBUTE, category.as_str());
        self.removals.schedule(now_ms + self.removal_grace_ms, node);
        true
    }

    /// Full document pass. Returns the number of elements hidden.
    pub fn scan<D: DomTree>(
        &mut self,
        dom: &mut D,
        player: Option<&mut dyn Player>,
        ctx: &mut Context<'_>,
    ) -> usize {
        if !self.dom_active() || self.is_whitelisted_page(dom) {
            return 0;
        }

        let now = ctx.now_ms();
        self.rescan.mark(now);

        let mut matches: Vec<(SelectorCategory, NodeId)> = Vec::new();
        for (category, selectors) in self.selectors.iter() {
            for selector in selectors {
                for node in dom.query_all(dom.root(), selector) {
                    matches.push((category, node));
                }
            }
        }

        let hidden = self.hide_visible(dom, ctx, matches);

        if let Some(player) = player {
            self.handle_video_ad(dom, player, ctx);
        }

        if hidden > 0 {
            log::info!("Blocked {} ads in DOM scan", hidden);
        }
        hidden
    }

    /// Throttled pass over the subtrees named by a mutation batch. Batches
    /// arriving inside the throttle window are dropped.
    pub fn on_mutations<D: DomTree>(
        &mut self,
        dom: &mut D,
        ctx: &mut Context<'_>,
        records: &[MutationRecord],
    ) -> usize {
        if !self.dom_active() {
            return 0;
        }
        if !self.throttle.try_acquire(ctx.now_ms()) {
            log::debug!("Mutation batch of {} records dropped by throttle", records.len());
            return 0;
        }
        if self.is_whitelisted_page(dom) {
            return 0;
        }

        let mut roots: Vec<NodeId> = records.iter().flat_map(MutationRecord::scan_roots).collect();
        roots.sort_unstable();
        roots.dedup();

        let mut matches = Vec::new();
        for root in roots {
            if !dom.is_connected(root) {
                continue;
            }
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                if let Some(category) = self.selectors.categorize(dom, node) {
                    matches.push((category, node));
                }
                stack.extend(dom.children(node).into_iter().rev());
            }
        }

        let hidden = self.hide_visible(dom, ctx, matches);
        if hidden > 0 {
            log::debug!("Blocked {} ads from mutations", hidden);
        }
        hidden
    }

    fn hide_visible<D: DomTree>(
        &mut self,
        dom: &mut D,
        ctx: &mut Context<'_>,
        matches: Vec<(SelectorCategory, NodeId)>,
    ) -> usize {
        let now = ctx.now_ms();
        let mut per_category: BTreeMap<SelectorCategory, u64> = BTreeMap::new();
        for (category, node) in matches {
            if dom.is_visible(node) && self.hide(dom, node, category, now) {
                *per_category.entry(category).or_default() += 1;
            }
        }

        let mut total = 0;
        for (category, count) in per_category {
            total += count as usize;
            self.record(
                ctx,
                BlockEvent {
                    count,
                    category: category.into(),
                    timestamp_ms: now,
                },
            );
        }
        total
    }

    /// Host timer entry point.
    pub fn tick<D: DomTree>(
        &mut self,
        dom: &mut D,
        player: Option<&mut dyn Player>,
        ctx: &mut Context<'_>,
    ) -> TickReport {
        let now = ctx.now_ms();
        let removed = self.flush_removals(dom, now);
        let scanned = if self.rescan.is_due(now) {
            self.rescan.mark(now);
            Some(self.scan(dom, player, ctx))
        } else {
            None
        };
        TickReport { removed, scanned }
    }

    /// Detach hidden elements whose grace delay has passed.
    pub fn flush_removals<D: DomTree>(&mut self, dom: &mut D, now_ms: u64) -> usize {
        let mut removed = 0;
        for node in self.removals.drain_due(now_ms) {
            if dom.is_connected(node) {
                dom.remove(node);
                removed += 1;
            }
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Video ads
    // -------------------------------------------------------------------------

    /// Skip, fast-forward or mute a playing video ad.
    pub fn handle_video_ad<D: DomTree>(
        &mut self,
        dom: &mut D,
        player: &mut dyn Player,
        ctx: &mut Context<'_>,
    ) -> VideoAdAction {
        if !self.dom_active() || dom.query(&self.ad_markers).is_none() {
            return Self::restore_after_ad(player);
        }

        if let Some(button) = dom.query(&self.skip_button) {
            // Interactable = rendered (has an offset parent)
            if dom.offset_size(button).is_some() {
                dom.click(button);
                self.record_one(ctx, BlockCategory::VideoAd);
                log::info!("Auto-clicked skip button");
                return VideoAdAction::Skipped;
            }
        }

        let mut action = VideoAdAction::None;
        let duration = player.duration();
        if is_known_duration(duration)
            && duration < self.short_ad_threshold_secs
            && player.current_time() < duration
        {
            player.seek(duration);
            self.record_one(ctx, BlockCategory::VideoAd);
            log::info!("Seeked past video ad");
            action = VideoAdAction::SeekedToEnd;
        }

        if !player.is_muted() && !player.is_mute_flagged() {
            player.set_muted(true);
            player.flag_muted();
            if action == VideoAdAction::None {
                action = VideoAdAction::Muted;
            }
        }
        action
    }

    /// Undo our mute once no ad is playing. Only flagged elements were muted
    /// by us, and they were unmuted before.
    fn restore_after_ad(player: &mut dyn Player) -> VideoAdAction {
        if !player.is_mute_flagged() {
            return VideoAdAction::None;
        }
        player.clear_mute_flag();
        if player.is_muted() {
            player.set_muted(false);
            log::debug!("Ad over, unmuted");
            return VideoAdAction::Unmuted;
        }
        VideoAdAction::None
    }

    // -------------------------------------------------------------------------
    // Network
    // -------------------------------------------------------------------------

    /// Pure blocking decision for a request URL.
    pub fn should_block(&self, url: &str) -> bool {
        self.match_request(url).is_some()
    }

    fn match_request(&self, url: &str) -> Option<(ListName, &FilterRule)> {
        if !self.enabled || !self.features.contains(Features::NETWORK) {
            return None;
        }
        self.filters.find_match(url)
    }

    /// Interceptor hook for the request entry points.
    pub fn intercept(&mut self, ctx: &mut Context<'_>, kind: RequestKind, url: &str) -> Result<(), RequestBlocked> {
        let blocked = match self.match_request(url) {
            Some((list, rule)) => RequestBlocked {
                url: url.to_string(),
                rule: rule.raw().to_string(),
                list,
            },
            None => return Ok(()),
        };
        log::info!("Blocked {} request: {} ({})", kind.as_str(), url, blocked.rule);
        self.record_one(ctx, BlockCategory::Network);
        Err(blocked)
    }

    // -------------------------------------------------------------------------
    // Anti-detection
    // -------------------------------------------------------------------------

    /// Detection signal presented to the page.
    pub fn adblock_detected(&self) -> bool {
        ADBLOCK_DETECTED
    }

    /// Computed style as reported to page code: elements this component hid
    /// read as visible, everything else reads truthfully.
    pub fn reported_style<D: DomTree>(&self, dom: &D, node: NodeId, property: &str) -> String {
        let real = dom.computed_style(node, property);
        if !self.features.contains(Features::ANTI_DETECTION) {
            return real;
        }
        let ours = dom.has_class(node, HIDDEN_CLASS)
            && dom.inline_style(node, "display").as_deref() == Some("none");
        if !ours {
            return real;
        }
        match property {
            "display" => "block".to_string(),
            "visibility" => "visible".to_string(),
            "opacity" => "1".to_string(),
            _ => real,
        }
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    /// Toggle a channel's whitelist membership. Returns the new membership.
    pub fn toggle_whitelist(&mut self, ctx: &mut Context<'_>, channel: &str) -> bool {
        if channel.is_empty() {
            return false;
        }
        let member = if self.whitelist.remove(channel) {
            false
        } else {
            self.whitelist.insert(channel.to_string());
            true
        };
        let list: Vec<&String> = self.whitelist.iter().collect();
        store::write_one(ctx.store, keys::ADBLOCK_WHITELIST, json!(list));
        member
    }

    pub fn is_whitelisted(&self, channel: &str) -> bool {
        self.whitelist.contains(channel)
    }

    /// Apply and persist a settings patch. Disabling the engine restores the
    /// page.
    pub fn update_settings<D: DomTree>(&mut self, dom: &mut D, ctx: &mut Context<'_>, patch: SettingsPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(on) = patch.dom_blocking {
            self.features.set(Features::DOM, on);
        }
        if let Some(on) = patch.network_blocking {
            self.features.set(Features::NETWORK, on);
        }
        if let Some(on) = patch.anti_detection {
            self.features.set(Features::ANTI_DETECTION, on);
        }

        let mut values = Values::new();
        values.insert(keys::ADBLOCK_ENABLED.into(), Value::Bool(self.enabled));
        values.insert(keys::ADBLOCK_NETWORK.into(), Value::Bool(self.features.contains(Features::NETWORK)));
        values.insert(keys::ADBLOCK_DOM.into(), Value::Bool(self.features.contains(Features::DOM)));
        values.insert(
            keys::ADBLOCK_ANTI_ANTI.into(),
            Value::Bool(self.features.contains(Features::ANTI_DETECTION)),
        );
        store::write(ctx.store, values);

        if patch.enabled == Some(false) {
            let restored = self.cleanup(dom);
            log::info!("Suppressor disabled, restored {} elements", restored);
        }
    }

    /// Undo hiding for elements still in the document and drop pending
    /// removals. Returns the number of restored elements.
    pub fn cleanup<D: DomTree>(&mut self, dom: &mut D) -> usize {
        self.removals.clear();
        let marker = Selector::parse_or_empty(&format!(".{HIDDEN_CLASS}"));
        let hidden = dom.query_all(dom.root(), &marker);
        for &node in &hidden {
            for (property, _) in HIDDEN_STYLE {
                dom.remove_inline_style(node, property);
            }
            dom.remove_class(node, HIDDEN_CLASS);
            dom.remove_attribute(node, CATEGORY_ATTRIBUTE);
        }
        hidden.len()
    }

    /// Replace the custom filter list. Returns the number of usable rules.
    pub fn set_custom_filters(&mut self, ctx: &mut Context<'_>, raw: Vec<String>) -> usize {
        let rules = parse_rules(&raw);
        let accepted = rules.len();
        self.filters.set_list(ListName::Custom, rules);
        store::write_one(ctx.store, keys::ADBLOCK_CUSTOM_FILTERS, json!(raw));
        log::info!("Loaded {} custom filters", accepted);
        accepted
    }

    /// Explicit user reset of the blocked counter.
    pub fn reset_count(&mut self, ctx: &mut Context<'_>) {
        self.blocked.reset(ctx.store);
        ctx.notifier.update_badge(ctx.tab_id, 0);
    }

    pub fn stats(&self) -> SuppressorStats {
        SuppressorStats {
            enabled: self.enabled,
            blocked_count: self.blocked.value(),
            network_blocking: self.features.contains(Features::NETWORK),
            dom_blocking: self.features.contains(Features::DOM),
            anti_anti_adblock: self.features.contains(Features::ANTI_DETECTION),
            whitelisted_channels: self.whitelist.iter().cloned().collect(),
            filter_count: self.filters.len(),
        }
    }

    // -------------------------------------------------------------------------
    // Counting
    // -------------------------------------------------------------------------

    fn record_one(&mut self, ctx: &mut Context<'_>, category: BlockCategory) {
        let event = BlockEvent {
            count: 1,
            category,
            timestamp_ms: ctx.now_ms(),
        };
        self.record(ctx, event);
    }

    fn record(&mut self, ctx: &mut Context<'_>, event: BlockEvent) {
        let total = self.blocked.add(ctx.store, event.count);
        ctx.notifier.update_badge(ctx.tab_id, total);
        ctx.notifier.report(EngineEvent::AdsBlocked {
            count: event.count,
            total,
            category: event.category,
        });
        log::debug!(
            "Recorded {} {} block(s) at {}",
            event.count,
            event.category.as_str(),
            event.timestamp_ms
        );
    }
}

fn parse_rules(raw: &[String]) -> Vec<FilterRule> {
    raw.iter()
        .filter_map(|text| {
            let rule = FilterRule::parse(text);
            if rule.is_none() {
                log::warn!("Ignoring unusable filter '{}'", text);
            }
            rule
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::notify::RecordingNotifier;
    use crate::player::MediaState;
    use crate::scheduler::ManualClock;
    use crate::store::MemoryStore;

    struct Harness {
        store: MemoryStore,
        notifier: RecordingNotifier,
        clock: ManualClock,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                notifier: RecordingNotifier::new(),
                clock: ManualClock::new(10_000),
            }
        }

        fn ctx(&mut self) -> Context<'_> {
            Context::new(&mut self.store, &mut self.notifier, &self.clock).with_tab(7)
        }

        fn suppressor(&self) -> Suppressor {
            Suppressor::load(&EngineConfig::default(), SelectorSet::builtin(), &self.store)
        }
    }

    fn banner_page() -> (Document, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        doc.append(body, "div", &[("id", "content")]);
        let ad = doc.append(body, "div", &[("id", "masthead-ad")]);
        (doc, ad)
    }

    #[test]
    fn test_scan_hides_visible_banner_once() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let (mut doc, ad) = banner_page();

        assert_eq!(suppressor.scan(&mut doc, None, &mut h.ctx()), 1);
        assert!(doc.has_class(ad, HIDDEN_CLASS));
        assert_eq!(doc.attribute(ad, CATEGORY_ATTRIBUTE).as_deref(), Some("banner"));
        assert!(!doc.is_visible(ad));

        assert_eq!(suppressor.scan(&mut doc, None, &mut h.ctx()), 0);
        assert_eq!(suppressor.blocked_count(), 1);
        assert_eq!(h.store.value(keys::ADBLOCK_COUNT), Some(&json!(1)));
        assert_eq!(h.notifier.badges.last(), Some(&(Some(7), 1)));
    }

    #[test]
    fn test_scan_skips_whitelisted_channel() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let (mut doc, ad) = banner_page();
        let body = doc.body();
        doc.append(body, "a", &[("href", "https://www.youtube.com/channel/abc")]);

        assert!(suppressor.toggle_whitelist(&mut h.ctx(), "abc"));
        assert_eq!(suppressor.scan(&mut doc, None, &mut h.ctx()), 0);
        assert!(!doc.has_class(ad, HIDDEN_CLASS));
        assert_eq!(h.store.value(keys::ADBLOCK_WHITELIST), Some(&json!(["abc"])));

        assert!(!suppressor.toggle_whitelist(&mut h.ctx(), "abc"));
        assert_eq!(suppressor.scan(&mut doc, None, &mut h.ctx()), 1);
    }

    #[test]
    fn test_scan_ignores_invisible_and_disabled() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let (mut doc, ad) = banner_page();
        doc.set_size(ad, 0.0, 0.0);
        assert_eq!(suppressor.scan(&mut doc, None, &mut h.ctx()), 0);

        doc.set_size(ad, 300.0, 90.0);
        let mut dom_off = Document::new();
        suppressor.update_settings(
            &mut dom_off,
            &mut h.ctx(),
            SettingsPatch { dom_blocking: Some(false), ..Default::default() },
        );
        assert_eq!(suppressor.scan(&mut doc, None, &mut h.ctx()), 0);
        assert_eq!(h.store.value(keys::ADBLOCK_DOM), Some(&json!(false)));
    }

    #[test]
    fn test_hide_is_idempotent() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let (mut doc, ad) = banner_page();

        assert!(suppressor.hide(&mut doc, ad, SelectorCategory::Banner, 0));
        let once = doc.clone();
        assert!(!suppressor.hide(&mut doc, ad, SelectorCategory::Video, 0));

        for (property, _) in HIDDEN_STYLE {
            assert_eq!(doc.inline_style(ad, property), once.inline_style(ad, property));
        }
        assert_eq!(doc.attribute(ad, "class"), once.attribute(ad, "class"));
        assert_eq!(doc.attribute(ad, CATEGORY_ATTRIBUTE).as_deref(), Some("banner"));
        assert_eq!(suppressor.pending_removals(), 1);
    }

    #[test]
    fn test_removal_after_grace_delay() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let (mut doc, ad) = banner_page();

        suppressor.scan(&mut doc, None, &mut h.ctx());
        h.clock.advance(999);
        assert_eq!(suppressor.tick(&mut doc, None, &mut h.ctx()).removed, 0);
        assert!(doc.is_connected(ad));

        h.clock.advance(1);
        let report = suppressor.tick(&mut doc, None, &mut h.ctx());
        assert_eq!(report.removed, 1);
        assert!(!doc.is_connected(ad));
    }

    #[test]
    fn test_periodic_scan_is_gated() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let (mut doc, _) = banner_page();

        assert_eq!(suppressor.tick(&mut doc, None, &mut h.ctx()).scanned, Some(1));
        h.clock.advance(500);
        assert_eq!(suppressor.tick(&mut doc, None, &mut h.ctx()).scanned, None);
        h.clock.advance(500);
        assert_eq!(suppressor.tick(&mut doc, None, &mut h.ctx()).scanned, Some(0));
    }

    #[test]
    fn test_mutations_are_throttled_and_scoped() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let mut doc = Document::new();
        let body = doc.body();
        let untouched = doc.append(body, "div", &[("id", "masthead-ad")]);
        let container = doc.append(body, "div", &[]);
        let first = doc.append(container, "ytd-ad-slot-renderer", &[]);

        let records = vec![MutationRecord::ChildList { added: vec![container] }];
        assert_eq!(suppressor.on_mutations(&mut doc, &mut h.ctx(), &records), 1);
        assert!(doc.has_class(first, HIDDEN_CLASS));
        assert_eq!(doc.attribute(first, CATEGORY_ATTRIBUTE).as_deref(), Some("sidebar"));
        // Outside the changed subtree
        assert!(!doc.has_class(untouched, HIDDEN_CLASS));

        let second = doc.append(body, "div", &[("class", "video-ads")]);
        h.clock.advance(50);
        let records = vec![MutationRecord::ChildList { added: vec![second] }];
        assert_eq!(suppressor.on_mutations(&mut doc, &mut h.ctx(), &records), 0);
        assert!(!doc.has_class(second, HIDDEN_CLASS));

        h.clock.advance(50);
        assert_eq!(suppressor.on_mutations(&mut doc, &mut h.ctx(), &records), 1);
        assert_eq!(doc.attribute(second, CATEGORY_ATTRIBUTE).as_deref(), Some("video"));
    }

    #[test]
    fn test_attribute_mutation_rescans_target() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let mut doc = Document::new();
        let body = doc.body();
        let el = doc.append(body, "div", &[]);
        doc.set_attribute(el, "class", "ytd-banner-promo-renderer");

        let records = vec![MutationRecord::Attributes { target: el, name: "class".into() }];
        assert_eq!(suppressor.on_mutations(&mut doc, &mut h.ctx(), &records), 1);
    }

    #[test]
    fn test_video_ad_skip_button() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let mut doc = Document::new();
        let body = doc.body();
        let button = doc.append(body, "button", &[("class", "ytp-ad-skip-button")]);
        let mut media = MediaState::new(15.0);

        let action = suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx());
        assert_eq!(action, VideoAdAction::Skipped);
        assert_eq!(doc.click_count(button), 1);
        assert!(!media.muted);
        assert_eq!(suppressor.blocked_count(), 1);
    }

    #[test]
    fn test_video_ad_short_seeks_and_mutes() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let mut doc = Document::new();
        let body = doc.body();
        doc.append(body, "span", &[("class", "ytp-ad-duration-remaining")]);
        let button = doc.append(body, "button", &[("class", "ytp-skip-ad-button")]);
        doc.set_inline_style(button, "display", "none");
        let mut media = MediaState::new(12.0);

        let action = suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx());
        assert_eq!(action, VideoAdAction::SeekedToEnd);
        assert_eq!(media.current_time, 12.0);
        assert!(media.muted && media.mute_flag);
        assert_eq!(doc.click_count(button), 0);

        // Already at the end and flagged: nothing more to do or count
        let action = suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx());
        assert_eq!(action, VideoAdAction::None);
        assert_eq!(suppressor.blocked_count(), 1);
    }

    #[test]
    fn test_video_ad_long_is_muted_once() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let mut doc = Document::new();
        let body = doc.body();
        doc.append(body, "div", &[("class", "ytp-ad-text")]);
        let mut media = MediaState::new(600.0);

        assert_eq!(suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx()), VideoAdAction::Muted);
        assert_eq!(media.current_time, 0.0);

        // User unmutes; the flag stops us from muting again
        media.muted = false;
        assert_eq!(suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx()), VideoAdAction::None);
        assert!(!media.muted);
        assert_eq!(suppressor.blocked_count(), 0);
    }

    #[test]
    fn test_mute_restored_when_ad_ends() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let mut doc = Document::new();
        let body = doc.body();
        let marker = doc.append(body, "div", &[("class", "ytp-ad-text")]);
        let mut media = MediaState::new(600.0);

        assert_eq!(suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx()), VideoAdAction::Muted);
        assert!(media.muted && media.mute_flag);

        doc.remove(marker);
        assert_eq!(suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx()), VideoAdAction::Unmuted);
        assert!(!media.muted && !media.mute_flag);

        // A user mute outside ads is left alone
        media.muted = true;
        assert_eq!(suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx()), VideoAdAction::None);
        assert!(media.muted);
    }

    #[test]
    fn test_user_unmute_during_ad_clears_flag_after() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let mut doc = Document::new();
        let body = doc.body();
        let marker = doc.append(body, "div", &[("class", "ytp-ad-text")]);
        let mut media = MediaState::new(600.0);

        suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx());
        media.muted = false;
        doc.remove(marker);
        assert_eq!(suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx()), VideoAdAction::None);
        assert!(!media.mute_flag);

        // The next ad is muted again
        doc.append(body, "div", &[("class", "ytp-ad-text")]);
        assert_eq!(suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx()), VideoAdAction::Muted);
    }

    #[test]
    fn test_no_ad_markers_no_action() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let mut doc = Document::new();
        let mut media = MediaState::new(10.0);
        assert_eq!(suppressor.handle_video_ad(&mut doc, &mut media, &mut h.ctx()), VideoAdAction::None);
        assert!(!media.muted);
    }

    #[test]
    fn test_intercept_blocks_and_counts() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();

        let err = suppressor
            .intercept(&mut h.ctx(), RequestKind::Fetch, "https://googleads.g.doubleclick.net/pagead/id")
            .unwrap_err();
        assert_eq!(err.to_string(), BLOCK_REASON);
        assert_eq!(err.rule, "||doubleclick.net^");
        assert_eq!(err.list, ListName::Builtin);

        assert!(suppressor
            .intercept(&mut h.ctx(), RequestKind::XmlHttpRequest, "https://www.youtube.com/youtubei/v1/next")
            .is_ok());
        assert_eq!(suppressor.blocked_count(), 1);
        assert!(matches!(
            h.notifier.events.last(),
            Some(EngineEvent::AdsBlocked { category: BlockCategory::Network, total: 1, .. })
        ));
    }

    #[test]
    fn test_should_block_respects_switches() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let url = "https://www.youtube.com/api/stats/ads?ver=2";
        assert!(suppressor.should_block(url));

        let mut doc = Document::new();
        suppressor.update_settings(
            &mut doc,
            &mut h.ctx(),
            SettingsPatch { network_blocking: Some(false), ..Default::default() },
        );
        assert!(!suppressor.should_block(url));
    }

    #[test]
    fn test_media_source_write_dropped() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let mut source = GuardedSource::new();

        assert!(source.assign(&mut suppressor, &mut h.ctx(), "blob:https://www.youtube.com/1"));
        assert!(!source.assign(
            &mut suppressor,
            &mut h.ctx(),
            "https://r1.googlevideo.com/videoplayback?x=1&dur=15.0&gir=yes&lmt=1"
        ));
        assert_eq!(source.get(), Some("blob:https://www.youtube.com/1"));

        let mut fresh = GuardedSource::new();
        assert!(!fresh.assign(&mut suppressor, &mut h.ctx(), "https://ad.doubleclick.net/v.mp4"));
        assert_eq!(fresh.get(), None);
    }

    #[test]
    fn test_reported_style_only_lies_for_own_elements() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let (mut doc, ad) = banner_page();
        let body = doc.body();
        let ordinary = doc.append(body, "div", &[]);
        doc.set_inline_style(ordinary, "display", "none");

        suppressor.scan(&mut doc, None, &mut h.ctx());
        assert_eq!(doc.computed_style(ad, "display"), "none");
        assert_eq!(suppressor.reported_style(&doc, ad, "display"), "block");
        assert_eq!(suppressor.reported_style(&doc, ad, "visibility"), "visible");
        assert_eq!(suppressor.reported_style(&doc, ad, "opacity"), "1");
        assert_eq!(suppressor.reported_style(&doc, ad, "width"), "0");
        assert_eq!(suppressor.reported_style(&doc, ordinary, "display"), "none");
        assert!(!suppressor.adblock_detected());
    }

    #[test]
    fn test_disable_restores_page() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let (mut doc, ad) = banner_page();
        suppressor.scan(&mut doc, None, &mut h.ctx());

        suppressor.update_settings(
            &mut doc,
            &mut h.ctx(),
            SettingsPatch { enabled: Some(false), ..Default::default() },
        );
        assert!(doc.is_visible(ad));
        assert!(!doc.has_class(ad, HIDDEN_CLASS));
        assert_eq!(suppressor.pending_removals(), 0);
        assert_eq!(h.store.value(keys::ADBLOCK_ENABLED), Some(&json!(false)));

        h.clock.advance(5_000);
        assert_eq!(suppressor.tick(&mut doc, None, &mut h.ctx()), TickReport { removed: 0, scanned: Some(0) });
    }

    #[test]
    fn test_custom_filters_persist_and_reload() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let accepted = suppressor.set_custom_filters(&mut h.ctx(), vec!["tracker.example".into(), "*".into()]);
        assert_eq!(accepted, 1);
        assert!(suppressor.should_block("https://tracker.example/p"));

        let reloaded = h.suppressor();
        assert!(reloaded.should_block("https://tracker.example/p"));
        assert_eq!(reloaded.stats().filter_count, crate::filter::BUILTIN_FILTERS.len() + 1);
    }

    #[test]
    fn test_counter_matches_successful_operations() {
        let mut h = Harness::new();
        let mut suppressor = h.suppressor();
        let (mut doc, _) = banner_page();
        let body = doc.body();
        doc.append(body, "ytd-promoted-video-renderer", &[]);

        let hidden = suppressor.scan(&mut doc, None, &mut h.ctx());
        let _ = suppressor.intercept(&mut h.ctx(), RequestKind::Fetch, "https://doubleclick.net/x");
        let _ = suppressor.intercept(&mut h.ctx(), RequestKind::Fetch, "https://example.com/x");
        assert_eq!(hidden, 2);
        assert_eq!(h.store.value(keys::ADBLOCK_COUNT), Some(&json!(3)));

        suppressor.reset_count(&mut h.ctx());
        assert_eq!(h.store.value(keys::ADBLOCK_COUNT), Some(&json!(0)));
        assert_eq!(suppressor.stats().blocked_count, 0);
    }

    #[test]
    fn test_extra_filters_from_config() {
        let h = Harness::new();
        let config = EngineConfig {
            extra_filters: vec!["||ads.example^".into()],
            ..EngineConfig::default()
        };
        let suppressor = Suppressor::load(&config, SelectorSet::builtin(), &h.store);
        assert!(suppressor.should_block("https://ads.example/x"));
        assert_eq!(suppressor.filters().list(ListName::Builtin).len(), crate::filter::BUILTIN_FILTERS.len() + 1);
    }
}
