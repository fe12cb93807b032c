//! Segment Skip Controller
//!
//! Keeps the community segment list for the current media item, decides
//! which segment (if any) covers the playback position, and skips it.
//!
//! Loading is split in two so the host owns the network:
//!
//! ```text
//! load_segments(id) -> LoadOutcome::Fetch(ticket)
//!        host GETs ticket.url
//! complete_load(ticket, result) -> segments replaced, markers rendered
//! ```
//!
//! A ticket whose item is no longer current is discarded on completion.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::api::{self, ApiError, Submission, SubmissionBody, SubmittedSegment};
use crate::config::EngineConfig;
use crate::context::{Context, Counter};
use crate::dom::{DomTree, Selector};
use crate::notify::{EngineEvent, Notification, DEFAULT_NOTIFICATION_MS};
use crate::player::{is_known_duration, Player};
use crate::scheduler::format_time;
use crate::selectors::{MARKER_CLASS, PROGRESS_BAR};
use crate::store::{self, keys, KeyValueStore, Values};
use crate::types::{CategoryPolicy, Segment, SegmentCategory, Severity, FALLBACK_MARKER_COLOR};

/// Prefix of generated submitter ids.
const USER_ID_PREFIX: &str = "ytguard_";

/// Fixed marker styles; position, size and color are added per segment.
const MARKER_STYLE: &[(&str, &str)] = &[
    ("position", "absolute"),
    ("height", "100%"),
    ("opacity", "0.8"),
    ("pointer-events", "none"),
    ("z-index", "1"),
];

/// A fetch the host must perform for [`SkipController::complete_load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub item_id: String,
    pub categories: Vec<SegmentCategory>,
    pub url: String,
}

/// Result of [`SkipController::load_segments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Same item as last time; the cached list stands
    Cached,
    /// Disabled, or no category enabled; the list is now empty
    Empty,
    /// The host must fetch and complete this ticket
    Fetch(FetchTicket),
}

/// Error preparing a submission.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("Segment skipping is disabled")]
    Disabled,
    #[error("No media item is loaded")]
    NoItem,
    #[error("Invalid segment range {start}..{end}")]
    InvalidRange { start: f64, end: f64 },
    #[error("Unknown segment category")]
    UnknownCategory,
}

/// Position and look of one timeline marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerLayout {
    pub left_percent: f64,
    pub width_percent: f64,
    pub color: String,
    pub title: String,
}

/// Partial settings update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkipSettingsPatch {
    pub enabled: Option<bool>,
    /// Merged over the current policies
    pub categories: BTreeMap<SegmentCategory, CategoryPolicy>,
}

/// Snapshot for the popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipStats {
    pub enabled: bool,
    pub skip_count: u64,
    pub segments_found: usize,
    pub current_item: Option<String>,
}

/// The segment skip controller.
#[derive(Debug)]
pub struct SkipController {
    enabled: bool,
    api_base: String,
    notification_ms: u64,
    categories: BTreeMap<SegmentCategory, CategoryPolicy>,
    segments: Vec<Segment>,
    current_item: Option<String>,
    skips: Counter,
    user_id: Option<String>,
    progress_bar: Selector,
    markers: Selector,
}

impl SkipController {
    /// Build from configuration and the persisted settings.
    pub fn load(config: &EngineConfig, store: &dyn KeyValueStore) -> Self {
        let values = store.get(&[
            keys::SPONSORBLOCK_ENABLED,
            keys::SPONSORBLOCK_CATEGORIES,
            keys::SPONSORBLOCK_USERID,
        ]);

        let mut categories: BTreeMap<SegmentCategory, CategoryPolicy> = SegmentCategory::KNOWN
            .into_iter()
            .map(|category| (category, category.default_policy()))
            .collect();
        let stored: BTreeMap<String, CategoryPolicy> =
            store::read(&values, keys::SPONSORBLOCK_CATEGORIES).unwrap_or_default();
        for (name, policy) in stored {
            match SegmentCategory::parse(&name) {
                SegmentCategory::Unknown => log::warn!("Ignoring policy for unknown category '{}'", name),
                category => {
                    categories.insert(category, policy);
                }
            }
        }

        let controller = Self {
            enabled: store::read_switch(&values, keys::SPONSORBLOCK_ENABLED),
            api_base: config.api_base.clone(),
            notification_ms: config.notification_ms,
            categories,
            segments: Vec::new(),
            current_item: None,
            skips: Counter::load(store, keys::SPONSORBLOCK_SKIPCOUNT),
            user_id: store::read(&values, keys::SPONSORBLOCK_USERID),
            progress_bar: Selector::parse_or_empty(PROGRESS_BAR),
            markers: Selector::parse_or_empty(&format!(".{MARKER_CLASS}")),
        };
        log::info!("Skip controller initialized");
        controller
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn current_item(&self) -> Option<&str> {
        self.current_item.as_deref()
    }

    pub fn skip_count(&self) -> u64 {
        self.skips.value()
    }

    pub fn policy(&self, category: SegmentCategory) -> Option<&CategoryPolicy> {
        self.categories.get(&category)
    }

    fn is_category_enabled(&self, category: SegmentCategory) -> bool {
        self.categories.get(&category).is_some_and(|policy| policy.enabled)
    }

    /// Enabled categories, in request order.
    pub fn enabled_categories(&self) -> Vec<SegmentCategory> {
        SegmentCategory::KNOWN
            .into_iter()
            .filter(|category| self.is_category_enabled(*category))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Switch to `item_id`. The current id is updated before any fetch is
    /// handed out, so a second call for the same id never fetches again.
    pub fn load_segments(&mut self, item_id: &str) -> LoadOutcome {
        if self.current_item.as_deref() == Some(item_id) {
            return LoadOutcome::Cached;
        }

        self.current_item = Some(item_id.to_string());
        self.segments.clear();

        if !self.enabled || item_id.is_empty() {
            return LoadOutcome::Empty;
        }
        let categories = self.enabled_categories();
        if categories.is_empty() {
            return LoadOutcome::Empty;
        }

        log::info!("Fetching segments for {}", item_id);
        let url = api::segments_url(&self.api_base, item_id, &categories);
        LoadOutcome::Fetch(FetchTicket {
            item_id: item_id.to_string(),
            categories,
            url,
        })
    }

    /// Apply a finished fetch. Returns false if the ticket was stale.
    pub fn complete_load<D: DomTree>(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Segment>, ApiError>,
        dom: &mut D,
        player: &dyn Player,
    ) -> bool {
        if self.current_item.as_deref() != Some(ticket.item_id.as_str()) {
            log::debug!("Discarding stale segments for {}", ticket.item_id);
            return false;
        }

        self.segments = match result {
            Ok(segments) => {
                log::info!("Found {} segments", segments.len());
                segments
            }
            Err(e) => {
                log::warn!("Segment fetch for {} failed: {}", ticket.item_id, e);
                Vec::new()
            }
        };
        self.render_markers(dom, player.duration());
        true
    }

    // -------------------------------------------------------------------------
    // Playback
    // -------------------------------------------------------------------------

    /// Segment covering `time`. With overlaps the earliest start wins; equal
    /// starts keep list order.
    pub fn check_position(&self, time: f64) -> Option<&Segment> {
        if !self.enabled {
            return None;
        }
        self.segments
            .iter()
            .filter(|segment| segment.contains(time) && self.is_category_enabled(segment.category))
            .min_by(|a, b| a.start_time.total_cmp(&b.start_time))
    }

    /// Jump past `segment`. Returns false if playback is already past it.
    pub fn skip(&mut self, segment: &Segment, player: &mut dyn Player, ctx: &mut Context<'_>) -> bool {
        if player.current_time() >= segment.end_time {
            return false;
        }

        player.seek(segment.end_time);
        self.skips.add(ctx.store, 1);

        ctx.notifier.notify(Notification {
            message: format!(
                "Skipped {} segment ({})",
                segment.category.label(),
                format_time(segment.duration())
            ),
            severity: Severity::Success,
            duration_ms: self.notification_ms,
        });
        ctx.notifier.report(EngineEvent::SegmentSkipped {
            category: segment.category,
            item_id: self.current_item.clone(),
        });

        log::info!(
            "Skipped {} segment: {}s - {}s",
            segment.category.as_str(),
            segment.start_time,
            segment.end_time
        );
        true
    }

    /// Check the player's position and skip if it is inside a segment.
    pub fn poll(&mut self, player: &mut dyn Player, ctx: &mut Context<'_>) -> Option<Segment> {
        let segment = self.check_position(player.current_time())?.clone();
        self.skip(&segment, player, ctx).then_some(segment)
    }

    // -------------------------------------------------------------------------
    // Timeline
    // -------------------------------------------------------------------------

    /// Marker geometry for the current segments. Empty if `duration` is
    /// unknown.
    pub fn marker_layout(&self, duration: f64) -> Vec<MarkerLayout> {
        if !is_known_duration(duration) {
            return Vec::new();
        }
        self.segments
            .iter()
            .map(|segment| MarkerLayout {
                left_percent: segment.start_time / duration * 100.0,
                width_percent: segment.duration() / duration * 100.0,
                color: self
                    .categories
                    .get(&segment.category)
                    .map_or_else(|| FALLBACK_MARKER_COLOR.to_string(), |policy| policy.color.clone()),
                title: format!(
                    "{}: {} - {}",
                    segment.category.label(),
                    format_time(segment.start_time),
                    format_time(segment.end_time)
                ),
            })
            .collect()
    }

    /// Remove every marker from the document.
    pub fn clear_markers<D: DomTree>(&self, dom: &mut D) -> usize {
        let existing = dom.query_all(dom.root(), &self.markers);
        for &marker in &existing {
            dom.remove(marker);
        }
        existing.len()
    }

    /// Redraw markers into the progress bar. Returns the number drawn.
    pub fn render_markers<D: DomTree>(&self, dom: &mut D, duration: f64) -> usize {
        self.clear_markers(dom);

        let layout = self.marker_layout(duration);
        if layout.is_empty() {
            return 0;
        }
        let Some(bar) = dom.query(&self.progress_bar) else {
            log::warn!("Could not find progress bar for segment markers");
            return 0;
        };

        for marker in &layout {
            let node = dom.append_element(bar, "div");
            dom.add_class(node, MARKER_CLASS);
            dom.set_attribute(node, "title", &marker.title);
            for (property, value) in MARKER_STYLE {
                dom.set_inline_style(node, property, value);
            }
            dom.set_inline_style(node, "left", &format!("{}%", marker.left_percent));
            dom.set_inline_style(node, "width", &format!("{}%", marker.width_percent));
            dom.set_inline_style(node, "background-color", &marker.color);
        }
        layout.len()
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Submitter id, generated and persisted on first use.
    pub fn user_id(&mut self, ctx: &mut Context<'_>) -> String {
        if let Some(id) = &self.user_id {
            return id.clone();
        }
        let id = generate_user_id();
        store::write_one(ctx.store, keys::SPONSORBLOCK_USERID, Value::String(id.clone()));
        self.user_id = Some(id.clone());
        id
    }

    /// Build a submission for the current item.
    pub fn prepare_submission(
        &mut self,
        ctx: &mut Context<'_>,
        start: f64,
        end: f64,
        category: SegmentCategory,
    ) -> Result<Submission, SubmitError> {
        if !self.enabled {
            return Err(SubmitError::Disabled);
        }
        let item_id = self.current_item.clone().ok_or(SubmitError::NoItem)?;
        if !(start.is_finite() && end.is_finite() && start >= 0.0 && end > start) {
            return Err(SubmitError::InvalidRange { start, end });
        }
        if category == SegmentCategory::Unknown {
            return Err(SubmitError::UnknownCategory);
        }

        Ok(Submission {
            url: api::submit_url(&self.api_base),
            body: SubmissionBody {
                item_id,
                segments: vec![SubmittedSegment {
                    segment: [start, end],
                    category,
                }],
                user_id: self.user_id(ctx),
            },
        })
    }

    /// Report a submission outcome to the user. No retry.
    pub fn finish_submission(&self, ctx: &mut Context<'_>, result: Result<(), ApiError>) -> bool {
        let (message, severity, ok) = match result {
            Ok(()) => ("Segment submitted to SponsorBlock!", Severity::Success, true),
            Err(e) => {
                log::error!("Error submitting segment: {}", e);
                ("Failed to submit segment", Severity::Error, false)
            }
        };
        ctx.notifier.notify(Notification {
            message: message.to_string(),
            severity,
            duration_ms: DEFAULT_NOTIFICATION_MS,
        });
        ok
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    /// Apply and persist a settings patch. The cached list is kept; disabled
    /// categories are filtered at lookup time.
    pub fn update_settings(&mut self, ctx: &mut Context<'_>, patch: SkipSettingsPatch) {
        if let Some(enabled) = patch.enabled {
            if enabled && !self.enabled {
                // Nothing was fetched while disabled
                self.current_item = None;
            }
            self.enabled = enabled;
        }
        for (category, policy) in patch.categories {
            if category != SegmentCategory::Unknown {
                self.categories.insert(category, policy);
            }
        }

        let mut values = Values::new();
        values.insert(keys::SPONSORBLOCK_ENABLED.into(), Value::Bool(self.enabled));
        match serde_json::to_value(&self.categories) {
            Ok(categories) => {
                values.insert(keys::SPONSORBLOCK_CATEGORIES.into(), categories);
            }
            Err(e) => log::warn!("Failed to encode category policies: {}", e),
        }
        store::write(ctx.store, values);
    }

    pub fn stats(&self) -> SkipStats {
        SkipStats {
            enabled: self.enabled,
            skip_count: self.skips.value(),
            segments_found: self.segments.len(),
            current_item: self.current_item.clone(),
        }
    }
}

/// `ytguard_` + a random v4 UUID in simple (hex) form.
fn generate_user_id() -> String {
    format!("{USER_ID_PREFIX}{}", Uuid::new_v4().simple())
}
