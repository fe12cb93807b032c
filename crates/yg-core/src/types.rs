//! Core type definitions for ytguard
//!
//! These types are shared by the suppressor, the skip controller and the
//! bindings, and several of them map directly to persisted values.

use serde::{Deserialize, Serialize};

// =============================================================================
// Selector Categories
// =============================================================================

/// Group of structural ad selectors.
///
/// Declaration order is scan priority: an element matching several
/// categories is attributed to the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorCategory {
    /// In-player ad surfaces
    Video,
    /// Page-level banners and promoted tiles
    Banner,
    /// Sidebar, companion and search ads
    Sidebar,
}

impl SelectorCategory {
    /// All categories in scan priority order.
    pub const ALL: [SelectorCategory; 3] = [Self::Video, Self::Banner, Self::Sidebar];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Banner => "banner",
            Self::Sidebar => "sidebar",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "video" => Some(Self::Video),
            "banner" => Some(Self::Banner),
            "sidebar" => Some(Self::Sidebar),
            _ => None,
        }
    }
}

// =============================================================================
// Block Categories
// =============================================================================

/// What a block event is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    Video,
    Banner,
    Sidebar,
    /// A playing video ad that was skipped or seeked past
    VideoAd,
    /// An intercepted outbound request or media source
    Network,
}

impl BlockCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Banner => "banner",
            Self::Sidebar => "sidebar",
            Self::VideoAd => "video_ad",
            Self::Network => "network",
        }
    }
}

impl From<SelectorCategory> for BlockCategory {
    fn from(category: SelectorCategory) -> Self {
        match category {
            SelectorCategory::Video => Self::Video,
            SelectorCategory::Banner => Self::Banner,
            SelectorCategory::Sidebar => Self::Sidebar,
        }
    }
}

// =============================================================================
// Suppressor Features
// =============================================================================

bitflags::bitflags! {
    /// Independently switchable suppressor features.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Features: u8 {
        /// Selector scans, mutation re-scans and video-ad handling
        const DOM = 1 << 0;
        /// Request and media-source interception
        const NETWORK = 1 << 1;
        /// Detection signal and computed-style spoofing
        const ANTI_DETECTION = 1 << 2;

        const ALL = Self::DOM.bits() | Self::NETWORK.bits() | Self::ANTI_DETECTION.bits();
    }
}

impl Default for Features {
    fn default() -> Self {
        Self::ALL
    }
}

// =============================================================================
// Segment Categories
// =============================================================================

/// Category of a community-submitted skip segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentCategory {
    Sponsor,
    Selfpromo,
    Interaction,
    Intro,
    Outro,
    Preview,
    MusicOfftopic,
    Filler,
    /// Anything the service returns that this build does not know about
    #[serde(other)]
    Unknown,
}

impl SegmentCategory {
    /// Known categories in the order they are requested from the service.
    pub const KNOWN: [SegmentCategory; 8] = [
        Self::Sponsor,
        Self::Selfpromo,
        Self::Interaction,
        Self::Intro,
        Self::Outro,
        Self::Preview,
        Self::MusicOfftopic,
        Self::Filler,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sponsor => "sponsor",
            Self::Selfpromo => "selfpromo",
            Self::Interaction => "interaction",
            Self::Intro => "intro",
            Self::Outro => "outro",
            Self::Preview => "preview",
            Self::MusicOfftopic => "music_offtopic",
            Self::Filler => "filler",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|category| category.as_str() == s)
            .unwrap_or(Self::Unknown)
    }

    /// Upper-case label used in notifications and marker titles.
    pub fn label(self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }

    pub fn default_policy(self) -> CategoryPolicy {
        let (enabled, color) = match self {
            Self::Sponsor => (true, "#00d400"),
            Self::Selfpromo => (true, "#ffff00"),
            Self::Interaction => (true, "#cc00ff"),
            Self::Intro => (false, "#00ffff"),
            Self::Outro => (false, "#0202ed"),
            Self::Preview => (false, "#008fd6"),
            Self::MusicOfftopic => (false, "#ff9900"),
            Self::Filler => (false, "#7300FF"),
            Self::Unknown => (false, FALLBACK_MARKER_COLOR),
        };
        CategoryPolicy {
            enabled,
            color: color.to_string(),
        }
    }
}

/// Marker color for categories without a policy.
pub const FALLBACK_MARKER_COLOR: &str = "#ff0000";

/// Per-category skip policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPolicy {
    pub enabled: bool,
    pub color: String,
}

// =============================================================================
// Segments
// =============================================================================

/// A skippable time range of the current media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub category: SegmentCategory,
    /// Seconds
    pub start_time: f64,
    /// Seconds, always greater than `start_time`
    pub end_time: f64,
    /// Opaque service identifier (UUID)
    pub id: String,
    pub votes: i64,
    pub locked: bool,
    pub description: String,
}

impl Segment {
    #[inline]
    pub fn contains(&self, time: f64) -> bool {
        self.start_time <= time && time < self.end_time
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

// =============================================================================
// Events
// =============================================================================

/// A batch of blocked ads, forwarded to persistence and the notifier and then
/// dropped. Only the running total is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEvent {
    pub count: u64,
    pub category: BlockCategory,
    pub timestamp_ms: u64,
}

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_category_wire_names() {
        let parsed: Vec<SegmentCategory> =
            serde_json::from_str(r#"["sponsor","music_offtopic","exclusive_access"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![SegmentCategory::Sponsor, SegmentCategory::MusicOfftopic, SegmentCategory::Unknown]
        );
        assert_eq!(SegmentCategory::parse("filler"), SegmentCategory::Filler);
        assert_eq!(SegmentCategory::parse("nope"), SegmentCategory::Unknown);
    }

    #[test]
    fn test_labels() {
        assert_eq!(SegmentCategory::Sponsor.label(), "SPONSOR");
        assert_eq!(SegmentCategory::MusicOfftopic.label(), "MUSIC OFFTOPIC");
    }

    #[test]
    fn test_default_policies() {
        let enabled: Vec<_> = SegmentCategory::KNOWN
            .into_iter()
            .filter(|c| c.default_policy().enabled)
            .collect();
        assert_eq!(
            enabled,
            vec![SegmentCategory::Sponsor, SegmentCategory::Selfpromo, SegmentCategory::Interaction]
        );
    }

    #[test]
    fn test_segment_contains_is_half_open() {
        let segment = Segment {
            category: SegmentCategory::Sponsor,
            start_time: 10.0,
            end_time: 20.0,
            id: "a".into(),
            votes: 0,
            locked: false,
            description: String::new(),
        };
        assert!(segment.contains(10.0));
        assert!(segment.contains(19.99));
        assert!(!segment.contains(20.0));
        assert!(!segment.contains(9.99));
    }

    #[test]
    fn test_selector_category_priority() {
        assert!(SelectorCategory::Video < SelectorCategory::Banner);
        assert_eq!(SelectorCategory::parse("sidebar"), Some(SelectorCategory::Sidebar));
        assert_eq!(BlockCategory::from(SelectorCategory::Banner), BlockCategory::Banner);
    }
}
