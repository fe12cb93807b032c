//! Categorized ad selectors and the page landmarks the engine looks for

use crate::dom::{DomTree, NodeId, Selector};
use crate::types::SelectorCategory;

/// Selectors shipped with the engine, in scan priority order.
pub const BUILTIN_SELECTORS: &[(SelectorCategory, &[&str])] = &[
    (
        SelectorCategory::Video,
        &[
            ".video-ads",
            ".ytp-ad-module",
            ".ytp-ad-overlay-container",
            ".ytp-ad-text-overlay",
            ".ytp-ad-player-overlay",
            ".ytp-ad-skip-button-container",
            ".ytp-ad-preview-container",
            "ytd-player-legacy-desktop-watch-ads-renderer",
            "ytd-display-ad-renderer[slot-id*=\"player\"]",
        ],
    ),
    (
        SelectorCategory::Banner,
        &[
            "#masthead-ad",
            ".ytd-display-ad-renderer",
            ".ytd-promoted-sparkles-web-renderer",
            ".ytd-ad-slot-renderer",
            ".ytd-banner-promo-renderer",
            "ytd-rich-item-renderer[is-ad]",
            "ytd-compact-promoted-item-renderer",
        ],
    ),
    (
        SelectorCategory::Sidebar,
        &[
            "#secondary .ytd-display-ad-renderer",
            ".ytd-companion-slot-renderer",
            "ytd-promoted-video-renderer",
            ".ytd-search-pyv-renderer",
            "ytd-ad-slot-renderer",
            ".ytm-promoted-video-renderer",
            ".ytm-companion-ad-renderer",
        ],
    ),
];

/// Player UI that only exists while an ad plays.
pub const AD_PLAYING_MARKERS: &str =
    ".ytp-ad-text, .ytp-ad-duration-remaining, .ytp-ad-skip-button, .ytp-ad-preview-text";

/// Skip control of a skippable video ad.
pub const SKIP_BUTTON: &str = ".ytp-ad-skip-button, .ytp-skip-ad-button";

/// Link to the channel owning the current media item.
pub const CHANNEL_LINK: &str = "a[href*=\"/channel/\"], a[href*=\"/@\"]";

/// Container the timeline markers are drawn into.
pub const PROGRESS_BAR: &str = ".ytp-progress-bar-container";

/// Class put on every element the suppressor hid.
pub const HIDDEN_CLASS: &str = "yg-blocked";

/// Attribute recording which category an element was hidden for.
pub const CATEGORY_ATTRIBUTE: &str = "data-yg-category";

/// Class of timeline markers.
pub const MARKER_CLASS: &str = "yg-segment-marker";

/// Surfaces hidden by stylesheet before any scan runs.
const STYLESHEET_HIDDEN: &[&str] = &[
    "[data-ad-slot-id]",
    ".GoogleActiveViewElement",
    ".ytp-ad-overlay-container",
    ".ytp-ad-text-overlay",
    "ytd-promoted-sparkles-web-renderer",
    "ytd-compact-promoted-item-renderer",
    "[aria-label*=\"Promoted\"]",
];

/// Stylesheet injected at startup: keeps hidden elements collapsed even if
/// page scripts rewrite their inline style, and hides known ad surfaces
/// before the first scan.
pub fn hiding_stylesheet() -> String {
    format!(
        ".{HIDDEN_CLASS} {{\n  display: none !important;\n  visibility: hidden !important;\n  \
         opacity: 0 !important;\n  height: 0 !important;\n  width: 0 !important;\n  \
         overflow: hidden !important;\n  position: absolute !important;\n  left: -9999px !important;\n}}\n\
         {} {{\n  display: none !important;\n}}\n",
        STYLESHEET_HIDDEN.join(",\n")
    )
}

/// Ordered, immutable selector categories.
#[derive(Debug, Clone, Default)]
pub struct SelectorSet {
    categories: Vec<(SelectorCategory, Vec<Selector>)>,
}

impl SelectorSet {
    /// Build from parsed selectors. Categories are reordered into priority
    /// order; repeated categories are merged.
    pub fn new(entries: Vec<(SelectorCategory, Vec<Selector>)>) -> Self {
        let mut categories: Vec<(SelectorCategory, Vec<Selector>)> = Vec::new();
        for (category, selectors) in entries {
            match categories.iter_mut().find(|(existing, _)| *existing == category) {
                Some((_, existing)) => existing.extend(selectors),
                None => categories.push((category, selectors)),
            }
        }
        categories.sort_by_key(|(category, _)| *category);
        Self { categories }
    }

    /// The shipped selectors.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_SELECTORS
                .iter()
                .map(|(category, raws)| {
                    (*category, raws.iter().map(|raw| Selector::parse_or_empty(raw)).collect())
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (SelectorCategory, &[Selector])> {
        self.categories
            .iter()
            .map(|(category, selectors)| (*category, selectors.as_slice()))
    }

    pub fn selectors(&self, category: SelectorCategory) -> &[Selector] {
        self.categories
            .iter()
            .find(|(existing, _)| *existing == category)
            .map_or(&[], |(_, selectors)| selectors.as_slice())
    }

    /// First category (in priority order) with a selector matching `node`.
    pub fn categorize<D: DomTree>(&self, dom: &D, node: NodeId) -> Option<SelectorCategory> {
        self.iter()
            .find(|(_, selectors)| selectors.iter().any(|selector| selector.matches(dom, node)))
            .map(|(category, _)| category)
    }

    pub fn len(&self) -> usize {
        self.categories.iter().map(|(_, selectors)| selectors.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_builtin_selectors_all_parse() {
        for (_, raws) in BUILTIN_SELECTORS {
            for raw in *raws {
                assert!(Selector::parse(raw).is_ok(), "{raw}");
            }
        }
        for raw in [AD_PLAYING_MARKERS, SKIP_BUTTON, CHANNEL_LINK, PROGRESS_BAR] {
            assert!(Selector::parse(raw).is_ok(), "{raw}");
        }
        let total: usize = BUILTIN_SELECTORS.iter().map(|(_, raws)| raws.len()).sum();
        assert_eq!(SelectorSet::builtin().len(), total);
    }

    #[test]
    fn test_hiding_stylesheet() {
        let css = hiding_stylesheet();
        assert!(css.starts_with(".yg-blocked {"));
        assert!(css.contains("left: -9999px !important;"));
        assert!(css.contains("[data-ad-slot-id],\n.GoogleActiveViewElement"));
        for raw in STYLESHEET_HIDDEN {
            assert!(Selector::parse(raw).is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_new_orders_and_merges() {
        let set = SelectorSet::new(vec![
            (SelectorCategory::Sidebar, vec![Selector::parse(".s").unwrap()]),
            (SelectorCategory::Video, vec![Selector::parse(".v").unwrap()]),
            (SelectorCategory::Sidebar, vec![Selector::parse(".t").unwrap()]),
        ]);
        let order: Vec<_> = set.iter().map(|(category, _)| category).collect();
        assert_eq!(order, vec![SelectorCategory::Video, SelectorCategory::Sidebar]);
        assert_eq!(set.selectors(SelectorCategory::Sidebar).len(), 2);
        assert!(set.selectors(SelectorCategory::Banner).is_empty());
    }

    #[test]
    fn test_categorize_prefers_video_over_banner() {
        let mut doc = Document::new();
        let body = doc.body();
        // Matches both `.ytd-display-ad-renderer` (banner) and the player slot (video)
        let el = doc.append(
            body,
            "ytd-display-ad-renderer",
            &[("class", "ytd-display-ad-renderer"), ("slot-id", "player-1")],
        );
        let banner_only = doc.append(body, "div", &[("id", "masthead-ad")]);
        let plain = doc.append(body, "div", &[]);

        let set = SelectorSet::builtin();
        assert_eq!(set.categorize(&doc, el), Some(SelectorCategory::Video));
        assert_eq!(set.categorize(&doc, banner_only), Some(SelectorCategory::Banner));
        assert_eq!(set.categorize(&doc, plain), None);
    }
}
