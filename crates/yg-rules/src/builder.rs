use std::collections::BTreeMap;

use yg_core::dom::{Selector, SelectorError};
use yg_core::filter::{FilterRule, FilterSet, ListName};
use yg_core::selectors::{SelectorSet, BUILTIN_SELECTORS};
use yg_core::types::SelectorCategory;

use crate::optimizer::{optimize_rules, OptimizeStats};
use crate::parser::parse_filter_list;

/// A configured selector that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Rejected {category} selector '{raw}': {error}", category = .category.as_str())]
pub struct RejectedSelector {
    pub category: SelectorCategory,
    pub raw: String,
    pub error: SelectorError,
}

#[derive(Debug, Clone)]
pub struct SelectorBuild {
    pub set: SelectorSet,
    pub rejected: Vec<RejectedSelector>,
}

/// Built-in selectors plus `extra`, with duplicates dropped. Malformed extras
/// are reported and left out.
pub fn build_selector_set(extra: &BTreeMap<SelectorCategory, Vec<String>>) -> SelectorBuild {
    let mut entries: Vec<(SelectorCategory, Vec<Selector>)> = Vec::new();
    let mut rejected = Vec::new();

    for category in SelectorCategory::ALL {
        let builtin = BUILTIN_SELECTORS
            .iter()
            .filter(|(c, _)| *c == category)
            .flat_map(|(_, raws)| raws.iter().map(|raw| raw.to_string()));
        let configured = extra.get(&category).into_iter().flatten().cloned();

        let mut selectors: Vec<Selector> = Vec::new();
        for raw in builtin.chain(configured) {
            match Selector::parse(&raw) {
                Ok(selector) => {
                    if !selectors.iter().any(|s| s.as_str() == selector.as_str()) {
                        selectors.push(selector);
                    }
                }
                Err(error) => {
                    let reject = RejectedSelector { category, raw, error };
                    log::warn!("{}", reject);
                    rejected.push(reject);
                }
            }
        }
        entries.push((category, selectors));
    }

    SelectorBuild {
        set: SelectorSet::new(entries),
        rejected,
    }
}

/// Filter set from the built-in list plus custom filter-list text.
pub fn build_filter_set(custom_text: &str) -> (FilterSet, OptimizeStats) {
    let mut set = FilterSet::builtin();
    let parsed = parse_filter_list(custom_text);
    let mut custom: Vec<FilterRule> = parsed.rules;
    let stats = optimize_rules(&mut custom, set.list(ListName::Builtin));
    log::info!(
        "Custom list: {} rules kept of {} ({} duplicates, {} already built in, {} lines skipped)",
        stats.after,
        stats.before,
        stats.deduped,
        stats.shadowed,
        parsed.skipped.len()
    );
    set.set_list(ListName::Custom, custom);
    (set, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yg_core::dom::{Document, DomTree};

    #[test]
    fn test_builtin_only() {
        let build = build_selector_set(&BTreeMap::new());
        assert!(build.rejected.is_empty());
        assert_eq!(build.set.len(), SelectorSet::builtin().len());
    }

    #[test]
    fn test_extras_merged_and_rejected() {
        let mut extra = BTreeMap::new();
        extra.insert(
            SelectorCategory::Sidebar,
            vec![
                ".promo-shelf".to_string(),
                "ytd-promoted-video-renderer".to_string(),
                "div[data-x".to_string(),
            ],
        );
        let build = build_selector_set(&extra);
        assert_eq!(build.set.len(), SelectorSet::builtin().len() + 1);
        assert_eq!(build.rejected.len(), 1);
        assert_eq!(build.rejected[0].category, SelectorCategory::Sidebar);
        assert_eq!(build.rejected[0].error, SelectorError::UnterminatedAttribute);

        let mut doc = Document::new();
        let body = doc.body();
        let shelf = doc.append(body, "div", &[("class", "promo-shelf")]);
        assert_eq!(build.set.categorize(&doc, shelf), Some(SelectorCategory::Sidebar));
        assert!(doc.is_visible(shelf));
    }

    #[test]
    fn test_build_filter_set() {
        let (set, stats) = build_filter_set("! list\n||doubleclick.net^\ntracker.example\ntracker.example\n");
        assert_eq!(stats.shadowed, 1);
        assert_eq!(stats.deduped, 1);
        assert_eq!(set.list(ListName::Custom).len(), 1);
        let (list, rule) = set.find_match("https://tracker.example/p").unwrap();
        assert_eq!(list, ListName::Custom);
        assert_eq!(rule.raw(), "tracker.example");
    }
}
