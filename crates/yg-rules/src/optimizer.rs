use std::collections::HashSet;

use yg_core::filter::{FilterRule, RuleKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    /// Rules identical in effect to an earlier rule of the same list
    pub deduped: usize,
    /// Rules already covered by a rule of a higher-priority list
    pub shadowed: usize,
}

/// Drop rules that repeat an earlier rule (same effect, e.g. `||a.com^` and
/// `||a.com`) or an identical rule in `higher`.
pub fn optimize_rules(rules: &mut Vec<FilterRule>, higher: &[FilterRule]) -> OptimizeStats {
    let before = rules.len();
    let upstream: HashSet<&RuleKind> = higher.iter().map(FilterRule::kind).collect();

    let mut shadowed = 0usize;
    rules.retain(|rule| {
        if upstream.contains(rule.kind()) {
            shadowed += 1;
            false
        } else {
            true
        }
    });

    let mut seen: HashSet<RuleKind> = HashSet::new();
    let mut deduped = 0usize;
    rules.retain(|rule| {
        if seen.insert(rule.kind().clone()) {
            true
        } else {
            deduped += 1;
            false
        }
    });

    OptimizeStats {
        before,
        after: rules.len(),
        deduped,
        shadowed,
    }
}
