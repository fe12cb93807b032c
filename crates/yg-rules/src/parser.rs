use yg_core::filter::FilterRule;

/// Why a line produced no rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Element hiding rule (`##`, `#@#`, `#?#`)
    Cosmetic,
    /// Allow rule (`@@`)
    Exception,
    /// Rule with `$` options
    Options,
    /// Would match every URL
    MatchesEverything,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosmetic => "cosmetic rule",
            Self::Exception => "exception rule",
            Self::Options => "rule options",
            Self::MatchesEverything => "matches every URL",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedList {
    pub rules: Vec<FilterRule>,
    /// 1-based line number and reason for each rejected line
    pub skipped: Vec<(usize, SkipReason)>,
}

/// Parse filter-list text. Comments and blank lines are ignored; lines the
/// rule language cannot express are reported in `skipped`.
pub fn parse_filter_list(text: &str) -> ParsedList {
    let mut parsed = ParsedList::default();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || is_comment_line(line) {
            continue;
        }
        let line_no = index + 1;

        let reason = if line.contains("##") || line.contains("#@#") || line.contains("#?#") {
            Some(SkipReason::Cosmetic)
        } else if line.starts_with("@@") {
            Some(SkipReason::Exception)
        } else if has_options(line) {
            Some(SkipReason::Options)
        } else {
            None
        };

        match reason {
            Some(reason) => parsed.skipped.push((line_no, reason)),
            None => match FilterRule::parse(line) {
                Some(rule) => parsed.rules.push(rule),
                None => parsed.skipped.push((line_no, SkipReason::MatchesEverything)),
            },
        }
    }

    if !parsed.skipped.is_empty() {
        log::debug!("Skipped {} unsupported filter lines", parsed.skipped.len());
    }
    parsed
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('!') || line.starts_with('[') || line.starts_with('#')
}

// `$` followed by something option-like, e.g. `$script,third-party`
fn has_options(line: &str) -> bool {
    match line.rfind('$') {
        Some(pos) => line[pos + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '~'),
        None => false,
    }
}
