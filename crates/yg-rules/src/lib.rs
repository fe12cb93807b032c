//! ytguard Rule Compiler
//!
//! Turns filter-list text and configured selectors into the rule sets the
//! engine consumes.

pub mod parser;
pub mod optimizer;
pub mod builder;

pub use builder::{build_filter_set, build_selector_set, SelectorBuild};
pub use optimizer::{optimize_rules, OptimizeStats};
pub use parser::{parse_filter_list, ParsedList, SkipReason};
