//! DOM abstraction and selector engine
//!
//! The suppressor and the timeline renderer only see the page through
//! [`DomTree`]. The browser bindings implement it over the live document;
//! [`Document`] is an in-memory tree with the same observable behavior for
//! the parts the engine relies on (inline styles, classes, attributes,
//! layout boxes, detachment).

use std::collections::BTreeMap;

// =============================================================================
// Node Handles
// =============================================================================

/// Opaque handle to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Attributes whose changes trigger a reactive re-scan.
pub const OBSERVED_ATTRIBUTES: &[&str] = &["class", "id", "src", "data-ad-slot-id"];

/// One entry of a structural-change batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Elements inserted under some parent
    ChildList { added: Vec<NodeId> },
    /// An attribute changed on `target`
    Attributes { target: NodeId, name: String },
}

impl MutationRecord {
    /// Roots of the subtrees this record asks to re-scan.
    pub fn scan_roots(&self) -> Vec<NodeId> {
        match self {
            Self::ChildList { added } => added.clone(),
            Self::Attributes { target, name } => {
                if OBSERVED_ATTRIBUTES.contains(&name.as_str()) {
                    vec![*target]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

// =============================================================================
// DomTree
// =============================================================================

/// Read/write access to an element tree.
pub trait DomTree {
    fn root(&self) -> NodeId;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    /// Lower-case tag name.
    fn tag_name(&self, node: NodeId) -> String;
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    /// Is the node still attached to the document?
    fn is_connected(&self, node: NodeId) -> bool;
    /// The real computed value of a style property.
    fn computed_style(&self, node: NodeId, property: &str) -> String;
    /// Rendered `(width, height)`, or None when the element has no offset
    /// parent (not rendered).
    fn offset_size(&self, node: NodeId) -> Option<(f64, f64)>;

    fn set_inline_style(&mut self, node: NodeId, property: &str, value: &str);
    fn remove_inline_style(&mut self, node: NodeId, property: &str);
    fn inline_style(&self, node: NodeId, property: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);
    /// Detach from the document. No-op when already detached.
    fn remove(&mut self, node: NodeId);
    fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId;
    fn click(&mut self, node: NodeId);

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let classes = match self.attribute(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &classes);
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(existing) = self.attribute(node, "class") {
            let kept: Vec<&str> = existing.split_ascii_whitespace().filter(|c| *c != class).collect();
            self.set_attribute(node, "class", &kept.join(" "));
        }
    }

    /// Does `node` match `selector`?
    fn matches(&self, node: NodeId, selector: &Selector) -> bool
    where
        Self: Sized,
    {
        selector.matches(self, node)
    }

    /// All descendants of `scope` matching `selector`, in document order.
    fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId>
    where
        Self: Sized,
    {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if selector.matches(self, node) {
                found.push(node);
            }
            stack.extend(self.children(node).into_iter().rev());
        }
        found
    }

    /// First descendant of the root matching `selector`.
    fn query(&self, selector: &Selector) -> Option<NodeId>
    where
        Self: Sized,
    {
        self.query_all(self.root(), selector).into_iter().next()
    }

    /// Visible = rendered with a non-zero box and not hidden by style.
    fn is_visible(&self, node: NodeId) -> bool {
        let Some((width, height)) = self.offset_size(node) else {
            return false;
        };
        width > 0.0
            && height > 0.0
            && self.computed_style(node, "display") != "none"
            && self.computed_style(node, "visibility") != "hidden"
            && self.computed_style(node, "opacity") != "0"
    }
}

// =============================================================================
// Selectors
// =============================================================================

/// Error parsing a selector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,
    #[error("Unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("Unterminated attribute selector")]
    UnterminatedAttribute,
    #[error("Unterminated string")]
    UnterminatedString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrTest {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            AttrOp::Contains => !self.value.is_empty() && actual.contains(self.value.as_str()),
            AttrOp::Prefix => !self.value.is_empty() && actual.starts_with(self.value.as_str()),
            AttrOp::Suffix => !self.value.is_empty() && actual.ends_with(self.value.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches<D: DomTree + ?Sized>(&self, dom: &D, node: NodeId) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && !dom.tag_name(node).eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if dom.attribute(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| dom.has_class(node, class)) {
            return false;
        }
        self.attrs
            .iter()
            .all(|test| test.matches(dom.attribute(node, &test.name).as_deref()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// Compounds left to right; each combinator links a compound to the previous
/// one (the first combinator is ignored).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches<D: DomTree + ?Sized>(&self, dom: &D, node: NodeId) -> bool {
        self.matches_at(dom, node, self.parts.len() - 1)
    }

    fn matches_at<D: DomTree + ?Sized>(&self, dom: &D, node: NodeId, idx: usize) -> bool {
        let (combinator, compound) = &self.parts[idx];
        if !compound.matches(dom, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => dom
                .parent(node)
                .is_some_and(|parent| self.matches_at(dom, parent, idx - 1)),
            Combinator::Descendant => {
                let mut ancestor = dom.parent(node);
                while let Some(current) = ancestor {
                    if self.matches_at(dom, current, idx - 1) {
                        return true;
                    }
                    ancestor = dom.parent(current);
                }
                false
            }
        }
    }
}

/// A parsed selector list.
///
/// Supports type, universal, `#id`, `.class`, `[attr]`, `[attr=v]`,
/// `[attr*=v]`, `[attr^=v]`, `[attr$=v]`, descendant and child combinators
/// and comma-separated lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    raw: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(raw: &str) -> Result<Self, SelectorError> {
        let alternatives = SelectorParser::new(raw).parse_list()?;
        Ok(Self {
            raw: raw.trim().to_string(),
            alternatives,
        })
    }

    /// Parse, or log and fall back to a selector that matches nothing.
    pub fn parse_or_empty(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|e| {
            log::error!("Invalid selector '{}': {}", raw, e);
            Self {
                raw: raw.trim().to_string(),
                alternatives: Vec::new(),
            }
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches<D: DomTree + ?Sized>(&self, dom: &D, node: NodeId) -> bool {
        self.alternatives.iter().any(|complex| complex.matches(dom, node))
    }
}

struct SelectorParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos != start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(c) => SelectorError::UnexpectedChar(c, self.pos),
            None => SelectorError::Empty,
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>, SelectorError> {
        let mut list = Vec::new();
        loop {
            self.skip_ws();
            list.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.bump();
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(list)
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;
        loop {
            let compound = self.parse_compound()?;
            if compound.is_empty() {
                return Err(self.unexpected());
            }
            parts.push((combinator, compound));

            let had_ws = self.skip_ws();
            match self.peek() {
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    combinator = Combinator::Child;
                }
                Some(',') | None => break,
                Some(_) if had_ws => combinator = Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(Complex { parts })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();

        if self.peek() == Some('*') {
            self.bump();
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.parse_attr()?);
                }
                _ => break,
            }
        }

        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_attr(&mut self) -> Result<AttrTest, SelectorError> {
        self.skip_ws();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match self.bump() {
            Some(']') => {
                return Ok(AttrTest {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                })
            }
            Some('=') => AttrOp::Equals,
            Some(c @ ('*' | '^' | '$')) => {
                if self.bump() != Some('=') {
                    return Err(SelectorError::UnterminatedAttribute);
                }
                match c {
                    '*' => AttrOp::Contains,
                    '^' => AttrOp::Prefix,
                    _ => AttrOp::Suffix,
                }
            }
            _ => return Err(SelectorError::UnterminatedAttribute),
        };

        self.skip_ws();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some(_) => {}
                        None => return Err(SelectorError::UnterminatedString),
                    }
                }
                self.input[start..self.pos - 1].to_string()
            }
            _ => self.parse_ident()?,
        };
        self.skip_ws();
        if self.bump() != Some(']') {
            return Err(SelectorError::UnterminatedAttribute);
        }

        Ok(AttrTest { name, op, value })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

// =============================================================================
// In-memory Document
// =============================================================================

const DEFAULT_SIZE: (f64, f64) = (100.0, 100.0);

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attrs: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    size: (f64, f64),
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    clicks: u32,
}

impl Element {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            style: BTreeMap::new(),
            size: DEFAULT_SIZE,
            parent,
            children: Vec::new(),
            clicks: 0,
        }
    }
}

/// In-memory element tree rooted at `<html>` with a `<body>` child.
///
/// Inline styles are the only style source: `display` defaults to `block`,
/// `opacity` to `1`, and `visibility` inherits (default `visible`). An
/// element is rendered when it and all ancestors are attached and not
/// `display: none`.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Element>,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![Element::new("html", None)],
            body: NodeId(0),
        };
        doc.body = doc.append_element(NodeId(0), "body");
        doc
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn node(&self, id: NodeId) -> &Element {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id.0 as usize]
    }

    /// Append an element with attributes.
    pub fn append(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.append_element(parent, tag);
        for (name, value) in attrs {
            self.set_attribute(id, name, value);
        }
        id
    }

    /// Set the rendered box of an element.
    pub fn set_size(&mut self, node: NodeId, width: f64, height: f64) {
        self.node_mut(node).size = (width, height);
    }

    /// Number of times the element was clicked.
    pub fn click_count(&self, node: NodeId) -> u32 {
        self.node(node).clicks
    }

    fn is_rendered(&self, node: NodeId) -> bool {
        if !self.is_connected(node) {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if self.node(id).style.get("display").is_some_and(|d| d == "none") {
                return false;
            }
            current = self.node(id).parent;
        }
        true
    }
}

impl DomTree for Document {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).children.clone()
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.node(node).tag.clone()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node).attrs.get(name).cloned()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root() {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn computed_style(&self, node: NodeId, property: &str) -> String {
        let element = self.node(node);
        if let Some(value) = element.style.get(property) {
            return value.clone();
        }
        match property {
            "display" => "block".to_string(),
            "opacity" => "1".to_string(),
            "visibility" => match element.parent {
                Some(parent) => self.computed_style(parent, property),
                None => "visible".to_string(),
            },
            _ => String::new(),
        }
    }

    fn offset_size(&self, node: NodeId) -> Option<(f64, f64)> {
        if !self.is_rendered(node) {
            return None;
        }
        let element = self.node(node);
        let parse = |property: &str, fallback: f64| {
            element
                .style
                .get(property)
                .and_then(|v| v.trim_end_matches("px").parse::<f64>().ok())
                .unwrap_or(fallback)
        };
        Some((parse("width", element.size.0), parse("height", element.size.1)))
    }

    fn set_inline_style(&mut self, node: NodeId, property: &str, value: &str) {
        self.node_mut(node).style.insert(property.to_string(), value.to_string());
    }

    fn remove_inline_style(&mut self, node: NodeId, property: &str) {
        self.node_mut(node).style.remove(property);
    }

    fn inline_style(&self, node: NodeId, property: &str) -> Option<String> {
        self.node(node).style.get(property).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.node_mut(node).attrs.insert(name.to_ascii_lowercase(), value.to_string());
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        self.node_mut(node).attrs.remove(name);
    }

    fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.node(node).parent {
            self.node_mut(parent).children.retain(|child| *child != node);
            self.node_mut(node).parent = None;
        }
    }

    fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Element::new(tag, Some(parent)));
        self.node_mut(parent).children.push(id);
        id
    }

    fn click(&mut self, node: NodeId) {
        self.node_mut(node).clicks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(raw: &str) -> Selector {
        Selector::parse(raw).unwrap()
    }

    #[test]
    fn test_parses_builtin_shapes() {
        for raw in [
            ".video-ads",
            "#masthead-ad",
            "ytd-player-legacy-desktop-watch-ads-renderer",
            "ytd-display-ad-renderer[slot-id*=\"player\"]",
            "ytd-rich-item-renderer[is-ad]",
            "#secondary .ytd-display-ad-renderer",
            "a[href*=\"/channel/\"], a[href*=\"/@\"]",
            "div > .child",
            "*[data-x='y']",
        ] {
            assert!(Selector::parse(raw).is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert!(matches!(Selector::parse("div["), Err(SelectorError::UnterminatedAttribute) | Err(SelectorError::Empty)));
        assert_eq!(Selector::parse("[a=\"b]"), Err(SelectorError::UnterminatedString));
        assert!(matches!(Selector::parse(".a::after"), Err(SelectorError::UnexpectedChar(':', _))));
        assert!(Selector::parse("div,").is_err());
        assert!(Selector::parse("> div").is_err());
    }

    #[test]
    fn test_parse_or_empty_matches_nothing() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.append(body, "div", &[]);
        let never = Selector::parse_or_empty("div[");
        assert!(doc.query(&never).is_none());
        assert_eq!(never.as_str(), "div[");
    }

    #[test]
    fn test_compound_matching() {
        let mut doc = Document::new();
        let body = doc.body();
        let el = doc.append(body, "ytd-display-ad-renderer", &[("slot-id", "player-top"), ("class", "a b")]);

        assert!(doc.matches(el, &sel("ytd-display-ad-renderer[slot-id*=\"player\"]")));
        assert!(doc.matches(el, &sel(".a.b")));
        assert!(doc.matches(el, &sel("[slot-id^=player]")));
        assert!(doc.matches(el, &sel("[slot-id$='-top']")));
        assert!(!doc.matches(el, &sel("[slot-id=player]")));
        assert!(!doc.matches(el, &sel(".a.c")));
        assert!(!doc.matches(el, &sel("div")));
    }

    #[test]
    fn test_combinators() {
        let mut doc = Document::new();
        let body = doc.body();
        let secondary = doc.append(body, "div", &[("id", "secondary")]);
        let wrapper = doc.append(secondary, "div", &[]);
        let ad = doc.append(wrapper, "div", &[("class", "ytd-display-ad-renderer")]);
        let other = doc.append(body, "div", &[("class", "ytd-display-ad-renderer")]);

        let descendant = sel("#secondary .ytd-display-ad-renderer");
        assert!(doc.matches(ad, &descendant));
        assert!(!doc.matches(other, &descendant));

        assert!(!doc.matches(ad, &sel("#secondary > .ytd-display-ad-renderer")));
        assert!(doc.matches(wrapper, &sel("#secondary > div")));
    }

    #[test]
    fn test_query_all_document_order() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.append(body, "div", &[("class", "ad")]);
        let inner = doc.append(a, "span", &[("class", "ad")]);
        let b = doc.append(body, "div", &[("class", "ad")]);

        assert_eq!(doc.query_all(doc.root(), &sel(".ad")), vec![a, inner, b]);
        assert_eq!(doc.query_all(a, &sel(".ad")), vec![inner]);
        assert_eq!(doc.query(&sel("span")), Some(inner));
    }

    #[test]
    fn test_visibility() {
        let mut doc = Document::new();
        let body = doc.body();
        let parent = doc.append(body, "div", &[]);
        let child = doc.append(parent, "div", &[]);
        assert!(doc.is_visible(child));

        doc.set_inline_style(parent, "display", "none");
        assert!(!doc.is_visible(child));
        assert_eq!(doc.offset_size(child), None);

        doc.remove_inline_style(parent, "display");
        doc.set_inline_style(parent, "visibility", "hidden");
        assert!(!doc.is_visible(child));

        doc.remove_inline_style(parent, "visibility");
        doc.set_size(child, 0.0, 10.0);
        assert!(!doc.is_visible(child));
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let mut doc = Document::new();
        let body = doc.body();
        let parent = doc.append(body, "div", &[]);
        let child = doc.append(parent, "div", &[("class", "x")]);

        doc.remove(parent);
        assert!(!doc.is_connected(parent));
        assert!(!doc.is_connected(child));
        assert!(doc.query(&sel(".x")).is_none());
        doc.remove(parent);
    }

    #[test]
    fn test_class_helpers() {
        let mut doc = Document::new();
        let body = doc.body();
        let el = doc.append(body, "div", &[("class", "a")]);
        doc.add_class(el, "b");
        doc.add_class(el, "b");
        assert_eq!(doc.attribute(el, "class").as_deref(), Some("a b"));
        doc.remove_class(el, "a");
        assert_eq!(doc.attribute(el, "class").as_deref(), Some("b"));
    }

    #[test]
    fn test_mutation_scan_roots() {
        let record = MutationRecord::Attributes { target: NodeId(3), name: "class".into() };
        assert_eq!(record.scan_roots(), vec![NodeId(3)]);
        let record = MutationRecord::Attributes { target: NodeId(3), name: "title".into() };
        assert!(record.scan_roots().is_empty());
    }
}
