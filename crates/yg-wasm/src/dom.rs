//! Live document and media element behind the engine's DOM seams

use std::cell::RefCell;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, HtmlMediaElement};
use yg_core::dom::{DomTree, NodeId, Selector};
use yg_core::player::Player;

/// Attribute that marks a media element we muted.
const MUTE_FLAG_ATTRIBUTE: &str = "data-yg-muted";

/// Bits of a [`NodeId`] holding the slot index; the rest is the slot's
/// generation, so ids of pruned elements never resolve to a newer one.
const SLOT_BITS: u32 = 24;
const SLOT_MASK: u32 = (1 << SLOT_BITS) - 1;

struct Slot {
    element: Option<Element>,
    generation: u8,
}

#[derive(Default)]
struct Registry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

fn node_id(slot: u32, generation: u8) -> NodeId {
    NodeId((u32::from(generation) << SLOT_BITS) | slot)
}

/// The page document. Elements get a [`NodeId`] the first time the engine
/// sees them; [`WebDom::prune`] releases the ones no longer attached.
pub struct WebDom {
    document: Document,
    ids: js_sys::WeakMap,
    registry: RefCell<Registry>,
}

impl WebDom {
    pub fn new(document: Document) -> Option<Self> {
        let root = document.document_element()?;
        let dom = Self {
            document,
            ids: js_sys::WeakMap::new(),
            registry: RefCell::new(Registry::default()),
        };
        dom.id_of(&root);
        Some(dom)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn id_of(&self, element: &Element) -> NodeId {
        let key: &js_sys::Object = element.unchecked_ref();
        if let Some(id) = self.ids.get(key).as_f64() {
            return NodeId(id as u32);
        }
        let mut registry = self.registry.borrow_mut();
        let id = match registry.free.pop() {
            Some(slot) => {
                let entry = &mut registry.slots[slot as usize];
                entry.element = Some(element.clone());
                node_id(slot, entry.generation)
            }
            None => {
                let slot = registry.slots.len() as u32;
                registry.slots.push(Slot {
                    element: Some(element.clone()),
                    generation: 0,
                });
                node_id(slot, 0)
            }
        };
        self.ids.set(key, &JsValue::from(id.0));
        id
    }

    pub fn element(&self, node: NodeId) -> Option<Element> {
        let registry = self.registry.borrow();
        let slot = registry.slots.get((node.0 & SLOT_MASK) as usize)?;
        if node_id(node.0 & SLOT_MASK, slot.generation) != node {
            return None;
        }
        slot.element.clone()
    }

    fn html(&self, node: NodeId) -> Option<HtmlElement> {
        self.element(node)?.dyn_into::<HtmlElement>().ok()
    }

    /// Number of elements currently registered.
    pub fn registered(&self) -> usize {
        self.registry
            .borrow()
            .slots
            .iter()
            .filter(|slot| slot.element.is_some())
            .count()
    }

    /// Forget elements that are no longer in the document. Their ids stop
    /// resolving and their slots are reused. Returns the number released.
    pub fn prune(&self) -> usize {
        let mut registry = self.registry.borrow_mut();
        let mut released = Vec::new();
        // Slot 0 is the root element
        for (index, slot) in registry.slots.iter_mut().enumerate().skip(1) {
            let detached = slot.element.as_ref().is_some_and(|el| !el.is_connected());
            if !detached {
                continue;
            }
            if let Some(element) = slot.element.take() {
                self.ids.delete(element.unchecked_ref());
            }
            slot.generation = slot.generation.wrapping_add(1);
            released.push(index as u32);
        }
        let count = released.len();
        registry.free.extend(released);
        if count > 0 {
            log::debug!("Released {} detached elements", count);
        }
        count
    }

    /// Append a `<style>` element with `css` to the document head.
    pub fn inject_stylesheet(&self, css: &str) -> bool {
        let Ok(style) = self.document.create_element("style") else {
            return false;
        };
        style.set_text_content(Some(css));
        let parent = self
            .document
            .query_selector("head")
            .ok()
            .flatten()
            .or_else(|| self.document.document_element());
        match parent {
            Some(parent) => parent.append_child(&style).is_ok(),
            None => false,
        }
    }
}

impl DomTree for WebDom {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.element(node)?.parent_element()?;
        Some(self.id_of(&parent))
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        let Some(element) = self.element(node) else {
            return Vec::new();
        };
        let children = element.children();
        (0..children.length())
            .filter_map(|i| children.item(i))
            .map(|child| self.id_of(&child))
            .collect()
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.element(node)
            .map(|el| el.tag_name().to_ascii_lowercase())
            .unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.get_attribute(name)
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|el| el.is_connected())
    }

    fn computed_style(&self, node: NodeId, property: &str) -> String {
        let (Some(element), Some(window)) = (self.element(node), web_sys::window()) else {
            return String::new();
        };
        match window.get_computed_style(&element) {
            Ok(Some(style)) => style.get_property_value(property).unwrap_or_default(),
            _ => String::new(),
        }
    }

    fn offset_size(&self, node: NodeId) -> Option<(f64, f64)> {
        let html = self.html(node)?;
        html.offset_parent()?;
        Some((html.offset_width() as f64, html.offset_height() as f64))
    }

    fn set_inline_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(html) = self.html(node) {
            let _ = html.style().set_property_with_priority(property, value, "important");
        }
    }

    fn remove_inline_style(&mut self, node: NodeId, property: &str) {
        if let Some(html) = self.html(node) {
            let _ = html.style().remove_property(property);
        }
    }

    fn inline_style(&self, node: NodeId, property: &str) -> Option<String> {
        let value = self.html(node)?.style().get_property_value(property).ok()?;
        (!value.is_empty()).then_some(value)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element(node) {
            let _ = element.set_attribute(name, value);
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element(node) {
            let _ = element.remove_attribute(name);
        }
    }

    fn remove(&mut self, node: NodeId) {
        if let Some(element) = self.element(node) {
            element.remove();
        }
    }

    fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let created = self
            .element(parent)
            .zip(self.document.create_element(tag).ok())
            .filter(|(parent, child)| parent.append_child(child).is_ok());
        match created {
            Some((_, child)) => self.id_of(&child),
            None => {
                log::error!("Failed to append <{}>", tag);
                parent
            }
        }
    }

    fn click(&mut self, node: NodeId) {
        if let Some(html) = self.html(node) {
            html.click();
        }
    }

    // The browser's matcher accepts every selector the engine parses
    fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let Some(scope) = self.element(scope) else {
            return Vec::new();
        };
        let Ok(list) = scope.query_selector_all(selector.as_str()) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| self.id_of(&element))
            .collect()
    }
}

/// The page's `<video>` element.
pub struct WebPlayer {
    media: HtmlMediaElement,
}

impl WebPlayer {
    pub fn find(document: &Document) -> Option<Self> {
        let element = document.query_selector("video").ok()??;
        let media = element.dyn_into::<HtmlMediaElement>().ok()?;
        Some(Self { media })
    }
}

impl Player for WebPlayer {
    fn current_time(&self) -> f64 {
        self.media.current_time()
    }

    fn seek(&mut self, time: f64) {
        self.media.set_current_time(time);
    }

    fn duration(&self) -> f64 {
        self.media.duration()
    }

    fn is_muted(&self) -> bool {
        self.media.muted()
    }

    fn set_muted(&mut self, muted: bool) {
        self.media.set_muted(muted);
    }

    fn is_mute_flagged(&self) -> bool {
        self.media.has_attribute(MUTE_FLAG_ATTRIBUTE)
    }

    fn flag_muted(&mut self) {
        let _ = self.media.set_attribute(MUTE_FLAG_ATTRIBUTE, "true");
    }

    fn clear_mute_flag(&mut self) {
        let _ = self.media.remove_attribute(MUTE_FLAG_ATTRIBUTE);
    }
}
