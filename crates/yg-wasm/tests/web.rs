#![cfg(target_arch = "wasm32")]

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;
use yg_core::dom::DomTree;
use yg_core::selectors::{CATEGORY_ATTRIBUTE, HIDDEN_CLASS};
use yg_wasm::dom::WebDom;

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

// All tests share one module instance, so the engine is created once
fn ensure_engine() {
    if !yg_wasm::is_initialized() {
        yg_wasm::init("", "{}", Some(1), None).unwrap();
    }
}

fn append_div(text: &str) -> web_sys::Element {
    let doc = document();
    let el = doc.create_element("div").unwrap();
    el.set_text_content(Some(text));
    doc.body().unwrap().append_child(&el).unwrap();
    el
}

fn is_hidden(el: &web_sys::Element) -> bool {
    el.get_attribute("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == HIDDEN_CLASS))
}

#[wasm_bindgen_test]
fn web_dom_ids_are_stable() {
    let dom = WebDom::new(document()).unwrap();
    let body = document().body().unwrap();
    let first = dom.id_of(&body);
    let second = dom.id_of(&body);
    assert_eq!(first, second);
    assert_eq!(dom.parent(first), Some(dom.root()));
}

#[wasm_bindgen_test]
fn web_dom_prune_releases_detached_elements() {
    let dom = WebDom::new(document()).unwrap();
    let kept = append_div("kept");
    let gone = append_div("gone");
    let kept_id = dom.id_of(&kept);
    let gone_id = dom.id_of(&gone);
    let before = dom.registered();

    gone.remove();
    assert_eq!(dom.prune(), 1);
    assert_eq!(dom.registered(), before - 1);
    assert!(dom.element(gone_id).is_none());
    assert_eq!(dom.id_of(&kept), kept_id);

    // The freed slot is reused without reviving the old id
    let next = append_div("next");
    let next_id = dom.id_of(&next);
    assert_ne!(next_id, gone_id);
    assert!(dom.element(gone_id).is_none());
    assert!(dom.element(next_id).is_some());
}

#[wasm_bindgen_test]
fn helpers_parse_urls() {
    assert_eq!(yg_wasm::video_id("https://www.youtube.com/watch?v=abc"), Some("abc".to_string()));
    assert_eq!(yg_wasm::channel_id("/channel/UC1/videos"), Some("UC1".to_string()));
    assert_eq!(yg_wasm::format_time(75.0), "1:15");
}

#[wasm_bindgen_test]
fn scan_hides_banner() {
    let ad = append_div("ad");
    ad.set_id("masthead-ad");

    ensure_engine();
    assert!(yg_wasm::scan() >= 1);
    assert!(is_hidden(&ad));
    assert_eq!(ad.get_attribute(CATEGORY_ATTRIBUTE).as_deref(), Some("banner"));
    assert!(yg_wasm::intercept("fetch", "https://ad.doubleclick.net/x").is_err());
    assert!(!yg_wasm::adblock_detected());
}

#[wasm_bindgen_test]
fn class_change_rescans_element() {
    ensure_engine();
    let el = append_div("promo");
    el.set_attribute("class", "ytd-banner-promo-renderer").unwrap();

    let record = Object::new();
    Reflect::set(&record, &JsValue::from_str("type"), &JsValue::from_str("attributes")).unwrap();
    Reflect::set(&record, &JsValue::from_str("target"), &el).unwrap();
    Reflect::set(&record, &JsValue::from_str("attributeName"), &JsValue::from_str("class")).unwrap();

    assert_eq!(yg_wasm::on_mutations(Array::of1(&record)), 1);
    assert!(is_hidden(&el));
}
