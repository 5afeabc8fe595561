//! Page-introspector bounds: visibility filtering, per-tag caps and
//! text truncation.

mod common;

use common::{FakePage, element, test_config};
use webpilot::dom::capture_context;
use webpilot::types::ElementDescriptor;

fn invisible(tag: &str, text: &str) -> ElementDescriptor {
    ElementDescriptor {
        visible: false,
        ..element(tag, text)
    }
}

#[test]
fn empty_page_yields_empty_containers() {
    let page = FakePage::new();
    let context = capture_context(page.as_ref(), &test_config()).unwrap();

    assert!(context.visible_text.is_empty());
    assert!(context.elements.is_empty());
}

#[test]
fn elements_are_capped_per_tag() {
    let page = FakePage::new();
    page.set_elements(
        "button",
        (0..14).map(|i| element("button", &format!("b{i}"))).collect(),
    );
    page.set_elements("a", vec![element("a", "Home"), element("a", "Docs")]);

    let context = capture_context(page.as_ref(), &test_config()).unwrap();

    let buttons = context.elements.iter().filter(|el| el.tag == "button").count();
    let links = context.elements.iter().filter(|el| el.tag == "a").count();
    assert_eq!(buttons, 10);
    assert_eq!(links, 2);
}

#[test]
fn invisible_elements_are_skipped() {
    let page = FakePage::new();
    page.set_elements(
        "a",
        vec![
            element("a", "Visible"),
            invisible("a", "Hidden"),
            element("a", "Also visible"),
        ],
    );

    let context = capture_context(page.as_ref(), &test_config()).unwrap();

    assert_eq!(context.elements.len(), 2);
    assert!(context.elements.iter().all(|el| el.text != "Hidden"));
}

#[test]
fn visible_text_is_truncated_to_the_capture_limit() {
    let page = FakePage::new();
    page.set_text(&"word ".repeat(1000));

    let context = capture_context(page.as_ref(), &test_config()).unwrap();

    assert_eq!(context.visible_text.chars().count(), 2000);
}

#[test]
fn tag_order_follows_the_allow_list() {
    let page = FakePage::new();
    page.set_elements("a", vec![element("a", "link")]);
    page.set_elements("button", vec![element("button", "btn")]);
    page.set_elements("input", vec![element("input", "field")]);

    let context = capture_context(page.as_ref(), &test_config()).unwrap();

    let tags: Vec<&str> = context.elements.iter().map(|el| el.tag.as_str()).collect();
    assert_eq!(tags, vec!["button", "a", "input"]);
}
