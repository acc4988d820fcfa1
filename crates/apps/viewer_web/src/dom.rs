use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::JsValue;
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlElement};

pub fn document() -> Result<Document, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))
}

pub fn element(id: &str) -> Result<Element, JsValue> {
    document()?
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing #{id}")))
}

/// Like [`element`] for parts of the page that are optional.
pub fn find(id: &str) -> Option<Element> {
    document().ok()?.get_element_by_id(id)
}

pub fn set_hidden(id: &str, hidden: bool) {
    if let Some(el) = find(id).and_then(|e| e.dyn_into::<HtmlElement>().ok()) {
        el.set_hidden(hidden);
    }
}

pub fn set_text(id: &str, text: &str) {
    if let Some(el) = find(id) {
        el.set_text_content(Some(text));
    }
}

pub fn set_class(el: &Element, class: &str, on: bool) {
    let _ = el.class_list().toggle_with_force(class, on);
}

/// `document.createElement(tag)` with a class and optional text.
pub fn create(tag: &str, class: &str, text: Option<&str>) -> Result<Element, JsValue> {
    let el = document()?.create_element(tag)?;
    if !class.is_empty() {
        el.set_class_name(class);
    }
    if let Some(text) = text {
        el.set_text_content(Some(text));
    }
    Ok(el)
}

pub fn warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

pub fn ctx_set_fill_style(ctx: &CanvasRenderingContext2d, value: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("fillStyle"),
        &JsValue::from_str(value),
    );
}

pub fn ctx_set_stroke_style(ctx: &CanvasRenderingContext2d, value: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("strokeStyle"),
        &JsValue::from_str(value),
    );
}
