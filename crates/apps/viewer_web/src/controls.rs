use layers::{ControlGroup, ControlItem, ControlKind, LayerControls};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::JsValue;
use web_sys::{Element, HtmlInputElement};

use crate::dom;

pub const LAYER_LIST_ID: &str = "layer-controls";
pub const ANNOTATION_LIST_ID: &str = "annotation-controls";

fn list_id(group: ControlGroup) -> &'static str {
    match group {
        ControlGroup::Layers => LAYER_LIST_ID,
        ControlGroup::Annotations => ANNOTATION_LIST_ID,
    }
}

fn group_name(group: ControlGroup) -> &'static str {
    match group {
        ControlGroup::Layers => "layers",
        ControlGroup::Annotations => "annotations",
    }
}

/// Checkbox lists in the sidebar. Each input carries `data-group` and
/// `data-id`; the page forwards `change` events to `on_control_change`.
/// Base layers render as radio buttons sharing one name.
#[derive(Debug, Default)]
pub struct DomControls;

impl DomControls {
    fn render_list(&self, group: ControlGroup, items: &[ControlItem]) -> Result<(), JsValue> {
        // Pages without a sidebar have nothing to fill.
        let Some(list) = dom::find(list_id(group)) else {
            return Ok(());
        };
        list.set_text_content(None);
        for item in items {
            list.append_child(&row(group, item)?.into())?;
        }
        Ok(())
    }

    fn input(&self, group: ControlGroup, id: &str) -> Option<HtmlInputElement> {
        let list = dom::find(list_id(group))?;
        let selector = format!("input[data-id=\"{}\"]", css_escape(id));
        list.query_selector(&selector)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
    }
}

fn row(group: ControlGroup, item: &ControlItem) -> Result<Element, JsValue> {
    let label = dom::create("label", "control-row", None)?;
    let input = dom::create("input", "", None)?.dyn_into::<HtmlInputElement>()?;
    if item.kind == ControlKind::Base {
        input.set_type("radio");
        input.set_name("base-layer");
    } else {
        input.set_type("checkbox");
    }
    input.set_checked(item.checked);
    input.set_attribute("data-group", group_name(group))?;
    input.set_attribute("data-id", &item.id)?;
    label.append_child(&input)?;
    label.append_child(&dom::create("span", "control-name", Some(&item.name))?.into())?;
    Ok(label)
}

/// Escapes `"` and `\` for use inside a quoted attribute selector.
pub fn css_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl LayerControls for DomControls {
    fn render(&mut self, group: ControlGroup, items: &[ControlItem]) {
        if let Err(err) = self.render_list(group, items) {
            dom::warn(&format!("could not render {} controls: {err:?}", group_name(group)));
        }
    }

    fn set_checked(&mut self, group: ControlGroup, id: &str, checked: bool) {
        if let Some(input) = self.input(group, id) {
            input.set_checked(checked);
        }
    }
}

/// `data-group` value back to a group.
pub fn parse_group(raw: &str) -> Option<ControlGroup> {
    match raw {
        "layers" => Some(ControlGroup::Layers),
        "annotations" => Some(ControlGroup::Annotations),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{css_escape, parse_group};
    use layers::ControlGroup;

    #[test]
    fn selector_values_are_escaped() {
        assert_eq!(css_escape("ortho"), "ortho");
        assert_eq!(css_escape(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn groups_round_trip_through_attributes() {
        assert_eq!(parse_group("layers"), Some(ControlGroup::Layers));
        assert_eq!(parse_group("annotations"), Some(ControlGroup::Annotations));
        assert_eq!(parse_group("other"), None);
    }
}
