//! Human readable rendering of a control, e.g.
//! `[HtmlImage 'picture.png' (id='myId') (name='myName')]`.

use crate::dom::{Element, NodeId};
use crate::page_index::PageIndex;

const INPUT_TYPE_NAMES: [(&str, &str); 17] = [
    ("text", "HtmlTextInput"),
    ("password", "HtmlPasswordInput"),
    ("email", "HtmlEmailInput"),
    ("search", "HtmlSearchInput"),
    ("url", "HtmlUrlInput"),
    ("tel", "HtmlTelInput"),
    ("number", "HtmlNumberInput"),
    ("date", "HtmlDateInput"),
    ("checkbox", "HtmlCheckBoxInput"),
    ("radio", "HtmlRadioButtonInput"),
    ("submit", "HtmlSubmitInput"),
    ("reset", "HtmlResetInput"),
    ("button", "HtmlButtonInput"),
    ("image", "HtmlImageInput"),
    ("file", "HtmlFileInput"),
    ("hidden", "HtmlHiddenInput"),
    ("color", "HtmlColorInput"),
];

const TAG_TYPE_NAMES: [(&str, &str); 14] = [
    ("a", "HtmlAnchor"),
    ("body", "HtmlBody"),
    ("button", "HtmlButton"),
    ("div", "HtmlDivision"),
    ("img", "HtmlImage"),
    ("label", "HtmlLabel"),
    ("optgroup", "HtmlOptionGroup"),
    ("option", "HtmlOption"),
    ("p", "HtmlParagraph"),
    ("select", "HtmlSelect"),
    ("span", "HtmlSpan"),
    ("table", "HtmlTable"),
    ("td", "HtmlTableDataCell"),
    ("textarea", "HtmlTextArea"),
];

pub fn type_name(element: &Element) -> String {
    if let Some(kind) = element.input_type() {
        return INPUT_TYPE_NAMES
            .iter()
            .find(|(name, _)| *name == kind)
            .map_or_else(|| "HtmlTextInput".to_string(), |(_, type_name)| type_name.to_string());
    }
    let tag = element.tag_name.to_ascii_lowercase();
    if let Some((_, type_name)) = TAG_TYPE_NAMES.iter().find(|(name, _)| *name == tag) {
        return type_name.to_string();
    }
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) => format!("Html{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "Html".to_string(),
    }
}

/// Describes `node`; non-elements render as `[#node]`.
pub fn describe(index: &PageIndex<'_>, node: NodeId) -> String {
    let dom = index.dom();
    let Some(element) = dom.element(node) else {
        return "[#node]".to_string();
    };
    let mut out = format!("[{}", type_name(element));
    let own_text = || {
        index
            .as_text(node)
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    };
    let quoted = |out: &mut String, text: &str| out.push_str(&format!(" '{text}'"));

    match element.input_type().as_deref() {
        Some("submit" | "reset" | "button" | "radio") => {
            quoted(&mut out, element.attr("value").unwrap_or_default());
        }
        Some("image") => {
            quoted(&mut out, element.attr("value").unwrap_or_default());
            out.push_str(&format!(" (src='{}')", element.attr("src").unwrap_or_default()));
        }
        Some(_) => {}
        None if element.is("a") || element.is("button") => {
            if let Some(image) = dom
                .children(node)
                .first()
                .copied()
                .filter(|child| dom.is_tag(*child, "img"))
            {
                quoted(
                    &mut out,
                    &format!("image: {}", dom.attr(image, "src").unwrap_or_default()),
                );
            }
            let text = own_text();
            if !text.is_empty() {
                quoted(&mut out, &text);
            } else if element.is("button") {
                if let Some(value) = element.attr("value").filter(|value| !value.is_empty()) {
                    quoted(&mut out, value);
                }
            }
        }
        None if element.is("img") => quoted(&mut out, element.attr("src").unwrap_or_default()),
        None if element.is("span") || element.is("option") => quoted(&mut out, &own_text()),
        None if element.is("optgroup") => {
            quoted(&mut out, element.attr("label").unwrap_or_default());
        }
        None if element.is("p") || element.is("label") => {
            let text = own_text();
            if !text.is_empty() {
                quoted(&mut out, &text);
            }
        }
        None => {}
    }

    for attribute in ["id", "name", "data-testid"] {
        if let Some(value) = element.attr(attribute).filter(|value| !value.is_empty()) {
            out.push_str(&format!(" ({attribute}='{value}')"));
        }
    }
    if element.is("label") {
        if let Some(target) = element.attr("for").filter(|value| !value.is_empty()) {
            out.push_str(&format!(" (for='{target}')"));
        }
    }
    if element.is("option") || element.is("optgroup") {
        if let Some(select) = dom.find_ancestor_by_tag(node, "select") {
            out.push_str(&format!(" part of {}", describe(index, select)));
        }
    }
    out.push(']');
    out
}

#[cfg(test)]
#[path = "tests/describe.rs"]
mod tests;
