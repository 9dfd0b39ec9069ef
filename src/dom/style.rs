use super::{Element, NodeId};

/// The handful of computed CSS properties element resolution depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub position: String,
    pub clip: String,
    pub text_transform: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "inline".to_string(),
            visibility: "visible".to_string(),
            position: "static".to_string(),
            clip: "auto".to_string(),
            text_transform: "none".to_string(),
        }
    }
}

impl ComputedStyle {
    pub(crate) fn initial(element: &Element, inherited: Option<&ComputedStyle>) -> Self {
        let mut style = Self {
            display: default_display(element).to_string(),
            ..Self::default()
        };
        if let Some(parent) = inherited {
            style.visibility = parent.visibility.clone();
            style.text_transform = parent.text_transform.clone();
        }
        style
    }

    pub(crate) fn apply(
        &mut self,
        declarations: &[(String, String)],
        inherited: Option<&ComputedStyle>,
    ) {
        let fallback = ComputedStyle::default();
        let parent = inherited.unwrap_or(&fallback);
        for (name, raw_value) in declarations {
            let value = raw_value
                .trim_end_matches("!important")
                .trim()
                .to_ascii_lowercase();
            let inherit = value == "inherit";
            match name.as_str() {
                "display" => {
                    self.display = if inherit { parent.display.clone() } else { value };
                }
                "visibility" => {
                    self.visibility = if inherit { parent.visibility.clone() } else { value };
                }
                "position" => {
                    self.position = if inherit { parent.position.clone() } else { value };
                }
                "clip" => {
                    self.clip = if inherit { parent.clip.clone() } else { value };
                }
                "text-transform" => {
                    self.text_transform = if inherit {
                        parent.text_transform.clone()
                    } else {
                        value
                    };
                }
                _ => {}
            }
        }
    }

    pub fn is_block_like(&self) -> bool {
        matches!(
            self.display.as_str(),
            "block" | "inline-block" | "list-item" | "flex" | "inline-table"
        ) || self.display.starts_with("table")
    }

    pub(crate) fn is_invisible(&self) -> bool {
        matches!(self.visibility.as_str(), "hidden" | "collapse")
    }

    /// `position: absolute; clip: rect(0px, 0px, 1px, 1px)` hides content
    /// from sighted users.
    pub(crate) fn is_clipped_away(&self) -> bool {
        if self.position != "absolute" {
            return false;
        }
        let clip = self
            .clip
            .replace(',', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        clip == "rect(0px 0px 1px 1px)"
    }
}

fn default_display(element: &Element) -> &'static str {
    if element.attrs.contains_key("hidden") {
        return "none";
    }
    match element.tag_name.to_ascii_lowercase().as_str() {
        "head" | "title" | "script" | "style" | "meta" | "link" | "base" | "template"
        | "noscript" | "datalist" | "param" => "none",
        "html" | "body" | "div" | "p" | "form" | "ul" | "ol" | "dl" | "dt" | "dd" | "h1"
        | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" | "blockquote" | "fieldset" | "legend"
        | "address" | "article" | "aside" | "section" | "nav" | "header" | "footer" | "main"
        | "hr" | "figure" | "figcaption" | "center" | "details" | "summary" | "menu"
        | "option" | "optgroup" | "frameset" | "frame" => "block",
        "table" => "table",
        "tr" => "table-row",
        "td" | "th" => "table-cell",
        "thead" => "table-header-group",
        "tbody" => "table-row-group",
        "tfoot" => "table-footer-group",
        "caption" => "table-caption",
        "li" => "list-item",
        "input" | "button" | "select" | "textarea" => "inline-block",
        _ => "inline",
    }
}

/// Selector subset supported in `<style>` blocks: `tag`, `.class`, `#id`,
/// `*` and compounds of those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SimpleSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl SimpleSelector {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty()
            || raw
                .chars()
                .any(|ch| ch.is_whitespace() || matches!(ch, '>' | '+' | '~' | ':' | '[' | ','))
        {
            return None;
        }

        let mut selector = Self {
            tag: None,
            id: None,
            classes: Vec::new(),
        };
        let mut rest = raw;
        let tag_end = rest.find(['.', '#']).unwrap_or(rest.len());
        let tag = &rest[..tag_end];
        if !tag.is_empty() && tag != "*" {
            selector.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_end..];

        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return None;
            }
            if marker == '#' {
                selector.id = Some(name.to_string());
            } else {
                selector.classes.push(name.to_string());
            }
            rest = &body[end..];
        }
        Some(selector)
    }

    pub(crate) fn matches(&self, element: &Element) -> bool {
        if self.tag.as_deref().is_some_and(|tag| !element.is(tag)) {
            return false;
        }
        if self
            .id
            .as_deref()
            .is_some_and(|id| element.attr("id") != Some(id))
        {
            return false;
        }
        let classes = class_tokens(element.attr("class"));
        self.classes
            .iter()
            .all(|class| classes.iter().any(|token| token == class))
    }

    pub(crate) fn specificity(&self) -> usize {
        usize::from(self.id.is_some()) * 100
            + self.classes.len() * 10
            + usize::from(self.tag.is_some())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StyleRule {
    pub(crate) document: NodeId,
    pub(crate) selector: SimpleSelector,
    pub(crate) declarations: Vec<(String, String)>,
    pub(crate) order: usize,
}

/// Parses a `<style>` body, keeping only rules whose selectors are simple.
pub(crate) fn parse_style_sheet(
    document: NodeId,
    css: &str,
    first_order: usize,
) -> Vec<StyleRule> {
    let css = strip_css_comments(css);
    let mut rules = Vec::new();
    let mut order = first_order;
    for block in css.split('}') {
        let Some((selectors, body)) = block.split_once('{') else {
            continue;
        };
        if selectors.trim_start().starts_with('@') {
            continue;
        }
        let declarations = parse_style_declarations(Some(body));
        if declarations.is_empty() {
            continue;
        }
        for raw in selectors.split(',') {
            let Some(selector) = SimpleSelector::parse(raw) else {
                continue;
            };
            rules.push(StyleRule {
                document,
                selector,
                declarations: declarations.clone(),
                order,
            });
            order += 1;
        }
    }
    rules
}

fn strip_css_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

pub(crate) fn class_tokens(class_attr: Option<&str>) -> Vec<String> {
    class_attr
        .map(|value| {
            value
                .split_whitespace()
                .filter(|token| !token.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

pub(crate) fn parse_style_declarations(style_attr: Option<&str>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let Some(style_attr) = style_attr else {
        return out;
    };

    let mut start = 0usize;
    let mut i = 0usize;
    let bytes = style_attr.as_bytes();
    let mut paren_depth = 0isize;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let ch = bytes[i];
        match (quote, ch) {
            (Some(_), b'\\') if i + 1 < bytes.len() => {
                i += 2;
                continue;
            }
            (Some(q), _) if ch == q => quote = None,
            (Some(_), _) => {}
            (None, b'\'') | (None, b'"') => quote = Some(ch),
            (None, b'(') => paren_depth += 1,
            (None, b')') => paren_depth = (paren_depth - 1).max(0),
            (None, b';') if paren_depth == 0 => {
                push_style_declaration(&style_attr[start..i], &mut out);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    push_style_declaration(&style_attr[start..], &mut out);
    out
}

fn push_style_declaration(raw_decl: &str, out: &mut Vec<(String, String)>) {
    let Some((name, value)) = raw_decl.split_once(':') else {
        return;
    };
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return;
    }
    let value = value.trim().to_string();
    if let Some(pos) = out.iter().position(|(existing, _)| existing == &name) {
        out[pos].1 = value;
    } else {
        out.push((name, value));
    }
}
