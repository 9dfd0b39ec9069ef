use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use tracing::{debug, debug_span, error, trace};
use unicode_normalization::UnicodeNormalization;

use crate::config::LocatorConfig;
use crate::dom::{ComputedStyle, Dom, DomProvider, NodeId, NodeType};
use crate::error::{Error, Result};
use crate::normalized::NormalizedString;
use crate::search_pattern::{FindSpot, SearchPattern};

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    Click,
    ClickDouble,
    ClickRight,
    MouseOver,
}

impl MouseAction {
    pub const ALL: [MouseAction; 4] = [
        MouseAction::Click,
        MouseAction::ClickDouble,
        MouseAction::ClickRight,
        MouseAction::MouseOver,
    ];

    const fn bit(self) -> u8 {
        match self {
            MouseAction::Click => 1,
            MouseAction::ClickDouble => 1 << 1,
            MouseAction::ClickRight => 1 << 2,
            MouseAction::MouseOver => 1 << 3,
        }
    }
}

/// Set of [`MouseAction`]s, copied by value down the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MouseActions(u8);

impl MouseActions {
    pub const EMPTY: MouseActions = MouseActions(0);

    pub const fn with(self, action: MouseAction) -> Self {
        MouseActions(self.0 | action.bit())
    }

    pub const fn union(self, other: MouseActions) -> Self {
        MouseActions(self.0 | other.0)
    }

    pub const fn contains(self, action: MouseAction) -> bool {
        self.0 & action.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Actions a handler for the DOM event `event` reacts to.
    pub fn for_event(event: &str) -> Self {
        use MouseAction::*;
        match event {
            "mousedown" | "mouseup" => Self::EMPTY.with(Click).with(ClickDouble).with(ClickRight),
            "click" => Self::EMPTY.with(Click).with(ClickDouble),
            "dblclick" => Self::EMPTY.with(ClickDouble),
            "contextmenu" => Self::EMPTY.with(ClickRight),
            "mouseover" | "mousemove" | "mouseout" => Self::EMPTY.with(MouseOver),
            _ => Self::EMPTY,
        }
    }
}

const MOUSE_EVENTS: [&str; 8] = [
    "mousedown",
    "mouseup",
    "click",
    "dblclick",
    "contextmenu",
    "mouseover",
    "mousemove",
    "mouseout",
];

/// Linear text model of one rendered document.
///
/// Built in a single depth-first pass; every visited node gets a visit
/// index, a hierarchy path and a [`FindSpot`] in two buffers: the full text
/// and the text without form-control content.
#[derive(Debug, Clone)]
pub struct PageIndex<'a> {
    dom: &'a Dom,
    text: NormalizedString,
    text_without_form_controls: NormalizedString,
    rendered: String,
    positions: HashMap<NodeId, FindSpot>,
    positions_without_form_controls: HashMap<NodeId, FindSpot>,
    nodes: Vec<NodeId>,
    node_index: HashMap<NodeId, usize>,
    hierarchies: HashMap<NodeId, String>,
    visible: Vec<NodeId>,
    visible_set: HashSet<NodeId>,
    visible_bottom_up: Vec<NodeId>,
    mouse_actions: HashMap<NodeId, MouseActions>,
}

impl<'a> PageIndex<'a> {
    pub fn build<P>(provider: &'a P, config: &LocatorConfig) -> Result<Self>
    where
        P: DomProvider + ?Sized,
    {
        let dom = provider.dom();
        let span = debug_span!("page_index_build", nodes = dom.len());
        let _guard = span.enter();

        let mut indexer = Indexer {
            provider,
            config,
            styles: HashMap::new(),
            index: PageIndex {
                dom,
                text: NormalizedString::new(),
                text_without_form_controls: NormalizedString::new(),
                rendered: String::new(),
                positions: HashMap::new(),
                positions_without_form_controls: HashMap::new(),
                nodes: Vec::new(),
                node_index: HashMap::new(),
                hierarchies: HashMap::new(),
                visible: Vec::new(),
                visible_set: HashSet::new(),
                visible_bottom_up: Vec::new(),
                mouse_actions: HashMap::new(),
            },
        };
        indexer.visit(dom.root(), None, MouseActions::EMPTY)?;

        let mut index = indexer.index;
        index.rendered = index.text.to_string();
        debug!(
            visited = index.nodes.len(),
            visible = index.visible.len(),
            text_len = index.text.length(),
            "page index built"
        );
        Ok(index)
    }

    pub fn dom(&self) -> &'a Dom {
        self.dom
    }

    pub fn text(&self) -> &str {
        &self.rendered
    }

    pub fn text_without_form_controls(&self) -> String {
        self.text_without_form_controls.to_string()
    }

    /// Nodes in visit order; the position in this list is the node's index.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn visible_elements(&self) -> &[NodeId] {
        &self.visible
    }

    /// Visible elements with every element listed after its descendants.
    pub fn visible_elements_bottom_up(&self) -> &[NodeId] {
        &self.visible_bottom_up
    }

    pub fn is_visible(&self, node: NodeId) -> bool {
        self.visible_set.contains(&node)
    }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.node_index.get(&node).copied()
    }

    pub fn hierarchy(&self, node: NodeId) -> Option<&str> {
        self.hierarchies.get(&node).map(String::as_str)
    }

    pub fn position(&self, node: NodeId) -> Option<FindSpot> {
        self.positions.get(&node).copied()
    }

    pub fn position_without_form_controls(&self, node: NodeId) -> Option<FindSpot> {
        self.positions_without_form_controls.get(&node).copied()
    }

    pub fn html_element_by_id(&self, id: &str) -> Result<NodeId> {
        self.dom.require_by_id(id)
    }

    pub fn first_occurrence(&self, pattern: &SearchPattern) -> Option<FindSpot> {
        pattern.first_occurrence_in(&self.rendered)
    }

    pub fn first_occurrence_from(&self, pattern: &SearchPattern, from: usize) -> Option<FindSpot> {
        pattern.first_occurrence_from(&self.rendered, from)
    }

    pub fn as_text(&self, node: NodeId) -> Option<String> {
        let spot = self.position(node)?;
        Some(self.text.substring(spot.start, spot.end))
    }

    pub fn as_text_without_form_controls(&self, node: NodeId) -> Option<String> {
        let spot = self.position_without_form_controls(node)?;
        Some(self.text_without_form_controls.substring(spot.start, spot.end))
    }

    pub fn text_before(&self, node: NodeId) -> Option<String> {
        let spot = self.position(node)?;
        Some(self.text.substring(0, spot.start))
    }

    pub fn text_before_including_self(&self, node: NodeId) -> Option<String> {
        let spot = self.position(node)?;
        Some(self.text.substring(0, spot.end))
    }

    /// Text between `node` and the closest preceding form control, the body
    /// start or the end of a different form. Text before `floor` is never
    /// part of the result.
    pub fn labeling_text_before(&self, node: NodeId, floor: usize) -> Result<Option<String>> {
        let (Some(spot), Some(index)) = (self.position(node), self.index_of(node)) else {
            return Ok(None);
        };
        let current_form = self.dom.enclosing_form(node);
        let mut start = 0usize;

        for candidate in self.nodes[..index].iter().rev().copied() {
            if self.dom.is_tag(candidate, "body") {
                start = self.require_position(candidate)?.start;
                break;
            }

            if self.is_submittable(candidate) {
                start = self.require_position(candidate)?.end;
                let between = self.text.substring(start.max(floor), spot.start);
                if !between.is_empty() {
                    return Ok(Some(between));
                }
            }

            if self.dom.element(candidate).is_some() {
                let form = self.dom.enclosing_form(candidate);
                if form.is_some() && form != current_form {
                    start = self.require_position(candidate)?.end;
                    break;
                }
            }
        }

        Ok(Some(self.text.substring(start.max(floor), spot.start)))
    }

    /// Text between `node` and the next form control, or the first element
    /// outside of `node`'s form.
    pub fn labeling_text_after(&self, node: NodeId) -> Result<Option<String>> {
        let (Some(spot), Some(index)) = (self.position(node), self.index_of(node)) else {
            return Ok(None);
        };
        let current_form = self.dom.enclosing_form(node);
        let mut end = self.text.length();

        for candidate in self.nodes[index + 1..].iter().copied() {
            if self.is_submittable(candidate) {
                end = self.require_position(candidate)?.start;
                break;
            }
            if current_form.is_some()
                && self.dom.element(candidate).is_some()
                && self.dom.enclosing_form(candidate) != current_form
            {
                end = self.require_position(candidate)?.start;
                break;
            }
        }

        Ok(Some(self.text.substring(spot.end, end)))
    }

    pub fn mouse_actions(&self, node: NodeId) -> MouseActions {
        self.mouse_actions.get(&node).copied().unwrap_or_default()
    }

    pub fn has_mouse_action_listener(&self, action: MouseAction, node: NodeId) -> bool {
        self.mouse_actions(node).contains(action)
    }

    pub fn has_click_listener(&self, node: NodeId) -> bool {
        self.has_mouse_action_listener(MouseAction::Click, node)
    }

    /// One row per visited node: `index | hierarchy | type | full | without form controls`.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (index, node) in self.nodes.iter().enumerate() {
            let hierarchy = self.hierarchy(*node).unwrap_or("?");
            let kind = node_kind(self.dom, *node);
            let full = self
                .position(*node)
                .map_or_else(|| "-".to_string(), |spot| format!("{}..{}", spot.start, spot.end));
            let reduced = self
                .position_without_form_controls(*node)
                .map_or_else(|| "-".to_string(), |spot| format!("{}..{}", spot.start, spot.end));
            let _ = writeln!(out, "{index} | {hierarchy} | {kind} | {full} | {reduced}");
        }
        out
    }

    pub(crate) fn require_position(&self, node: NodeId) -> Result<FindSpot> {
        self.position(node).ok_or_else(|| {
            let dump = self.dump();
            error!(node = node.0, %dump, "visited node without position");
            Error::IndexInconsistency {
                node: format!("{} ({})", node.0, node_kind(self.dom, node)),
                dump,
            }
        })
    }

    fn is_submittable(&self, node: NodeId) -> bool {
        let Some(element) = self.dom.element(node) else {
            return false;
        };
        if element.is("input") {
            return !element.is_input_of(&["hidden"]);
        }
        element.is("button") || element.is("select") || element.is("textarea")
    }
}

fn node_kind(dom: &Dom, node: NodeId) -> String {
    match dom.node_type(node) {
        Some(NodeType::Document) => "#document".to_string(),
        Some(NodeType::Element(element)) => match element.input_type() {
            Some(kind) => format!("input[{kind}]"),
            None => element.tag_name.to_ascii_lowercase(),
        },
        Some(NodeType::Text(_)) => "#text".to_string(),
        Some(NodeType::Comment(_)) => "#comment".to_string(),
        None => "?".to_string(),
    }
}

struct Indexer<'a, 'c, P: ?Sized> {
    provider: &'a P,
    config: &'c LocatorConfig,
    index: PageIndex<'a>,
    styles: HashMap<NodeId, ComputedStyle>,
}

impl<'a, P> Indexer<'a, '_, P>
where
    P: DomProvider + ?Sized,
{
    fn visit(&mut self, node: NodeId, parent: Option<&str>, inherited: MouseActions) -> Result<()> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            self.visit_node(node, parent, inherited)
        })
    }

    fn visit_node(&mut self, node: NodeId, parent: Option<&str>, inherited: MouseActions) -> Result<()> {
        let dom = self.index.dom;
        let index = self.index.nodes.len();
        self.index.nodes.push(node);
        self.index.node_index.insert(node, index);
        let hierarchy = match parent {
            Some(parent) => format!("{parent}>{index}"),
            None => index.to_string(),
        };
        self.index.hierarchies.insert(node, hierarchy.clone());

        let start = self.index.text.length();
        let start_without_form_controls = self.index.text_without_form_controls.length();

        let displayed = {
            let provider = self.provider;
            self.config.retry.run(|| provider.is_displayed(node))?
        };
        let own = self.own_mouse_actions(node, inherited);
        let for_children = self.child_mouse_actions(node, inherited, own);

        if displayed {
            if dom.element(node).is_some() {
                self.index.visible.push(node);
                self.index.visible_set.insert(node);
                if !own.is_empty() {
                    self.index.mouse_actions.insert(node, own);
                }
            }
            self.dispatch(node, &hierarchy, for_children)?;
            if dom.element(node).is_some() {
                self.index.visible_bottom_up.push(node);
            }
        } else {
            trace!(node = node.0, "not displayed");
            self.visit_children(node, &hierarchy, for_children)?;
        }

        let end = self.index.text.length();
        let end_without_form_controls = self.index.text_without_form_controls.length();
        self.index
            .positions
            .insert(node, FindSpot::new(start, end));
        self.index.positions_without_form_controls.insert(
            node,
            FindSpot::new(start_without_form_controls, end_without_form_controls),
        );
        Ok(())
    }

    fn own_mouse_actions(&self, node: NodeId, inherited: MouseActions) -> MouseActions {
        let dom = self.index.dom;
        if dom.element(node).is_none() {
            return inherited;
        }
        MOUSE_EVENTS
            .iter()
            .filter(|event| dom.has_event_handler(node, event))
            .fold(inherited, |set, event| set.union(MouseActions::for_event(event)))
    }

    fn child_mouse_actions(
        &self,
        node: NodeId,
        inherited: MouseActions,
        own: MouseActions,
    ) -> MouseActions {
        let dom = self.index.dom;
        let Some(element) = dom.element(node) else {
            return own;
        };
        if element.is("html") || element.is("body") {
            return inherited;
        }
        if element.is("button") || (element.is("a") && element.attr("href").is_some()) {
            return own.with(MouseAction::Click);
        }
        own
    }

    fn visit_children(&mut self, node: NodeId, hierarchy: &str, actions: MouseActions) -> Result<()> {
        let dom = self.index.dom;
        for child in dom.children(node) {
            self.visit(*child, Some(hierarchy), actions)?;
        }
        Ok(())
    }

    fn visit_children_without_form_controls(
        &mut self,
        node: NodeId,
        hierarchy: &str,
        actions: MouseActions,
    ) -> Result<()> {
        let saved = self.index.text_without_form_controls.append_enabled();
        self.index.text_without_form_controls.disable_append();
        let result = self.visit_children(node, hierarchy, actions);
        self.index.text_without_form_controls.set_append_enabled(saved);
        result
    }

    fn blank(&mut self) {
        self.index.text.append_blank();
        self.index.text_without_form_controls.append_blank();
    }

    fn append_both(&mut self, value: &str) {
        let value = self.normalize(value);
        self.index.text.append(&value);
        self.index.text_without_form_controls.append(&value);
    }

    fn append_full(&mut self, value: &str) {
        let value = self.normalize(value);
        self.index.text.append(&value);
    }

    fn normalize(&self, value: &str) -> String {
        if self.config.normalize_unicode {
            value.nfc().collect()
        } else {
            value.to_string()
        }
    }

    fn dispatch(&mut self, node: NodeId, hierarchy: &str, actions: MouseActions) -> Result<()> {
        let dom = self.index.dom;
        let element = match dom.node_type(node) {
            Some(NodeType::Document) => return self.visit_children(node, hierarchy, actions),
            Some(NodeType::Text(text)) => {
                let text = self.transform_text(node, text)?;
                self.append_both(&text);
                return Ok(());
            }
            Some(NodeType::Comment(_)) | None => return Ok(()),
            Some(NodeType::Element(element)) => element,
        };

        let tag = element.tag_name.to_ascii_lowercase();
        match tag.as_str() {
            "script" | "style" | "head" | "title" | "applet" => Ok(()),
            "br" => {
                self.blank();
                Ok(())
            }
            "img" => {
                self.blank();
                self.append_both(element.attr("alt").unwrap_or_default());
                self.blank();
                Ok(())
            }
            "iframe" | "frame" => match dom.frame_document(node) {
                Some(document) => self.visit(document, Some(hierarchy), MouseActions::EMPTY),
                None => Ok(()),
            },
            "select" => self.select(node, hierarchy, actions),
            "optgroup" => {
                self.append_full(element.attr("label").unwrap_or_default());
                Ok(())
            }
            "legend" => {
                self.visit_children(node, hierarchy, actions)?;
                self.blank();
                Ok(())
            }
            "input" => self.input(node, hierarchy, actions),
            "textarea" => {
                if dom.text_content(node).is_empty() {
                    self.append_full(element.attr("placeholder").unwrap_or_default());
                    Ok(())
                } else {
                    self.visit_children_without_form_controls(node, hierarchy, actions)
                }
            }
            "button" => {
                self.blank();
                self.visit_children_without_form_controls(node, hierarchy, actions)?;
                self.blank();
                Ok(())
            }
            "ol" => self.ordered_list(node, hierarchy, actions),
            "label" => {
                self.blank();
                self.visit_children(node, hierarchy, actions)?;
                self.blank();
                Ok(())
            }
            "q" => {
                self.append_both("\"");
                self.visit_children(node, hierarchy, actions)?;
                self.append_both("\"");
                Ok(())
            }
            "object" => {
                self.blank();
                let has_embed = dom
                    .child_elements(node)
                    .iter()
                    .any(|child| dom.is_tag(*child, "embed"));
                if !has_embed {
                    self.visit_children(node, hierarchy, actions)?;
                }
                self.blank();
                Ok(())
            }
            _ => {
                let block =
                    tag == "link" || tag == "option" || self.style(node)?.is_block_like();
                if block {
                    self.blank();
                }
                self.visit_children(node, hierarchy, actions)?;
                if block {
                    self.blank();
                }
                Ok(())
            }
        }
    }

    fn input(&mut self, node: NodeId, hierarchy: &str, actions: MouseActions) -> Result<()> {
        let dom = self.index.dom;
        let Some(element) = dom.element(node) else {
            return Ok(());
        };
        let kind = element.input_type().unwrap_or_default();
        match kind.as_str() {
            "hidden" | "file" => {}
            "submit" | "reset" | "button" => {
                self.blank();
                self.append_full(element.attr("value").unwrap_or_default());
                self.blank();
            }
            "image" => {
                self.blank();
                self.append_full(element.attr("alt").unwrap_or_default());
                self.blank();
            }
            "checkbox" | "radio" => {
                self.blank();
                self.visit_children_without_form_controls(node, hierarchy, actions)?;
                self.blank();
            }
            _ => {
                let value = element.attr("value").unwrap_or_default();
                if value.is_empty() {
                    self.append_full(element.attr("placeholder").unwrap_or_default());
                } else {
                    self.append_full(value);
                }
            }
        }
        Ok(())
    }

    fn select(&mut self, node: NodeId, hierarchy: &str, actions: MouseActions) -> Result<()> {
        let dom = self.index.dom;
        let saved = self.index.text_without_form_controls.append_enabled();
        self.index.text_without_form_controls.disable_append();
        for item in dom.descendant_elements(node) {
            if dom.is_tag(item, "option") || dom.is_tag(item, "optgroup") {
                self.blank();
                self.visit(item, Some(hierarchy), actions)?;
            }
        }
        self.index.text_without_form_controls.set_append_enabled(saved);
        self.blank();
        Ok(())
    }

    fn ordered_list(&mut self, node: NodeId, hierarchy: &str, actions: MouseActions) -> Result<()> {
        let dom = self.index.dom;
        self.blank();
        let mut number = 1usize;
        for child in dom.children(node).iter().copied() {
            if !dom.is_tag(child, "li") {
                self.visit(child, Some(hierarchy), actions)?;
                continue;
            }
            let start = self.index.text.length();
            let start_without_form_controls = self.index.text_without_form_controls.length();
            self.append_both(&format!("{number}. "));
            number += 1;

            self.visit(child, Some(hierarchy), actions)?;
            if let Some(spot) = self.index.positions.get_mut(&child) {
                spot.start = start;
            }
            if let Some(spot) = self.index.positions_without_form_controls.get_mut(&child) {
                spot.start = start_without_form_controls;
            }
        }
        self.blank();
        Ok(())
    }

    /// Computed style of `node`, fetched from the provider once per build.
    fn style(&mut self, node: NodeId) -> Result<&ComputedStyle> {
        let provider = self.provider;
        let retry = self.config.retry;
        match self.styles.entry(node) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(retry.run(|| provider.computed_style(node))?)),
        }
    }

    fn transform_text(&mut self, node: NodeId, text: &str) -> Result<String> {
        let dom = self.index.dom;
        let Some(parent) = dom.parent(node).filter(|parent| dom.element(*parent).is_some())
        else {
            return Ok(text.to_string());
        };
        let style = self.style(parent)?;
        Ok(match style.text_transform.as_str() {
            "uppercase" => text.to_uppercase(),
            "lowercase" => text.to_lowercase(),
            "capitalize" => capitalize_words(text),
            _ => text.to_string(),
        })
    }
}

fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for ch in text.chars() {
        if word_start && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        word_start = ch.is_whitespace();
    }
    out
}

#[cfg(test)]
#[path = "tests/page_index.rs"]
mod tests;
