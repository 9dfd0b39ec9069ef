use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::error::{Error, Result};

mod style;

pub use style::ComputedStyle;
pub(crate) use style::{StyleRule, parse_style_declarations, parse_style_sheet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub enum NodeType {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag_name: String,
    pub attrs: HashMap<String, String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Lower-cased `type` of an `<input>`, defaulting to `text`.
    pub fn input_type(&self) -> Option<String> {
        if !self.is("input") {
            return None;
        }
        let kind = self.attr("type").map(str::trim).unwrap_or_default();
        if kind.is_empty() {
            Some("text".to_string())
        } else {
            Some(kind.to_ascii_lowercase())
        }
    }

    pub fn is_input_of(&self, kinds: &[&str]) -> bool {
        self.input_type()
            .is_some_and(|kind| kinds.contains(&kind.as_str()))
    }
}

/// Arena holding one or more documents; frame documents live next to the
/// top-level one.
#[derive(Debug, Clone)]
pub struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) id_index: HashMap<String, Vec<NodeId>>,
    pub(crate) style_rules: Vec<StyleRule>,
    pub(crate) listeners: HashMap<NodeId, HashSet<String>>,
    pub(crate) frames: HashMap<NodeId, NodeId>,
    rendering: OnceLock<Vec<Rendering>>,
}

/// Cascaded style of one node plus whether an ancestor-or-self removes the
/// whole subtree from rendering.
#[derive(Debug, Clone)]
struct Rendering {
    style: ComputedStyle,
    subtree_hidden: bool,
    document: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
            style_rules: Vec::new(),
            listeners: HashMap::new(),
            frames: HashMap::new(),
            rendering: OnceLock::new(),
        }
    }

    pub fn parse(html: &str) -> Result<Self> {
        crate::html::parse_html(html)
    }

    /// Parses `html` into a new document inside this arena.
    pub fn parse_document(&mut self, html: &str) -> Result<NodeId> {
        let document = self.create_document();
        crate::html::parse_into(self, document, html)?;
        Ok(document)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn create_document(&mut self) -> NodeId {
        self.create_node(None, NodeType::Document)
    }

    pub(crate) fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        self.rendering.take();
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let id_attr = attrs.get("id").cloned();
        let id = self.create_node(
            Some(parent),
            NodeType::Element(Element { tag_name, attrs }),
        );
        if let Some(id_attr) = id_attr {
            self.index_id(&id_attr, id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn create_comment(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Comment(text))
    }

    pub(crate) fn merge_attrs(&mut self, node_id: NodeId, attrs: HashMap<String, String>) {
        self.rendering.take();
        let mut new_id = None;
        let node_type = self.nodes.get_mut(node_id.0).map(|node| &mut node.node_type);
        if let Some(NodeType::Element(element)) = node_type {
            for (name, value) in attrs {
                if name == "id" && !element.attrs.contains_key("id") {
                    new_id = Some(value.clone());
                }
                element.attrs.entry(name).or_insert(value);
            }
        }
        if let Some(id) = new_id {
            self.index_id(&id, node_id);
        }
    }

    pub(crate) fn add_style_rules(&mut self, rules: Vec<StyleRule>) {
        self.rendering.take();
        self.style_rules.extend(rules);
    }

    fn index_id(&mut self, id: &str, node_id: NodeId) {
        if id.is_empty() {
            return;
        }
        self.id_index
            .entry(id.to_string())
            .or_default()
            .push(node_id);
    }

    pub fn node_type(&self, node_id: NodeId) -> Option<&NodeType> {
        self.nodes.get(node_id.0).map(|node| &node.node_type)
    }

    pub fn element(&self, node_id: NodeId) -> Option<&Element> {
        match self.node_type(node_id) {
            Some(NodeType::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub fn is_tag(&self, node_id: NodeId, tag: &str) -> bool {
        self.element(node_id).is_some_and(|e| e.is(tag))
    }

    pub fn attr(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.element(node_id).and_then(|e| e.attr(name))
    }

    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.nodes
            .get(node_id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn child_elements(&self, node_id: NodeId) -> Vec<NodeId> {
        self.children(node_id)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
            .collect()
    }

    pub fn first_element_child(&self, node_id: NodeId) -> Option<NodeId> {
        self.children(node_id)
            .iter()
            .copied()
            .find(|child| self.element(*child).is_some())
    }

    /// Element descendants in document order, not crossing into frames.
    pub fn descendant_elements(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.children(node_id).iter().rev().copied().collect::<Vec<_>>();
        while let Some(current) = stack.pop() {
            if self.element(current).is_some() {
                out.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn is_descendant_of(&self, node_id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn text_content(&self, node_id: NodeId) -> String {
        match self.node_type(node_id) {
            Some(NodeType::Document | NodeType::Element(_)) => {
                let mut out = String::new();
                for child in self.children(node_id) {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
            Some(NodeType::Text(text)) => text.clone(),
            Some(NodeType::Comment(_)) | None => String::new(),
        }
    }

    pub fn owner_document(&self, node_id: NodeId) -> NodeId {
        let mut current = node_id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    pub fn document_element(&self, document: NodeId) -> Option<NodeId> {
        self.first_element_child(document)
    }

    pub fn head(&self, document: NodeId) -> Option<NodeId> {
        let html = self.document_element(document)?;
        self.child_elements(html)
            .into_iter()
            .find(|child| self.is_tag(*child, "head"))
    }

    pub fn body(&self, document: NodeId) -> Option<NodeId> {
        let html = self.document_element(document)?;
        self.child_elements(html)
            .into_iter()
            .find(|child| self.is_tag(*child, "body") || self.is_tag(*child, "frameset"))
    }

    /// First element with `id` in the top-level document.
    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.by_id_in(self.root, id)
    }

    pub fn by_id_in(&self, document: NodeId, id: &str) -> Option<NodeId> {
        self.id_index
            .get(id)?
            .iter()
            .copied()
            .find(|node| self.owner_document(*node) == document)
    }

    pub fn require_by_id(&self, id: &str) -> Result<NodeId> {
        self.by_id(id)
            .ok_or_else(|| Error::NodeNotFound(format!("#{id}")))
    }

    pub fn find_ancestor_by_tag(&self, node_id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if self.is_tag(current, tag) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    pub fn enclosing_form(&self, node_id: NodeId) -> Option<NodeId> {
        self.find_ancestor_by_tag(node_id, "form")
    }

    pub fn frame_document(&self, frame: NodeId) -> Option<NodeId> {
        self.frames.get(&frame).copied()
    }

    /// Makes `document` the content of the `<iframe>`/`<frame>` element `frame`.
    pub fn attach_frame_document(&mut self, frame: NodeId, document: NodeId) -> Result<()> {
        if !(self.is_tag(frame, "iframe") || self.is_tag(frame, "frame")) {
            return Err(Error::NodeNotFound(format!(
                "node {} is not a frame element",
                frame.0
            )));
        }
        if !matches!(self.node_type(document), Some(NodeType::Document)) || document == self.root {
            return Err(Error::NodeNotFound(format!(
                "node {} is not a frame document",
                document.0
            )));
        }
        self.frames.insert(frame, document);
        Ok(())
    }

    pub fn add_event_listener(&mut self, node_id: NodeId, event: &str) {
        self.listeners
            .entry(node_id)
            .or_default()
            .insert(event.to_ascii_lowercase());
    }

    /// True when `event` has an `on<event>` attribute or a registered
    /// listener on the node itself.
    pub fn has_event_handler(&self, node_id: NodeId, event: &str) -> bool {
        let attr = format!("on{event}");
        self.element(node_id)
            .is_some_and(|element| element.attrs.contains_key(&attr))
            || self
                .listeners
                .get(&node_id)
                .is_some_and(|events| events.contains(event))
    }

    pub fn computed_style(&self, node_id: NodeId) -> ComputedStyle {
        self.rendering()
            .get(node_id.0)
            .map(|rendering| rendering.style.clone())
            .unwrap_or_default()
    }

    /// Rendered-ness as a browser would report it: hidden by `display: none`
    /// or the screen-reader clip idiom on the node or an ancestor, by
    /// `visibility`, or by being a hidden input.
    pub fn is_displayed(&self, node_id: NodeId) -> bool {
        match self.node_type(node_id) {
            Some(NodeType::Document) => true,
            Some(NodeType::Text(_) | NodeType::Comment(_)) => self
                .parent(node_id)
                .is_none_or(|parent| self.is_displayed(parent)),
            Some(NodeType::Element(element)) => {
                if element.is_input_of(&["hidden"]) {
                    return false;
                }
                self.rendering()
                    .get(node_id.0)
                    .is_some_and(|rendering| {
                        !rendering.subtree_hidden && !rendering.style.is_invisible()
                    })
            }
            None => false,
        }
    }

    fn rendering(&self) -> &[Rendering] {
        self.rendering.get_or_init(|| self.cascade_all())
    }

    /// One pass in arena order; parents are always allocated before their
    /// children, so each node inherits from an already computed entry.
    fn cascade_all(&self) -> Vec<Rendering> {
        let mut out: Vec<Rendering> = Vec::with_capacity(self.nodes.len());
        for (slot, node) in self.nodes.iter().enumerate() {
            let parent = node
                .parent
                .filter(|parent| parent.0 < slot)
                .map(|parent| (parent, &out[parent.0]));
            let document = parent.map_or(NodeId(slot), |(_, rendering)| rendering.document);
            let inherited = parent
                .filter(|(id, _)| self.element(*id).is_some())
                .map(|(_, rendering)| &rendering.style);
            let parent_hidden = parent.is_some_and(|(_, rendering)| rendering.subtree_hidden);

            let rendering = match &node.node_type {
                NodeType::Element(element) => {
                    let style = self.cascade(document, element, inherited);
                    let subtree_hidden =
                        parent_hidden || style.display == "none" || style.is_clipped_away();
                    Rendering {
                        style,
                        subtree_hidden,
                        document,
                    }
                }
                _ => Rendering {
                    style: inherited.cloned().unwrap_or_default(),
                    subtree_hidden: parent_hidden,
                    document,
                },
            };
            out.push(rendering);
        }
        out
    }

    fn cascade(
        &self,
        document: NodeId,
        element: &Element,
        inherited: Option<&ComputedStyle>,
    ) -> ComputedStyle {
        let mut style = ComputedStyle::initial(element, inherited);
        let mut matched = self
            .style_rules
            .iter()
            .filter(|rule| rule.document == document && rule.selector.matches(element))
            .collect::<Vec<_>>();
        matched.sort_by_key(|rule| (rule.selector.specificity(), rule.order));
        for rule in matched {
            style.apply(&rule.declarations, inherited);
        }
        let inline = parse_style_declarations(element.attr("style"));
        style.apply(&inline, inherited);
        style
    }
}

/// Read access to a rendered page.
///
/// Live browser backends can fail transiently while a node's script peer is
/// still being built; they report that as
/// [`Error::NotYetConstructed`](crate::Error::NotYetConstructed) and callers
/// retry according to their [`RetryPolicy`](crate::RetryPolicy).
pub trait DomProvider {
    fn dom(&self) -> &Dom;

    fn computed_style(&self, node: NodeId) -> Result<ComputedStyle>;

    fn is_displayed(&self, node: NodeId) -> Result<bool>;
}

impl DomProvider for Dom {
    fn dom(&self) -> &Dom {
        self
    }

    fn computed_style(&self, node: NodeId) -> Result<ComputedStyle> {
        Ok(Dom::computed_style(self, node))
    }

    fn is_displayed(&self, node: NodeId) -> Result<bool> {
        Ok(Dom::is_displayed(self, node))
    }
}

#[cfg(test)]
#[path = "tests/dom.rs"]
mod tests;
