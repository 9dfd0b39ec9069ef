use std::sync::Arc;

use tracing::trace;

use crate::describe::describe;
use crate::dom::{Element, NodeId};
use crate::error::Result;
use crate::matcher::{
    AttributeMatcher, CompiledCoordinate, ElementFilter, HtmlLabelMatcher, InnerImageMatcher,
    MatchResult, Matcher, PathContext, TableCoordinatesMatcher, ValueSource,
    is_in_table_coordinates,
};
use crate::page_index::{MouseAction, PageIndex};
use crate::search_pattern::SearchPattern;
use crate::weighted::{Entry, FoundBy};
use crate::wpath::WPath;

mod option;

pub use option::OptionIdentifier;

const TEXT_INPUT_TYPES: [&str; 8] = [
    "text", "password", "email", "search", "url", "tel", "number", "date",
];

/// Locator compiled against one page index. Shared by every identifier
/// run for the same `find` call.
#[derive(Debug, Clone)]
pub struct Request {
    wpath: WPath,
    path: Option<PathContext>,
    target: Arc<SearchPattern>,
    whole: Arc<SearchPattern>,
    coordinates: Vec<CompiledCoordinate>,
}

impl Request {
    pub fn new(index: &PageIndex<'_>, wpath: &WPath) -> Result<Self> {
        let path = PathContext::resolve(index, wpath.path_nodes())?;
        let target = SearchPattern::compile(wpath.last_node().unwrap_or_default())?;

        let mut whole_nodes: Vec<&str> = wpath.path_nodes().iter().map(String::as_str).collect();
        whole_nodes.extend(wpath.last_node());
        let whole = SearchPattern::create_from_list(&whole_nodes)?;

        let coordinates = wpath
            .table_coordinates_reversed()
            .iter()
            .map(CompiledCoordinate::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            wpath: wpath.clone(),
            path,
            target,
            whole,
            coordinates,
        })
    }

    pub fn wpath(&self) -> &WPath {
        &self.wpath
    }

    /// `None` when the context segments do not occur on the page.
    pub fn path(&self) -> Option<&PathContext> {
        self.path.as_ref()
    }

    pub fn target(&self) -> &Arc<SearchPattern> {
        &self.target
    }

    /// Context and target joined into one pattern.
    pub fn whole(&self) -> &Arc<SearchPattern> {
        &self.whole
    }

    /// Table coordinates, innermost first.
    pub fn coordinates(&self) -> &[CompiledCoordinate] {
        &self.coordinates
    }
}

/// Finds the controls of one family that a locator points at.
pub trait Identifier {
    fn is_supported(&self, index: &PageIndex<'_>, node: NodeId) -> bool;

    fn identify(&self, index: &PageIndex<'_>, request: &Request, node: NodeId)
        -> Result<Vec<Entry>>;
}

/// Scored entry for `node`; `start` is the control's own position.
pub(crate) fn entry(
    index: &PageIndex<'_>,
    node: NodeId,
    found_by: FoundBy,
    deviation: usize,
    distance: usize,
) -> Result<Entry> {
    let spot = index.require_position(node)?;
    Ok(Entry {
        control: node,
        description: describe(index, node),
        found_by,
        deviation,
        distance,
        start: spot.start,
        hierarchy: index.hierarchy(node).map(str::to_string),
        index: index.index_of(node).unwrap_or_default(),
    })
}

/// Turns matcher hits into entries. When the locator carries coordinates
/// and a target, every hit also has to sit in the addressed cell.
fn entries_for(
    index: &PageIndex<'_>,
    request: &Request,
    hits: Vec<MatchResult>,
) -> Result<Vec<Entry>> {
    let check_coordinates =
        !request.coordinates().is_empty() && request.wpath().last_node().is_some();
    let path_spot = request.path().and_then(PathContext::spot);

    let mut entries = Vec::with_capacity(hits.len());
    for hit in hits {
        if check_coordinates
            && !is_in_table_coordinates(index, hit.node, request.coordinates(), path_spot)
        {
            trace!(node = hit.node.0, "hit outside of table coordinates");
            continue;
        }
        entries.push(entry(index, hit.node, hit.found_by, hit.deviation, hit.distance)?);
    }
    Ok(entries)
}

/// Control families handled by [`MatcherIdentifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Anchor,
    Button,
    /// submit, reset and button inputs
    InputButton,
    InputImage,
    /// text-like inputs: text, password, email, search, url, tel, number, date
    InputText,
    CheckBox,
    Radio,
    Select,
    TextArea,
    Image,
    InputFile,
    /// Any element with a click listener.
    Clickable,
}

fn is_anchor(element: &Element) -> bool {
    element.is("a")
}

fn is_button(element: &Element) -> bool {
    element.is("button")
}

fn is_input_button(element: &Element) -> bool {
    element.is_input_of(&["submit", "reset", "button"])
}

fn is_input_image(element: &Element) -> bool {
    element.is_input_of(&["image"])
}

fn is_input_text(element: &Element) -> bool {
    element.is_input_of(&TEXT_INPUT_TYPES)
}

fn is_checkbox(element: &Element) -> bool {
    element.is_input_of(&["checkbox"])
}

fn is_radio(element: &Element) -> bool {
    element.is_input_of(&["radio"])
}

fn is_select(element: &Element) -> bool {
    element.is("select")
}

fn is_textarea(element: &Element) -> bool {
    element.is("textarea")
}

fn is_image(element: &Element) -> bool {
    element.is("img")
}

fn is_input_file(element: &Element) -> bool {
    element.is_input_of(&["file"])
}

fn is_any(_: &Element) -> bool {
    true
}

impl ControlKind {
    pub const ALL: [ControlKind; 12] = [
        ControlKind::Anchor,
        ControlKind::Button,
        ControlKind::InputButton,
        ControlKind::InputImage,
        ControlKind::InputText,
        ControlKind::CheckBox,
        ControlKind::Radio,
        ControlKind::Select,
        ControlKind::TextArea,
        ControlKind::Image,
        ControlKind::InputFile,
        ControlKind::Clickable,
    ];

    pub fn filter(self) -> ElementFilter {
        match self {
            ControlKind::Anchor => is_anchor,
            ControlKind::Button => is_button,
            ControlKind::InputButton => is_input_button,
            ControlKind::InputImage => is_input_image,
            ControlKind::InputText => is_input_text,
            ControlKind::CheckBox => is_checkbox,
            ControlKind::Radio => is_radio,
            ControlKind::Select => is_select,
            ControlKind::TextArea => is_textarea,
            ControlKind::Image => is_image,
            ControlKind::InputFile => is_input_file,
            ControlKind::Clickable => is_any,
        }
    }

    pub fn accepts(self, element: &Element) -> bool {
        (self.filter())(element)
    }

    /// Whether a `<label>` can point at controls of this kind.
    pub fn is_labelable(self) -> bool {
        matches!(
            self,
            ControlKind::InputText
                | ControlKind::InputFile
                | ControlKind::CheckBox
                | ControlKind::Radio
                | ControlKind::Select
                | ControlKind::TextArea
        )
    }
}

/// Identifier driven by a fixed matcher battery per [`ControlKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherIdentifier {
    kind: ControlKind,
}

impl MatcherIdentifier {
    pub const fn new(kind: ControlKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    fn matchers(
        &self,
        index: &PageIndex<'_>,
        request: &Request,
        node: NodeId,
    ) -> Result<Vec<Box<dyn Matcher>>> {
        let Some(path) = request.path() else {
            return Ok(Vec::new());
        };
        let Some(element) = index.dom().element(node) else {
            return Ok(Vec::new());
        };
        let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();

        if request.wpath().last_node().is_none() {
            if !request.coordinates().is_empty() && self.kind.accepts(element) {
                matchers.push(Box::new(TableCoordinatesMatcher::new(
                    path,
                    request.coordinates().to_vec(),
                    self.kind.filter(),
                )));
            }
            return Ok(matchers);
        }

        let target = request.target();
        if !self.kind.accepts(element) {
            if element.is("label") && self.kind.is_labelable() {
                let label = HtmlLabelMatcher::new(path, Arc::clone(target), self.kind.filter());
                matchers.push(Box::new(
                    if matches!(self.kind, ControlKind::CheckBox | ControlKind::Radio) {
                        label.allow_invisible_targets()
                    } else {
                        label
                    },
                ));
            }
            return Ok(matchers);
        }

        let target = || Arc::clone(target);
        match self.kind {
            ControlKind::Anchor => {
                matchers.push(Box::new(InnerImageMatcher::new(path, target())));
                matchers.push(Box::new(AttributeMatcher::by_text(path, target())));
                matchers.push(Box::new(AttributeMatcher::by_title(path, target())));
                matchers.push(Box::new(AttributeMatcher::by_aria_label(path, target())));
            }
            ControlKind::Button => {
                matchers.push(Box::new(InnerImageMatcher::new(path, target())));
                matchers.push(Box::new(AttributeMatcher::by_text(path, target())));
            }
            ControlKind::InputButton => {
                matchers.push(Box::new(AttributeMatcher::by_value(path, target())));
            }
            ControlKind::InputImage => {
                matchers.push(Box::new(AttributeMatcher::by_image_alt(path, target())));
                matchers.push(Box::new(AttributeMatcher::by_image_src(path, target())));
                matchers.push(Box::new(AttributeMatcher::by_title(path, target())));
            }
            ControlKind::Image => {
                matchers.push(Box::new(AttributeMatcher::by_labeling_text_before_as_text(
                    path,
                    target(),
                    request.wpath(),
                )?));
                matchers.push(Box::new(AttributeMatcher::by_whole_text_before(
                    path,
                    Arc::clone(request.whole()),
                )));
                matchers.push(Box::new(AttributeMatcher::by_image_alt(path, target())));
                matchers.push(Box::new(AttributeMatcher::by_image_src(path, target())));
                matchers.push(Box::new(AttributeMatcher::by_title(path, target())));
                matchers.push(Box::new(AttributeMatcher::by_aria_label(path, target())));
            }
            ControlKind::InputText | ControlKind::TextArea | ControlKind::InputFile => {
                matchers.push(Box::new(AttributeMatcher::by_labeling_text_before_as_text(
                    path,
                    target(),
                    request.wpath(),
                )?));
                matchers.push(Box::new(AttributeMatcher::by_labeling_text_before(
                    path,
                    target(),
                )));
                if self.kind != ControlKind::InputFile {
                    matchers.push(Box::new(AttributeMatcher::by_placeholder(path, target())));
                }
            }
            ControlKind::Select => {
                matchers.push(Box::new(AttributeMatcher::by_whole_text_before(
                    path,
                    Arc::clone(request.whole()),
                )));
                matchers.push(Box::new(AttributeMatcher::by_labeling_text_before(
                    path,
                    target(),
                )));
            }
            ControlKind::CheckBox | ControlKind::Radio => {
                matchers.push(Box::new(AttributeMatcher::by_labeling_text_before_as_text(
                    path,
                    target(),
                    request.wpath(),
                )?));
                matchers.push(Box::new(AttributeMatcher::by_labeling_text_after(
                    path,
                    target(),
                )));
                matchers.push(Box::new(AttributeMatcher::by_title(path, target())));
            }
            ControlKind::Clickable => {
                matchers.push(Box::new(AttributeMatcher::new(
                    path,
                    target(),
                    ValueSource::OwnText,
                    FoundBy::Text,
                )));
                matchers.push(Box::new(AttributeMatcher::by_title(path, target())));
                matchers.push(Box::new(AttributeMatcher::by_aria_label(path, target())));
                matchers.push(Box::new(AttributeMatcher::by_id(path, target())));
                return Ok(matchers);
            }
        }

        matchers.push(Box::new(AttributeMatcher::by_name(path, target())));
        matchers.push(Box::new(AttributeMatcher::by_data_testid(path, target())));
        matchers.push(Box::new(AttributeMatcher::by_id(path, target())));
        Ok(matchers)
    }
}

impl Identifier for MatcherIdentifier {
    fn is_supported(&self, index: &PageIndex<'_>, node: NodeId) -> bool {
        let Some(element) = index.dom().element(node) else {
            return false;
        };
        match self.kind {
            ControlKind::Clickable => index.has_click_listener(node),
            kind => kind.accepts(element) || (kind.is_labelable() && element.is("label")),
        }
    }

    fn identify(
        &self,
        index: &PageIndex<'_>,
        request: &Request,
        node: NodeId,
    ) -> Result<Vec<Entry>> {
        let mut hits = Vec::new();
        for matcher in self.matchers(index, request, node)? {
            hits.extend(matcher.matches(index, node)?);
        }
        entries_for(index, request, hits)
    }
}

/// Elements no other identifier supports, found when they listen for one
/// mouse action. Matches like [`ControlKind::Clickable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnspecificIdentifier {
    action: MouseAction,
}

impl UnspecificIdentifier {
    pub const fn new(action: MouseAction) -> Self {
        Self { action }
    }

    pub fn action(&self) -> MouseAction {
        self.action
    }
}

impl Identifier for UnspecificIdentifier {
    fn is_supported(&self, index: &PageIndex<'_>, node: NodeId) -> bool {
        index.dom().element(node).is_some() && index.has_mouse_action_listener(self.action, node)
    }

    fn identify(
        &self,
        index: &PageIndex<'_>,
        request: &Request,
        node: NodeId,
    ) -> Result<Vec<Entry>> {
        MatcherIdentifier::new(ControlKind::Clickable).identify(index, request, node)
    }
}

#[cfg(test)]
#[path = "tests/identifier.rs"]
mod tests;
