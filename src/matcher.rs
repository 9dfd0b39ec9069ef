use std::sync::Arc;

use tracing::trace;

use crate::dom::{Element, NodeId};
use crate::error::Result;
use crate::page_index::PageIndex;
use crate::search_pattern::{FindSpot, SearchPattern};
use crate::weighted::FoundBy;
use crate::wpath::WPath;

mod html_label;
mod inner_image;
mod table;

pub use html_label::HtmlLabelMatcher;
pub(crate) use html_label::labeled_element;
pub use inner_image::InnerImageMatcher;
pub use table::{CompiledCoordinate, TableCoordinatesMatcher, is_in_table_coordinates};

/// Element type test used by matchers that look past the element they are
/// given (labels, table cells).
pub type ElementFilter = fn(&Element) -> bool;

/// One hit of a matcher. `node` is the control the hit is about, which is
/// not always the element the matcher was run on; `start` is where the
/// matched text begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub node: NodeId,
    pub found_by: FoundBy,
    pub deviation: usize,
    pub distance: usize,
    pub start: usize,
}

pub trait Matcher {
    fn matches(&self, index: &PageIndex<'_>, node: NodeId) -> Result<Vec<MatchResult>>;
}

/// Resolved context segments of a locator.
///
/// Absent pattern and spot mean the locator has no (or only match-all)
/// context; [`PathContext::resolve`] returns `None` when the context is not
/// on the page at all.
#[derive(Debug, Clone, Default)]
pub struct PathContext {
    pattern: Option<Arc<SearchPattern>>,
    spot: Option<FindSpot>,
}

impl PathContext {
    pub fn resolve<S: AsRef<str>>(index: &PageIndex<'_>, nodes: &[S]) -> Result<Option<Self>> {
        if nodes.is_empty() {
            return Ok(Some(Self::default()));
        }
        let pattern = SearchPattern::create_from_list(nodes)?;
        if pattern.is_match_all() {
            return Ok(Some(Self::default()));
        }
        Ok(index.first_occurrence(&pattern).map(|spot| Self {
            pattern: Some(pattern),
            spot: Some(spot),
        }))
    }

    pub fn pattern(&self) -> Option<&SearchPattern> {
        self.pattern.as_deref()
    }

    pub fn spot(&self) -> Option<FindSpot> {
        self.spot
    }

    /// The context has to end before the node starts.
    pub fn allows(&self, node_spot: FindSpot) -> bool {
        self.spot.is_none_or(|spot| spot.end <= node_spot.start)
    }

    /// Characters between the end of the context and the end of
    /// `text_before`, or all of `text_before` without context.
    pub fn distance_in(&self, text_before: &str) -> Option<usize> {
        match &self.pattern {
            Some(pattern) => pattern.no_of_chars_after_last_shortest_occurrence_in(text_before),
            None => Some(text_before.chars().count()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Contains,
    Exact,
    StartsWith,
    EndsWith,
}

/// Where an [`AttributeMatcher`] reads the text it compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Attribute(&'static str),
    /// The element's own rendered text.
    OwnText,
    LabelingTextBefore,
    LabelingTextAfter,
    WholeTextBefore,
    InnerImage {
        image: NodeId,
        attribute: &'static str,
    },
}

/// Compares one text value of an element against the target pattern.
#[derive(Debug, Clone)]
pub struct AttributeMatcher {
    path: PathContext,
    pattern: Arc<SearchPattern>,
    mode: MatchMode,
    found_by: FoundBy,
    source: ValueSource,
}

impl AttributeMatcher {
    pub fn new(
        path: &PathContext,
        pattern: Arc<SearchPattern>,
        source: ValueSource,
        found_by: FoundBy,
    ) -> Self {
        Self {
            path: path.clone(),
            pattern,
            mode: MatchMode::Contains,
            found_by,
            source,
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn by_id(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(path, pattern, ValueSource::Attribute("id"), FoundBy::Id).with_mode(MatchMode::Exact)
    }

    pub fn by_name(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(path, pattern, ValueSource::Attribute("name"), FoundBy::Name)
            .with_mode(MatchMode::Exact)
    }

    pub fn by_data_testid(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(
            path,
            pattern,
            ValueSource::Attribute("data-testid"),
            FoundBy::DataTestid,
        )
        .with_mode(MatchMode::Exact)
    }

    pub fn by_title(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(
            path,
            pattern,
            ValueSource::Attribute("title"),
            FoundBy::TitleAttribute,
        )
    }

    pub fn by_aria_label(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(
            path,
            pattern,
            ValueSource::Attribute("aria-label"),
            FoundBy::AriaLabelAttribute,
        )
    }

    pub fn by_placeholder(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(
            path,
            pattern,
            ValueSource::Attribute("placeholder"),
            FoundBy::Placeholder,
        )
    }

    pub fn by_value(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(path, pattern, ValueSource::Attribute("value"), FoundBy::Label)
    }

    pub fn by_text(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(path, pattern, ValueSource::OwnText, FoundBy::Label)
    }

    pub fn by_image_alt(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(
            path,
            pattern,
            ValueSource::Attribute("alt"),
            FoundBy::ImgAltAttribute,
        )
    }

    pub fn by_image_src(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(
            path,
            pattern,
            ValueSource::Attribute("src"),
            FoundBy::ImgSrcAttribute,
        )
        .with_mode(MatchMode::EndsWith)
    }

    pub fn by_labeling_text_before(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(
            path,
            pattern,
            ValueSource::LabelingTextBefore,
            FoundBy::LabelingText,
        )
    }

    /// Labeling text read as plain page text. With an empty target the last
    /// context segment becomes the label and the control has to follow it
    /// directly.
    pub fn by_labeling_text_before_as_text(
        path: &PathContext,
        pattern: Arc<SearchPattern>,
        wpath: &WPath,
    ) -> Result<Self> {
        let matcher = Self::new(path, pattern, ValueSource::LabelingTextBefore, FoundBy::Text);
        match (wpath.path_nodes().last(), wpath.last_node()) {
            (Some(label), Some(last)) if matcher.pattern.min_length() == 0 => {
                let pattern = SearchPattern::create_from_list(&[label.as_str(), last])?;
                Ok(Self { pattern, ..matcher }.with_mode(MatchMode::StartsWith))
            }
            _ => Ok(matcher),
        }
    }

    pub fn by_labeling_text_after(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self::new(
            path,
            pattern,
            ValueSource::LabelingTextAfter,
            FoundBy::LabelingText,
        )
    }

    /// `whole` is the context and the target joined into one pattern.
    pub fn by_whole_text_before(path: &PathContext, whole: Arc<SearchPattern>) -> Self {
        Self::new(path, whole, ValueSource::WholeTextBefore, FoundBy::Text)
    }

    fn value(&self, index: &PageIndex<'_>, node: NodeId) -> Result<Option<String>> {
        let dom = index.dom();
        Ok(match self.source {
            ValueSource::Attribute(name) => dom.attr(node, name).map(str::to_string),
            ValueSource::OwnText => index.as_text(node),
            ValueSource::LabelingTextBefore => {
                let floor = match (self.mode, self.path.spot()) {
                    (MatchMode::StartsWith, _) | (_, None) => 0,
                    (_, Some(spot)) => spot.end,
                };
                index.labeling_text_before(node, floor)?
            }
            ValueSource::LabelingTextAfter => index.labeling_text_after(node)?,
            ValueSource::WholeTextBefore => index.text_before(node),
            ValueSource::InnerImage { image, attribute } => {
                dom.attr(image, attribute).map(str::to_string)
            }
        })
    }

    fn accepts(&self, value: &str) -> bool {
        match self.mode {
            MatchMode::Contains | MatchMode::StartsWith => true,
            MatchMode::Exact => self.pattern.matches(value),
            MatchMode::EndsWith => self.pattern.matches_at_end(value),
        }
    }

    fn deviation(&self, value: &str) -> Option<usize> {
        match self.mode {
            MatchMode::EndsWith => self.pattern.no_of_chars_before_last_occurrence_in(value),
            MatchMode::StartsWith => self.pattern.no_of_chars_after_last_occurrence_in(value),
            MatchMode::Contains | MatchMode::Exact => self.pattern.no_of_surrounding_chars_in(value),
        }
    }

    /// Labeling text is part of the text before the control; cut it off so
    /// the distance is measured up to the label.
    fn text_for_distance(&self, text_before: String) -> String {
        if self.source != ValueSource::LabelingTextBefore || self.mode == MatchMode::StartsWith {
            return text_before;
        }
        match self
            .pattern
            .no_of_chars_before_last_shortest_occurrence_in(&text_before)
        {
            Some(keep) => text_before.chars().take(keep).collect(),
            None => text_before,
        }
    }
}

impl Matcher for AttributeMatcher {
    fn matches(&self, index: &PageIndex<'_>, node: NodeId) -> Result<Vec<MatchResult>> {
        if self.pattern.min_length() == 0 {
            return Ok(Vec::new());
        }
        let Some(node_spot) = index.position(node) else {
            return Ok(Vec::new());
        };
        if !self.path.allows(node_spot) {
            return Ok(Vec::new());
        }

        let Some(value) = self.value(index, node)?.filter(|value| !value.is_empty()) else {
            return Ok(Vec::new());
        };
        if !self.accepts(&value) {
            return Ok(Vec::new());
        }
        let Some(deviation) = self.deviation(&value) else {
            return Ok(Vec::new());
        };

        let text_before = self.text_for_distance(index.text_before(node).unwrap_or_default());
        let Some(distance) = self.path.distance_in(&text_before) else {
            return Ok(Vec::new());
        };

        trace!(
            node = node.0,
            found_by = %self.found_by,
            deviation,
            distance,
            pattern = self.pattern.raw(),
            "attribute matcher hit"
        );
        Ok(vec![MatchResult {
            node,
            found_by: self.found_by,
            deviation,
            distance,
            start: node_spot.start,
        }])
    }
}

#[cfg(test)]
#[path = "tests/matcher.rs"]
mod tests;
