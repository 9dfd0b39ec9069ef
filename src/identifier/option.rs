use std::sync::Arc;

use tracing::trace;

use super::{Identifier, Request, entry};
use crate::dom::NodeId;
use crate::error::Result;
use crate::matcher::{PathContext, is_in_table_coordinates, labeled_element};
use crate::page_index::PageIndex;
use crate::search_pattern::{FindSpot, SearchPattern};
use crate::weighted::{Entry, FoundBy};

/// Options of a select, addressed as `select label > option text`.
///
/// The last context segment names the select (by labeling text, name or
/// id), the segments before it narrow the search as usual. Without context
/// every select qualifies.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionIdentifier;

struct SelectLocator {
    pattern: Arc<SearchPattern>,
    spot: Option<FindSpot>,
    has_context: bool,
}

impl SelectLocator {
    fn resolve(index: &PageIndex<'_>, request: &Request) -> Result<Option<Self>> {
        let Some((select, rest)) = request.wpath().path_nodes().split_last() else {
            return Ok(Some(Self {
                pattern: SearchPattern::compile("")?,
                spot: None,
                has_context: false,
            }));
        };
        let Some(context) = PathContext::resolve(index, rest)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            pattern: SearchPattern::compile(select)?,
            spot: context.spot(),
            has_context: true,
        }))
    }

    fn allows(&self, spot: FindSpot) -> bool {
        self.spot.is_none_or(|context| context.end <= spot.start)
    }

    /// Distance of the select from the page start, or from the end of the
    /// select pattern inside `text`.
    fn distance(&self, index: &PageIndex<'_>, select: NodeId, text: &str) -> Option<usize> {
        if self.has_context {
            self.pattern.no_of_chars_after_last_occurrence_in(text)
        } else {
            Some(index.text_before(select).unwrap_or_default().chars().count())
        }
    }
}

impl OptionIdentifier {
    /// Distances for every way `select` matches the select pattern.
    fn select_distances(
        &self,
        index: &PageIndex<'_>,
        locator: &SelectLocator,
        select: NodeId,
    ) -> Result<Vec<usize>> {
        let dom = index.dom();
        let mut distances = Vec::new();

        let floor = locator.spot.map_or(0, |spot| spot.end);
        if let Some(labeling) = index
            .labeling_text_before(select, floor)?
            .filter(|text| !text.is_empty())
        {
            if locator.pattern.no_of_surrounding_chars_in(&labeling).is_some() {
                distances.extend(locator.distance(index, select, &labeling));
            }
        }

        for attribute in ["name", "id"] {
            let Some(value) = dom.attr(select, attribute).filter(|value| !value.is_empty()) else {
                continue;
            };
            if locator.pattern.matches(value)
                && locator.pattern.no_of_surrounding_chars_in(value).is_some()
            {
                // a select matched directly sits right before its options
                distances.push(if locator.has_context {
                    0
                } else {
                    index.text_before(select).unwrap_or_default().chars().count()
                });
            }
        }
        Ok(distances)
    }

    fn identify_option(
        &self,
        index: &PageIndex<'_>,
        request: &Request,
        select: NodeId,
        option: NodeId,
        distance: usize,
    ) -> Result<Vec<Entry>> {
        if !request.coordinates().is_empty()
            && !is_in_table_coordinates(index, select, request.coordinates(), None)
        {
            return Ok(Vec::new());
        }

        let dom = index.dom();
        let pattern = request.target();
        let mut entries = Vec::new();

        if let Some(id) = dom.attr(option, "id").filter(|id| !id.is_empty()) {
            if pattern.min_length() > 0 && pattern.matches(id) {
                if let Some(deviation) = pattern.no_of_surrounding_chars_in(id) {
                    entries.push(entry(index, option, FoundBy::Id, deviation, distance)?);
                }
            }
        }

        // options with an empty text or label are valid targets of an
        // empty pattern; they rank by their length then
        let texts = [
            index.as_text(option),
            dom.attr(option, "label").map(str::to_string),
        ];
        for text in texts.into_iter().flatten() {
            if let Some(deviation) = pattern.no_of_surrounding_chars_in(&text) {
                let deviation = if pattern.min_length() == 0 {
                    text.chars().count()
                } else {
                    deviation
                };
                entries.push(entry(index, option, FoundBy::Label, deviation, distance)?);
            }
        }
        Ok(entries)
    }
}

impl Identifier for OptionIdentifier {
    fn is_supported(&self, index: &PageIndex<'_>, node: NodeId) -> bool {
        let dom = index.dom();
        dom.is_tag(node, "option")
            || (dom.is_tag(node, "label")
                && labeled_element(dom, node).is_some_and(|target| dom.is_tag(target, "select")))
    }

    fn identify(
        &self,
        index: &PageIndex<'_>,
        request: &Request,
        node: NodeId,
    ) -> Result<Vec<Entry>> {
        if request.wpath().last_node().is_none() {
            return Ok(Vec::new());
        }
        let Some(locator) = SelectLocator::resolve(index, request)? else {
            return Ok(Vec::new());
        };
        let dom = index.dom();
        let mut entries = Vec::new();

        if dom.is_tag(node, "option") {
            let Some(select) = dom.find_ancestor_by_tag(node, "select") else {
                return Ok(entries);
            };
            if !locator.allows(index.require_position(select)?) {
                return Ok(entries);
            }
            for distance in self.select_distances(index, &locator, select)? {
                entries.extend(self.identify_option(index, request, select, node, distance)?);
            }
        } else if dom.is_tag(node, "label") {
            if !locator.allows(index.require_position(node)?) {
                return Ok(entries);
            }
            let text = index.as_text_without_form_controls(node).unwrap_or_default();
            if locator.pattern.no_of_chars_after_last_occurrence_in(&text).is_none() {
                return Ok(entries);
            }
            let Some(select) = labeled_element(dom, node)
                .filter(|target| dom.is_tag(*target, "select") && index.is_visible(*target))
            else {
                return Ok(entries);
            };
            let text_before = index.text_before(select).unwrap_or_default();
            let Some(distance) = locator.distance(index, select, &text_before) else {
                return Ok(entries);
            };
            for option in dom
                .descendant_elements(select)
                .into_iter()
                .filter(|option| dom.is_tag(*option, "option"))
            {
                entries.extend(self.identify_option(index, request, select, option, distance)?);
            }
        }

        trace!(node = node.0, hits = entries.len(), "option identifier");
        Ok(entries)
    }
}
