use std::sync::Arc;

use tracing::trace;

use super::{ElementFilter, MatchResult, Matcher, PathContext};
use crate::dom::{Dom, NodeId};
use crate::error::Result;
use crate::page_index::PageIndex;
use crate::search_pattern::SearchPattern;
use crate::weighted::FoundBy;

/// Control a `<label>` points at: its `for` target, else the first labelable
/// element inside it.
pub(crate) fn labeled_element(dom: &Dom, label: NodeId) -> Option<NodeId> {
    if let Some(target) = for_target(dom, label) {
        return Some(target);
    }
    dom.descendant_elements(label).into_iter().find(|node| {
        dom.element(*node).is_some_and(|element| {
            element.is("select")
                || element.is("textarea")
                || element.is("button")
                || (element.is("input") && !element.is_input_of(&["hidden"]))
        })
    })
}

fn for_target(dom: &Dom, label: NodeId) -> Option<NodeId> {
    dom.attr(label, "for")
        .filter(|id| !id.is_empty())
        .and_then(|id| dom.by_id_in(dom.owner_document(label), id))
}

/// Runs on `<label>` elements and reports the controls they label.
#[derive(Debug, Clone)]
pub struct HtmlLabelMatcher {
    path: PathContext,
    pattern: Arc<SearchPattern>,
    filter: ElementFilter,
    allow_invisible: bool,
}

impl HtmlLabelMatcher {
    pub fn new(path: &PathContext, pattern: Arc<SearchPattern>, filter: ElementFilter) -> Self {
        Self {
            path: path.clone(),
            pattern,
            filter,
            allow_invisible: false,
        }
    }

    /// Checkboxes and radios are often hidden behind a styled label.
    pub fn allow_invisible_targets(mut self) -> Self {
        self.allow_invisible = true;
        self
    }

    fn accepts_target(&self, index: &PageIndex<'_>, target: NodeId) -> bool {
        index.dom().element(target).is_some_and(self.filter)
            && (self.allow_invisible || index.is_visible(target))
    }

    fn targets(&self, index: &PageIndex<'_>, label: NodeId) -> Vec<NodeId> {
        let dom = index.dom();
        let mut targets = Vec::new();
        if let Some(target) =
            for_target(dom, label).filter(|target| self.accepts_target(index, *target))
        {
            targets.push(target);
        }
        for nested in dom.descendant_elements(label) {
            if !targets.contains(&nested) && self.accepts_target(index, nested) {
                targets.push(nested);
            }
        }
        targets
    }
}

impl Matcher for HtmlLabelMatcher {
    fn matches(&self, index: &PageIndex<'_>, node: NodeId) -> Result<Vec<MatchResult>> {
        if self.pattern.min_length() == 0 || !index.dom().is_tag(node, "label") {
            return Ok(Vec::new());
        }
        let Some(label_spot) = index.position(node) else {
            return Ok(Vec::new());
        };
        if !self.path.allows(label_spot) {
            return Ok(Vec::new());
        }

        let Some(text) = index
            .as_text_without_form_controls(node)
            .filter(|text| !text.is_empty())
        else {
            return Ok(Vec::new());
        };
        let Some(deviation) = self.pattern.no_of_surrounding_chars_in(&text) else {
            return Ok(Vec::new());
        };
        let Some(distance) = self
            .path
            .distance_in(&index.text_before(node).unwrap_or_default())
        else {
            return Ok(Vec::new());
        };

        let results: Vec<MatchResult> = self
            .targets(index, node)
            .into_iter()
            .map(|target| MatchResult {
                node: target,
                found_by: FoundBy::LabelElement,
                deviation,
                distance,
                start: label_spot.start,
            })
            .collect();
        trace!(label = node.0, hits = results.len(), "label matcher");
        Ok(results)
    }
}
