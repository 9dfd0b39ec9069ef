use std::sync::Arc;

use tracing::{debug, debug_span, trace};
use unicode_normalization::UnicodeNormalization;

use crate::config::LocatorConfig;
use crate::dom::{DomProvider, NodeId};
use crate::error::Result;
use crate::identifier::{
    ControlKind, Identifier, MatcherIdentifier, OptionIdentifier, Request, UnspecificIdentifier,
    entry,
};
use crate::matcher::{AttributeMatcher, Matcher, PathContext};
use crate::page_index::{MouseAction, PageIndex};
use crate::search_pattern::{FindSpot, SearchPattern};
use crate::weighted::{Entry, FoundBy, WeightedControlList};
use crate::wpath::WPath;

/// Resolves locators against one rendered page.
///
/// The page index is built once in [`ControlFinder::new`]; every `find`
/// runs all identifiers over the visible elements and merges their entries.
/// Elements no identifier supports are still found when they listen for
/// the requested mouse action (a click unless stated otherwise).
pub struct ControlFinder<'a> {
    index: PageIndex<'a>,
    config: LocatorConfig,
    identifiers: Vec<Box<dyn Identifier + 'a>>,
}

impl<'a> ControlFinder<'a> {
    pub fn new<P>(provider: &'a P) -> Result<Self>
    where
        P: DomProvider + ?Sized,
    {
        Self::with_config(provider, LocatorConfig::default())
    }

    pub fn with_config<P>(provider: &'a P, config: LocatorConfig) -> Result<Self>
    where
        P: DomProvider + ?Sized,
    {
        let index = PageIndex::build(provider, &config)?;
        let mut identifiers: Vec<Box<dyn Identifier + 'a>> = ControlKind::ALL
            .into_iter()
            .filter(|kind| *kind != ControlKind::Clickable)
            .map(|kind| Box::new(MatcherIdentifier::new(kind)) as Box<dyn Identifier + 'a>)
            .collect();
        identifiers.push(Box::new(OptionIdentifier));
        Ok(Self {
            index,
            config,
            identifiers,
        })
    }

    /// Registers an additional identifier; it runs after the built-in ones.
    pub fn add_identifier(&mut self, identifier: Box<dyn Identifier + 'a>) {
        self.identifiers.push(identifier);
    }

    pub fn index(&self) -> &PageIndex<'a> {
        &self.index
    }

    pub fn find(&self, locator: &str) -> Result<WeightedControlList> {
        self.find_for_action(locator, MouseAction::Click)
    }

    pub fn find_path(&self, wpath: &WPath) -> Result<WeightedControlList> {
        self.find_path_for_action(wpath, MouseAction::Click)
    }

    /// Like [`ControlFinder::find`], but unsupported elements have to listen
    /// for `action` instead of a click.
    pub fn find_for_action(&self, locator: &str, action: MouseAction) -> Result<WeightedControlList> {
        self.find_path_for_action(&self.parse(locator)?, action)
    }

    pub fn find_path_for_action(
        &self,
        wpath: &WPath,
        action: MouseAction,
    ) -> Result<WeightedControlList> {
        self.identify_for_action(wpath, self.index.visible_elements(), action)
    }

    /// Runs the identifiers over `candidates` only.
    pub fn identify(&self, wpath: &WPath, candidates: &[NodeId]) -> Result<WeightedControlList> {
        self.identify_for_action(wpath, candidates, MouseAction::Click)
    }

    fn identify_for_action(
        &self,
        wpath: &WPath,
        candidates: &[NodeId],
        action: MouseAction,
    ) -> Result<WeightedControlList> {
        let span = debug_span!("find", locator = %wpath, ?action, candidates = candidates.len());
        let _guard = span.enter();

        let mut list = WeightedControlList::new();
        if wpath.is_empty() {
            return Ok(list);
        }
        let request = Request::new(&self.index, wpath)?;
        let unspecific = UnspecificIdentifier::new(action);

        for &node in candidates {
            let mut supported = false;
            for identifier in &self.identifiers {
                if identifier.is_supported(&self.index, node) {
                    supported = true;
                    list.add_all(identifier.identify(&self.index, &request, node)?);
                }
            }
            if !supported && unspecific.is_supported(&self.index, node) {
                list.add_all(unspecific.identify(&self.index, &request, node)?);
            }
        }

        debug!(entries = list.len(), "locator resolved");
        Ok(list)
    }

    /// Finds elements no identifier supports, listener or not: by id, and by
    /// the innermost visible element around each occurrence of the target
    /// text. Table coordinates are ignored.
    pub fn find_unknown(&self, locator: &str) -> Result<WeightedControlList> {
        self.find_unknown_path(&self.parse(locator)?)
    }

    pub fn find_unknown_path(&self, wpath: &WPath) -> Result<WeightedControlList> {
        let span = debug_span!("find_unknown", locator = %wpath);
        let _guard = span.enter();

        let mut list = WeightedControlList::new();
        let Some(last) = wpath.last_node().filter(|last| !last.is_empty()) else {
            return Ok(list);
        };
        let Some(path) = PathContext::resolve(&self.index, wpath.path_nodes())? else {
            return Ok(list);
        };
        let target = SearchPattern::compile(last)?;

        let by_id = AttributeMatcher::by_id(&path, Arc::clone(&target));
        for &node in self.index.visible_elements() {
            if self.is_known(node) {
                continue;
            }
            for hit in by_id.matches(&self.index, node)? {
                list.add(entry(&self.index, hit.node, hit.found_by, hit.deviation, hit.distance)?);
            }
        }

        let mut hit = self
            .index
            .first_occurrence_from(&target, path.spot().map_or(0, |spot| spot.end));
        while let Some(spot) = hit {
            if let Some(node) = self.innermost_around(spot) {
                if self.is_known(node) {
                    trace!(node = node.0, "text hit inside a known control");
                } else if let Some(found) = self.text_entry(&path, &target, node)? {
                    list.add(found);
                }
            }
            hit = self.index.first_occurrence_from(&target, spot.start + 1);
        }

        debug!(entries = list.len(), "unknown controls resolved");
        Ok(list)
    }

    fn parse(&self, locator: &str) -> Result<WPath> {
        if self.config.normalize_unicode {
            WPath::parse(&locator.nfc().collect::<String>())
        } else {
            WPath::parse(locator)
        }
    }

    fn is_known(&self, node: NodeId) -> bool {
        self.identifiers
            .iter()
            .any(|identifier| identifier.is_supported(&self.index, node))
    }

    fn innermost_around(&self, hit: FindSpot) -> Option<NodeId> {
        self.index
            .visible_elements_bottom_up()
            .iter()
            .copied()
            .find(|node| {
                self.index
                    .position(*node)
                    .is_some_and(|spot| spot.start <= hit.start && hit.end <= spot.end)
            })
    }

    /// Scores `node` by the last occurrence of the target in the text up to
    /// its end; the distance is measured from the context to that occurrence.
    fn text_entry(
        &self,
        path: &PathContext,
        target: &SearchPattern,
        node: NodeId,
    ) -> Result<Option<Entry>> {
        let Some(text) = self.index.text_before_including_self(node) else {
            return Ok(None);
        };
        let Some(last) = target.last_occurrence_in(&text) else {
            return Ok(None);
        };
        let deviation = text.chars().count().saturating_sub(last.end);
        let before: String = text.chars().take(last.start).collect();
        let distance = match path.pattern() {
            Some(pattern) => pattern.no_of_chars_after_last_occurrence_in(&before),
            None => Some(before.chars().count()),
        };
        let Some(distance) = distance else {
            return Ok(None);
        };
        entry(&self.index, node, FoundBy::Text, deviation, distance).map(Some)
    }
}

#[cfg(test)]
#[path = "tests/finder.rs"]
mod tests;
