use std::sync::Arc;

use super::{AttributeMatcher, MatchMode, MatchResult, Matcher, PathContext, ValueSource};
use crate::dom::NodeId;
use crate::error::Result;
use crate::page_index::PageIndex;
use crate::search_pattern::SearchPattern;
use crate::weighted::FoundBy;

const INNER_ATTRIBUTES: [(&str, MatchMode, FoundBy); 4] = [
    ("alt", MatchMode::Contains, FoundBy::InnerImgAltAttribute),
    ("title", MatchMode::Contains, FoundBy::InnerImgTitleAttribute),
    ("src", MatchMode::EndsWith, FoundBy::InnerImgSrcAttribute),
    ("name", MatchMode::Exact, FoundBy::InnerName),
];

/// Matches anchors and buttons through the images they contain. Hits are
/// reported for the outer element.
#[derive(Debug, Clone)]
pub struct InnerImageMatcher {
    path: PathContext,
    pattern: Arc<SearchPattern>,
}

impl InnerImageMatcher {
    pub fn new(path: &PathContext, pattern: Arc<SearchPattern>) -> Self {
        Self {
            path: path.clone(),
            pattern,
        }
    }
}

impl Matcher for InnerImageMatcher {
    fn matches(&self, index: &PageIndex<'_>, node: NodeId) -> Result<Vec<MatchResult>> {
        let dom = index.dom();
        let mut results = Vec::new();
        for image in dom
            .descendant_elements(node)
            .into_iter()
            .filter(|image| dom.is_tag(*image, "img"))
        {
            for (attribute, mode, found_by) in INNER_ATTRIBUTES {
                let matcher = AttributeMatcher::new(
                    &self.path,
                    Arc::clone(&self.pattern),
                    ValueSource::InnerImage { image, attribute },
                    found_by,
                )
                .with_mode(mode);
                results.extend(matcher.matches(index, node)?);
            }
        }
        Ok(results)
    }
}
