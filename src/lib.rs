mod config;
mod describe;
mod dom;
mod error;
mod finder;
mod html;
mod identifier;
mod matcher;
mod normalized;
mod page_index;
mod regex;
mod search_pattern;
mod weighted;
mod wpath;

pub use config::{LocatorConfig, RetryPolicy};
pub use describe::{describe, type_name};
pub use dom::{ComputedStyle, Dom, DomProvider, Element, NodeId, NodeType};
pub use error::{Error, Result};
pub use finder::ControlFinder;
pub use identifier::{
    ControlKind, Identifier, MatcherIdentifier, OptionIdentifier, Request, UnspecificIdentifier,
};
pub use matcher::{
    AttributeMatcher, CompiledCoordinate, ElementFilter, HtmlLabelMatcher, InnerImageMatcher,
    MatchMode, MatchResult, Matcher, PathContext, TableCoordinatesMatcher, ValueSource,
    is_in_table_coordinates,
};
pub use normalized::NormalizedString;
pub use page_index::{MouseAction, MouseActions, PageIndex};
pub use search_pattern::{FindSpot, SearchPattern};
pub use weighted::{Entry, FoundBy, WeightedControlList};
pub use wpath::{TableCoordinate, WPath};
