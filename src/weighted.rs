use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::dom::NodeId;

/// Strategy that produced an [`Entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoundBy {
    Id,
    DataTestid,
    Name,
    InnerName,
    TitleAttribute,
    AriaLabelAttribute,
    Placeholder,
    ImgAltAttribute,
    ImgSrcAttribute,
    InnerImgAltAttribute,
    InnerImgTitleAttribute,
    InnerImgSrcAttribute,
    Label,
    LabelElement,
    LabelingText,
    Text,
    TableCoordinate,
}

impl FoundBy {
    /// Reliability class; lower ranks first.
    pub const fn tier(self) -> u8 {
        match self {
            FoundBy::Id => 0,
            FoundBy::DataTestid => 1,
            FoundBy::Name => 2,
            FoundBy::InnerName => 3,
            FoundBy::TitleAttribute => 4,
            FoundBy::AriaLabelAttribute => 5,
            FoundBy::Placeholder => 6,
            FoundBy::ImgAltAttribute | FoundBy::ImgSrcAttribute => 7,
            FoundBy::InnerImgAltAttribute
            | FoundBy::InnerImgTitleAttribute
            | FoundBy::InnerImgSrcAttribute => 8,
            FoundBy::Label => 9,
            FoundBy::LabelElement => 10,
            FoundBy::LabelingText => 11,
            FoundBy::Text => 12,
            FoundBy::TableCoordinate => 13,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            FoundBy::Id => "BY_ID",
            FoundBy::DataTestid => "BY_DATA_TESTID",
            FoundBy::Name => "BY_NAME",
            FoundBy::InnerName => "BY_INNER_NAME",
            FoundBy::TitleAttribute => "BY_TITLE_ATTRIBUTE",
            FoundBy::AriaLabelAttribute => "BY_ARIA_LABEL_ATTRIBUTE",
            FoundBy::Placeholder => "BY_PLACEHOLDER",
            FoundBy::ImgAltAttribute => "BY_IMG_ALT_ATTRIBUTE",
            FoundBy::ImgSrcAttribute => "BY_IMG_SRC_ATTRIBUTE",
            FoundBy::InnerImgAltAttribute => "BY_INNER_IMG_ALT_ATTRIBUTE",
            FoundBy::InnerImgTitleAttribute => "BY_INNER_IMG_TITLE_ATTRIBUTE",
            FoundBy::InnerImgSrcAttribute => "BY_INNER_IMG_SRC_ATTRIBUTE",
            FoundBy::Label => "BY_LABEL",
            FoundBy::LabelElement => "BY_LABEL_ELEMENT",
            FoundBy::LabelingText => "BY_LABELING_TEXT",
            FoundBy::Text => "BY_TEXT",
            FoundBy::TableCoordinate => "BY_TABLE_COORDINATE",
        }
    }
}

impl fmt::Display for FoundBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub control: NodeId,
    pub description: String,
    pub found_by: FoundBy,
    pub deviation: usize,
    pub distance: usize,
    pub start: usize,
    pub hierarchy: Option<String>,
    pub index: usize,
}

impl Entry {
    fn sort_key(&self) -> (u8, usize, usize, usize, usize) {
        (
            self.found_by.tier(),
            self.deviation,
            self.distance,
            self.start,
            self.index,
        )
    }

    fn rank(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.control.0.cmp(&other.control.0))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} found by: {} deviation: {} distance: {} start: {}",
            self.description, self.found_by, self.deviation, self.distance, self.start
        )?;
        if let Some(hierarchy) = &self.hierarchy {
            write!(f, " hierarchy: {hierarchy}")?;
        }
        write!(f, " index: {}", self.index)
    }
}

/// Accumulates entries from any number of identifiers; read back through
/// [`WeightedControlList::entries_sorted`].
#[derive(Debug, Clone, Default)]
pub struct WeightedControlList {
    entries: Vec<Entry>,
}

impl WeightedControlList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn add_all(&mut self, entries: impl IntoIterator<Item = Entry>) {
        self.entries.extend(entries);
    }

    pub fn merge(&mut self, other: WeightedControlList) {
        self.entries.extend(other.entries);
    }

    /// Number of raw entries, duplicates per control included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Best entry per control, ordered by `(tier, deviation, distance, start, index)`.
    pub fn entries_sorted(&self) -> Vec<Entry> {
        let mut sorted: Vec<&Entry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.rank(b));

        let mut seen = HashSet::new();
        sorted
            .into_iter()
            .filter(|entry| seen.insert(entry.control))
            .cloned()
            .collect()
    }
}

impl fmt::Display for WeightedControlList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.entries_sorted() {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl Extend<Entry> for WeightedControlList {
    fn extend<T: IntoIterator<Item = Entry>>(&mut self, iter: T) {
        self.add_all(iter);
    }
}

#[cfg(test)]
#[path = "tests/weighted.rs"]
mod tests;
