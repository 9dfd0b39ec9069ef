use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::trace;

use crate::error::Result;
use crate::regex::{Regex, RegexBuilder, escape};

/// Half-open character range `[start, end)` into one text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FindSpot {
    pub start: usize,
    pub end: usize,
}

impl FindSpot {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl fmt::Display for FindSpot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FindSpot({}, {})", self.start, self.end)
    }
}

/// Compiled `*`-wildcard expression.
///
/// All positions and counts are measured in characters. Matching ignores
/// case. `\*` stands for a literal star; a pattern that is empty or made of
/// stars only matches everything.
#[derive(Debug)]
pub struct SearchPattern {
    raw: String,
    min_length: usize,
    kind: PatternKind,
}

#[derive(Debug)]
enum PatternKind {
    MatchAll,
    TextOnly(Vec<char>),
    Wildcard(Box<WildcardRegex>),
}

#[derive(Debug)]
struct WildcardRegex {
    leading: Vec<char>,
    unanchored: Regex,
    shortest_prefix: Regex,
    longest_prefix: Regex,
    whole: Regex,
}

fn pattern_cache() -> &'static RwLock<HashMap<String, Arc<SearchPattern>>> {
    static CACHE: OnceLock<RwLock<HashMap<String, Arc<SearchPattern>>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

impl SearchPattern {
    pub fn compile(raw: &str) -> Result<Arc<Self>> {
        if let Ok(cache) = pattern_cache().read() {
            if let Some(pattern) = cache.get(raw) {
                return Ok(Arc::clone(pattern));
            }
        }

        let pattern = Arc::new(Self::build(raw)?);
        match pattern_cache().write() {
            Ok(mut cache) => Ok(Arc::clone(
                cache.entry(raw.to_string()).or_insert(pattern),
            )),
            Err(_) => Ok(pattern),
        }
    }

    /// Joins the segments with `*` so they are searched as one ordered
    /// sequence.
    pub fn create_from_list<S: AsRef<str>>(segments: &[S]) -> Result<Arc<Self>> {
        let joined = segments
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("*");
        Self::compile(&joined)
    }

    fn build(raw: &str) -> Result<Self> {
        let segments = split_segments(raw.trim());
        let min_length = segments.iter().map(|s| s.chars().count()).sum();

        let kind = if segments.iter().all(String::is_empty) {
            PatternKind::MatchAll
        } else if segments.len() == 1 {
            PatternKind::TextOnly(fold(&segments[0]))
        } else {
            PatternKind::Wildcard(Box::new(WildcardRegex::new(&segments)?))
        };
        trace!(pattern = raw, min_length, "compiled search pattern");

        Ok(Self {
            raw: raw.to_string(),
            min_length,
            kind,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Number of literal characters a match needs at least.
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self.kind, PatternKind::MatchAll)
    }

    pub fn matches(&self, text: &str) -> bool {
        match &self.kind {
            PatternKind::MatchAll => true,
            PatternKind::TextOnly(literal) => fold(text) == *literal,
            PatternKind::Wildcard(regex) => {
                text.chars().count() >= self.min_length
                    && regex.whole.is_match(text).unwrap_or(false)
            }
        }
    }

    pub fn matches_at_end(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        match &self.kind {
            PatternKind::MatchAll => false,
            PatternKind::TextOnly(literal) => fold(text).ends_with(literal),
            PatternKind::Wildcard(regex) => {
                let hay = Haystack::new(text);
                if hay.len() < self.min_length {
                    return false;
                }
                regex
                    .rightmost_begin(&hay)
                    .and_then(|begin| regex.longest_end(&hay, begin))
                    .is_some_and(|end| end == hay.len())
            }
        }
    }

    pub fn first_occurrence_in(&self, text: &str) -> Option<FindSpot> {
        self.first_occurrence_from(text, 0)
    }

    /// Leftmost shortest occurrence at or after `from`.
    pub fn first_occurrence_from(&self, text: &str, from: usize) -> Option<FindSpot> {
        if text.is_empty() {
            return None;
        }
        match &self.kind {
            PatternKind::MatchAll => None,
            PatternKind::TextOnly(literal) => {
                let folded = fold(text);
                index_of(&folded, literal, from)
                    .map(|pos| FindSpot::new(pos, pos + literal.len()))
            }
            PatternKind::Wildcard(regex) => {
                let hay = Haystack::new(text);
                if hay.len() < self.min_length {
                    return None;
                }
                ShortMatches::new(regex, &hay, from).next()
            }
        }
    }

    /// Rightmost occurrence, ending as early as possible.
    pub fn last_occurrence_in(&self, text: &str) -> Option<FindSpot> {
        if text.is_empty() {
            return None;
        }
        match &self.kind {
            PatternKind::MatchAll => None,
            PatternKind::TextOnly(literal) => {
                let folded = fold(text);
                last_index_of(&folded, literal)
                    .map(|pos| FindSpot::new(pos, pos + literal.len()))
            }
            PatternKind::Wildcard(regex) => {
                let hay = Haystack::new(text);
                if hay.len() < self.min_length {
                    return None;
                }
                let begin = regex.rightmost_begin(&hay)?;
                let end = regex.shortest_end(&hay, begin)?;
                Some(FindSpot::new(begin, end))
            }
        }
    }

    pub fn no_of_chars_before_last_occurrence_in(&self, text: &str) -> Option<usize> {
        if text.is_empty() {
            return None;
        }
        match &self.kind {
            PatternKind::MatchAll => Some(0),
            PatternKind::TextOnly(literal) => last_index_of(&fold(text), literal),
            PatternKind::Wildcard(regex) => {
                let hay = Haystack::new(text);
                if hay.len() < self.min_length {
                    return None;
                }
                regex.rightmost_begin(&hay)
            }
        }
    }

    pub fn no_of_chars_before_last_shortest_occurrence_in(&self, text: &str) -> Option<usize> {
        self.no_of_chars_before_last_occurrence_in(text)
    }

    pub fn no_of_chars_after_last_occurrence_in(&self, text: &str) -> Option<usize> {
        self.after_last(text, false)
    }

    pub fn no_of_chars_after_last_shortest_occurrence_in(&self, text: &str) -> Option<usize> {
        self.after_last(text, true)
    }

    fn after_last(&self, text: &str, shortest: bool) -> Option<usize> {
        match &self.kind {
            PatternKind::MatchAll => Some(text.chars().count()),
            _ if text.is_empty() => None,
            PatternKind::TextOnly(literal) => {
                let folded = fold(text);
                last_index_of(&folded, literal).map(|pos| folded.len() - pos - literal.len())
            }
            PatternKind::Wildcard(regex) => {
                let hay = Haystack::new(text);
                if hay.len() < self.min_length {
                    return None;
                }
                let begin = regex.rightmost_begin(&hay)?;
                let end = if shortest {
                    regex.shortest_end(&hay, begin)?
                } else {
                    regex.longest_end(&hay, begin)?
                };
                Some(hay.len() - end)
            }
        }
    }

    /// Smallest number of characters of `text` left outside a match, taking
    /// leftmost-longest matches that do not overlap.
    pub fn no_of_surrounding_chars_in(&self, text: &str) -> Option<usize> {
        match &self.kind {
            PatternKind::MatchAll => Some(0),
            _ if text.is_empty() => None,
            PatternKind::TextOnly(literal) => {
                let folded = fold(text);
                index_of(&folded, literal, 0).map(|_| folded.len() - literal.len())
            }
            PatternKind::Wildcard(regex) => {
                let hay = Haystack::new(text);
                let mut best: Option<usize> = None;
                let mut from = 0;
                while let Some(begin) = regex.leftmost_begin(&hay, from) {
                    let Some(end) = regex.longest_end(&hay, begin) else {
                        from = begin + 1;
                        continue;
                    };
                    let surrounding = hay.len() - (end - begin);
                    best = Some(best.map_or(surrounding, |b| b.min(surrounding)));
                    from = end.max(begin + 1);
                }
                best
            }
        }
    }

    /// Ranking penalty of `text` against this pattern; 0 is an exact match.
    pub fn deviation(&self, text: &str) -> Option<usize> {
        self.no_of_surrounding_chars_in(text)
    }
}

impl fmt::Display for SearchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PatternKind::MatchAll => write!(f, "SearchPattern '{}' [matchAll]", self.raw),
            PatternKind::TextOnly(_) => write!(f, "SearchPattern '{}' [text]", self.raw),
            PatternKind::Wildcard(_) => write!(f, "SearchPattern '{}' [wildcard]", self.raw),
        }
    }
}

impl PartialEq for SearchPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for SearchPattern {}

fn split_segments(raw: &str) -> Vec<String> {
    let mut segments = vec![String::new()];
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'*') => {
                chars.next();
                push_char(&mut segments, '*');
            }
            '*' => {
                if segments.last().is_some_and(|s| !s.is_empty()) || segments.len() == 1 {
                    segments.push(String::new());
                }
            }
            other => push_char(&mut segments, other),
        }
    }
    segments
}

fn push_char(segments: &mut Vec<String>, ch: char) {
    if let Some(last) = segments.last_mut() {
        last.push(ch);
    }
}

fn fold_char(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

fn fold(text: &str) -> Vec<char> {
    text.chars().map(fold_char).collect()
}

fn index_of(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&at| haystack[at..at + needle.len()] == *needle)
}

fn last_index_of(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&at| haystack[at..at + needle.len()] == *needle)
}

/// Text with character/byte offset bookkeeping for the regex backend.
struct Haystack<'a> {
    text: &'a str,
    offsets: Vec<usize>,
    folded: Vec<char>,
}

impl<'a> Haystack<'a> {
    fn new(text: &'a str) -> Self {
        let mut offsets = text.char_indices().map(|(at, _)| at).collect::<Vec<_>>();
        offsets.push(text.len());
        Self {
            text,
            offsets,
            folded: fold(text),
        }
    }

    fn len(&self) -> usize {
        self.folded.len()
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    fn char_index(&self, byte: usize) -> usize {
        self.offsets.partition_point(|&offset| offset < byte)
    }
}

impl WildcardRegex {
    fn new(segments: &[String]) -> Result<Self> {
        let escaped = segments.iter().map(|s| escape(s)).collect::<Vec<_>>();
        let lazy = escaped.join(".*?");
        let greedy = escaped.join(".*");
        Ok(Self {
            leading: fold(&segments[0]),
            unanchored: build(&lazy)?,
            shortest_prefix: build(&format!("^(?:{lazy})"))?,
            longest_prefix: build(&format!("^(?:{greedy})"))?,
            whole: build(&format!("^(?:{greedy})$"))?,
        })
    }

    fn leftmost_begin(&self, hay: &Haystack<'_>, from: usize) -> Option<usize> {
        if from >= hay.len() {
            return None;
        }
        let found = self.unanchored.find(hay.slice(from, hay.len())).ok()??;
        Some(hay.char_index(hay.offsets[from] + found.start()))
    }

    fn rightmost_begin(&self, hay: &Haystack<'_>) -> Option<usize> {
        (0..hay.len())
            .rev()
            .find(|&begin| self.shortest_end(hay, begin).is_some())
    }

    fn shortest_end(&self, hay: &Haystack<'_>, begin: usize) -> Option<usize> {
        self.prefix_end(&self.shortest_prefix, hay, begin, hay.len())
    }

    fn longest_end(&self, hay: &Haystack<'_>, begin: usize) -> Option<usize> {
        self.prefix_end(&self.longest_prefix, hay, begin, hay.len())
    }

    fn prefix_end(
        &self,
        regex: &Regex,
        hay: &Haystack<'_>,
        begin: usize,
        limit: usize,
    ) -> Option<usize> {
        if !self.leading_fits(hay, begin, limit) {
            return None;
        }
        let found = regex.find(hay.slice(begin, limit)).ok()??;
        Some(hay.char_index(hay.offsets[begin] + found.end()))
    }

    /// False once the text at `begin` diverges from the leading literal.
    fn leading_fits(&self, hay: &Haystack<'_>, begin: usize, limit: usize) -> bool {
        self.leading
            .iter()
            .zip(hay.folded[begin..limit].iter())
            .all(|(expected, actual)| expected == actual)
    }

    /// Moves the start of `[begin, end)` right while the pattern still
    /// matches a prefix of the remaining range; the end stays put.
    fn reduce(&self, hay: &Haystack<'_>, begin: usize, end: usize) -> usize {
        let mut start = begin;
        for candidate in begin + 1..end {
            if !self.leading_fits(hay, candidate, end) {
                break;
            }
            if self
                .prefix_end(&self.shortest_prefix, hay, candidate, end)
                .is_some()
            {
                start = candidate;
            }
        }
        start
    }
}

fn build(pattern: &str) -> Result<Regex> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()?;
    Ok(regex)
}

/// Successive shortest matches, each search resuming one character after the
/// previous match start.
struct ShortMatches<'p, 'h, 'a> {
    regex: &'p WildcardRegex,
    hay: &'h Haystack<'a>,
    next_begin: Option<usize>,
}

impl<'p, 'h, 'a> ShortMatches<'p, 'h, 'a> {
    fn new(regex: &'p WildcardRegex, hay: &'h Haystack<'a>, from: usize) -> Self {
        Self {
            regex,
            hay,
            next_begin: Some(from),
        }
    }
}

impl Iterator for ShortMatches<'_, '_, '_> {
    type Item = FindSpot;

    fn next(&mut self) -> Option<FindSpot> {
        let from = self.next_begin.take()?;
        let mut begin = self.regex.leftmost_begin(self.hay, from)?;
        let end = loop {
            if let Some(end) = self.regex.shortest_end(self.hay, begin) {
                break end;
            }
            begin = self.regex.leftmost_begin(self.hay, begin + 1)?;
        };
        let start = if end - begin > 1 {
            self.regex.reduce(self.hay, begin, end)
        } else {
            begin
        };
        self.next_begin = Some(start + 1);
        Some(FindSpot::new(start, end))
    }
}

#[cfg(test)]
#[path = "tests/search_pattern.rs"]
mod tests;
