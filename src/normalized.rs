use std::fmt;

/// Text buffer that collapses every whitespace run into a single blank.
///
/// The buffer never starts with a blank. [`length`](Self::length) ignores a
/// single trailing blank, so positions taken between appends stay stable no
/// matter whether a block separator follows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedString {
    content: Vec<char>,
    append_disabled: bool,
}

impl NormalizedString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        let mut out = Self::new();
        out.append(text);
        out
    }

    pub fn disable_append(&mut self) {
        self.append_disabled = true;
    }

    pub fn enable_append(&mut self) {
        self.append_disabled = false;
    }

    pub fn append_enabled(&self) -> bool {
        !self.append_disabled
    }

    pub fn set_append_enabled(&mut self, enabled: bool) {
        self.append_disabled = !enabled;
    }

    pub fn append(&mut self, text: &str) -> &mut Self {
        if self.append_disabled || text.is_empty() {
            return self;
        }

        let mut blank = self.ends_blank();
        for ch in text.chars() {
            if is_blank_char(ch) {
                if !blank {
                    blank = true;
                    self.content.push(' ');
                }
            } else {
                blank = false;
                self.content.push(ch);
            }
        }
        self
    }

    pub fn append_blank(&mut self) -> &mut Self {
        if self.append_disabled || self.ends_blank() {
            return self;
        }
        self.content.push(' ');
        self
    }

    pub fn length(&self) -> usize {
        let len = self.content.len();
        if len > 0 && is_blank_char(self.content[len - 1]) {
            return len - 1;
        }
        len
    }

    /// Text between two positions with one blank trimmed from either edge.
    ///
    /// Returns an empty string for empty or inverted ranges; `end` is clamped
    /// to [`length`](Self::length).
    pub fn substring(&self, start: usize, end: usize) -> String {
        let end = end.min(self.length());
        if end == 0 || start >= end {
            return String::new();
        }

        let mut from = start;
        let mut to = end;
        if is_blank_char(self.content[to - 1]) {
            to -= 1;
        }
        if is_blank_char(self.content[from]) {
            from += 1;
        }
        if from >= to {
            return String::new();
        }
        self.content[from..to].iter().collect()
    }

    fn ends_blank(&self) -> bool {
        self.content.last().is_none_or(|ch| is_blank_char(*ch))
    }
}

impl fmt::Display for NormalizedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.substring(0, self.length()))
    }
}

pub(crate) fn is_blank_char(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{00A0}'
}

#[cfg(test)]
#[path = "tests/normalized.rs"]
mod tests;
