use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A `[x; y]` table-coordinate segment. Either axis may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCoordinate {
    pub x: Option<String>,
    pub y: Option<String>,
}

impl TableCoordinate {
    pub fn parse(segment: &str) -> Result<Self> {
        let inner = segment
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| Error::InvalidLocator(format!("{segment} is not a valid table coordinate")))?;

        let parts: Vec<&str> = inner.split(';').collect();
        if parts.len() > 2 {
            return Err(Error::InvalidLocator(format!(
                "{segment} is not a valid table coordinate"
            )));
        }
        let axis = |part: Option<&&str>| {
            part.map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        Ok(Self {
            x: axis(parts.first()),
            y: axis(parts.get(1)),
        })
    }

    pub(crate) fn is_coordinate_segment(segment: &str) -> bool {
        segment.starts_with('[') && segment.ends_with(']') && !segment.ends_with("\\]")
    }
}

/// Rejects a segment whose unescaped `[` and `]` do not pair up.
fn check_brackets(segment: &str) -> Result<()> {
    let mut depth = 0usize;
    let mut chars = segment.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1).ok_or_else(|| unbalanced(segment))?;
            }
            _ => {}
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(unbalanced(segment))
    }
}

fn unbalanced(segment: &str) -> Error {
    Error::InvalidLocator(format!("unbalanced brackets in '{segment}'"))
}

/// Plain text segment with `\[` and `\]` turned back into brackets.
fn plain_segment(segment: &str) -> String {
    segment.replace("\\[", "[").replace("\\]", "]")
}

impl fmt::Display for TableCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{};{}]",
            self.x.as_deref().unwrap_or_default(),
            self.y.as_deref().unwrap_or_default()
        )
    }
}

/// Parsed locator: `segment ( ">" segment )*`.
///
/// The last segment is the target, earlier plain segments are context the
/// target must follow, and `[x; y]` segments select table cells. Only one
/// contiguous group of coordinates is allowed among the context segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WPath {
    raw: Vec<String>,
    path_nodes: Vec<String>,
    table_coordinates: Vec<TableCoordinate>,
    last_node: Option<String>,
}

impl WPath {
    pub fn parse(locator: &str) -> Result<Self> {
        if locator.trim().is_empty() {
            return Ok(Self::default());
        }
        Self::from_nodes(locator.split('>').map(|segment| segment.trim().to_string()))
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = String>) -> Result<Self> {
        let raw: Vec<String> = nodes.into_iter().collect();
        let Some((last, context)) = raw.split_last() else {
            return Ok(Self::default());
        };

        let mut path_nodes = Vec::new();
        let mut table_coordinates = Vec::new();
        let mut coordinates_closed = false;
        for node in &raw {
            check_brackets(node)?;
        }
        for node in context {
            if TableCoordinate::is_coordinate_segment(node) {
                if coordinates_closed {
                    return Err(Error::InvalidLocator(
                        "only one group of table coordinates allowed".into(),
                    ));
                }
                table_coordinates.push(TableCoordinate::parse(node)?);
            } else {
                if !table_coordinates.is_empty() {
                    coordinates_closed = true;
                }
                path_nodes.push(plain_segment(node));
            }
        }

        let last_node = if TableCoordinate::is_coordinate_segment(last) {
            table_coordinates.push(TableCoordinate::parse(last)?);
            None
        } else {
            Some(plain_segment(last))
        };

        Ok(Self {
            raw,
            path_nodes,
            table_coordinates,
            last_node,
        })
    }

    pub fn raw_path(&self) -> &[String] {
        &self.raw
    }

    pub fn path_nodes(&self) -> &[String] {
        &self.path_nodes
    }

    pub fn table_coordinates(&self) -> &[TableCoordinate] {
        &self.table_coordinates
    }

    /// Innermost coordinate first.
    pub fn table_coordinates_reversed(&self) -> Vec<TableCoordinate> {
        self.table_coordinates.iter().rev().cloned().collect()
    }

    pub fn last_node(&self) -> Option<&str> {
        self.last_node.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl FromStr for WPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for WPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw.join(" > "))
    }
}

#[cfg(test)]
#[path = "tests/wpath.rs"]
mod tests;
