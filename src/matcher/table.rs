use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use tracing::trace;

use super::{ElementFilter, MatchResult, Matcher, PathContext};
use crate::dom::{Dom, NodeId};
use crate::error::Result;
use crate::page_index::PageIndex;
use crate::search_pattern::{FindSpot, SearchPattern};
use crate::weighted::FoundBy;
use crate::wpath::TableCoordinate;

/// A `[x; y]` locator segment with both axes compiled.
#[derive(Debug, Clone)]
pub struct CompiledCoordinate {
    pub x: Option<Arc<SearchPattern>>,
    pub y: Option<Arc<SearchPattern>>,
}

impl CompiledCoordinate {
    pub fn compile(coordinate: &TableCoordinate) -> Result<Self> {
        let axis = |value: &Option<String>| value.as_deref().map(SearchPattern::compile).transpose();
        Ok(Self {
            x: axis(&coordinate.x)?,
            y: axis(&coordinate.y)?,
        })
    }
}

struct Placement {
    row: usize,
    columns: Range<usize>,
    rowspan: usize,
}

/// Cell layout of one table with `colspan`/`rowspan` resolved.
struct TableGrid {
    rows: Vec<Vec<Option<NodeId>>>,
    placements: HashMap<NodeId, Placement>,
}

impl TableGrid {
    fn build(dom: &Dom, table: NodeId) -> Self {
        let mut row_nodes = Vec::new();
        for child in dom.child_elements(table) {
            if dom.is_tag(child, "tr") {
                row_nodes.push(child);
            } else if ["thead", "tbody", "tfoot"]
                .iter()
                .any(|section| dom.is_tag(child, section))
            {
                row_nodes.extend(
                    dom.child_elements(child)
                        .into_iter()
                        .filter(|row| dom.is_tag(*row, "tr")),
                );
            }
        }

        let mut rows: Vec<Vec<Option<NodeId>>> = vec![Vec::new(); row_nodes.len()];
        let mut placements = HashMap::new();
        for (row_index, row) in row_nodes.iter().enumerate() {
            let mut column = 0;
            for cell in dom
                .child_elements(*row)
                .into_iter()
                .filter(|cell| is_cell(dom, *cell))
            {
                while matches!(rows[row_index].get(column), Some(Some(_))) {
                    column += 1;
                }
                let colspan = column_span(dom, cell);
                let rowspan = row_span(dom, cell, row_nodes.len() - row_index);
                for covered in rows.iter_mut().skip(row_index).take(rowspan) {
                    if covered.len() < column + colspan {
                        covered.resize(column + colspan, None);
                    }
                    for slot in &mut covered[column..column + colspan] {
                        *slot = Some(cell);
                    }
                }
                placements.insert(
                    cell,
                    Placement {
                        row: row_index,
                        columns: column..column + colspan,
                        rowspan,
                    },
                );
                column += colspan;
            }
        }
        Self { rows, placements }
    }

    /// Distinct cells in the given columns, over all rows.
    fn column_cells(&self, columns: Range<usize>) -> Vec<NodeId> {
        let mut cells = Vec::new();
        for row in &self.rows {
            let end = columns.end.min(row.len());
            let start = columns.start.min(end);
            for cell in row[start..end].iter().flatten() {
                if !cells.contains(cell) {
                    cells.push(*cell);
                }
            }
        }
        cells
    }

    /// Distinct cells in the given rows.
    fn row_cells(&self, rows: Range<usize>) -> Vec<NodeId> {
        let mut cells = Vec::new();
        for row in self.rows.get(rows).unwrap_or_default() {
            for cell in row.iter().flatten() {
                if !cells.contains(cell) {
                    cells.push(*cell);
                }
            }
        }
        cells
    }
}

fn is_cell(dom: &Dom, node: NodeId) -> bool {
    dom.is_tag(node, "td") || dom.is_tag(node, "th")
}

const MAX_COLSPAN: u64 = 1000;
const MAX_ROWSPAN: u64 = 65534;

/// Leading digits of a span attribute; values too large for `u64` saturate.
fn span_value(dom: &Dom, cell: NodeId, attribute: &str) -> Option<u64> {
    let value = dom.attr(cell, attribute)?.trim();
    let digits = value
        .find(|ch: char| !ch.is_ascii_digit())
        .map_or(value, |end| &value[..end]);
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

fn column_span(dom: &Dom, cell: NodeId) -> usize {
    span_value(dom, cell, "colspan")
        .filter(|value| *value > 0)
        .map_or(1, |value| value.min(MAX_COLSPAN) as usize)
}

/// `rowspan='0'` reaches the last row; nothing spans past it.
fn row_span(dom: &Dom, cell: NodeId, remaining_rows: usize) -> usize {
    let rows = match span_value(dom, cell, "rowspan") {
        None => 1,
        Some(0) => remaining_rows,
        Some(value) => value.min(MAX_ROWSPAN) as usize,
    };
    rows.clamp(1, remaining_rows.max(1))
}

fn enclosing_cell(dom: &Dom, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(candidate) = current {
        if is_cell(dom, candidate) {
            return Some(candidate);
        }
        current = dom.parent(candidate);
    }
    None
}

fn axis_hit(
    index: &PageIndex<'_>,
    cells: Vec<NodeId>,
    pattern: &SearchPattern,
    path_spot: Option<FindSpot>,
) -> bool {
    cells.into_iter().any(|cell| {
        let after_path = match (path_spot, index.position(cell)) {
            (None, _) => true,
            (Some(path), Some(cell_spot)) => path.end < cell_spot.start,
            (Some(_), None) => false,
        };
        after_path
            && index
                .as_text(cell)
                .is_some_and(|text| pattern.matches(&text))
    })
}

/// Row of the innermost table around `node` whose cells satisfy
/// `coordinate`, walking outwards through nested tables.
fn coordinate_row(
    index: &PageIndex<'_>,
    node: NodeId,
    coordinate: &CompiledCoordinate,
    path_spot: Option<FindSpot>,
) -> Option<NodeId> {
    let dom = index.dom();
    let mut cell = enclosing_cell(dom, node);
    while let Some(current) = cell {
        let row = dom.find_ancestor_by_tag(current, "tr")?;
        let table = dom.find_ancestor_by_tag(current, "table")?;
        let grid = TableGrid::build(dom, table);
        let placement = grid.placements.get(&current)?;

        let x_found = coordinate.x.as_deref().is_none_or(|x| {
            axis_hit(index, grid.column_cells(placement.columns.clone()), x, path_spot)
        });
        let y_found = coordinate.y.as_deref().is_none_or(|y| {
            let end = (placement.row + placement.rowspan).min(grid.rows.len());
            axis_hit(index, grid.row_cells(placement.row..end), y, path_spot)
        });
        if x_found && y_found {
            return Some(row);
        }
        cell = enclosing_cell(dom, row);
    }
    None
}

/// Whether `node` sits in the cells addressed by `coordinates`, innermost
/// coordinate first. No coordinates always holds.
pub fn is_in_table_coordinates(
    index: &PageIndex<'_>,
    node: NodeId,
    coordinates: &[CompiledCoordinate],
    path_spot: Option<FindSpot>,
) -> bool {
    let mut element = node;
    for coordinate in coordinates {
        match coordinate_row(index, element, coordinate, path_spot) {
            Some(row) => element = row,
            None => return false,
        }
    }
    true
}

/// Used when a locator ends in a coordinate: every control of the wanted
/// type inside the addressed cell is a hit.
#[derive(Debug, Clone)]
pub struct TableCoordinatesMatcher {
    path: PathContext,
    coordinates: Vec<CompiledCoordinate>,
    filter: ElementFilter,
}

impl TableCoordinatesMatcher {
    pub fn new(path: &PathContext, coordinates: Vec<CompiledCoordinate>, filter: ElementFilter) -> Self {
        Self {
            path: path.clone(),
            coordinates,
            filter,
        }
    }
}

impl Matcher for TableCoordinatesMatcher {
    fn matches(&self, index: &PageIndex<'_>, node: NodeId) -> Result<Vec<MatchResult>> {
        if !index.dom().element(node).is_some_and(self.filter) {
            return Ok(Vec::new());
        }
        let Some(spot) = index.position(node) else {
            return Ok(Vec::new());
        };
        if !self.path.allows(spot)
            || !is_in_table_coordinates(index, node, &self.coordinates, self.path.spot())
        {
            return Ok(Vec::new());
        }
        let Some(distance) = self
            .path
            .distance_in(&index.text_before(node).unwrap_or_default())
        else {
            return Ok(Vec::new());
        };
        trace!(node = node.0, distance, "table coordinate hit");
        Ok(vec![MatchResult {
            node,
            found_by: FoundBy::TableCoordinate,
            deviation: 0,
            distance,
            start: spot.start,
        }])
    }
}
