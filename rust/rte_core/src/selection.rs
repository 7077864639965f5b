//! Selection model: text ranges over leaf blocks and rectangular cell ranges.

use serde::{Deserialize, Serialize};

use crate::doc::{Block, ContainerKind, Doc};
use crate::table::{CellRef, Rect, TableMap};

/// A character offset inside a leaf block. Positions order by document order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub path: Vec<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl Position {
    pub fn new(path: Vec<usize>, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPos {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selection {
    Text { anchor: Position, head: Position },
    /// Rectangular cell range; coordinates are grid slots of `table`.
    Cells { table: Vec<usize>, anchor: GridPos, head: GridPos },
}

impl Default for Selection {
    fn default() -> Self {
        Selection::cursor(vec![0], 0)
    }
}

/// A slice `start..end` of one textblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub path: Vec<usize>,
    pub start: usize,
    pub end: usize,
}

/// The table a selection points into and the grid region it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    pub path: Vec<usize>,
    pub rect: Rect,
    pub head: CellRef,
}

/// Selection stored as leaf ordinals. Survives edits that re-nest blocks
/// without adding or removing leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark {
    anchor: (usize, usize),
    head: (usize, usize),
}

impl Selection {
    pub fn cursor(path: Vec<usize>, offset: usize) -> Self {
        let pos = Position::new(path, offset);
        Selection::Text { anchor: pos.clone(), head: pos }
    }

    pub fn range(anchor: Position, head: Position) -> Self {
        Selection::Text { anchor, head }
    }

    pub fn cells(table: Vec<usize>, anchor: GridPos, head: GridPos) -> Self {
        Selection::Cells { table, anchor, head }
    }

    pub fn start_of(doc: &Doc) -> Self {
        Selection::cursor(doc.first_leaf(), 0)
    }

    /// Cursor at the start of the cell covering grid slot (`row`, `col`),
    /// clamped into the table.
    pub fn in_cell(doc: &Doc, table: &[usize], row: usize, col: usize) -> Option<Self> {
        let Some(Block::Table(t)) = doc.block(table) else { return None };
        let map = TableMap::build(t).ok()?;
        let cell = map.cell_at(row.min(map.height - 1), col.min(map.width - 1))?;
        let mut path = table.to_vec();
        path.extend([cell.row, cell.index]);
        Some(Selection::cursor(doc.first_leaf_under(&path)?, 0))
    }

    pub fn is_collapsed(&self) -> bool {
        match self {
            Selection::Text { anchor, head } => anchor == head,
            Selection::Cells { .. } => false,
        }
    }

    /// Ordered `(from, to)` of a text selection.
    pub fn bounds(&self) -> Option<(&Position, &Position)> {
        match self {
            Selection::Text { anchor, head } if anchor <= head => Some((anchor, head)),
            Selection::Text { anchor, head } => Some((head, anchor)),
            Selection::Cells { .. } => None,
        }
    }

    pub fn is_valid(&self, doc: &Doc) -> bool {
        match self {
            Selection::Text { anchor, head } => position_is_valid(doc, anchor) && position_is_valid(doc, head),
            Selection::Cells { table, anchor, head } => {
                let Some(Block::Table(t)) = doc.block(table) else { return false };
                let Ok(map) = TableMap::build(t) else { return false };
                map.cell_at(anchor.row, anchor.col).is_some() && map.cell_at(head.row, head.col).is_some()
            }
        }
    }

    /// Leaf paths the selection touches, in document order.
    pub fn leaves(&self, doc: &Doc) -> Vec<Vec<usize>> {
        match self {
            Selection::Text { .. } => {
                let Some((from, to)) = self.bounds() else { return Vec::new() };
                doc.leaf_paths().into_iter().filter(|p| *p >= from.path && *p <= to.path).collect()
            }
            Selection::Cells { table, .. } => {
                let Some(target) = self.table_target(doc) else { return Vec::new() };
                let Some(Block::Table(t)) = doc.block(table) else { return Vec::new() };
                let Ok(map) = TableMap::build(t) else { return Vec::new() };
                let prefixes: Vec<Vec<usize>> = map
                    .cells_in(target.rect)
                    .into_iter()
                    .map(|c| {
                        let mut p = table.clone();
                        p.extend([c.row, c.index]);
                        p
                    })
                    .collect();
                doc.leaf_paths().into_iter().filter(|p| prefixes.iter().any(|pre| p.starts_with(pre))).collect()
            }
        }
    }

    /// Non-empty text slices covered by the selection.
    pub fn segments(&self, doc: &Doc) -> Vec<Segment> {
        let bounds = self.bounds();
        self.leaves(doc)
            .into_iter()
            .filter_map(|path| {
                let block = doc.block(&path)?;
                if !block.is_textblock() {
                    return None;
                }
                let len = block.text_len();
                let (start, end) = match bounds {
                    Some((from, to)) => (
                        if path == from.path { from.offset.min(len) } else { 0 },
                        if path == to.path { to.offset.min(len) } else { len },
                    ),
                    None => (0, len),
                };
                (start < end).then_some(Segment { path, start, end })
            })
            .collect()
    }

    /// The innermost table under the selection head and the covered rect.
    pub fn table_target(&self, doc: &Doc) -> Option<TableTarget> {
        match self {
            Selection::Text { anchor, head } => {
                let table = doc.ancestors(&head.path).into_iter().filter(|a| a.kind == ContainerKind::Table).last()?;
                let Some(Block::Table(t)) = doc.block(&table.path) else { return None };
                let map = TableMap::build(t).ok()?;
                let depth = table.path.len();
                let head_cell = CellRef { row: head.path[depth], index: head.path[depth + 1] };
                let anchor_cell = if anchor.path.len() > depth + 1 && anchor.path.starts_with(&table.path) {
                    CellRef { row: anchor.path[depth], index: anchor.path[depth + 1] }
                } else {
                    head_cell
                };
                let rect = map.rect_between(anchor_cell, head_cell)?;
                Some(TableTarget { path: table.path, rect, head: head_cell })
            }
            Selection::Cells { table, anchor, head } => {
                let Some(Block::Table(t)) = doc.block(table) else { return None };
                let map = TableMap::build(t).ok()?;
                let anchor_cell = map.cell_at(anchor.row, anchor.col)?;
                let head_cell = map.cell_at(head.row, head.col)?;
                let rect = map.rect_between(anchor_cell, head_cell)?;
                Some(TableTarget { path: table.clone(), rect, head: head_cell })
            }
        }
    }

    pub fn bookmark(&self, doc: &Doc) -> Option<Bookmark> {
        let Selection::Text { anchor, head } = self else { return None };
        let leaves = doc.leaf_paths();
        let ordinal = |p: &Position| leaves.iter().position(|l| *l == p.path).map(|i| (i, p.offset));
        Some(Bookmark { anchor: ordinal(anchor)?, head: ordinal(head)? })
    }
}

impl Bookmark {
    pub fn resolve(&self, doc: &Doc) -> Selection {
        let leaves = doc.leaf_paths();
        let position = |(ordinal, offset): (usize, usize)| {
            let path = leaves.get(ordinal).or_else(|| leaves.last()).cloned().unwrap_or_else(|| vec![0]);
            let len = doc.block(&path).map(Block::text_len).unwrap_or(0);
            Position::new(path, offset.min(len))
        };
        Selection::range(position(self.anchor), position(self.head))
    }
}

fn position_is_valid(doc: &Doc, pos: &Position) -> bool {
    doc.block(&pos.path).is_some_and(|b| b.is_leaf() && pos.offset <= b.text_len())
}
