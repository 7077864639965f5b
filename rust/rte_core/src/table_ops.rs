//! Table commands. Each acts on the table under the selection head and the
//! grid rectangle the selection covers.

use crate::doc::{Block, BorderStyle, Color, Doc, Table};
use crate::ops::nearest_leaf;
use crate::selection::{GridPos, Position, Selection, TableTarget};
use crate::table::{CellRef, TableMap};

fn table_mut<'a>(doc: &'a mut Doc, path: &[usize]) -> Option<&'a mut Table> {
    match doc.block_mut(path)? {
        Block::Table(table) => Some(table),
        _ => None,
    }
}

fn map_of(doc: &Doc, path: &[usize]) -> Option<TableMap> {
    match doc.block(path)? {
        Block::Table(table) => TableMap::build(table).ok(),
        _ => None,
    }
}

/// Where a selection endpoint sits relative to the table, so it can be put
/// back after rows or columns are inserted.
enum Spot {
    Outside(Position),
    Inside { origin: GridPos, rest: Vec<usize>, offset: usize },
}

fn capture(map: &TableMap, table: &[usize], pos: &Position) -> Spot {
    let depth = table.len();
    if pos.path.len() > depth + 2 && pos.path.starts_with(table) {
        let cell = CellRef { row: pos.path[depth], index: pos.path[depth + 1] };
        if let Some(rect) = map.rect(cell) {
            return Spot::Inside {
                origin: GridPos { row: rect.top, col: rect.left },
                rest: pos.path[depth + 2..].to_vec(),
                offset: pos.offset,
            };
        }
    }
    Spot::Outside(pos.clone())
}

fn restore(map: &TableMap, table: &[usize], spot: Spot, shift: impl Fn(GridPos) -> GridPos) -> Option<Position> {
    match spot {
        Spot::Outside(pos) => Some(pos),
        Spot::Inside { origin, rest, offset } => {
            let at = shift(origin);
            let cell = map.cell_at(at.row, at.col)?;
            let mut path = table.to_vec();
            path.extend([cell.row, cell.index]);
            path.extend(rest);
            Some(Position::new(path, offset))
        }
    }
}

/// Runs a row or column insertion and carries the selection over to the
/// cells it pointed at, which may have moved by one slot.
fn insert_line(
    doc: &mut Doc,
    sel: &Selection,
    target: &TableTarget,
    edit: impl FnOnce(&mut Table) -> bool,
    shift: impl Fn(GridPos) -> GridPos,
) -> Option<Selection> {
    let before = map_of(doc, &target.path)?;
    if !edit(table_mut(doc, &target.path)?) {
        return None;
    }
    let after = map_of(doc, &target.path)?;
    match sel {
        Selection::Text { anchor, head } => {
            let anchor = restore(&after, &target.path, capture(&before, &target.path, anchor), &shift)?;
            let head = restore(&after, &target.path, capture(&before, &target.path, head), &shift)?;
            Some(Selection::range(anchor, head))
        }
        Selection::Cells { table, anchor, head } => Some(Selection::cells(table.clone(), shift(*anchor), shift(*head))),
    }
}

pub fn add_row(doc: &mut Doc, sel: &Selection, after: bool) -> Option<Selection> {
    let target = sel.table_target(doc)?;
    let at = if after { target.rect.bottom } else { target.rect.top };
    insert_line(doc, sel, &target, |t| t.add_row(at), |p| GridPos { row: if p.row >= at { p.row + 1 } else { p.row }, col: p.col })
}

pub fn add_column(doc: &mut Doc, sel: &Selection, after: bool) -> Option<Selection> {
    let target = sel.table_target(doc)?;
    let at = if after { target.rect.right } else { target.rect.left };
    insert_line(doc, sel, &target, |t| t.add_column(at), |p| GridPos { row: p.row, col: if p.col >= at { p.col + 1 } else { p.col } })
}

/// Deletes every row the selection touches; removing all rows removes the
/// table.
pub fn delete_rows(doc: &mut Doc, sel: &Selection) -> Option<Selection> {
    let target = sel.table_target(doc)?;
    let map = map_of(doc, &target.path)?;
    if target.rect.height() >= map.height {
        return delete_table(doc, sel);
    }
    let table = table_mut(doc, &target.path)?;
    for row in (target.rect.top..target.rect.bottom).rev() {
        if !table.remove_row(row) {
            return None;
        }
    }
    Selection::in_cell(doc, &target.path, target.rect.top, target.rect.left)
}

pub fn delete_columns(doc: &mut Doc, sel: &Selection) -> Option<Selection> {
    let target = sel.table_target(doc)?;
    let map = map_of(doc, &target.path)?;
    if target.rect.width() >= map.width {
        return delete_table(doc, sel);
    }
    let table = table_mut(doc, &target.path)?;
    for col in (target.rect.left..target.rect.right).rev() {
        if !table.remove_column(col) {
            return None;
        }
    }
    Selection::in_cell(doc, &target.path, target.rect.top, target.rect.left)
}

pub fn merge_cells(doc: &mut Doc, sel: &Selection) -> Option<Selection> {
    let target = sel.table_target(doc)?;
    if !table_mut(doc, &target.path)?.merge(target.rect) {
        return None;
    }
    Selection::in_cell(doc, &target.path, target.rect.top, target.rect.left)
}

/// Splits the selected cell; the selection must cover exactly one cell.
pub fn split_cell(doc: &mut Doc, sel: &Selection) -> Option<Selection> {
    let target = sel.table_target(doc)?;
    let map = map_of(doc, &target.path)?;
    if map.rect(target.head)? != target.rect {
        return None;
    }
    if !table_mut(doc, &target.path)?.split(target.head) {
        return None;
    }
    if sel.is_valid(doc) {
        Some(sel.clone())
    } else {
        Selection::in_cell(doc, &target.path, target.rect.top, target.rect.left)
    }
}

pub fn delete_table(doc: &mut Doc, sel: &Selection) -> Option<Selection> {
    let target = sel.table_target(doc)?;
    let (&index, parent) = target.path.split_last()?;
    let seq = doc.sequence_mut(parent)?;
    seq.remove(index);
    if seq.is_empty() {
        seq.push(Block::empty_paragraph());
    }
    Some(nearest_leaf(doc, &target.path))
}

pub fn set_cell_background(doc: &mut Doc, sel: &Selection, color: Option<&Color>) -> Option<Selection> {
    let target = sel.table_target(doc)?;
    let table = table_mut(doc, &target.path)?;
    table.update_cells(target.rect, |attrs| attrs.background = color.cloned()).then(|| sel.clone())
}

pub fn set_cell_border(doc: &mut Doc, sel: &Selection, border: BorderStyle) -> Option<Selection> {
    let target = sel.table_target(doc)?;
    let table = table_mut(doc, &target.path)?;
    table.update_cells(target.rect, |attrs| attrs.border = border).then(|| sel.clone())
}
