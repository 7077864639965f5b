//! Table grid model: span layout, row/column edits, merge and split.
//!
//! Rows store only the cells that originate in them. A cell with
//! `rowspan > 1` covers slots in the rows below, which hold no cell for those
//! columns. [`TableMap`] turns that layout into a rectangular grid view.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::doc::{Block, Cell, CellAttrs, Table, TableRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub index: usize,
}

/// Grid rectangle; `bottom` and `right` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl Rect {
    pub fn width(&self) -> usize {
        self.right - self.left
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.top >= self.top && other.left >= self.left && other.bottom <= self.bottom && other.right <= self.right
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            top: self.top.min(other.top),
            left: self.left.min(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.max(other.right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("table has no cells")]
    Empty,
    #[error("cell {index} of row {row} has a zero span")]
    ZeroSpan { row: usize, index: usize },
    #[error("cell {index} of row {row} spans past the last row")]
    Overflow { row: usize, index: usize },
    #[error("cell {index} of row {row} overlaps another cell at column {col}")]
    Overlap { row: usize, index: usize, col: usize },
    #[error("grid slot ({row}, {col}) is not covered by any cell")]
    Hole { row: usize, col: usize },
}

#[derive(Debug, Clone)]
pub struct TableMap {
    pub width: usize,
    pub height: usize,
    grid: Vec<CellRef>,
    rects: Vec<Vec<Rect>>,
}

impl TableMap {
    /// Lays out the table, failing when the spans do not tile a rectangle.
    pub fn build(table: &Table) -> Result<TableMap, GridError> {
        let height = table.rows.len();
        let mut slots: Vec<Vec<Option<CellRef>>> = vec![Vec::new(); height];
        let mut rects = Vec::with_capacity(height);
        for (r, row) in table.rows.iter().enumerate() {
            let mut col = 0;
            let mut row_rects = Vec::with_capacity(row.cells.len());
            for (index, cell) in row.cells.iter().enumerate() {
                let (colspan, rowspan) = (cell.attrs.colspan as usize, cell.attrs.rowspan as usize);
                if colspan == 0 || rowspan == 0 {
                    return Err(GridError::ZeroSpan { row: r, index });
                }
                if r + rowspan > height {
                    return Err(GridError::Overflow { row: r, index });
                }
                while slots[r].get(col).is_some_and(Option::is_some) {
                    col += 1;
                }
                for line in &mut slots[r..r + rowspan] {
                    if line.len() < col + colspan {
                        line.resize(col + colspan, None);
                    }
                    for (c, slot) in line[col..col + colspan].iter_mut().enumerate() {
                        if slot.is_some() {
                            return Err(GridError::Overlap { row: r, index, col: col + c });
                        }
                        *slot = Some(CellRef { row: r, index });
                    }
                }
                row_rects.push(Rect { top: r, left: col, bottom: r + rowspan, right: col + colspan });
                col += colspan;
            }
            rects.push(row_rects);
        }

        let width = slots.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return Err(GridError::Empty);
        }
        let mut grid = Vec::with_capacity(width * height);
        for (r, line) in slots.iter().enumerate() {
            for c in 0..width {
                match line.get(c).copied().flatten() {
                    Some(cell) => grid.push(cell),
                    None => return Err(GridError::Hole { row: r, col: c }),
                }
            }
        }
        Ok(TableMap { width, height, grid, rects })
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<CellRef> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.grid.get(row * self.width + col).copied()
    }

    pub fn rect(&self, cell: CellRef) -> Option<Rect> {
        self.rects.get(cell.row)?.get(cell.index).copied()
    }

    pub fn full(&self) -> Rect {
        Rect { top: 0, left: 0, bottom: self.height, right: self.width }
    }

    /// Distinct cells touching `rect`, ordered by where they originate.
    pub fn cells_in(&self, rect: Rect) -> Vec<CellRef> {
        let mut out: Vec<CellRef> = Vec::new();
        for r in rect.top..rect.bottom.min(self.height) {
            for c in rect.left..rect.right.min(self.width) {
                if let Some(cell) = self.cell_at(r, c) {
                    if !out.contains(&cell) {
                        out.push(cell);
                    }
                }
            }
        }
        out.sort();
        out
    }

    /// Index in `row` where a cell starting at grid column `col` belongs.
    pub fn insert_index(&self, row: usize, col: usize) -> usize {
        self.rects.get(row).map(|rects| rects.iter().filter(|r| r.left < col).count()).unwrap_or(0)
    }

    /// Smallest rectangle covering both cells' full extents.
    pub fn rect_between(&self, a: CellRef, b: CellRef) -> Option<Rect> {
        Some(self.rect(a)?.union(&self.rect(b)?))
    }
}

impl Table {
    pub fn new(rows: usize, cols: usize, with_header_row: bool) -> Table {
        let rows = (0..rows.max(1))
            .map(|r| TableRow { header: with_header_row && r == 0, cells: vec![Cell::default(); cols.max(1)] })
            .collect();
        Table { rows }
    }

    pub fn cell(&self, cell: CellRef) -> Option<&Cell> {
        self.rows.get(cell.row)?.cells.get(cell.index)
    }

    pub fn cell_mut(&mut self, cell: CellRef) -> Option<&mut Cell> {
        self.rows.get_mut(cell.row)?.cells.get_mut(cell.index)
    }

    pub fn has_header_row(&self) -> bool {
        self.rows.first().is_some_and(|r| r.header)
    }

    /// Repairs imported tables: clamps spans, drops header flags below the
    /// first row and pads rows so the grid is rectangular.
    pub fn normalize(&mut self) {
        let height = self.rows.len();
        if height == 0 {
            return;
        }
        for row in self.rows.iter_mut().skip(1) {
            row.header = false;
        }

        let mut slots: Vec<Vec<bool>> = vec![Vec::new(); height];
        for r in 0..height {
            let mut col = 0;
            for cell in self.rows[r].cells.iter_mut() {
                let attrs = &mut cell.attrs;
                attrs.rowspan = attrs.rowspan.clamp(1, (height - r) as u32);
                attrs.colspan = attrs.colspan.max(1);
                while slots[r].get(col).copied().unwrap_or(false) {
                    col += 1;
                }
                let mut colspan = 0;
                while colspan < attrs.colspan as usize && !slots[r].get(col + colspan).copied().unwrap_or(false) {
                    colspan += 1;
                }
                attrs.colspan = colspan as u32;
                for line in &mut slots[r..r + attrs.rowspan as usize] {
                    if line.len() < col + colspan {
                        line.resize(col + colspan, false);
                    }
                    for slot in &mut line[col..col + colspan] {
                        *slot = true;
                    }
                }
                col += colspan;
            }
        }

        let width = slots.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for (row, line) in self.rows.iter_mut().zip(&slots) {
            let covered = line.iter().filter(|s| **s).count();
            for _ in covered..width {
                row.cells.push(Cell::default());
            }
        }
        debug_assert!(TableMap::build(self).is_ok());
    }

    /// Inserts an empty row before grid row `at`; cells spanning across the
    /// insertion line grow instead of getting a neighbour.
    pub fn add_row(&mut self, at: usize) -> bool {
        let Ok(map) = TableMap::build(self) else { return false };
        if at > map.height {
            return false;
        }
        let mut cells = Vec::with_capacity(map.width);
        let mut col = 0;
        while col < map.width {
            if at > 0 && at < map.height {
                if let Some((cell, rect)) = map.cell_at(at, col).and_then(|c| Some((c, map.rect(c)?))) {
                    if rect.top < at {
                        if let Some(spanning) = self.cell_mut(cell) {
                            spanning.attrs.rowspan += 1;
                        }
                        col = rect.right;
                        continue;
                    }
                }
            }
            cells.push(Cell::default());
            col += 1;
        }
        // A row inserted above the header takes over the header role.
        let header = at == 0 && self.has_header_row();
        if header {
            self.rows[0].header = false;
        }
        self.rows.insert(at, TableRow { header, cells });
        true
    }

    /// Inserts an empty column before grid column `at`.
    pub fn add_column(&mut self, at: usize) -> bool {
        let Ok(map) = TableMap::build(self) else { return false };
        if at > map.width {
            return false;
        }
        let mut inserts = Vec::with_capacity(map.height);
        for r in 0..map.height {
            if at > 0 && at < map.width {
                if let Some((cell, rect)) = map.cell_at(r, at).and_then(|c| Some((c, map.rect(c)?))) {
                    if rect.left < at {
                        if rect.top == r {
                            if let Some(spanning) = self.cell_mut(cell) {
                                spanning.attrs.colspan += 1;
                            }
                        }
                        continue;
                    }
                }
            }
            inserts.push((r, map.insert_index(r, at)));
        }
        for (r, index) in inserts {
            self.rows[r].cells.insert(index, Cell::default());
        }
        true
    }

    /// Removes grid row `row`. Refuses to remove the only row.
    pub fn remove_row(&mut self, row: usize) -> bool {
        let Ok(map) = TableMap::build(self) else { return false };
        if row >= map.height || map.height == 1 {
            return false;
        }
        let mut col = 0;
        while col < map.width {
            let Some((cell, rect)) = map.cell_at(row, col).and_then(|c| Some((c, map.rect(c)?))) else {
                return false;
            };
            if rect.top < row {
                if let Some(spanning) = self.cell_mut(cell) {
                    spanning.attrs.rowspan -= 1;
                }
            }
            col = rect.right;
        }

        let removed = self.rows.remove(row);
        let mut incoming = Vec::new();
        for (index, mut cell) in removed.cells.into_iter().enumerate() {
            let Some(rect) = map.rect(CellRef { row, index }) else { continue };
            if rect.bottom > row + 1 {
                cell.attrs.rowspan -= 1;
                incoming.push((rect.left, cell));
            }
        }
        if !incoming.is_empty() {
            let next = &mut self.rows[row];
            let existing = std::mem::take(&mut next.cells)
                .into_iter()
                .enumerate()
                .filter_map(|(index, cell)| Some((map.rect(CellRef { row: row + 1, index })?.left, cell)));
            let mut merged: Vec<(usize, Cell)> = existing.chain(incoming).collect();
            merged.sort_by_key(|(left, _)| *left);
            next.cells = merged.into_iter().map(|(_, cell)| cell).collect();
        }
        true
    }

    /// Removes grid column `col`. Refuses to remove the only column.
    pub fn remove_column(&mut self, col: usize) -> bool {
        let Ok(map) = TableMap::build(self) else { return false };
        if col >= map.width || map.width == 1 {
            return false;
        }
        let mut removals = Vec::new();
        for r in 0..map.height {
            let Some((cell, rect)) = map.cell_at(r, col).and_then(|c| Some((c, map.rect(c)?))) else {
                return false;
            };
            if rect.top != r {
                continue;
            }
            if rect.width() > 1 {
                if let Some(spanning) = self.cell_mut(cell) {
                    spanning.attrs.colspan -= 1;
                }
            } else {
                removals.push(cell);
            }
        }
        for cell in removals {
            self.rows[cell.row].cells.remove(cell.index);
        }
        true
    }

    /// Merges every cell in `rect` into its top-left cell. Declines unless the
    /// region holds at least two cells and no cell crosses its edge.
    pub fn merge(&mut self, rect: Rect) -> bool {
        let Ok(map) = TableMap::build(self) else { return false };
        if rect.width() == 0 || rect.height() == 0 || !map.full().contains(&rect) {
            return false;
        }
        let cells = map.cells_in(rect);
        if cells.len() < 2 {
            return false;
        }
        if cells.iter().any(|c| map.rect(*c).map_or(true, |r| !rect.contains(&r))) {
            return false;
        }

        let mut content: Vec<Block> = Vec::new();
        for cell in cells.iter().filter_map(|c| self.cell(*c)) {
            if !cell.is_empty() {
                content.extend(cell.blocks.iter().cloned());
            }
        }
        if content.is_empty() {
            content.push(Block::empty_paragraph());
        }

        let target = cells[0];
        for cell in cells[1..].iter().rev() {
            self.rows[cell.row].cells.remove(cell.index);
        }
        let Some(survivor) = self.cell_mut(target) else { return false };
        survivor.blocks = content;
        survivor.attrs.colspan = rect.width() as u32;
        survivor.attrs.rowspan = rect.height() as u32;
        true
    }

    /// Splits a spanning cell back into 1×1 cells; the content stays in the
    /// top-left one.
    pub fn split(&mut self, cell: CellRef) -> bool {
        let Ok(map) = TableMap::build(self) else { return false };
        let Some(rect) = map.rect(cell) else { return false };
        if rect.width() == 1 && rect.height() == 1 {
            return false;
        }
        let Some(origin) = self.cell_mut(cell) else { return false };
        let attrs: CellAttrs = origin.attrs.unspanned();
        origin.attrs.colspan = 1;
        origin.attrs.rowspan = 1;

        for r in rect.top..rect.bottom {
            let (index, count) = if r == rect.top {
                (cell.index + 1, rect.width() - 1)
            } else {
                (map.insert_index(r, rect.left), rect.width())
            };
            for _ in 0..count {
                self.rows[r].cells.insert(index, Cell::with_attrs(attrs.clone()));
            }
        }
        true
    }

    /// Applies `f` to every cell touching `rect`.
    pub fn update_cells(&mut self, rect: Rect, mut f: impl FnMut(&mut CellAttrs)) -> bool {
        let Ok(map) = TableMap::build(self) else { return false };
        let cells = map.cells_in(rect);
        for cell in &cells {
            if let Some(cell) = self.cell_mut(*cell) {
                f(&mut cell.attrs);
            }
        }
        !cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::BorderStyle;

    fn text_table(rows: usize, cols: usize) -> Table {
        let mut table = Table::new(rows, cols, false);
        for (r, row) in table.rows.iter_mut().enumerate() {
            for (c, cell) in row.cells.iter_mut().enumerate() {
                cell.blocks = vec![Block::paragraph(format!("{r}{c}"))];
            }
        }
        table
    }

    fn texts(table: &Table) -> Vec<Vec<String>> {
        table
            .rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.blocks.iter().map(Block::plain_text).collect::<Vec<_>>().join("|")).collect())
            .collect()
    }

    fn rect(top: usize, left: usize, bottom: usize, right: usize) -> Rect {
        Rect { top, left, bottom, right }
    }

    #[test]
    fn map_resolves_spanning_cells() {
        let mut table = text_table(3, 3);
        assert!(table.merge(rect(0, 0, 2, 2)));
        let map = TableMap::build(&table).unwrap();
        assert_eq!((map.width, map.height), (3, 3));
        assert_eq!(map.cell_at(1, 1), Some(CellRef { row: 0, index: 0 }));
        assert_eq!(map.cell_at(1, 2), Some(CellRef { row: 1, index: 0 }));
        assert_eq!(map.insert_index(1, 2), 0);
        assert_eq!(map.rect(CellRef { row: 0, index: 0 }), Some(rect(0, 0, 2, 2)));
    }

    #[test]
    fn merge_concatenates_content_in_reading_order() {
        let mut table = text_table(3, 3);
        assert!(table.merge(rect(0, 0, 2, 2)));
        let first = &table.rows[0].cells[0];
        assert_eq!((first.attrs.colspan, first.attrs.rowspan), (2, 2));
        let content: Vec<String> = first.blocks.iter().map(Block::plain_text).collect();
        assert_eq!(content, vec!["00", "01", "10", "11"]);
        assert_eq!(texts(&table)[2], vec!["20", "21", "22"]);
    }

    #[test]
    fn merge_skips_empty_cells() {
        let mut table = Table::new(1, 3, false);
        table.rows[0].cells[1].blocks = vec![Block::paragraph("mid")];
        assert!(table.merge(rect(0, 0, 1, 3)));
        assert_eq!(table.rows[0].cells[0].blocks, vec![Block::paragraph("mid")]);

        let mut blank = Table::new(2, 1, false);
        assert!(blank.merge(rect(0, 0, 2, 1)));
        assert!(blank.rows[0].cells[0].is_empty());
        assert!(blank.rows[1].cells.is_empty());
    }

    #[test]
    fn merge_declines_regions_cutting_through_cells() {
        let mut table = text_table(3, 3);
        assert!(table.merge(rect(0, 0, 2, 2)));
        let before = table.clone();
        assert!(!table.merge(rect(1, 1, 3, 3)));
        assert!(!table.merge(rect(0, 0, 1, 1)));
        assert!(!table.merge(rect(0, 0, 4, 1)));
        assert_eq!(table, before);
    }

    #[test]
    fn split_restores_grid_with_empty_cells() {
        let mut table = text_table(2, 3);
        assert!(table.merge(rect(0, 0, 1, 2)));
        assert!(table.split(CellRef { row: 0, index: 0 }));
        assert_eq!(texts(&table)[0], vec!["00|01", "", "02"]);
        assert!(TableMap::build(&table).is_ok());
        assert!(!table.split(CellRef { row: 0, index: 0 }));
    }

    #[test]
    fn split_fills_rows_below_and_copies_attributes() {
        let mut table = text_table(3, 3);
        assert!(table.merge(rect(0, 1, 2, 3)));
        table.rows[0].cells[1].attrs.border = BorderStyle::None;
        assert!(table.split(CellRef { row: 0, index: 1 }));
        let map = TableMap::build(&table).unwrap();
        assert_eq!((map.width, map.height), (3, 3));
        assert_eq!(table.rows[1].cells.len(), 3);
        assert_eq!(table.rows[1].cells[2].attrs.border, BorderStyle::None);
        assert_eq!(texts(&table)[1], vec!["10", "", ""]);
    }

    #[test]
    fn add_column_grows_cells_spanning_the_line() {
        let mut table = text_table(2, 3);
        assert!(table.merge(rect(0, 0, 1, 2)));
        assert!(table.add_column(1));
        let map = TableMap::build(&table).unwrap();
        assert_eq!(map.width, 4);
        assert_eq!(table.rows[0].cells[0].attrs.colspan, 3);
        assert_eq!(texts(&table)[1], vec!["10", "", "11", "12"]);
    }

    #[test]
    fn add_row_grows_cells_spanning_the_line() {
        let mut table = text_table(3, 2);
        assert!(table.merge(rect(0, 0, 2, 1)));
        assert!(table.add_row(1));
        assert_eq!(table.rows[0].cells[0].attrs.rowspan, 3);
        assert_eq!(table.rows[1].cells.len(), 1);
        assert!(TableMap::build(&table).is_ok());
    }

    #[test]
    fn row_above_header_takes_header_role() {
        let mut table = Table::new(2, 2, true);
        assert!(table.add_row(0));
        assert!(table.rows[0].header);
        assert!(!table.rows[1].header);
    }

    #[test]
    fn remove_row_moves_spanning_cell_down() {
        let mut table = text_table(3, 2);
        assert!(table.merge(rect(0, 0, 2, 1)));
        assert!(table.remove_row(0));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(texts(&table)[0], vec!["00|10", "11"]);
        assert_eq!(table.rows[0].cells[0].attrs.rowspan, 1);
        assert!(TableMap::build(&table).is_ok());
    }

    #[test]
    fn remove_row_shrinks_cells_from_above() {
        let mut table = text_table(3, 2);
        assert!(table.merge(rect(0, 0, 2, 1)));
        assert!(table.remove_row(1));
        assert_eq!(table.rows[0].cells[0].attrs.rowspan, 1);
        assert_eq!(texts(&table), vec![vec!["00|10", "01"], vec!["20", "21"]]);
    }

    #[test]
    fn remove_column_shrinks_or_drops_cells() {
        let mut table = text_table(2, 3);
        assert!(table.merge(rect(0, 0, 1, 2)));
        assert!(table.remove_column(1));
        assert_eq!(table.rows[0].cells[0].attrs.colspan, 1);
        assert_eq!(texts(&table), vec![vec!["00|01", "02"], vec!["10", "12"]]);
        assert!(!Table::new(2, 1, false).remove_column(0));
    }

    #[test]
    fn normalize_pads_ragged_rows() {
        let mut table = text_table(2, 3);
        table.rows[1].cells.truncate(1);
        table.rows[0].cells[0].attrs.rowspan = 5;
        table.normalize();
        assert_eq!(table.rows[0].cells[0].attrs.rowspan, 2);
        let map = TableMap::build(&table).unwrap();
        assert_eq!((map.width, map.height), (3, 2));
    }

    #[test]
    fn build_reports_holes() {
        let mut table = text_table(2, 2);
        table.rows[1].cells.pop();
        assert_eq!(TableMap::build(&table).unwrap_err(), GridError::Hole { row: 1, col: 1 });
    }
}
