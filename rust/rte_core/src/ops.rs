//! Commands/operations for editing.
//!
//! Every operation edits the document in place and returns the selection
//! that follows the edit, or `None` when it does not apply to the given
//! selection. Callers run them against a scratch copy so a `None` never
//! leaves partial edits behind.

use serde::{Deserialize, Serialize};

use crate::doc::{Ancestor, Block, Color, ContainerKind, Doc, ListItem, MarkKind, Marks, Table};
use crate::inline;
use crate::selection::{Position, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockType {
    Paragraph,
    Heading { level: u8 },
    BulletList,
    OrderedList,
    Blockquote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Ordered,
}

impl ListKind {
    fn of(kind: ContainerKind) -> Option<ListKind> {
        match kind {
            ContainerKind::BulletList => Some(ListKind::Bullet),
            ContainerKind::OrderedList => Some(ListKind::Ordered),
            _ => None,
        }
    }

    fn block(self, items: Vec<ListItem>) -> Block {
        match self {
            ListKind::Bullet => Block::BulletList { items },
            ListKind::Ordered => Block::OrderedList { items },
        }
    }
}

fn into_list(block: Block) -> Result<(ListKind, Vec<ListItem>), Block> {
    match block {
        Block::BulletList { items } => Ok((ListKind::Bullet, items)),
        Block::OrderedList { items } => Ok((ListKind::Ordered, items)),
        other => Err(other),
    }
}

/// Union-wins toggle: the mark is set across the range unless every
/// character already carries it, in which case it is removed everywhere.
pub fn toggle_mark(doc: &mut Doc, sel: &Selection, kind: MarkKind) -> Option<Selection> {
    let segments = sel.segments(doc);
    if segments.is_empty() {
        return None;
    }
    let uniform = segments.iter().all(|s| {
        doc.block(&s.path)
            .and_then(Block::runs)
            .is_some_and(|runs| inline::all_match(runs, s.start, s.end, |m| m.has(kind)))
    });
    for s in &segments {
        let runs = doc.block_mut(&s.path)?.runs_mut()?;
        inline::update_marks(runs, s.start, s.end, |m| m.set(kind, !uniform));
    }
    Some(sel.clone())
}

pub fn set_text_color(doc: &mut Doc, sel: &Selection, color: Option<&Color>) -> Option<Selection> {
    let segments = sel.segments(doc);
    if segments.is_empty() {
        return None;
    }
    for s in &segments {
        let runs = doc.block_mut(&s.path)?.runs_mut()?;
        inline::update_marks(runs, s.start, s.end, |m| m.color = color.cloned());
    }
    Some(sel.clone())
}

pub fn set_block_type(doc: &mut Doc, sel: &Selection, ty: BlockType) -> Option<Selection> {
    match ty {
        BlockType::Paragraph | BlockType::Heading { .. } => set_textblocks(doc, sel, ty),
        BlockType::BulletList | BlockType::OrderedList => {
            let kind = if ty == BlockType::BulletList { ListKind::Bullet } else { ListKind::Ordered };
            match innermost_common(doc, sel) {
                Some(a) => match ListKind::of(a.kind) {
                    Some(current) if current == kind => None,
                    Some(_) => convert_list(doc, sel, &a.path, kind),
                    None => wrap(doc, sel, Some(kind)),
                },
                None => wrap(doc, sel, Some(kind)),
            }
        }
        BlockType::Blockquote => match innermost_common(doc, sel) {
            Some(a) if a.kind == ContainerKind::Blockquote => None,
            _ => wrap(doc, sel, None),
        },
    }
}

/// Toolbar semantics: an already active type is switched back off.
pub fn toggle_block_type(doc: &mut Doc, sel: &Selection, ty: BlockType) -> Option<Selection> {
    match ty {
        BlockType::Paragraph => set_textblocks(doc, sel, ty),
        BlockType::Heading { level } => {
            let active = textblock_paths(doc, sel)
                .iter()
                .all(|p| matches!(doc.block(p), Some(Block::Heading { level: l, .. }) if *l == level));
            let target = if active { BlockType::Paragraph } else { ty };
            set_textblocks(doc, sel, target)
        }
        BlockType::BulletList | BlockType::OrderedList => {
            let kind = if ty == BlockType::BulletList { ListKind::Bullet } else { ListKind::Ordered };
            match innermost_common(doc, sel) {
                Some(a) => match ListKind::of(a.kind) {
                    Some(current) if current == kind => lift_items(doc, sel, &a),
                    Some(_) => convert_list(doc, sel, &a.path, kind),
                    None => wrap(doc, sel, Some(kind)),
                },
                None => wrap(doc, sel, Some(kind)),
            }
        }
        BlockType::Blockquote => match innermost_common(doc, sel) {
            Some(a) if a.kind == ContainerKind::Blockquote => unwrap_blockquote(doc, sel, &a.path),
            _ => wrap(doc, sel, None),
        },
    }
}

/// Whether `ty` describes the blocks under the selection head.
pub fn is_block_type_active(doc: &Doc, sel: &Selection, ty: BlockType) -> bool {
    let Some(head) = head_path(sel) else { return false };
    match ty {
        BlockType::Paragraph => matches!(doc.block(&head), Some(Block::Paragraph { .. })),
        BlockType::Heading { level } => matches!(doc.block(&head), Some(Block::Heading { level: l, .. }) if *l == level),
        BlockType::BulletList => doc.ancestors(&head).iter().any(|a| a.kind == ContainerKind::BulletList),
        BlockType::OrderedList => doc.ancestors(&head).iter().any(|a| a.kind == ContainerKind::OrderedList),
        BlockType::Blockquote => doc.ancestors(&head).iter().any(|a| a.kind == ContainerKind::Blockquote),
    }
}

fn head_path(sel: &Selection) -> Option<Vec<usize>> {
    match sel {
        Selection::Text { head, .. } => Some(head.path.clone()),
        Selection::Cells { .. } => None,
    }
}

fn textblock_paths(doc: &Doc, sel: &Selection) -> Vec<Vec<usize>> {
    sel.leaves(doc).into_iter().filter(|p| doc.block(p).is_some_and(Block::is_textblock)).collect()
}

fn set_textblocks(doc: &mut Doc, sel: &Selection, ty: BlockType) -> Option<Selection> {
    if let BlockType::Heading { level } = ty {
        if !(1..=6).contains(&level) {
            return None;
        }
    }
    let paths = textblock_paths(doc, sel);
    if paths.is_empty() {
        return None;
    }
    for path in paths {
        let block = doc.block_mut(&path)?;
        let runs = block.runs_mut().map(std::mem::take).unwrap_or_default();
        *block = match ty {
            BlockType::Heading { level } => Block::Heading { level, runs },
            _ => Block::Paragraph { runs },
        };
    }
    Some(sel.clone())
}

/// Deepest container that encloses both ends of the selection.
fn innermost_common(doc: &Doc, sel: &Selection) -> Option<Ancestor> {
    let leaves = sel.leaves(doc);
    let first = doc.ancestors(leaves.first()?);
    let last = doc.ancestors(leaves.last()?);
    first.into_iter().zip(last).take_while(|(a, b)| a == b).map(|(a, _)| a).last()
}

/// Container path and sibling index range holding both leaves. A range that
/// reaches into a table from outside its cell has no block range.
fn block_range(doc: &Doc, first: &[usize], last: &[usize]) -> Option<(Vec<usize>, usize, usize)> {
    let mut depths = vec![0];
    for a in doc.ancestors(first) {
        depths.push(match a.kind {
            ContainerKind::Blockquote => a.path.len(),
            ContainerKind::BulletList | ContainerKind::OrderedList => a.path.len() + 1,
            ContainerKind::Table => a.path.len() + 2,
        });
    }
    let floor = [first, last]
        .into_iter()
        .flat_map(|leaf| doc.ancestors(leaf))
        .filter(|a| a.kind == ContainerKind::Table)
        .map(|a| a.path.len() + 2)
        .max()
        .unwrap_or(0);
    depths.into_iter().rev().filter(|&d| d >= floor).find_map(|d| {
        (first.len() > d && last.len() > d && first[..d] == last[..d]).then(|| (first[..d].to_vec(), first[d], last[d]))
    })
}

/// Wraps the selected sibling blocks in a list (one item per block) or, when
/// `list` is `None`, in a blockquote.
fn wrap(doc: &mut Doc, sel: &Selection, list: Option<ListKind>) -> Option<Selection> {
    let bookmark = sel.bookmark(doc)?;
    let leaves = sel.leaves(doc);
    let (container, start, end) = block_range(doc, leaves.first()?, leaves.last()?)?;
    let seq = doc.sequence_mut(&container)?;
    let taken: Vec<Block> = seq.drain(start..=end).collect();
    let wrapped = match list {
        Some(kind) => kind.block(taken.into_iter().map(|b| ListItem { blocks: vec![b] }).collect()),
        None => Block::Blockquote { blocks: taken },
    };
    seq.insert(start, wrapped);
    Some(bookmark.resolve(doc))
}

fn convert_list(doc: &mut Doc, sel: &Selection, list: &[usize], kind: ListKind) -> Option<Selection> {
    let block = doc.block_mut(list)?;
    let (_, items) = into_list(std::mem::take(block)).ok()?;
    *block = kind.block(items);
    Some(sel.clone())
}

/// Moves the selected items out of `list` into its parent sequence,
/// splitting the list around them.
fn lift_items(doc: &mut Doc, sel: &Selection, list: &Ancestor) -> Option<Selection> {
    let bookmark = sel.bookmark(doc)?;
    let leaves = sel.leaves(doc);
    let first = list.child_index(leaves.first()?)?;
    let last = list.child_index(leaves.last()?)?;
    let (&index, parent) = list.path.split_last()?;
    let seq = doc.sequence_mut(parent)?;
    let (kind, mut items) = into_list(seq.remove(index)).ok()?;

    let after = items.split_off(last + 1);
    let lifted = items.split_off(first);
    let mut replacement = Vec::new();
    if !items.is_empty() {
        replacement.push(kind.block(items));
    }
    replacement.extend(lifted.into_iter().flat_map(|item| item.blocks));
    if !after.is_empty() {
        replacement.push(kind.block(after));
    }
    seq.splice(index..index, replacement);
    Some(bookmark.resolve(doc))
}

fn unwrap_blockquote(doc: &mut Doc, sel: &Selection, quote: &[usize]) -> Option<Selection> {
    let bookmark = sel.bookmark(doc)?;
    let (&index, parent) = quote.split_last()?;
    let seq = doc.sequence_mut(parent)?;
    let Block::Blockquote { blocks } = seq.remove(index) else { return None };
    seq.splice(index..index, blocks);
    Some(bookmark.resolve(doc))
}

/// Inserts `block` after the block holding the selection head, replacing
/// that block when it is an empty paragraph. Returns the new block's path.
fn insert_block(doc: &mut Doc, sel: &Selection, block: Block) -> Option<Vec<usize>> {
    let mut path = match sel {
        Selection::Text { head, .. } => head.path.clone(),
        Selection::Cells { table, .. } => table.clone(),
    };
    let (&index, parent) = path.split_last()?;
    let seq = doc.sequence_mut(parent)?;
    if seq.get(index)?.is_empty_paragraph() {
        seq[index] = block;
    } else {
        seq.insert(index + 1, block);
        *path.last_mut()? += 1;
    }
    Some(path)
}

pub fn insert_image(doc: &mut Doc, sel: &Selection, src: &str, alt: Option<&str>) -> Option<Selection> {
    if src.trim().is_empty() {
        return None;
    }
    let image = Block::Image { src: src.trim().to_string(), alt: alt.map(str::to_string) };
    let path = insert_block(doc, sel, image)?;
    let leaves = doc.leaf_paths();
    let next = leaves.iter().position(|p| *p == path).and_then(|i| leaves.get(i + 1));
    match next {
        Some(next) if next.len() == path.len() && next[..path.len() - 1] == path[..path.len() - 1] => {
            Some(Selection::cursor(next.clone(), 0))
        }
        _ => Some(Selection::cursor(path, 0)),
    }
}

/// Inserts a `rows` × `cols` table. Tables are not nested.
pub fn insert_table(doc: &mut Doc, sel: &Selection, rows: usize, cols: usize, with_header_row: bool) -> Option<Selection> {
    if rows == 0 || cols == 0 || sel.table_target(doc).is_some() {
        return None;
    }
    let path = insert_block(doc, sel, Block::Table(Table::new(rows, cols, with_header_row)))?;
    Some(Selection::cursor(doc.first_leaf_under(&path)?, 0))
}

/// Replaces the selected text of a single textblock with `text`.
pub fn insert_text(doc: &mut Doc, sel: &Selection, text: &str, stored: Option<&Marks>) -> Option<Selection> {
    if text.is_empty() {
        return None;
    }
    let (from, to) = sel.bounds()?;
    if from.path != to.path {
        return None;
    }
    let runs = doc.block_mut(&from.path)?.runs_mut()?;
    let marks = stored.cloned().unwrap_or_else(|| inline::marks_at(runs, from.offset));
    inline::delete_range(runs, from.offset, to.offset);
    inline::insert_text(runs, from.offset, text, marks);
    Some(Selection::cursor(from.path.clone(), from.offset + text.chars().count()))
}

/// Deletes the selected text, or the character before a collapsed cursor.
/// Returns `None` at the start of a block; see [`join_backward`].
pub fn delete_backward(doc: &mut Doc, sel: &Selection) -> Option<Selection> {
    let (from, to) = sel.bounds()?;
    if from.path != to.path {
        return None;
    }
    let start = if from == to { from.offset.checked_sub(1)? } else { from.offset };
    let runs = doc.block_mut(&from.path)?.runs_mut()?;
    inline::delete_range(runs, start, to.offset);
    Some(Selection::cursor(from.path.clone(), start))
}

/// Joins the textblock at the cursor onto the previous sibling textblock.
pub fn join_backward(doc: &mut Doc, sel: &Selection) -> Option<Selection> {
    let (from, to) = sel.bounds()?;
    if from != to || from.offset != 0 {
        return None;
    }
    let (&index, parent) = from.path.split_last()?;
    let prev_index = index.checked_sub(1)?;
    let seq = doc.sequence_mut(parent)?;
    if !seq.get(prev_index)?.is_textblock() || !seq.get(index)?.is_textblock() {
        return None;
    }
    let mut current = seq.remove(index);
    let tail = current.runs_mut().map(std::mem::take).unwrap_or_default();
    let prev = seq.get_mut(prev_index)?;
    let offset = prev.text_len();
    let runs = prev.runs_mut()?;
    runs.extend(tail);
    inline::normalize_runs(runs);
    let mut path = parent.to_vec();
    path.push(prev_index);
    Some(Selection::cursor(path, offset))
}

/// Splits the textblock at the cursor (Enter). Inside the last block of a
/// list item the new block starts a new item.
pub fn split_block(doc: &mut Doc, sel: &Selection) -> Option<Selection> {
    let (from, to) = sel.bounds()?;
    if from.path != to.path {
        return None;
    }
    let path = from.path.clone();
    let (&index, parent) = path.split_last()?;
    let block = doc.block_mut(&path)?;
    let level = match block {
        Block::Heading { level, .. } => Some(*level),
        _ => None,
    };
    let is_image = matches!(block, Block::Image { .. });
    let new_block = match block.runs_mut() {
        Some(runs) => {
            inline::delete_range(runs, from.offset, to.offset);
            let tail = inline::split_off(runs, from.offset);
            match level {
                Some(level) if !tail.is_empty() => Block::Heading { level, runs: tail },
                _ => Block::Paragraph { runs: tail },
            }
        }
        None if is_image => Block::empty_paragraph(),
        None => return None,
    };

    let in_list_item = parent.len() >= 2
        && matches!(doc.block(&parent[..parent.len() - 1]), Some(Block::BulletList { .. } | Block::OrderedList { .. }));
    let last_in_item = doc.sequence(parent).is_some_and(|seq| index + 1 == seq.len());
    if in_list_item && last_in_item {
        let (&item, list) = parent.split_last()?;
        let (Block::BulletList { items } | Block::OrderedList { items }) = doc.block_mut(list)? else { return None };
        items.insert(item + 1, ListItem { blocks: vec![new_block] });
        let mut new_path = list.to_vec();
        new_path.extend([item + 1, 0]);
        return Some(Selection::cursor(new_path, 0));
    }

    doc.sequence_mut(parent)?.insert(index + 1, new_block);
    let mut new_path = parent.to_vec();
    new_path.push(index + 1);
    Some(Selection::cursor(new_path, 0))
}

/// Leaf nearest to where the block at `path` used to be.
pub(crate) fn nearest_leaf(doc: &Doc, path: &[usize]) -> Selection {
    let leaves = doc.leaf_paths();
    let found = leaves.iter().find(|p| p.as_slice() >= path).or_else(|| leaves.last());
    match found {
        Some(p) => Selection::cursor(p.clone(), 0),
        None => Selection::start_of(doc),
    }
}

pub(crate) fn position_marks(doc: &Doc, pos: &Position) -> Marks {
    doc.block(&pos.path).and_then(Block::runs).map(|r| inline::marks_at(r, pos.offset)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::InlineRun;

    fn range(a: (&[usize], usize), b: (&[usize], usize)) -> Selection {
        Selection::range(Position::new(a.0.to_vec(), a.1), Position::new(b.0.to_vec(), b.1))
    }

    fn bold() -> Marks {
        Marks { bold: true, ..Marks::default() }
    }

    #[test]
    fn toggle_mark_union_wins_then_removes() {
        let mut doc = Doc::new(vec![Block::Paragraph {
            runs: vec![InlineRun::styled("bold", bold()), InlineRun::plain(" plain")],
        }]);
        let sel = range((&[0], 0), (&[0], 10));
        toggle_mark(&mut doc, &sel, MarkKind::Bold).unwrap();
        assert_eq!(doc.blocks[0].runs().unwrap(), &vec![InlineRun::styled("bold plain", bold())]);
        toggle_mark(&mut doc, &sel, MarkKind::Bold).unwrap();
        assert_eq!(doc.blocks[0].runs().unwrap(), &vec![InlineRun::plain("bold plain")]);
    }

    #[test]
    fn toggle_mark_spans_blocks() {
        let mut doc = Doc::new(vec![Block::paragraph("abc"), Block::paragraph("def")]);
        let sel = range((&[0], 1), (&[1], 2));
        toggle_mark(&mut doc, &sel, MarkKind::Italic).unwrap();
        let italic = Marks { italic: true, ..Marks::default() };
        assert_eq!(doc.blocks[0].runs().unwrap(), &vec![InlineRun::plain("a"), InlineRun::styled("bc", italic.clone())]);
        assert_eq!(doc.blocks[1].runs().unwrap(), &vec![InlineRun::styled("de", italic), InlineRun::plain("f")]);
        assert!(toggle_mark(&mut doc, &Selection::cursor(vec![0], 1), MarkKind::Bold).is_none());
    }

    #[test]
    fn color_is_set_and_cleared() {
        let mut doc = Doc::new(vec![Block::paragraph("abc")]);
        let sel = range((&[0], 0), (&[0], 3));
        let red = Color::parse("#dc2626");
        set_text_color(&mut doc, &sel, red.as_ref()).unwrap();
        assert_eq!(doc.blocks[0].runs().unwrap()[0].marks.color, red);
        set_text_color(&mut doc, &sel, None).unwrap();
        assert_eq!(doc, Doc::new(vec![Block::paragraph("abc")]));
    }

    #[test]
    fn heading_toggle_switches_back_to_paragraph() {
        let mut doc = Doc::new(vec![Block::paragraph("title")]);
        let sel = Selection::cursor(vec![0], 2);
        toggle_block_type(&mut doc, &sel, BlockType::Heading { level: 2 }).unwrap();
        assert_eq!(doc.blocks[0], Block::heading(2, "title"));
        assert!(is_block_type_active(&doc, &sel, BlockType::Heading { level: 2 }));
        toggle_block_type(&mut doc, &sel, BlockType::Heading { level: 2 }).unwrap();
        assert_eq!(doc.blocks[0], Block::paragraph("title"));
        assert!(set_block_type(&mut doc, &sel, BlockType::Heading { level: 9 }).is_none());
    }

    #[test]
    fn wrap_and_lift_bullet_list() {
        let mut doc = Doc::new(vec![Block::paragraph("a"), Block::paragraph("b"), Block::paragraph("c")]);
        let sel = range((&[0], 0), (&[1], 1));
        let sel = toggle_block_type(&mut doc, &sel, BlockType::BulletList).unwrap();
        assert_eq!(
            doc.blocks[0],
            Block::BulletList {
                items: vec![ListItem { blocks: vec![Block::paragraph("a")] }, ListItem { blocks: vec![Block::paragraph("b")] }]
            }
        );
        assert_eq!(sel, range((&[0, 0, 0], 0), (&[0, 1, 0], 1)));

        let only_b = Selection::cursor(vec![0, 1, 0], 0);
        let lifted = toggle_block_type(&mut doc, &only_b, BlockType::BulletList).unwrap();
        assert_eq!(doc.blocks.len(), 3);
        assert_eq!(doc.blocks[1], Block::paragraph("b"));
        assert_eq!(lifted, Selection::cursor(vec![1], 0));
    }

    #[test]
    fn wrapping_declines_across_table_cells() {
        let mut table = Table::new(1, 2, false);
        table.rows[0].cells[0].blocks = vec![Block::paragraph("left")];
        table.rows[0].cells[1].blocks = vec![Block::paragraph("right")];
        let mut doc = Doc::new(vec![Block::paragraph("before"), Block::Table(table)]);
        let before = doc.clone();
        let across = range((&[1, 0, 0, 0], 0), (&[1, 0, 1, 0], 5));
        assert!(toggle_block_type(&mut doc, &across, BlockType::BulletList).is_none());
        assert!(set_block_type(&mut doc, &across, BlockType::Blockquote).is_none());
        let into_table = range((&[0], 0), (&[1, 0, 0, 0], 2));
        assert!(toggle_block_type(&mut doc, &into_table, BlockType::OrderedList).is_none());
        assert_eq!(doc, before);

        let inside = Selection::cursor(vec![1, 0, 1, 0], 1);
        toggle_block_type(&mut doc, &inside, BlockType::BulletList).unwrap();
        let Block::Table(table) = &doc.blocks[1] else { panic!("table moved") };
        assert!(matches!(table.rows[0].cells[1].blocks[0], Block::BulletList { .. }));
    }

    #[test]
    fn list_kind_is_converted_in_place() {
        let mut doc = Doc::new(vec![Block::paragraph("a")]);
        let sel = set_block_type(&mut doc, &Selection::cursor(vec![0], 0), BlockType::BulletList).unwrap();
        let sel = set_block_type(&mut doc, &sel, BlockType::OrderedList).unwrap();
        assert!(matches!(doc.blocks[0], Block::OrderedList { .. }));
        assert!(set_block_type(&mut doc, &sel, BlockType::OrderedList).is_none());
    }

    #[test]
    fn blockquote_wraps_and_unwraps() {
        let mut doc = Doc::new(vec![Block::paragraph("q")]);
        let sel = toggle_block_type(&mut doc, &Selection::cursor(vec![0], 1), BlockType::Blockquote).unwrap();
        assert_eq!(doc.blocks[0], Block::Blockquote { blocks: vec![Block::paragraph("q")] });
        assert_eq!(sel, Selection::cursor(vec![0, 0], 1));
        let sel = toggle_block_type(&mut doc, &sel, BlockType::Blockquote).unwrap();
        assert_eq!(doc.blocks[0], Block::paragraph("q"));
        assert_eq!(sel, Selection::cursor(vec![0], 1));
    }

    #[test]
    fn table_replaces_empty_paragraph_and_refuses_nesting() {
        let mut doc = Doc::default();
        let sel = insert_table(&mut doc, &Selection::cursor(vec![0], 0), 2, 3, true).unwrap();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(sel, Selection::cursor(vec![0, 0, 0, 0], 0));
        assert!(insert_table(&mut doc, &sel, 2, 2, false).is_none());
        assert!(insert_table(&mut Doc::default(), &Selection::default(), 0, 2, false).is_none());
    }

    #[test]
    fn image_goes_after_current_block() {
        let mut doc = Doc::new(vec![Block::paragraph("text"), Block::paragraph("next")]);
        let sel = insert_image(&mut doc, &Selection::cursor(vec![0], 4), "https://cdn/x.png", None).unwrap();
        assert_eq!(doc.blocks[1], Block::Image { src: "https://cdn/x.png".into(), alt: None });
        assert_eq!(sel, Selection::cursor(vec![2], 0));
        assert!(insert_image(&mut doc, &sel, "  ", None).is_none());
    }

    #[test]
    fn typing_inherits_marks_and_replaces_range() {
        let mut doc = Doc::new(vec![Block::Paragraph { runs: vec![InlineRun::styled("ab", bold()), InlineRun::plain("cd")] }]);
        let sel = insert_text(&mut doc, &Selection::cursor(vec![0], 2), "X", None).unwrap();
        assert_eq!(doc.blocks[0].runs().unwrap()[0], InlineRun::styled("abX", bold()));
        assert_eq!(sel, Selection::cursor(vec![0], 3));
        let sel = insert_text(&mut doc, &range((&[0], 3), (&[0], 5)), "y", Some(&Marks::default())).unwrap();
        assert_eq!(doc.blocks[0].plain_text(), "abXy");
        assert_eq!(sel, Selection::cursor(vec![0], 4));
    }

    #[test]
    fn backspace_deletes_then_joins() {
        let mut doc = Doc::new(vec![Block::paragraph("ab"), Block::paragraph("cd")]);
        let sel = delete_backward(&mut doc, &Selection::cursor(vec![1], 1)).unwrap();
        assert_eq!(doc.blocks[1], Block::paragraph("d"));
        assert!(delete_backward(&mut doc, &sel).is_none());
        let sel = join_backward(&mut doc, &sel).unwrap();
        assert_eq!(doc.blocks, vec![Block::paragraph("abd")]);
        assert_eq!(sel, Selection::cursor(vec![0], 2));
    }

    #[test]
    fn enter_splits_blocks_and_list_items() {
        let mut doc = Doc::new(vec![Block::heading(1, "Title")]);
        let sel = split_block(&mut doc, &Selection::cursor(vec![0], 5)).unwrap();
        assert_eq!(doc.blocks[1], Block::empty_paragraph());
        assert_eq!(sel, Selection::cursor(vec![1], 0));

        let mut doc = Doc::new(vec![Block::BulletList { items: vec![ListItem { blocks: vec![Block::paragraph("onetwo")] }] }]);
        let sel = split_block(&mut doc, &Selection::cursor(vec![0, 0, 0], 3)).unwrap();
        assert_eq!(sel, Selection::cursor(vec![0, 1, 0], 0));
        assert_eq!(doc.block(&[0, 1, 0]), Some(&Block::paragraph("two")));
    }
}
