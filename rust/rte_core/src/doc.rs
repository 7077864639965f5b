//! Document tree structures and helpers.
//!
//! Blocks are addressed by index paths. A path starts with an index into the
//! root sequence and continues through containers: a blockquote takes one
//! more index (child), a list takes two (item, child) and a table takes three
//! (row, cell, child).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inline::normalize_runs;
use crate::table::{GridError, TableMap};

/// Neutral border drawn around a cell whose border is not hidden.
pub const SOLID_BORDER: &str = "2px solid #d1d5db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    pub blocks: Vec<Block>,
}

impl Default for Doc {
    fn default() -> Self {
        Self { blocks: vec![Block::empty_paragraph()] }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    Paragraph {
        #[serde(default)]
        runs: Vec<InlineRun>,
    },
    Heading {
        level: u8,
        #[serde(default)]
        runs: Vec<InlineRun>,
    },
    BulletList { items: Vec<ListItem> },
    OrderedList { items: Vec<ListItem> },
    Blockquote { blocks: Vec<Block> },
    Table(Table),
    Image {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
}

impl Default for Block {
    fn default() -> Self {
        Block::empty_paragraph()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub blocks: Vec<Block>,
}

impl Default for ListItem {
    fn default() -> Self {
        Self { blocks: vec![Block::empty_paragraph()] }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineRun {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

impl InlineRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), marks: Marks::default() }
    }

    pub fn styled(text: impl Into<String>, marks: Marks) -> Self {
        Self { text: text.into(), marks }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strike: bool,
    /// Foreground text color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl Marks {
    pub fn has(&self, kind: MarkKind) -> bool {
        match kind {
            MarkKind::Bold => self.bold,
            MarkKind::Italic => self.italic,
            MarkKind::Strike => self.strike,
        }
    }

    pub fn set(&mut self, kind: MarkKind, on: bool) {
        match kind {
            MarkKind::Bold => self.bold = on,
            MarkKind::Italic => self.italic = on,
            MarkKind::Strike => self.strike = on,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    Bold,
    Italic,
    Strike,
}

/// A CSS color value that is safe to place inside an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color value: {0:?}")]
pub struct InvalidColor(pub String);

impl Color {
    /// Accepts hex (`#rgb`, `#rrggbb`, with optional alpha), named colors and
    /// functional notations such as `rgb(…)`.
    pub fn parse(raw: &str) -> Option<Color> {
        let value = raw.trim();
        if value.is_empty() || value.len() > 64 {
            return None;
        }
        let allowed = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' ' | '-'));
        if !allowed {
            return None;
        }
        if let Some(hex) = value.strip_prefix('#') {
            if !matches!(hex.len(), 3 | 4 | 6 | 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
        } else if !value.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        Some(Color(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Color {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value).ok_or(InvalidColor(value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Only the first row of a table may be a header row.
    #[serde(default)]
    pub header: bool,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub attrs: CellAttrs,
}

impl Default for Cell {
    fn default() -> Self {
        Self { blocks: vec![Block::empty_paragraph()], attrs: CellAttrs::default() }
    }
}

impl Cell {
    pub fn with_attrs(attrs: CellAttrs) -> Self {
        Self { blocks: vec![Block::empty_paragraph()], attrs }
    }

    /// True when the cell holds nothing but one empty paragraph.
    pub fn is_empty(&self) -> bool {
        matches!(self.blocks.as_slice(), [b] if b.is_empty_paragraph())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellAttrs {
    #[serde(default = "one")]
    pub colspan: u32,
    #[serde(default = "one")]
    pub rowspan: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
    #[serde(default)]
    pub border: BorderStyle,
}

fn one() -> u32 {
    1
}

impl Default for CellAttrs {
    fn default() -> Self {
        Self { colspan: 1, rowspan: 1, background: None, border: BorderStyle::Solid }
    }
}

impl CellAttrs {
    /// Attributes copied onto cells created next to this one.
    pub fn unspanned(&self) -> CellAttrs {
        CellAttrs { colspan: 1, rowspan: 1, ..self.clone() }
    }

    /// Inline style for the rendered cell.
    pub fn render_style(&self) -> String {
        let mut parts = Vec::new();
        if let Some(bg) = &self.background {
            parts.push(format!("background-color: {bg}"));
        }
        match self.border {
            BorderStyle::Solid => parts.push(format!("border: {SOLID_BORDER}")),
            BorderStyle::None => parts.push("border: none !important".to_string()),
        }
        parts.join("; ")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    Solid,
    /// Suppresses the border regardless of the table's own border.
    None,
}

impl BorderStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            BorderStyle::Solid => "solid",
            BorderStyle::None => "none",
        }
    }
}

impl Block {
    pub fn empty_paragraph() -> Self {
        Block::Paragraph { runs: Vec::new() }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Block::empty_paragraph();
        }
        Block::Paragraph { runs: vec![InlineRun::plain(text)] }
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        let mut runs = vec![InlineRun::plain(text)];
        normalize_runs(&mut runs);
        Block::Heading { level, runs }
    }

    pub fn is_textblock(&self) -> bool {
        matches!(self, Block::Paragraph { .. } | Block::Heading { .. })
    }

    /// Leaves are the blocks a cursor can rest in.
    pub fn is_leaf(&self) -> bool {
        self.is_textblock() || matches!(self, Block::Image { .. })
    }

    pub fn is_empty_paragraph(&self) -> bool {
        matches!(self, Block::Paragraph { runs } if runs.is_empty())
    }

    pub fn runs(&self) -> Option<&Vec<InlineRun>> {
        match self {
            Block::Paragraph { runs } | Block::Heading { runs, .. } => Some(runs),
            _ => None,
        }
    }

    pub fn runs_mut(&mut self) -> Option<&mut Vec<InlineRun>> {
        match self {
            Block::Paragraph { runs } | Block::Heading { runs, .. } => Some(runs),
            _ => None,
        }
    }

    /// Length in characters; zero for non-text leaves and containers.
    pub fn text_len(&self) -> usize {
        self.runs().map(|r| crate::inline::char_len(r)).unwrap_or(0)
    }

    pub fn plain_text(&self) -> String {
        match self {
            Block::Paragraph { runs } | Block::Heading { runs, .. } => {
                runs.iter().map(|r| r.text.as_str()).collect()
            }
            Block::BulletList { items } | Block::OrderedList { items } => items
                .iter()
                .flat_map(|i| i.blocks.iter())
                .map(Block::plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Blockquote { blocks } => {
                blocks.iter().map(Block::plain_text).collect::<Vec<_>>().join("\n")
            }
            Block::Table(t) => t
                .rows
                .iter()
                .flat_map(|r| r.cells.iter())
                .flat_map(|c| c.blocks.iter())
                .map(Block::plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Image { .. } => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Blockquote,
    BulletList,
    OrderedList,
    Table,
}

/// A container block on the way down to some path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    pub kind: ContainerKind,
    pub path: Vec<usize>,
}

impl Ancestor {
    /// Index of the list item or table row the descent went through.
    pub fn child_index(&self, path: &[usize]) -> Option<usize> {
        path.get(self.path.len()).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("document has no blocks")]
    EmptyDocument,
    #[error("container at {0:?} has no blocks")]
    EmptyContainer(Vec<usize>),
    #[error("list at {0:?} has no items")]
    EmptyList(Vec<usize>),
    #[error("runs at {0:?} are not normalized")]
    UnnormalizedRuns(Vec<usize>),
    #[error("heading at {path:?} has level {level}")]
    HeadingLevel { path: Vec<usize>, level: u8 },
    #[error("table at {0:?} has no rows")]
    EmptyTable(Vec<usize>),
    #[error("row {row} of table at {path:?} is marked header")]
    MisplacedHeader { path: Vec<usize>, row: usize },
    #[error("table at {path:?}: {source}")]
    Grid {
        path: Vec<usize>,
        #[source]
        source: GridError,
    },
}

impl Doc {
    pub fn new(blocks: Vec<Block>) -> Self {
        let mut doc = Doc { blocks };
        doc.normalize();
        doc
    }

    /// A single empty paragraph and nothing else.
    pub fn is_semantically_empty(&self) -> bool {
        matches!(self.blocks.as_slice(), [b] if b.is_empty_paragraph())
    }

    pub fn block(&self, path: &[usize]) -> Option<&Block> {
        let (&last, parent) = path.split_last()?;
        self.sequence(parent)?.get(last)
    }

    pub fn block_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        let (&last, parent) = path.split_last()?;
        self.sequence_mut(parent)?.get_mut(last)
    }

    /// The block sequence a container path points into.
    pub fn sequence(&self, container: &[usize]) -> Option<&Vec<Block>> {
        sequence_in(&self.blocks, container)
    }

    pub fn sequence_mut(&mut self, container: &[usize]) -> Option<&mut Vec<Block>> {
        sequence_in_mut(&mut self.blocks, container)
    }

    /// Container blocks enclosing the block at `path`, outermost first.
    pub fn ancestors(&self, path: &[usize]) -> Vec<Ancestor> {
        let mut out = Vec::new();
        let mut seq = &self.blocks;
        let mut i = 0;
        while i + 1 < path.len() {
            let Some(block) = seq.get(path[i]) else { break };
            let here = path[..=i].to_vec();
            match block {
                Block::Blockquote { blocks } => {
                    out.push(Ancestor { kind: ContainerKind::Blockquote, path: here });
                    seq = blocks;
                    i += 1;
                }
                Block::BulletList { items } | Block::OrderedList { items } => {
                    let Some(item) = path.get(i + 1).and_then(|k| items.get(*k)) else { break };
                    let kind = if matches!(block, Block::BulletList { .. }) {
                        ContainerKind::BulletList
                    } else {
                        ContainerKind::OrderedList
                    };
                    out.push(Ancestor { kind, path: here });
                    seq = &item.blocks;
                    i += 2;
                }
                Block::Table(table) => {
                    let cell = path
                        .get(i + 1)
                        .zip(path.get(i + 2))
                        .and_then(|(r, c)| table.rows.get(*r)?.cells.get(*c));
                    let Some(cell) = cell else { break };
                    out.push(Ancestor { kind: ContainerKind::Table, path: here });
                    seq = &cell.blocks;
                    i += 3;
                }
                _ => break,
            }
        }
        out
    }

    /// Paths of every leaf block in document order.
    pub fn leaf_paths(&self) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        collect_leaves(&self.blocks, &mut Vec::new(), &mut out);
        out
    }

    pub fn first_leaf(&self) -> Vec<usize> {
        self.leaf_paths().into_iter().next().unwrap_or_else(|| vec![0])
    }

    /// First leaf inside (or at) the block at `path`.
    pub fn first_leaf_under(&self, path: &[usize]) -> Option<Vec<usize>> {
        self.leaf_paths().into_iter().find(|p| p.starts_with(path))
    }

    pub fn normalize(&mut self) {
        normalize_blocks(&mut self.blocks);
    }

    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.blocks.is_empty() {
            return Err(InvariantViolation::EmptyDocument);
        }
        validate_blocks(&self.blocks, &mut Vec::new())
    }
}

fn sequence_in<'a>(blocks: &'a Vec<Block>, container: &[usize]) -> Option<&'a Vec<Block>> {
    let Some((&first, rest)) = container.split_first() else {
        return Some(blocks);
    };
    match blocks.get(first)? {
        Block::Blockquote { blocks } => sequence_in(blocks, rest),
        Block::BulletList { items } | Block::OrderedList { items } => {
            let (&item, rest) = rest.split_first()?;
            sequence_in(&items.get(item)?.blocks, rest)
        }
        Block::Table(table) => {
            let (&row, rest) = rest.split_first()?;
            let (&cell, rest) = rest.split_first()?;
            sequence_in(&table.rows.get(row)?.cells.get(cell)?.blocks, rest)
        }
        _ => None,
    }
}

fn sequence_in_mut<'a>(blocks: &'a mut Vec<Block>, container: &[usize]) -> Option<&'a mut Vec<Block>> {
    let Some((&first, rest)) = container.split_first() else {
        return Some(blocks);
    };
    match blocks.get_mut(first)? {
        Block::Blockquote { blocks } => sequence_in_mut(blocks, rest),
        Block::BulletList { items } | Block::OrderedList { items } => {
            let (&item, rest) = rest.split_first()?;
            sequence_in_mut(&mut items.get_mut(item)?.blocks, rest)
        }
        Block::Table(table) => {
            let (&row, rest) = rest.split_first()?;
            let (&cell, rest) = rest.split_first()?;
            sequence_in_mut(&mut table.rows.get_mut(row)?.cells.get_mut(cell)?.blocks, rest)
        }
        _ => None,
    }
}

fn collect_leaves(blocks: &[Block], prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (i, block) in blocks.iter().enumerate() {
        prefix.push(i);
        match block {
            Block::Paragraph { .. } | Block::Heading { .. } | Block::Image { .. } => out.push(prefix.clone()),
            Block::Blockquote { blocks } => collect_leaves(blocks, prefix, out),
            Block::BulletList { items } | Block::OrderedList { items } => {
                for (k, item) in items.iter().enumerate() {
                    prefix.push(k);
                    collect_leaves(&item.blocks, prefix, out);
                    prefix.pop();
                }
            }
            Block::Table(table) => {
                for (r, row) in table.rows.iter().enumerate() {
                    for (c, cell) in row.cells.iter().enumerate() {
                        prefix.extend([r, c]);
                        collect_leaves(&cell.blocks, prefix, out);
                        prefix.truncate(prefix.len() - 2);
                    }
                }
            }
        }
        prefix.pop();
    }
}

fn normalize_blocks(blocks: &mut Vec<Block>) {
    blocks.retain(|b| match b {
        Block::BulletList { items } | Block::OrderedList { items } => !items.is_empty(),
        Block::Table(t) => !t.rows.is_empty(),
        _ => true,
    });
    for block in blocks.iter_mut() {
        match block {
            Block::Paragraph { runs } | Block::Heading { runs, .. } => normalize_runs(runs),
            Block::Blockquote { blocks } => normalize_blocks(blocks),
            Block::BulletList { items } | Block::OrderedList { items } => {
                for item in items.iter_mut() {
                    normalize_blocks(&mut item.blocks);
                }
            }
            Block::Table(table) => {
                table.normalize();
                for cell in table.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    normalize_blocks(&mut cell.blocks);
                }
            }
            Block::Image { .. } => {}
        }
        if let Block::Heading { level, .. } = block {
            *level = (*level).clamp(1, 6);
        }
    }
    if blocks.is_empty() {
        blocks.push(Block::empty_paragraph());
    }
}

fn validate_blocks(blocks: &[Block], path: &mut Vec<usize>) -> Result<(), InvariantViolation> {
    if blocks.is_empty() {
        return Err(InvariantViolation::EmptyContainer(path.clone()));
    }
    for (i, block) in blocks.iter().enumerate() {
        path.push(i);
        match block {
            Block::Paragraph { runs } | Block::Heading { runs, .. } => {
                let mut normalized = runs.clone();
                normalize_runs(&mut normalized);
                if &normalized != runs {
                    return Err(InvariantViolation::UnnormalizedRuns(path.clone()));
                }
                if let Block::Heading { level, .. } = block {
                    if !(1..=6).contains(level) {
                        return Err(InvariantViolation::HeadingLevel { path: path.clone(), level: *level });
                    }
                }
            }
            Block::Blockquote { blocks } => validate_blocks(blocks, path)?,
            Block::BulletList { items } | Block::OrderedList { items } => {
                if items.is_empty() {
                    return Err(InvariantViolation::EmptyList(path.clone()));
                }
                for (k, item) in items.iter().enumerate() {
                    path.push(k);
                    validate_blocks(&item.blocks, path)?;
                    path.pop();
                }
            }
            Block::Table(table) => {
                if table.rows.is_empty() {
                    return Err(InvariantViolation::EmptyTable(path.clone()));
                }
                if let Some(row) = table.rows.iter().skip(1).position(|r| r.header) {
                    return Err(InvariantViolation::MisplacedHeader { path: path.clone(), row: row + 1 });
                }
                TableMap::build(table).map_err(|source| InvariantViolation::Grid { path: path.clone(), source })?;
                for (r, row) in table.rows.iter().enumerate() {
                    for (c, cell) in row.cells.iter().enumerate() {
                        path.extend([r, c]);
                        validate_blocks(&cell.blocks, path)?;
                        path.truncate(path.len() - 2);
                    }
                }
            }
            Block::Image { .. } => {}
        }
        path.pop();
    }
    Ok(())
}
