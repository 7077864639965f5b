//! HTML/JSON import/export.
//!
//! The HTML form is the one tiptap's starter kit and table extensions emit,
//! so stored documents stay readable by the web editor. Parsing is tolerant:
//! unknown wrappers are transparent, stray inline content becomes a
//! paragraph, images are lifted out of paragraphs and ragged tables are
//! padded. Only structurally broken markup is an error.

use thiserror::Error;

use crate::doc::{Block, BorderStyle, Cell, CellAttrs, Color, Doc, InlineRun, ListItem, Marks, Table, TableRow};
use crate::inline::normalize_runs;

pub fn to_html(doc: &Doc) -> String {
    let mut out = String::new();
    render_blocks(&doc.blocks, &mut out);
    out
}

fn render_blocks(blocks: &[Block], out: &mut String) {
    for block in blocks {
        render_block(block, out);
    }
}

fn render_block(block: &Block, out: &mut String) {
    match block {
        Block::Paragraph { runs } => {
            out.push_str("<p>");
            render_runs(runs, out);
            out.push_str("</p>");
        }
        Block::Heading { level, runs } => {
            let lvl = (*level).clamp(1, 6);
            out.push_str(&format!("<h{lvl}>"));
            render_runs(runs, out);
            out.push_str(&format!("</h{lvl}>"));
        }
        Block::BulletList { items } | Block::OrderedList { items } => {
            let tag = if matches!(block, Block::BulletList { .. }) { "ul" } else { "ol" };
            out.push_str(&format!("<{tag}>"));
            for item in items {
                out.push_str("<li>");
                render_blocks(&item.blocks, out);
                out.push_str("</li>");
            }
            out.push_str(&format!("</{tag}>"));
        }
        Block::Blockquote { blocks } => {
            out.push_str("<blockquote>");
            render_blocks(blocks, out);
            out.push_str("</blockquote>");
        }
        Block::Table(table) => render_table(table, out),
        Block::Image { src, alt } => {
            out.push_str(&format!("<img src=\"{}\"", html_escape::encode_double_quoted_attribute(src)));
            if let Some(alt) = alt {
                out.push_str(&format!(" alt=\"{}\"", html_escape::encode_double_quoted_attribute(alt)));
            }
            out.push('>');
        }
    }
}

fn render_table(table: &Table, out: &mut String) {
    out.push_str("<table><tbody>");
    for row in &table.rows {
        let tag = if row.header { "th" } else { "td" };
        out.push_str("<tr>");
        for cell in &row.cells {
            out.push_str(&format!("<{tag}{}>", cell_attributes(&cell.attrs)));
            render_blocks(&cell.blocks, out);
            out.push_str(&format!("</{tag}>"));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

fn cell_attributes(attrs: &CellAttrs) -> String {
    let mut s = String::new();
    if attrs.colspan > 1 {
        s.push_str(&format!(" colspan=\"{}\"", attrs.colspan));
    }
    if attrs.rowspan > 1 {
        s.push_str(&format!(" rowspan=\"{}\"", attrs.rowspan));
    }
    if let Some(bg) = &attrs.background {
        s.push_str(&format!(" data-background-color=\"{}\"", html_escape::encode_double_quoted_attribute(bg.as_str())));
    }
    if attrs.border == BorderStyle::None {
        s.push_str(" data-border-style=\"none\"");
    }
    s.push_str(&format!(" style=\"{}\"", html_escape::encode_double_quoted_attribute(&attrs.render_style())));
    s
}

fn render_runs(runs: &[InlineRun], out: &mut String) {
    for run in runs {
        let mut open = String::new();
        let mut close = String::new();
        if let Some(color) = &run.marks.color {
            open.push_str(&format!("<span style=\"color: {}\">", html_escape::encode_double_quoted_attribute(color.as_str())));
            close.insert_str(0, "</span>");
        }
        for (on, tag) in [(run.marks.bold, "strong"), (run.marks.italic, "em"), (run.marks.strike, "s")] {
            if on {
                open.push_str(&format!("<{tag}>"));
                close.insert_str(0, &format!("</{tag}>"));
            }
        }
        out.push_str(&open);
        let lines: Vec<String> = run.text.split('\n').map(encode_line).collect();
        out.push_str(&lines.join("<br>"));
        out.push_str(&close);
    }
}

/// Tabs and carriage returns are written as references; raw ones would be
/// read back as source formatting.
fn encode_line(line: &str) -> String {
    html_escape::encode_text(line).replace('\t', "&#9;").replace('\r', "&#13;")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unterminated tag")]
    UnterminatedTag,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated attribute value")]
    UnterminatedQuote,
    #[error("closing tag </{0}> has no open element")]
    UnexpectedClose(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
}

impl ParseError {
    fn new(kind: ParseErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "template"];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Start { name: String, attrs: Vec<(String, String)>, self_closing: bool },
    End { name: String, offset: usize },
    Text(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;
    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let next = bytes.get(pos + 1).copied();
        let markup = matches!(next, Some(b'/' | b'!' | b'?')) || next.is_some_and(|b| b.is_ascii_alphabetic());
        if !markup {
            pos += 1;
            continue;
        }
        if text_start < pos {
            tokens.push(text_token(&input[text_start..pos]));
        }
        if input[pos..].starts_with("<!--") {
            let end = input[pos + 4..].find("-->").ok_or(ParseError::new(ParseErrorKind::UnterminatedComment, pos))?;
            pos += 4 + end + 3;
        } else if matches!(next, Some(b'!' | b'?')) {
            let end = input[pos..].find('>').ok_or(ParseError::new(ParseErrorKind::UnterminatedTag, pos))?;
            pos += end + 1;
        } else {
            let (token, end) = read_tag(input, pos)?;
            pos = end;
            if let Token::Start { name, self_closing: false, .. } = &token {
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    // Raw text content is dropped along with its element.
                    let closing = format!("</{name}");
                    pos = match input[pos..].to_ascii_lowercase().find(&closing) {
                        Some(at) => {
                            let tail = pos + at;
                            let gt = input[tail..].find('>').ok_or(ParseError::new(ParseErrorKind::UnterminatedTag, tail))?;
                            tail + gt + 1
                        }
                        None => return Err(ParseError::new(ParseErrorKind::UnterminatedTag, pos)),
                    };
                    text_start = pos;
                    continue;
                }
            }
            tokens.push(token);
        }
        text_start = pos;
    }
    if text_start < bytes.len() {
        tokens.push(text_token(&input[text_start..]));
    }
    Ok(tokens)
}

/// Source whitespace collapses before entities are decoded, so escaped tabs
/// and carriage returns survive.
fn text_token(raw: &str) -> Token {
    Token::Text(html_escape::decode_html_entities(&clean_text(raw)).into_owned())
}

fn read_tag(input: &str, start: usize) -> Result<(Token, usize), ParseError> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let unterminated = || ParseError::new(ParseErrorKind::UnterminatedTag, start);
    let mut i = start + 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    let name_start = i;
    while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    let name = input[name_start..i].to_ascii_lowercase();

    let mut attrs = Vec::new();
    let mut self_closing = false;
    loop {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return Err(unterminated()),
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') => {
                self_closing = true;
                i += 1;
            }
            Some(b'=') => i += 1,
            Some(_) => {
                let key_start = i;
                while i < len && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'>' | b'/') {
                    i += 1;
                }
                let key = input[key_start..i].to_ascii_lowercase();
                while i < len && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                let mut value = String::new();
                if bytes.get(i) == Some(&b'=') {
                    i += 1;
                    while i < len && bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    match bytes.get(i) {
                        Some(&quote @ (b'"' | b'\'')) => {
                            let rest = &input[i + 1..];
                            let end = rest
                                .find(quote as char)
                                .ok_or(ParseError::new(ParseErrorKind::UnterminatedQuote, i))?;
                            value = html_escape::decode_html_entities(&rest[..end]).into_owned();
                            i += end + 2;
                        }
                        Some(_) => {
                            let value_start = i;
                            while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                                i += 1;
                            }
                            value = html_escape::decode_html_entities(&input[value_start..i]).into_owned();
                        }
                        None => return Err(unterminated()),
                    }
                }
                attrs.push((key, value));
            }
        }
    }

    let token = if closing {
        Token::End { name, offset: start }
    } else {
        Token::Start { name, attrs, self_closing }
    };
    Ok((token, i))
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Declarations of the inline `style` attribute, keys lowercased.
    fn style(&self) -> Vec<(String, String)> {
        self.attr("style")
            .map(|style| {
                style
                    .split(';')
                    .filter_map(|decl| decl.split_once(':'))
                    .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn style_value(&self, key: &str) -> Option<String> {
        self.style().into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Builds the element tree. Elements left open at the end are closed.
fn build_tree(tokens: Vec<Token>) -> Result<Element, ParseError> {
    let mut stack = vec![Element::default()];
    for token in tokens {
        match token {
            Token::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.children.push(Node::Text(text));
                }
            }
            Token::Start { name, attrs, self_closing } => {
                let element = Element { name, attrs, children: Vec::new() };
                if self_closing || VOID_ELEMENTS.contains(&element.name.as_str()) {
                    if let Some(top) = stack.last_mut() {
                        top.children.push(Node::Element(element));
                    }
                } else {
                    stack.push(element);
                }
            }
            Token::End { name, offset } => {
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    continue;
                }
                let Some(depth) = stack.iter().skip(1).rposition(|e| e.name == name) else {
                    return Err(ParseError::new(ParseErrorKind::UnexpectedClose(name), offset));
                };
                while stack.len() > depth + 1 {
                    close_top(&mut stack);
                }
            }
        }
    }
    while stack.len() > 1 {
        close_top(&mut stack);
    }
    Ok(stack.pop().unwrap_or_default())
}

fn close_top(stack: &mut Vec<Element>) {
    if let Some(done) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(Node::Element(done));
        }
    }
}

pub fn from_html(html: &str) -> Result<Doc, ParseError> {
    let root = build_tree(tokenize(html)?)?;
    Ok(Doc::new(blocks_from(&root.children)))
}

fn is_formatting_whitespace(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

fn blocks_from(nodes: &[Node]) -> Vec<Block> {
    let mut out = Vec::new();
    let mut pending = Vec::new();
    for node in nodes {
        let Node::Element(el) = node else {
            collect_inline(std::slice::from_ref(node), &Marks::default(), &mut pending);
            continue;
        };
        match el.name.as_str() {
            "p" => {
                flush_inline(&mut pending, &mut out);
                textblock(el, Block::empty_paragraph(), &mut out);
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                flush_inline(&mut pending, &mut out);
                let level = el.name[1..].parse().unwrap_or(1);
                textblock(el, Block::Heading { level, runs: Vec::new() }, &mut out);
            }
            "ul" | "ol" => {
                flush_inline(&mut pending, &mut out);
                let items = list_items(el);
                if !items.is_empty() {
                    out.push(if el.name == "ul" { Block::BulletList { items } } else { Block::OrderedList { items } });
                }
            }
            "blockquote" => {
                flush_inline(&mut pending, &mut out);
                out.push(Block::Blockquote { blocks: blocks_from(&el.children) });
            }
            "table" => {
                flush_inline(&mut pending, &mut out);
                if let Some(table) = table_from(el) {
                    out.push(Block::Table(table));
                }
            }
            "img" => {
                flush_inline(&mut pending, &mut out);
                out.extend(image_from(el));
            }
            name if is_inline(name) => collect_inline(std::slice::from_ref(node), &Marks::default(), &mut pending),
            _ => {
                flush_inline(&mut pending, &mut out);
                out.extend(blocks_from(&el.children));
            }
        }
    }
    flush_inline(&mut pending, &mut out);
    out
}

fn is_inline(name: &str) -> bool {
    matches!(
        name,
        "a" | "abbr" | "b" | "br" | "code" | "del" | "em" | "font" | "i" | "mark" | "small" | "s" | "span" | "strike"
            | "strong" | "sub" | "sup" | "u"
    )
}

enum Piece {
    Run(InlineRun),
    Image(Block),
}

/// Stray inline content between blocks becomes its own paragraph unless it
/// is only whitespace.
fn flush_inline(pending: &mut Vec<Piece>, out: &mut Vec<Block>) {
    if pending.is_empty() {
        return;
    }
    let blank = pending.iter().all(|p| matches!(p, Piece::Run(r) if is_formatting_whitespace(&r.text)));
    let pieces = std::mem::take(pending);
    if !blank {
        split_pieces(pieces, Block::empty_paragraph(), false, out);
    }
}

fn textblock(el: &Element, shell: Block, out: &mut Vec<Block>) {
    let mut pieces = Vec::new();
    collect_inline(&el.children, &Marks::default(), &mut pieces);
    split_pieces(pieces, shell, true, out);
}

/// Emits `shell` filled with the runs, breaking it around images. Without
/// images an empty block is kept when `keep_empty` is set.
fn split_pieces(pieces: Vec<Piece>, shell: Block, keep_empty: bool, out: &mut Vec<Block>) {
    let has_images = pieces.iter().any(|p| matches!(p, Piece::Image(_)));
    let mut runs = Vec::new();
    let mut emit = |runs: &mut Vec<InlineRun>, out: &mut Vec<Block>, force: bool| {
        normalize_runs(runs);
        if runs.is_empty() && !force {
            return;
        }
        let mut block = shell.clone();
        if let Some(target) = block.runs_mut() {
            *target = std::mem::take(runs);
        }
        out.push(block);
    };
    for piece in pieces {
        match piece {
            Piece::Run(run) => runs.push(run),
            Piece::Image(image) => {
                emit(&mut runs, out, false);
                out.push(image);
            }
        }
    }
    emit(&mut runs, out, keep_empty && !has_images);
}

fn collect_inline(nodes: &[Node], marks: &Marks, out: &mut Vec<Piece>) {
    for node in nodes {
        match node {
            Node::Text(text) => {
                if !text.is_empty() {
                    out.push(Piece::Run(InlineRun::styled(text.clone(), marks.clone())));
                }
            }
            Node::Element(el) => match el.name.as_str() {
                "br" => out.push(Piece::Run(InlineRun::styled("\n", marks.clone()))),
                "img" => out.extend(image_from(el).map(Piece::Image)),
                _ => collect_inline(&el.children, &marks_for(el, marks), out),
            },
        }
    }
}

/// Whitespace runs that contain a line break or tab are source formatting
/// and collapse to one space; plain spaces are kept as typed.
fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if !c.is_whitespace() {
            out.push(c);
            continue;
        }
        let mut run = String::from(c);
        while let Some(&next) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            run.push(next);
            chars.next();
        }
        if run.contains(['\n', '\r', '\t']) {
            out.push(' ');
        } else {
            out.push_str(&run);
        }
    }
    out
}

fn marks_for(el: &Element, inherited: &Marks) -> Marks {
    let mut marks = inherited.clone();
    match el.name.as_str() {
        "strong" | "b" => marks.bold = true,
        "em" | "i" => marks.italic = true,
        "s" | "strike" | "del" => marks.strike = true,
        "font" => {
            if let Some(color) = el.attr("color").and_then(Color::parse) {
                marks.color = Some(color);
            }
        }
        _ => {}
    }
    for (key, value) in el.style() {
        match key.as_str() {
            "color" => {
                if let Some(color) = Color::parse(&value) {
                    marks.color = Some(color);
                }
            }
            "font-weight" if value == "bold" || value.parse::<u32>().is_ok_and(|w| w >= 600) => marks.bold = true,
            "font-style" if value == "italic" => marks.italic = true,
            "text-decoration" | "text-decoration-line" if value.contains("line-through") => marks.strike = true,
            _ => {}
        }
    }
    marks
}

fn image_from(el: &Element) -> Option<Block> {
    let src = el.attr("src")?.trim();
    if src.is_empty() {
        return None;
    }
    Some(Block::Image { src: src.to_string(), alt: el.attr("alt").map(str::to_string) })
}

fn list_items(el: &Element) -> Vec<ListItem> {
    let mut items: Vec<ListItem> = Vec::new();
    for node in &el.children {
        match node {
            Node::Element(li) if li.name == "li" => items.push(ListItem { blocks: blocks_from(&li.children) }),
            Node::Text(text) if is_formatting_whitespace(text) => {}
            // A list nested directly in a list belongs to the preceding item.
            Node::Element(nested) if matches!(nested.name.as_str(), "ul" | "ol") && !items.is_empty() => {
                if let Some(last) = items.last_mut() {
                    last.blocks.extend(blocks_from(std::slice::from_ref(node)));
                }
            }
            other => {
                let blocks = blocks_from(std::slice::from_ref(other));
                if !blocks.is_empty() {
                    items.push(ListItem { blocks });
                }
            }
        }
    }
    items
}

fn table_from(el: &Element) -> Option<Table> {
    let mut rows = Vec::new();
    collect_rows(&el.children, &mut rows);
    if rows.is_empty() {
        return None;
    }
    let mut table = Table { rows };
    table.normalize();
    Some(table)
}

fn collect_rows(nodes: &[Node], rows: &mut Vec<TableRow>) {
    for node in nodes {
        let Node::Element(el) = node else { continue };
        match el.name.as_str() {
            "tr" => {
                let cells: Vec<&Element> = el
                    .children
                    .iter()
                    .filter_map(|n| match n {
                        Node::Element(c) if c.name == "td" || c.name == "th" => Some(c),
                        _ => None,
                    })
                    .collect();
                let header = rows.is_empty() && !cells.is_empty() && cells.iter().all(|c| c.name == "th");
                rows.push(TableRow { header, cells: cells.into_iter().map(cell_from).collect() });
            }
            "caption" | "colgroup" => {}
            _ => collect_rows(&el.children, rows),
        }
    }
}

fn cell_from(el: &Element) -> Cell {
    let span = |key: &str| el.attr(key).and_then(|v| v.trim().parse::<u32>().ok()).unwrap_or(1).max(1);
    let background = el
        .attr("data-background-color")
        .map(str::to_string)
        .or_else(|| el.style_value("background-color"))
        .and_then(|v| Color::parse(&v));
    let border = match el.attr("data-border-style") {
        Some(v) if v.trim().eq_ignore_ascii_case("none") => BorderStyle::None,
        _ => BorderStyle::Solid,
    };
    let attrs = CellAttrs { colspan: span("colspan"), rowspan: span("rowspan"), background, border };
    let mut blocks = blocks_from(&el.children);
    if blocks.is_empty() {
        blocks.push(Block::empty_paragraph());
    }
    Cell { blocks, attrs }
}

pub fn to_json(doc: &Doc) -> serde_json::Result<String> {
    serde_json::to_string(doc)
}

pub fn from_json(json: &str) -> serde_json::Result<Doc> {
    let mut doc: Doc = serde_json::from_str(json)?;
    doc.normalize();
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> Marks {
        Marks { bold: true, ..Marks::default() }
    }

    fn sample() -> Doc {
        let mut table = Table::new(2, 3, true);
        table.rows[0].cells[0].blocks = vec![Block::paragraph("Name")];
        table.rows[1].cells[2].attrs.background = Color::parse("#dbeafe");
        table.rows[1].cells[2].attrs.border = BorderStyle::None;
        table.merge(crate::table::Rect { top: 0, left: 1, bottom: 2, right: 2 });
        Doc::new(vec![
            Block::heading(1, "Report"),
            Block::Paragraph {
                runs: vec![
                    InlineRun::plain("a < b & "),
                    InlineRun::styled("bold", bold()),
                    InlineRun::styled(
                        "red\nline",
                        Marks { italic: true, strike: true, color: Color::parse("#dc2626"), ..Marks::default() },
                    ),
                ],
            },
            Block::BulletList {
                items: vec![
                    ListItem { blocks: vec![Block::paragraph("one")] },
                    ListItem { blocks: vec![Block::paragraph("two"), Block::OrderedList { items: vec![ListItem::default()] }] },
                ],
            },
            Block::Blockquote { blocks: vec![Block::paragraph("quote")] },
            Block::Table(table),
            Block::Image { src: "https://cdn.example.com/a.png?x=1&y=2".into(), alt: Some("chart \"q\"".into()) },
            Block::paragraph("  spaced  "),
        ])
    }

    #[test]
    fn html_round_trips() {
        let doc = sample();
        let html = to_html(&doc);
        assert_eq!(from_html(&html).unwrap(), doc);
    }

    #[test]
    fn tabs_and_carriage_returns_survive() {
        let doc = Doc::new(vec![
            Block::paragraph("a\tb"),
            Block::Paragraph { runs: vec![InlineRun::plain("x\tcol\r\nz"), InlineRun::styled("\t", bold())] },
        ]);
        let html = to_html(&doc);
        assert!(html.starts_with("<p>a&#9;b</p><p>x&#9;col&#13;<br>z"));
        assert_eq!(from_html(&html).unwrap(), doc);
        // Literal source whitespace is still formatting.
        assert_eq!(from_html("<p>a\tb\r\n c</p>").unwrap(), Doc::new(vec![Block::paragraph("a b c")]));
    }

    #[test]
    fn renders_tiptap_markup() {
        let html = to_html(&sample());
        assert!(html.starts_with("<h1>Report</h1><p>a &lt; b &amp; <strong>bold</strong>"));
        assert!(html.contains("<span style=\"color: #dc2626\"><em><s>red<br>line</s></em></span>"));
        assert!(html.contains("<tr><th style=\"border: 2px solid #d1d5db\"><p>Name</p></th><th rowspan=\"2\""));
        assert!(html.contains(
            "<td data-background-color=\"#dbeafe\" data-border-style=\"none\" style=\"background-color: #dbeafe; border: none !important\">"
        ));
        assert!(html.contains("src=\"https://cdn.example.com/a.png?x=1&amp;y=2\""));
    }

    #[test]
    fn empty_document_is_one_paragraph() {
        assert_eq!(to_html(&Doc::default()), "<p></p>");
        assert_eq!(from_html("").unwrap(), Doc::default());
        assert_eq!(from_html("  \n ").unwrap(), Doc::default());
    }

    #[test]
    fn stray_text_and_wrappers() {
        let doc = from_html("<div>loose <b>text</b><section><p>inner</p></section></div>\n<!-- note --><p>x</p>").unwrap();
        assert_eq!(
            doc.blocks,
            vec![
                Block::Paragraph { runs: vec![InlineRun::plain("loose "), InlineRun::styled("text", bold())] },
                Block::paragraph("inner"),
                Block::paragraph("x"),
            ]
        );
    }

    #[test]
    fn images_are_lifted_out_of_paragraphs() {
        let doc = from_html("<p>before<img src=\"a.png\">after</p><p><img src=\"b.png\" alt=\"\"></p>").unwrap();
        assert_eq!(
            doc.blocks,
            vec![
                Block::paragraph("before"),
                Block::Image { src: "a.png".into(), alt: None },
                Block::paragraph("after"),
                Block::Image { src: "b.png".into(), alt: Some(String::new()) },
            ]
        );
    }

    #[test]
    fn ragged_tables_are_padded() {
        let doc = from_html("<table><tr><td colspan=\"2\">a</td></tr><tr><td>b</td></tr></table>").unwrap();
        let Block::Table(table) = &doc.blocks[0] else { panic!("expected table") };
        assert!(!table.has_header_row());
        assert_eq!(table.rows[1].cells.len(), 2);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn pasted_styles_become_marks() {
        let doc = from_html("<p><span style=\"font-weight:700;color:rgb(1, 2, 3)\">x</span></p>").unwrap();
        let run = &doc.blocks[0].runs().unwrap()[0];
        assert!(run.marks.bold);
        assert_eq!(run.marks.color.as_ref().map(Color::as_str), Some("rgb(1, 2, 3)"));
    }

    #[test]
    fn malformed_markup_is_reported() {
        assert_eq!(from_html("<p>ok</p><p class=\"x").unwrap_err().kind, ParseErrorKind::UnterminatedQuote);
        assert_eq!(from_html("<p>ok</p><p").unwrap_err(), ParseError::new(ParseErrorKind::UnterminatedTag, 9));
        assert_eq!(from_html("<!-- open").unwrap_err().kind, ParseErrorKind::UnterminatedComment);
        assert_eq!(from_html("<p>x</p></div>").unwrap_err().kind, ParseErrorKind::UnexpectedClose("div".into()));
        assert!(from_html("<p>a < b</p><br/><img src=x></img>").is_ok());
    }

    #[test]
    fn json_round_trips() {
        let doc = sample();
        let json = to_json(&doc).unwrap();
        assert_eq!(from_json(&json).unwrap(), doc);
    }
}
