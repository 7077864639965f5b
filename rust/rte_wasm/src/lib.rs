use std::cell::RefCell;
use std::rc::Rc;

use rte_core::{
    BlockType, BorderStyle, Color, Command, EditorConfig, EditorCore, EditorError, EditorHost, GridPos,
    ImageInsertion, ImageSource, MarkKind, Position, Selection, SessionState, UploadError,
};
use wasm_bindgen::prelude::*;

/// Notifications queued for JS to pick up after each call.
#[derive(Debug, Default)]
struct Outbox {
    change: Option<String>,
    error: Option<String>,
}

struct JsHost {
    outbox: Rc<RefCell<Outbox>>,
    uploads: bool,
}

impl EditorHost for JsHost {
    fn on_change(&mut self, html: &str) {
        self.outbox.borrow_mut().change = Some(html.to_string());
    }

    fn on_error(&mut self, error: &EditorError) {
        self.outbox.borrow_mut().error = Some(error.to_string());
    }

    fn uploads_images(&self) -> bool {
        self.uploads
    }
}

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_path(path: Vec<u32>) -> Vec<usize> {
    path.into_iter().map(|i| i as usize).collect()
}

#[wasm_bindgen]
pub struct Editor {
    core: EditorCore,
    outbox: Rc<RefCell<Outbox>>,
}

#[wasm_bindgen]
impl Editor {
    /// `config_json` may be partial; unknown or invalid config falls back to
    /// the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(initial_html: String, config_json: Option<String>, uploads_images: bool) -> Editor {
        let config = config_json.and_then(|json| EditorConfig::from_json(&json).ok()).unwrap_or_default();
        let outbox = Rc::new(RefCell::new(Outbox::default()));
        let mut core = EditorCore::new(config, &initial_html);
        core.set_host(Box::new(JsHost { outbox: outbox.clone(), uploads: uploads_images }));
        Editor { core, outbox }
    }

    pub fn new_empty() -> Editor {
        Self::new(String::new(), None, false)
    }

    pub fn to_html(&self) -> String { self.core.to_html() }
    pub fn to_json(&self) -> String { self.core.to_json() }

    pub fn load_html(&mut self, html: String) -> Result<(), JsValue> { self.core.load_html(&html).map_err(js_err) }
    pub fn load_json(&mut self, json: String) -> Result<(), JsValue> { self.core.load_json(&json).map_err(js_err) }

    /// Latest serialized document since the last call, if it changed.
    pub fn take_change(&mut self) -> Option<String> { self.outbox.borrow_mut().change.take() }
    pub fn take_error(&mut self) -> Option<String> { self.outbox.borrow_mut().error.take() }

    pub fn placeholder(&self) -> Option<String> { self.core.placeholder().map(str::to_string) }
    pub fn state(&self) -> String {
        match self.core.state() {
            SessionState::Idle => "idle",
            SessionState::Composing => "composing",
            SessionState::Uploading => "uploading",
        }
        .to_string()
    }
    pub fn can_undo(&self) -> bool { self.core.can_undo() }
    pub fn can_redo(&self) -> bool { self.core.can_redo() }
    pub fn in_table(&self) -> bool { self.core.in_table() }

    // Selection
    pub fn set_cursor(&mut self, path: Vec<u32>, offset: u32) -> bool {
        self.core.set_selection(Selection::cursor(to_path(path), offset as usize))
    }
    pub fn set_range(&mut self, anchor_path: Vec<u32>, anchor_offset: u32, head_path: Vec<u32>, head_offset: u32) -> bool {
        let anchor = Position::new(to_path(anchor_path), anchor_offset as usize);
        let head = Position::new(to_path(head_path), head_offset as usize);
        self.core.set_selection(Selection::range(anchor, head))
    }
    pub fn set_cell_range(&mut self, table_path: Vec<u32>, anchor_row: u32, anchor_col: u32, head_row: u32, head_col: u32) -> bool {
        let anchor = GridPos { row: anchor_row as usize, col: anchor_col as usize };
        let head = GridPos { row: head_row as usize, col: head_col as usize };
        self.core.set_selection(Selection::cells(to_path(table_path), anchor, head))
    }
    pub fn selection_json(&self) -> String {
        serde_json::to_string(self.core.selection()).unwrap_or_else(|_| "null".to_string())
    }

    // Text input
    pub fn insert_text(&mut self, text: String) -> bool { self.core.insert_text(&text) }
    pub fn delete_backward(&mut self) -> bool { self.core.delete_backward() }
    pub fn split_block(&mut self) -> bool { self.core.split_block() }
    pub fn commit(&mut self) { self.core.commit() }

    /// Applies a JSON-encoded command, e.g. `{"command":"merge_cells"}`.
    pub fn apply_command(&mut self, json: String) -> Result<bool, JsValue> {
        let command = Command::from_json(&json).map_err(js_err)?;
        Ok(self.core.apply(&command))
    }

    // Marks and blocks
    pub fn toggle_bold(&mut self) -> bool { self.core.toggle_mark(MarkKind::Bold) }
    pub fn toggle_italic(&mut self) -> bool { self.core.toggle_mark(MarkKind::Italic) }
    pub fn toggle_strike(&mut self) -> bool { self.core.toggle_mark(MarkKind::Strike) }
    pub fn set_text_color(&mut self, color: Option<String>) -> bool {
        match color {
            Some(raw) => match Color::parse(&raw) {
                Some(color) => self.core.set_text_color(Some(color)),
                None => false,
            },
            None => self.core.set_text_color(None),
        }
    }
    pub fn toggle_heading(&mut self, level: u8) -> bool { self.toggle_block(BlockType::Heading { level }) }
    pub fn set_paragraph(&mut self) -> bool { self.toggle_block(BlockType::Paragraph) }
    pub fn toggle_bullet_list(&mut self) -> bool { self.toggle_block(BlockType::BulletList) }
    pub fn toggle_ordered_list(&mut self) -> bool { self.toggle_block(BlockType::OrderedList) }
    pub fn toggle_blockquote(&mut self) -> bool { self.toggle_block(BlockType::Blockquote) }

    // Tables
    pub fn insert_table(&mut self, rows: u32, cols: u32, with_header_row: bool) -> bool {
        self.core.apply(&Command::InsertTable { rows: rows as usize, cols: cols as usize, with_header_row })
    }
    pub fn add_row_before(&mut self) -> bool { self.core.apply(&Command::AddRowBefore) }
    pub fn add_row_after(&mut self) -> bool { self.core.apply(&Command::AddRowAfter) }
    pub fn delete_row(&mut self) -> bool { self.core.apply(&Command::DeleteRow) }
    pub fn add_column_before(&mut self) -> bool { self.core.apply(&Command::AddColumnBefore) }
    pub fn add_column_after(&mut self) -> bool { self.core.apply(&Command::AddColumnAfter) }
    pub fn delete_column(&mut self) -> bool { self.core.apply(&Command::DeleteColumn) }
    pub fn merge_cells(&mut self) -> bool { self.core.apply(&Command::MergeCells) }
    pub fn split_cell(&mut self) -> bool { self.core.apply(&Command::SplitCell) }
    pub fn delete_table(&mut self) -> bool { self.core.apply(&Command::DeleteTable) }
    pub fn set_cell_background(&mut self, color: Option<String>) -> bool {
        let color = match color {
            Some(raw) => match Color::parse(&raw) {
                Some(color) => Some(color),
                None => return false,
            },
            None => None,
        };
        self.core.apply(&Command::SetCellBackground { color })
    }
    pub fn set_cell_border(&mut self, visible: bool) -> bool {
        let border = if visible { BorderStyle::Solid } else { BorderStyle::None };
        self.core.apply(&Command::SetCellBorder { border })
    }

    // Images
    pub fn insert_image_url(&mut self, src: String) -> bool {
        self.core.insert_image(ImageSource::Url(src)) == ImageInsertion::Inserted
    }

    /// Returns an upload ticket when the bytes must be uploaded by JS; the
    /// image is embedded directly when this editor has no uploader.
    pub fn insert_image_bytes(&mut self, data: Vec<u8>, mime: String) -> Option<u64> {
        match self.core.insert_image(ImageSource::Bytes { data, mime }) {
            ImageInsertion::Pending(request) => Some(request.ticket),
            ImageInsertion::Inserted | ImageInsertion::Declined => None,
        }
    }

    pub fn finish_upload(&mut self, ticket: u64, url: String) -> Result<bool, JsValue> {
        self.core.complete_upload(ticket, Ok(url)).map_err(js_err)
    }

    /// Reports a failed upload. The message is also queued for `take_error`.
    pub fn fail_upload(&mut self, ticket: u64, message: String) -> Result<(), JsValue> {
        match self.core.complete_upload(ticket, Err(UploadError::new(message))) {
            Ok(_) | Err(EditorError::Upload(_)) => Ok(()),
            Err(err) => Err(js_err(err)),
        }
    }

    // History
    pub fn undo(&mut self) -> bool { self.core.undo() }
    pub fn redo(&mut self) -> bool { self.core.redo() }
}

impl Editor {
    fn toggle_block(&mut self, block: BlockType) -> bool {
        self.core.apply(&Command::ToggleBlockType { block })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn wasm_sanity() {
        let mut e = Editor::new_empty();
        assert!(e.insert_table(2, 3, true));
        assert!(e.to_json().contains("\"Table\""));
        assert!(e.take_change().is_some_and(|html| html.contains("<table>")));
        assert!(e.take_change().is_none());
    }

    #[wasm_bindgen_test]
    fn commands_from_json() {
        let mut e = Editor::new("<p>hello</p>".to_string(), None, false);
        assert!(e.set_range(vec![0], 0, vec![0], 5));
        assert_eq!(e.apply_command(r#"{"command":"toggle_mark","mark":"bold"}"#.to_string()).ok(), Some(true));
        assert_eq!(e.to_html(), "<p><strong>hello</strong></p>");
        assert!(e.apply_command("{\"command\":\"nope\"}".to_string()).is_err());
    }

    #[wasm_bindgen_test]
    fn upload_round_trip() {
        let mut e = Editor::new("<p>x</p>".to_string(), Some(r#"{"placeholder":"Type"}"#.to_string()), true);
        let ticket = e.insert_image_bytes(vec![1, 2], "image/png".to_string()).unwrap();
        assert_eq!(e.state(), "uploading");
        assert!(e.fail_upload(ticket, "offline".to_string()).is_ok());
        assert_eq!(e.take_error().as_deref(), Some("image upload failed: offline"));
        assert_eq!(e.state(), "idle");
    }
}
