pub mod command;
pub mod config;
pub mod doc;
pub mod error;
pub mod history;
pub mod import_export;
pub mod inline;
pub mod ops;
pub mod selection;
pub mod table;
pub mod table_ops;
pub mod ui;

use std::fmt;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::Serialize;
use tracing::{debug, error, warn};

pub use command::Command;
pub use config::EditorConfig;
pub use doc::{Block, BorderStyle, Color, Doc, MarkKind, Marks};
pub use error::{EditorError, UploadError};
pub use ops::BlockType;
pub use selection::{GridPos, Position, Selection};

use history::History;

/// Receives the editor's outgoing notifications.
pub trait EditorHost {
    /// Called with the serialized document after every committed change.
    fn on_change(&mut self, html: &str);

    /// User-visible failures, such as a failed image upload.
    fn on_error(&mut self, _error: &EditorError) {}

    /// Whether the host uploads image files itself. Without an uploader,
    /// images are embedded as data URLs.
    fn uploads_images(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    /// A run of text input is being batched into one undo step.
    Composing,
    /// An image upload is in flight.
    Uploading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    Bytes { data: Vec<u8>, mime: String },
}

/// Bytes the host should upload, answered with [`EditorCore::complete_upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub ticket: u64,
    pub data: Vec<u8>,
    pub mime: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInsertion {
    Inserted,
    Declined,
    Pending(UploadRequest),
}

pub struct EditorCore {
    doc: Doc,
    selection: Selection,
    history: History,
    config: EditorConfig,
    stored_marks: Option<Marks>,
    composing: bool,
    upload: Option<u64>,
    next_ticket: u64,
    host: Option<Box<dyn EditorHost>>,
}

impl fmt::Debug for EditorCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorCore")
            .field("doc", &self.doc)
            .field("selection", &self.selection)
            .field("state", &self.state())
            .field("undo_depth", &self.history.undo_depth())
            .field("has_host", &self.host.is_some())
            .finish()
    }
}

impl Default for EditorCore {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl EditorCore {
    pub fn new_empty() -> Self {
        Self::with_doc(EditorConfig::default(), Doc::default())
    }

    /// Starts a session from stored HTML. Content that fails to parse is
    /// replaced by an empty document.
    pub fn new(config: EditorConfig, initial_html: &str) -> Self {
        let doc = match import_export::from_html(initial_html) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(error = %err, "initial content could not be parsed, starting empty");
                Doc::default()
            }
        };
        Self::with_doc(config, doc)
    }

    pub fn with_doc(config: EditorConfig, doc: Doc) -> Self {
        let selection = Selection::start_of(&doc);
        Self {
            doc,
            selection,
            history: History::with_limit(config.history_limit),
            config,
            stored_marks: None,
            composing: false,
            upload: None,
            next_ticket: 0,
            host: None,
        }
    }

    pub fn set_host(&mut self, host: Box<dyn EditorHost>) {
        self.host = Some(host);
    }

    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        if self.upload.is_some() {
            SessionState::Uploading
        } else if self.composing {
            SessionState::Composing
        } else {
            SessionState::Idle
        }
    }

    /// Placeholder text to show, if the document is empty.
    pub fn placeholder(&self) -> Option<&str> {
        self.doc.is_semantically_empty().then_some(self.config.placeholder.as_str())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn to_html(&self) -> String {
        import_export::to_html(&self.doc)
    }

    pub fn to_json(&self) -> String {
        import_export::to_json(&self.doc).unwrap_or_else(|_| "{}".to_string())
    }

    /// Replaces the content and starts a fresh history.
    pub fn load_html(&mut self, html: &str) -> Result<(), EditorError> {
        let doc = import_export::from_html(html)?;
        self.reset(doc);
        Ok(())
    }

    pub fn load_json(&mut self, json: &str) -> Result<(), EditorError> {
        let doc = import_export::from_json(json)?;
        self.reset(doc);
        Ok(())
    }

    fn reset(&mut self, doc: Doc) {
        self.selection = Selection::start_of(&doc);
        self.doc = doc;
        self.history.clear();
        self.stored_marks = None;
        self.composing = false;
    }

    /// Moves the selection. Ends a text batch and drops stored marks.
    pub fn set_selection(&mut self, selection: Selection) -> bool {
        if !selection.is_valid(&self.doc) {
            debug!(?selection, "ignoring selection outside the document");
            return false;
        }
        self.commit();
        self.stored_marks = None;
        self.selection = selection;
        true
    }

    /// Closes the pending text batch, if any, and notifies the host.
    pub fn commit(&mut self) {
        if self.composing {
            self.composing = false;
            self.notify();
        }
    }

    pub fn apply(&mut self, command: &Command) -> bool {
        let name = command.name();
        match command {
            Command::ToggleMark { mark } => self.toggle_mark(*mark),
            Command::SetTextColor { color } => self.set_text_color(color.clone()),
            Command::SetBlockType { block } => self.transact(name, |d, s| ops::set_block_type(d, s, *block)),
            Command::ToggleBlockType { block } => self.transact(name, |d, s| ops::toggle_block_type(d, s, *block)),
            Command::InsertImage { src, alt } => self.transact(name, |d, s| ops::insert_image(d, s, src, alt.as_deref())),
            Command::InsertTable { rows, cols, with_header_row } => {
                self.transact(name, |d, s| ops::insert_table(d, s, *rows, *cols, *with_header_row))
            }
            Command::AddRowBefore => self.transact(name, |d, s| table_ops::add_row(d, s, false)),
            Command::AddRowAfter => self.transact(name, |d, s| table_ops::add_row(d, s, true)),
            Command::DeleteRow => self.transact(name, table_ops::delete_rows),
            Command::AddColumnBefore => self.transact(name, |d, s| table_ops::add_column(d, s, false)),
            Command::AddColumnAfter => self.transact(name, |d, s| table_ops::add_column(d, s, true)),
            Command::DeleteColumn => self.transact(name, table_ops::delete_columns),
            Command::MergeCells => self.transact(name, table_ops::merge_cells),
            Command::SplitCell => self.transact(name, table_ops::split_cell),
            Command::DeleteTable => self.transact(name, table_ops::delete_table),
            Command::SetCellBackground { color } => {
                self.transact(name, |d, s| table_ops::set_cell_background(d, s, color.as_ref()))
            }
            Command::SetCellBorder { border } => self.transact(name, |d, s| table_ops::set_cell_border(d, s, *border)),
            Command::SplitBlock => self.split_block(),
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
        }
    }

    /// On a collapsed cursor the mark is queued for the next typed text.
    pub fn toggle_mark(&mut self, mark: MarkKind) -> bool {
        if self.selection.is_collapsed() {
            let mut marks = self.cursor_marks();
            marks.set(mark, !marks.has(mark));
            self.stored_marks = Some(marks);
            return true;
        }
        self.transact("toggle_mark", |d, s| ops::toggle_mark(d, s, mark))
    }

    pub fn set_text_color(&mut self, color: Option<Color>) -> bool {
        if self.selection.is_collapsed() {
            let mut marks = self.cursor_marks();
            marks.color = color;
            self.stored_marks = Some(marks);
            return true;
        }
        self.transact("set_text_color", |d, s| ops::set_text_color(d, s, color.as_ref()))
    }

    fn cursor_marks(&self) -> Marks {
        if let Some(marks) = &self.stored_marks {
            return marks.clone();
        }
        match &self.selection {
            Selection::Text { head, .. } => ops::position_marks(&self.doc, head),
            Selection::Cells { .. } => Marks::default(),
        }
    }

    /// Whether the toolbar should show `mark` as active.
    pub fn is_mark_active(&self, mark: MarkKind) -> bool {
        if self.selection.is_collapsed() {
            return self.cursor_marks().has(mark);
        }
        let segments = self.selection.segments(&self.doc);
        !segments.is_empty()
            && segments.iter().all(|s| {
                self.doc
                    .block(&s.path)
                    .and_then(Block::runs)
                    .is_some_and(|runs| inline::all_match(runs, s.start, s.end, |m| m.has(mark)))
            })
    }

    pub fn is_block_active(&self, block: BlockType) -> bool {
        ops::is_block_type_active(&self.doc, &self.selection, block)
    }

    pub fn in_table(&self) -> bool {
        self.selection.table_target(&self.doc).is_some()
    }

    /// Types `text` over the selection, batching consecutive input into one
    /// undo step.
    pub fn insert_text(&mut self, text: &str) -> bool {
        let mut scratch = self.doc.clone();
        match ops::insert_text(&mut scratch, &self.selection, text, self.stored_marks.as_ref()) {
            Some(selection) => self.compose(scratch, selection),
            None => {
                debug!(command = "insert_text", "declined");
                false
            }
        }
    }

    /// Backspace. At the start of a block this joins it with the previous
    /// one as a separate undo step.
    pub fn delete_backward(&mut self) -> bool {
        let mut scratch = self.doc.clone();
        match ops::delete_backward(&mut scratch, &self.selection) {
            Some(selection) => self.compose(scratch, selection),
            None => self.transact("join_backward", ops::join_backward),
        }
    }

    pub fn split_block(&mut self) -> bool {
        self.transact("split_block", ops::split_block)
    }

    fn compose(&mut self, doc: Doc, selection: Selection) -> bool {
        if doc == self.doc {
            return false;
        }
        debug_assert!(doc.validate().is_ok(), "text input broke the document: {:?}", doc.validate());
        if !self.composing {
            self.history.record(&self.doc, &self.selection);
            self.composing = true;
        }
        self.doc = doc;
        self.selection = selection;
        self.stored_marks = None;
        true
    }

    pub fn undo(&mut self) -> bool {
        self.commit();
        if !self.history.undo(&mut self.doc, &mut self.selection) {
            return false;
        }
        self.stored_marks = None;
        self.notify();
        true
    }

    pub fn redo(&mut self) -> bool {
        self.commit();
        if !self.history.redo(&mut self.doc, &mut self.selection) {
            return false;
        }
        self.stored_marks = None;
        self.notify();
        true
    }

    /// Runs a structural command on a scratch copy. Declined or unchanged
    /// results leave the session untouched.
    fn transact(&mut self, name: &'static str, op: impl FnOnce(&mut Doc, &Selection) -> Option<Selection>) -> bool {
        self.commit();
        let mut scratch = self.doc.clone();
        let Some(selection) = op(&mut scratch, &self.selection) else {
            debug!(command = name, "declined");
            return false;
        };
        if scratch == self.doc {
            debug!(command = name, "no change");
            return false;
        }
        debug_assert!(scratch.validate().is_ok(), "{name} broke the document: {:?}", scratch.validate());
        debug_assert!(selection.is_valid(&scratch), "{name} left an invalid selection: {selection:?}");
        self.history.record(&self.doc, &self.selection);
        self.doc = scratch;
        self.selection = selection;
        self.stored_marks = None;
        self.notify();
        true
    }

    fn notify(&mut self) {
        let html = import_export::to_html(&self.doc);
        if let Some(host) = self.host.as_mut() {
            host.on_change(&html);
        }
    }

    /// Inserts an image at the selection. Binary images go to the host's
    /// uploader when it has one and are embedded as data URLs otherwise.
    pub fn insert_image(&mut self, source: ImageSource) -> ImageInsertion {
        let (data, mime) = match source {
            ImageSource::Url(src) => return self.insert_image_src(&src),
            ImageSource::Bytes { data, mime } => (data, mime),
        };
        if self.upload.is_some() {
            debug!("image upload already in flight");
            return ImageInsertion::Declined;
        }
        if data.is_empty() || !mime.starts_with("image/") {
            debug!(%mime, "not an image payload");
            return ImageInsertion::Declined;
        }
        if self.host.as_ref().is_some_and(|h| h.uploads_images()) {
            self.next_ticket += 1;
            let ticket = self.next_ticket;
            self.upload = Some(ticket);
            debug!(ticket, bytes = data.len(), "image upload requested");
            return ImageInsertion::Pending(UploadRequest { ticket, data, mime });
        }
        let src = format!("data:{mime};base64,{}", BASE64_STANDARD.encode(&data));
        self.insert_image_src(&src)
    }

    fn insert_image_src(&mut self, src: &str) -> ImageInsertion {
        if self.transact("insert_image", |d, s| ops::insert_image(d, s, src, None)) {
            ImageInsertion::Inserted
        } else {
            ImageInsertion::Declined
        }
    }

    /// Finishes the upload started for `ticket`. A failure is reported to
    /// the host and leaves the document as it was.
    pub fn complete_upload(&mut self, ticket: u64, result: Result<String, UploadError>) -> Result<bool, EditorError> {
        if self.upload != Some(ticket) {
            return Err(EditorError::UnknownUpload(ticket));
        }
        self.upload = None;
        match result {
            Ok(url) => Ok(self.insert_image_src(&url) == ImageInsertion::Inserted),
            Err(err) => {
                error!(ticket, error = %err, "image upload failed");
                let err = EditorError::Upload(err);
                if let Some(host) = self.host.as_mut() {
                    host.on_error(&err);
                }
                Err(err)
            }
        }
    }
}
