//! View adapters for the floating toolbar and the table context menu.
//!
//! Both only keep what is open and the last picked colors; every user
//! intent is turned into a [`Command`] and applied to the session.

use crate::command::Command;
use crate::doc::{BorderStyle, Color, MarkKind};
use crate::ops::BlockType;
use crate::{EditorCore, SessionState};

pub const TEXT_COLORS: [&str; 10] = [
    "#000000", "#ffffff", "#dc2626", "#ea580c", "#ca8a04", "#16a34a", "#0284c7", "#9333ea", "#db2777", "#64748b",
];

pub const CELL_BACKGROUNDS: [&str; 10] = [
    "#ffffff", "#f3f4f6", "#dbeafe", "#dcfce7", "#fef3c7", "#fee2e2", "#fce7f3", "#e0e7ff", "#fef9c3", "#d1fae5",
];

/// Background written by "Clear background".
pub const CLEAR_BACKGROUND: &str = "transparent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Picker {
    TextColor,
    CellBackground,
}

impl Picker {
    pub fn palette(self) -> Vec<Color> {
        let raw: &[&str] = match self {
            Picker::TextColor => &TEXT_COLORS,
            Picker::CellBackground => &CELL_BACKGROUNDS,
        };
        raw.iter().filter_map(|c| Color::parse(c)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarAction {
    Bold,
    Italic,
    Strike,
    Heading(u8),
    BulletList,
    OrderedList,
    Blockquote,
    TogglePicker(Picker),
    PickTextColor(Color),
    ResetTextColor,
    InsertTable,
    AddColumnBefore,
    AddColumnAfter,
    DeleteColumn,
    AddRowBefore,
    AddRowAfter,
    DeleteRow,
    MergeCells,
    SplitCell,
    PickCellBackground(Color),
    ClearCellBackground,
    ShowBorder,
    HideBorder,
    DeleteTable,
    InsertImageUrl(String),
    /// Asks the host to open its file chooser.
    UploadImage,
    Undo,
    Redo,
}

impl ToolbarAction {
    /// Actions that only apply inside a table.
    pub fn needs_table(&self) -> bool {
        match self {
            ToolbarAction::TogglePicker(picker) => *picker == Picker::CellBackground,
            _ => self.command().is_some_and(|cmd| cmd.needs_table()),
        }
    }

    /// The command this action issues, if it edits the document.
    pub fn command(&self) -> Option<Command> {
        let cmd = match self {
            ToolbarAction::Bold => Command::ToggleMark { mark: MarkKind::Bold },
            ToolbarAction::Italic => Command::ToggleMark { mark: MarkKind::Italic },
            ToolbarAction::Strike => Command::ToggleMark { mark: MarkKind::Strike },
            ToolbarAction::Heading(level) => Command::ToggleBlockType { block: BlockType::Heading { level: *level } },
            ToolbarAction::BulletList => Command::ToggleBlockType { block: BlockType::BulletList },
            ToolbarAction::OrderedList => Command::ToggleBlockType { block: BlockType::OrderedList },
            ToolbarAction::Blockquote => Command::ToggleBlockType { block: BlockType::Blockquote },
            ToolbarAction::PickTextColor(color) => Command::SetTextColor { color: Some(color.clone()) },
            ToolbarAction::ResetTextColor => Command::SetTextColor { color: None },
            ToolbarAction::InsertTable => Command::InsertTable { rows: 3, cols: 3, with_header_row: true },
            ToolbarAction::AddColumnBefore => Command::AddColumnBefore,
            ToolbarAction::AddColumnAfter => Command::AddColumnAfter,
            ToolbarAction::DeleteColumn => Command::DeleteColumn,
            ToolbarAction::AddRowBefore => Command::AddRowBefore,
            ToolbarAction::AddRowAfter => Command::AddRowAfter,
            ToolbarAction::DeleteRow => Command::DeleteRow,
            ToolbarAction::MergeCells => Command::MergeCells,
            ToolbarAction::SplitCell => Command::SplitCell,
            ToolbarAction::PickCellBackground(color) => Command::SetCellBackground { color: Some(color.clone()) },
            ToolbarAction::ClearCellBackground => Command::SetCellBackground { color: Color::parse(CLEAR_BACKGROUND) },
            ToolbarAction::ShowBorder => Command::SetCellBorder { border: BorderStyle::Solid },
            ToolbarAction::HideBorder => Command::SetCellBorder { border: BorderStyle::None },
            ToolbarAction::DeleteTable => Command::DeleteTable,
            ToolbarAction::InsertImageUrl(src) => Command::InsertImage { src: src.clone(), alt: None },
            ToolbarAction::Undo => Command::Undo,
            ToolbarAction::Redo => Command::Redo,
            ToolbarAction::TogglePicker(_) | ToolbarAction::UploadImage => return None,
        };
        Some(cmd)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub action: ToolbarAction,
    pub title: &'static str,
    pub active: bool,
    pub enabled: bool,
}

impl Button {
    fn new(action: ToolbarAction, title: &'static str) -> Self {
        Self { action, title, active: false, enabled: true }
    }

    fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolbar {
    pub open_picker: Option<Picker>,
    pub selected_color: Option<Color>,
    pub selected_background: Option<Color>,
}

impl Toolbar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a click. Returns whether the document changed.
    pub fn trigger(&mut self, editor: &mut EditorCore, action: ToolbarAction) -> bool {
        match &action {
            ToolbarAction::TogglePicker(picker) => {
                self.open_picker = if self.open_picker == Some(*picker) { None } else { Some(*picker) };
                return false;
            }
            ToolbarAction::PickTextColor(color) => {
                self.selected_color = Some(color.clone());
                self.open_picker = None;
            }
            ToolbarAction::ResetTextColor | ToolbarAction::ClearCellBackground => self.open_picker = None,
            ToolbarAction::PickCellBackground(color) => {
                self.selected_background = Some(color.clone());
                self.open_picker = None;
            }
            _ => {}
        }
        match action.command() {
            Some(cmd) => editor.apply(&cmd),
            None => false,
        }
    }

    /// Buttons in display order. Table controls appear only while the
    /// selection is inside a table.
    pub fn buttons(&self, editor: &EditorCore) -> Vec<Button> {
        let mut out = vec![
            Button::new(ToolbarAction::Bold, "Bold").active(editor.is_mark_active(MarkKind::Bold)),
            Button::new(ToolbarAction::Italic, "Italic").active(editor.is_mark_active(MarkKind::Italic)),
            Button::new(ToolbarAction::Strike, "Strikethrough").active(editor.is_mark_active(MarkKind::Strike)),
        ];
        for (level, title) in [(1, "Heading 1"), (2, "Heading 2"), (3, "Heading 3")] {
            let active = editor.is_block_active(BlockType::Heading { level });
            out.push(Button::new(ToolbarAction::Heading(level), title).active(active));
        }
        out.extend([
            Button::new(ToolbarAction::BulletList, "Bullet list").active(editor.is_block_active(BlockType::BulletList)),
            Button::new(ToolbarAction::OrderedList, "Numbered list")
                .active(editor.is_block_active(BlockType::OrderedList)),
            Button::new(ToolbarAction::Blockquote, "Quote").active(editor.is_block_active(BlockType::Blockquote)),
            Button::new(ToolbarAction::TogglePicker(Picker::TextColor), "Text color")
                .active(self.open_picker == Some(Picker::TextColor)),
            Button::new(ToolbarAction::InsertTable, "Insert table").enabled(!editor.in_table()),
            Button::new(ToolbarAction::AddColumnBefore, "Add column before"),
            Button::new(ToolbarAction::AddColumnAfter, "Add column after"),
            Button::new(ToolbarAction::DeleteColumn, "Delete column"),
            Button::new(ToolbarAction::AddRowBefore, "Add row before"),
            Button::new(ToolbarAction::AddRowAfter, "Add row after"),
            Button::new(ToolbarAction::DeleteRow, "Delete row"),
            Button::new(ToolbarAction::MergeCells, "Merge cells"),
            Button::new(ToolbarAction::SplitCell, "Split cell"),
            Button::new(ToolbarAction::TogglePicker(Picker::CellBackground), "Cell background color")
                .active(self.open_picker == Some(Picker::CellBackground)),
            Button::new(ToolbarAction::ShowBorder, "Show border"),
            Button::new(ToolbarAction::HideBorder, "Hide border"),
            Button::new(ToolbarAction::DeleteTable, "Delete table"),
        ]);
        if !editor.in_table() {
            out.retain(|b| !b.action.needs_table());
        }
        out.extend([
            Button::new(ToolbarAction::UploadImage, "Upload image file")
                .enabled(editor.state() != SessionState::Uploading),
            Button::new(ToolbarAction::Undo, "Undo").enabled(editor.can_undo()),
            Button::new(ToolbarAction::Redo, "Redo").enabled(editor.can_redo()),
        ]);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    ShowBorder,
    HideBorder,
    MergeCells,
    SplitCell,
    AddRowBefore,
    AddRowAfter,
    AddColumnBefore,
    AddColumnAfter,
    DeleteRow,
    DeleteColumn,
    DeleteTable,
}

impl MenuItem {
    pub const ALL: [MenuItem; 11] = [
        MenuItem::ShowBorder,
        MenuItem::HideBorder,
        MenuItem::MergeCells,
        MenuItem::SplitCell,
        MenuItem::AddRowBefore,
        MenuItem::AddRowAfter,
        MenuItem::AddColumnBefore,
        MenuItem::AddColumnAfter,
        MenuItem::DeleteRow,
        MenuItem::DeleteColumn,
        MenuItem::DeleteTable,
    ];

    pub fn command(self) -> Command {
        match self {
            MenuItem::ShowBorder => Command::SetCellBorder { border: BorderStyle::Solid },
            MenuItem::HideBorder => Command::SetCellBorder { border: BorderStyle::None },
            MenuItem::MergeCells => Command::MergeCells,
            MenuItem::SplitCell => Command::SplitCell,
            MenuItem::AddRowBefore => Command::AddRowBefore,
            MenuItem::AddRowAfter => Command::AddRowAfter,
            MenuItem::AddColumnBefore => Command::AddColumnBefore,
            MenuItem::AddColumnAfter => Command::AddColumnAfter,
            MenuItem::DeleteRow => Command::DeleteRow,
            MenuItem::DeleteColumn => Command::DeleteColumn,
            MenuItem::DeleteTable => Command::DeleteTable,
        }
    }
}

/// Right-click menu for table cells.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContextMenu {
    position: Option<(f64, f64)>,
}

impl ContextMenu {
    /// Opens at the click position when the selection is in a table cell.
    /// Returns whether the click was taken.
    pub fn open_at(&mut self, editor: &EditorCore, x: f64, y: f64) -> bool {
        if !editor.in_table() {
            return false;
        }
        self.position = Some((x, y));
        true
    }

    pub fn is_open(&self) -> bool {
        self.position.is_some()
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        self.position
    }

    pub fn close(&mut self) {
        self.position = None;
    }

    pub fn items(&self) -> &'static [MenuItem] {
        if self.is_open() {
            &MenuItem::ALL[..]
        } else {
            &[]
        }
    }

    /// Applies the item and closes the menu.
    pub fn select(&mut self, editor: &mut EditorCore, item: MenuItem) -> bool {
        if !self.is_open() {
            return false;
        }
        self.close();
        editor.apply(&item.command())
    }

    /// "Background color" entry; `input` is the color typed by the user.
    /// Invalid input keeps the menu open and changes nothing.
    pub fn select_background(&mut self, editor: &mut EditorCore, input: &str) -> bool {
        let Some(color) = Color::parse(input) else { return false };
        if !self.is_open() {
            return false;
        }
        self.close();
        editor.apply(&Command::SetCellBackground { color: Some(color) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;
    use crate::EditorConfig;

    fn table_editor() -> EditorCore {
        let mut editor = EditorCore::new(EditorConfig::default(), "<p>intro</p>");
        editor.apply(&Command::InsertTable { rows: 2, cols: 2, with_header_row: true });
        editor
    }

    #[test]
    fn toolbar_and_menu_issue_the_same_commands() {
        let pairs = [
            (ToolbarAction::MergeCells, MenuItem::MergeCells),
            (ToolbarAction::SplitCell, MenuItem::SplitCell),
            (ToolbarAction::AddRowBefore, MenuItem::AddRowBefore),
            (ToolbarAction::AddRowAfter, MenuItem::AddRowAfter),
            (ToolbarAction::AddColumnBefore, MenuItem::AddColumnBefore),
            (ToolbarAction::AddColumnAfter, MenuItem::AddColumnAfter),
            (ToolbarAction::DeleteRow, MenuItem::DeleteRow),
            (ToolbarAction::DeleteColumn, MenuItem::DeleteColumn),
            (ToolbarAction::DeleteTable, MenuItem::DeleteTable),
            (ToolbarAction::ShowBorder, MenuItem::ShowBorder),
            (ToolbarAction::HideBorder, MenuItem::HideBorder),
        ];
        for (action, item) in pairs {
            assert_eq!(action.command(), Some(item.command()));
        }
    }

    #[test]
    fn toolbar_and_menu_edits_match() {
        let mut by_toolbar = table_editor();
        let mut by_menu = table_editor();
        assert!(Toolbar::new().trigger(&mut by_toolbar, ToolbarAction::AddColumnAfter));
        let mut menu = ContextMenu::default();
        assert!(menu.open_at(&by_menu, 10.0, 20.0));
        assert!(menu.select(&mut by_menu, MenuItem::AddColumnAfter));
        assert_eq!(by_toolbar.to_html(), by_menu.to_html());
        assert!(!menu.is_open());
    }

    #[test]
    fn context_menu_opens_only_in_tables() {
        let mut editor = table_editor();
        let mut menu = ContextMenu::default();
        assert!(menu.open_at(&editor, 4.0, 8.0));
        assert_eq!(menu.position(), Some((4.0, 8.0)));
        assert_eq!(menu.items().len(), 11);
        menu.close();
        editor.set_selection(Selection::cursor(vec![0], 0));
        assert!(!menu.open_at(&editor, 1.0, 1.0));
        assert!(menu.items().is_empty());
    }

    #[test]
    fn background_prompt_validates_input() {
        let mut editor = table_editor();
        let mut menu = ContextMenu::default();
        menu.open_at(&editor, 0.0, 0.0);
        assert!(!menu.select_background(&mut editor, "not a color;"));
        assert!(menu.is_open());
        assert!(menu.select_background(&mut editor, "#FEF3C7"));
        assert!(editor.to_html().contains("data-background-color=\"#fef3c7\""));
    }

    #[test]
    fn pickers_track_last_choice() {
        let mut editor = table_editor();
        let mut toolbar = Toolbar::new();
        toolbar.trigger(&mut editor, ToolbarAction::TogglePicker(Picker::CellBackground));
        assert_eq!(toolbar.open_picker, Some(Picker::CellBackground));
        let blue = Picker::CellBackground.palette()[2].clone();
        assert!(toolbar.trigger(&mut editor, ToolbarAction::PickCellBackground(blue.clone())));
        assert_eq!(toolbar.selected_background, Some(blue));
        assert_eq!(toolbar.open_picker, None);
        assert!(toolbar.trigger(&mut editor, ToolbarAction::ClearCellBackground));
        assert!(editor.to_html().contains("background-color: transparent"));
    }

    #[test]
    fn buttons_reflect_session_state() {
        let mut editor = EditorCore::new(EditorConfig::default(), "<p>x</p>");
        let toolbar = Toolbar::new();
        let undo = |buttons: &[Button]| buttons.iter().find(|b| b.action == ToolbarAction::Undo).map(|b| b.enabled);
        let buttons = toolbar.buttons(&editor);
        assert_eq!(undo(&buttons), Some(false));
        assert!(!buttons.iter().any(|b| b.action == ToolbarAction::MergeCells));
        assert!(!buttons.iter().any(|b| b.action.needs_table()));

        editor.apply(&Command::InsertTable { rows: 3, cols: 3, with_header_row: true });
        let buttons = toolbar.buttons(&editor);
        assert_eq!(undo(&buttons), Some(true));
        assert!(buttons.iter().any(|b| b.action == ToolbarAction::MergeCells));
        assert!(buttons.iter().any(|b| b.action == ToolbarAction::InsertTable && !b.enabled));
        assert_eq!(buttons.iter().filter(|b| b.action.needs_table()).count(), 12);
        assert!(MenuItem::ALL.iter().all(|item| item.command().needs_table()));
    }
}
