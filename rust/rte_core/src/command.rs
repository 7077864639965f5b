//! Serializable editor commands, the single surface the toolbar, the
//! context menu and the host adapters drive the session through.

use serde::{Deserialize, Serialize};

use crate::doc::{BorderStyle, Color, MarkKind};
use crate::ops::BlockType;

fn with_header_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    ToggleMark { mark: MarkKind },
    /// `None` removes the color mark.
    SetTextColor {
        #[serde(default)]
        color: Option<Color>,
    },
    SetBlockType { block: BlockType },
    ToggleBlockType { block: BlockType },
    InsertImage {
        src: String,
        #[serde(default)]
        alt: Option<String>,
    },
    InsertTable {
        rows: usize,
        cols: usize,
        #[serde(default = "with_header_default")]
        with_header_row: bool,
    },
    AddRowBefore,
    AddRowAfter,
    DeleteRow,
    AddColumnBefore,
    AddColumnAfter,
    DeleteColumn,
    MergeCells,
    SplitCell,
    DeleteTable,
    SetCellBackground {
        #[serde(default)]
        color: Option<Color>,
    },
    SetCellBorder { border: BorderStyle },
    SplitBlock,
    Undo,
    Redo,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ToggleMark { .. } => "toggle_mark",
            Command::SetTextColor { .. } => "set_text_color",
            Command::SetBlockType { .. } => "set_block_type",
            Command::ToggleBlockType { .. } => "toggle_block_type",
            Command::InsertImage { .. } => "insert_image",
            Command::InsertTable { .. } => "insert_table",
            Command::AddRowBefore => "add_row_before",
            Command::AddRowAfter => "add_row_after",
            Command::DeleteRow => "delete_row",
            Command::AddColumnBefore => "add_column_before",
            Command::AddColumnAfter => "add_column_after",
            Command::DeleteColumn => "delete_column",
            Command::MergeCells => "merge_cells",
            Command::SplitCell => "split_cell",
            Command::DeleteTable => "delete_table",
            Command::SetCellBackground { .. } => "set_cell_background",
            Command::SetCellBorder { .. } => "set_cell_border",
            Command::SplitBlock => "split_block",
            Command::Undo => "undo",
            Command::Redo => "redo",
        }
    }

    /// Commands that only make sense with the selection inside a table.
    pub fn needs_table(&self) -> bool {
        matches!(
            self,
            Command::AddRowBefore
                | Command::AddRowAfter
                | Command::DeleteRow
                | Command::AddColumnBefore
                | Command::AddColumnAfter
                | Command::DeleteColumn
                | Command::MergeCells
                | Command::SplitCell
                | Command::DeleteTable
                | Command::SetCellBackground { .. }
                | Command::SetCellBorder { .. }
        )
    }

    pub fn from_json(json: &str) -> serde_json::Result<Command> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_is_tagged() {
        let cmd = Command::from_json(r#"{"command":"set_block_type","block":{"kind":"heading","level":2}}"#).unwrap();
        assert_eq!(cmd, Command::SetBlockType { block: BlockType::Heading { level: 2 } });
        let cmd = Command::from_json(r#"{"command":"insert_table","rows":3,"cols":3}"#).unwrap();
        assert_eq!(cmd, Command::InsertTable { rows: 3, cols: 3, with_header_row: true });
        assert_eq!(serde_json::to_string(&Command::AddColumnAfter).unwrap(), r#"{"command":"add_column_after"}"#);
    }

    #[test]
    fn unsafe_colors_are_rejected_on_the_wire() {
        assert!(Command::from_json(r##"{"command":"set_text_color","color":"#16a34a"}"##).is_ok());
        assert!(Command::from_json(r#"{"command":"set_text_color","color":"red\" onload=\"x"}"#).is_err());
        assert_eq!(
            Command::from_json(r#"{"command":"set_cell_background"}"#).unwrap(),
            Command::SetCellBackground { color: None }
        );
    }
}
