//! Bounded undo/redo history of document snapshots.

use crate::doc::Doc;
use crate::selection::Selection;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Document and selection as they were before a change.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub doc: Doc,
    pub selection: Selection,
}

#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// A limit of zero keeps every entry.
    pub fn with_limit(limit: usize) -> Self {
        Self { undo_stack: Vec::new(), redo_stack: Vec::new(), limit }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Record the current state before making a change.
    pub fn record(&mut self, doc: &Doc, selection: &Selection) {
        self.undo_stack.push(HistoryEntry { doc: doc.clone(), selection: selection.clone() });
        if self.limit > 0 && self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..excess);
        }
        self.redo_stack.clear();
    }

    /// Undo into the provided state. Returns true if a change occurred.
    pub fn undo(&mut self, doc: &mut Doc, selection: &mut Selection) -> bool {
        let Some(prev) = self.undo_stack.pop() else { return false };
        self.redo_stack.push(HistoryEntry { doc: std::mem::replace(doc, prev.doc), selection: std::mem::replace(selection, prev.selection) });
        true
    }

    /// Redo into the provided state. Returns true if a change occurred.
    pub fn redo(&mut self, doc: &mut Doc, selection: &mut Selection) -> bool {
        let Some(next) = self.redo_stack.pop() else { return false };
        self.undo_stack.push(HistoryEntry { doc: std::mem::replace(doc, next.doc), selection: std::mem::replace(selection, next.selection) });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Block;

    fn doc(text: &str) -> Doc {
        Doc::new(vec![Block::paragraph(text)])
    }

    #[test]
    fn undo_and_redo_swap_states() {
        let mut history = History::new();
        let mut current = doc("a");
        let mut selection = Selection::default();
        history.record(&current, &selection);
        current = doc("b");
        assert!(history.undo(&mut current, &mut selection));
        assert_eq!(current, doc("a"));
        assert!(history.can_redo());
        assert!(history.redo(&mut current, &mut selection));
        assert_eq!(current, doc("b"));
        assert!(!history.redo(&mut current, &mut selection));
    }

    #[test]
    fn recording_clears_redo() {
        let mut history = History::new();
        let mut current = doc("a");
        let mut selection = Selection::default();
        history.record(&current, &selection);
        current = doc("b");
        history.undo(&mut current, &mut selection);
        history.record(&current, &selection);
        assert!(!history.can_redo());
    }

    #[test]
    fn limit_drops_oldest_entries() {
        let mut history = History::with_limit(2);
        let selection = Selection::default();
        for text in ["a", "b", "c"] {
            history.record(&doc(text), &selection);
        }
        assert_eq!(history.undo_depth(), 2);
        let mut current = doc("d");
        let mut sel = selection.clone();
        history.undo(&mut current, &mut sel);
        history.undo(&mut current, &mut sel);
        assert_eq!(current, doc("b"));
        assert!(!history.can_undo());
    }
}
