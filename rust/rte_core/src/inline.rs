//! Inline run helpers. Offsets count characters, not bytes.

use crate::doc::{InlineRun, Marks};

pub fn char_len(runs: &[InlineRun]) -> usize {
    runs.iter().map(|r| r.text.chars().count()).sum()
}

/// Drops empty runs and merges neighbours that carry identical marks.
pub fn normalize_runs(runs: &mut Vec<InlineRun>) {
    let mut out: Vec<InlineRun> = Vec::with_capacity(runs.len());
    for run in runs.drain(..) {
        if run.text.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(prev) if prev.marks == run.marks => prev.text.push_str(&run.text),
            _ => out.push(run),
        }
    }
    *runs = out;
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map(|(b, _)| b).unwrap_or(text.len())
}

/// Splits the run containing `offset` so a run boundary falls there and
/// returns the index of the first run starting at or after it.
pub fn split_at(runs: &mut Vec<InlineRun>, offset: usize) -> usize {
    let mut pos = 0;
    for i in 0..runs.len() {
        if offset == pos {
            return i;
        }
        let len = runs[i].text.chars().count();
        if offset < pos + len {
            let at = byte_offset(&runs[i].text, offset - pos);
            let tail = runs[i].text.split_off(at);
            let marks = runs[i].marks.clone();
            runs.insert(i + 1, InlineRun { text: tail, marks });
            return i + 1;
        }
        pos += len;
    }
    runs.len()
}

/// Applies `f` to the marks of every character in `start..end`.
pub fn update_marks(runs: &mut Vec<InlineRun>, start: usize, end: usize, mut f: impl FnMut(&mut Marks)) {
    if start >= end {
        return;
    }
    let from = split_at(runs, start);
    let to = split_at(runs, end);
    for run in &mut runs[from..to] {
        f(&mut run.marks);
    }
    normalize_runs(runs);
}

/// True when every character in `start..end` satisfies `pred`.
pub fn all_match(runs: &[InlineRun], start: usize, end: usize, pred: impl Fn(&Marks) -> bool) -> bool {
    let mut pos = 0;
    for run in runs {
        let len = run.text.chars().count();
        let (s, e) = (pos.max(start), (pos + len).min(end));
        if s < e && !pred(&run.marks) {
            return false;
        }
        pos += len;
    }
    true
}

/// Marks a character typed at `offset` inherits.
pub fn marks_at(runs: &[InlineRun], offset: usize) -> Marks {
    let mut pos = 0;
    for run in runs {
        let len = run.text.chars().count();
        if offset > pos && offset <= pos + len {
            return run.marks.clone();
        }
        pos += len;
    }
    runs.first().map(|r| r.marks.clone()).unwrap_or_default()
}

pub fn insert_text(runs: &mut Vec<InlineRun>, offset: usize, text: &str, marks: Marks) {
    let at = split_at(runs, offset);
    runs.insert(at, InlineRun { text: text.to_string(), marks });
    normalize_runs(runs);
}

pub fn delete_range(runs: &mut Vec<InlineRun>, start: usize, end: usize) {
    if start >= end {
        return;
    }
    let from = split_at(runs, start);
    let to = split_at(runs, end);
    runs.drain(from..to);
    normalize_runs(runs);
}

/// Cuts the runs at `offset`, returning everything after it.
pub fn split_off(runs: &mut Vec<InlineRun>, offset: usize) -> Vec<InlineRun> {
    let at = split_at(runs, offset);
    let mut tail = runs.split_off(at);
    normalize_runs(runs);
    normalize_runs(&mut tail);
    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> Marks {
        Marks { bold: true, ..Marks::default() }
    }

    #[test]
    fn normalize_merges_equal_neighbours() {
        let mut runs = vec![
            InlineRun::plain("ab"),
            InlineRun::plain(""),
            InlineRun::plain("c"),
            InlineRun::styled("d", bold()),
        ];
        normalize_runs(&mut runs);
        assert_eq!(runs, vec![InlineRun::plain("abc"), InlineRun::styled("d", bold())]);
    }

    #[test]
    fn update_marks_splits_inside_multibyte_text() {
        let mut runs = vec![InlineRun::plain("héllo")];
        update_marks(&mut runs, 1, 3, |m| m.bold = true);
        assert_eq!(
            runs,
            vec![InlineRun::plain("h"), InlineRun::styled("él", bold()), InlineRun::plain("lo")]
        );
        update_marks(&mut runs, 0, 5, |m| m.bold = false);
        assert_eq!(runs, vec![InlineRun::plain("héllo")]);
    }

    #[test]
    fn all_match_only_looks_inside_range() {
        let runs = vec![InlineRun::plain("ab"), InlineRun::styled("cd", bold())];
        assert!(all_match(&runs, 2, 4, |m| m.bold));
        assert!(!all_match(&runs, 1, 4, |m| m.bold));
    }

    #[test]
    fn typed_text_inherits_marks_before_cursor() {
        let runs = vec![InlineRun::plain("ab"), InlineRun::styled("cd", bold())];
        assert_eq!(marks_at(&runs, 2), Marks::default());
        assert_eq!(marks_at(&runs, 3), bold());
        assert_eq!(marks_at(&runs, 0), Marks::default());
    }

    #[test]
    fn insert_delete_and_split() {
        let mut runs = vec![InlineRun::plain("held")];
        insert_text(&mut runs, 2, "l", Marks::default());
        assert_eq!(runs, vec![InlineRun::plain("helld")]);
        delete_range(&mut runs, 4, 5);
        assert_eq!(runs, vec![InlineRun::plain("hell")]);
        let tail = split_off(&mut runs, 1);
        assert_eq!(runs, vec![InlineRun::plain("h")]);
        assert_eq!(tail, vec![InlineRun::plain("ell")]);
        let rest = split_off(&mut runs, 1);
        assert!(rest.is_empty());
    }
}
