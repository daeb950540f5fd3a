use std::collections::VecDeque;
use std::fmt;

use crossterm::style::Stylize;
use similar::{Algorithm, DiffOp, DiffTag, capture_diff_slices, group_diff_ops};
use unicode_width::UnicodeWidthChar;

pub const CONTEXT_LINES: usize = 3;
pub const FALLBACK_COLUMNS: usize = 80;
const TAB_SIZE: usize = 8;
const LINE_NUMBER_WIDTH: usize = 5;
const GUTTER: &str = "  ";
/// Narrowest terminal that still fits two numbered columns; below it the
/// unified layout is used.
pub const MIN_SIDE_BY_SIDE_COLUMNS: usize = 2 * (LINE_NUMBER_WIDTH + 2) + GUTTER.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    Unified,
    SideBySide { columns: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    FileHeader,
    HunkHeader,
    Added,
    Removed,
    Changed,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub kind: LineKind,
    pub text: String,
}

impl DisplayLine {
    fn new(kind: LineKind, text: String) -> Self {
        Self { kind, text }
    }

    /// Text with ANSI styling for terminal output.
    pub fn styled(&self) -> String {
        let text = self.text.as_str();
        match self.kind {
            LineKind::FileHeader => text.white().bold().to_string(),
            LineKind::HunkHeader => text.cyan().bold().to_string(),
            LineKind::Added => text.green().bold().to_string(),
            LineKind::Removed => text.red().bold().to_string(),
            LineKind::Changed => text.yellow().bold().to_string(),
            LineKind::Context => text.to_string(),
        }
    }
}

impl fmt::Display for DisplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Width of the controlling terminal, or 80 when it cannot be determined.
pub fn terminal_columns() -> usize {
    crossterm::terminal::size()
        .ok()
        .map(|(columns, _)| columns as usize)
        .filter(|columns| *columns > 0)
        .unwrap_or(FALLBACK_COLUMNS)
}

/// Renders the difference between `old` and `new`. Identical inputs yield no lines.
pub fn render<'a>(
    old: &'a [&'a str],
    new: &'a [&'a str],
    label: &'a str,
    mode: DiffMode,
) -> DiffLines<'a> {
    let mode = match mode {
        DiffMode::SideBySide { columns } if columns < MIN_SIDE_BY_SIDE_COLUMNS => {
            DiffMode::Unified
        }
        mode => mode,
    };
    let ops = capture_diff_slices(Algorithm::Myers, old, new);
    let groups: VecDeque<Vec<DiffOp>> = group_diff_ops(ops, CONTEXT_LINES)
        .into_iter()
        .filter(|group| group.iter().any(|op| op.tag() != DiffTag::Equal))
        .collect();
    DiffLines {
        old,
        new,
        label,
        mode,
        groups,
        header_done: false,
        pending: VecDeque::new(),
    }
}

/// Lazily rendered diff, one hunk at a time.
pub struct DiffLines<'a> {
    old: &'a [&'a str],
    new: &'a [&'a str],
    label: &'a str,
    mode: DiffMode,
    groups: VecDeque<Vec<DiffOp>>,
    header_done: bool,
    pending: VecDeque<DisplayLine>,
}

impl Iterator for DiffLines<'_> {
    type Item = DisplayLine;

    fn next(&mut self) -> Option<DisplayLine> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(line);
            }
            if self.groups.is_empty() {
                return None;
            }
            if !self.header_done {
                self.header_done = true;
                self.push_header();
                continue;
            }
            let group = self.groups.pop_front()?;
            self.push_group(&group);
        }
    }
}

impl DiffLines<'_> {
    fn push_header(&mut self) {
        match self.mode {
            DiffMode::Unified => {
                let label = self.label;
                self.pending.extend([
                    DisplayLine::new(LineKind::FileHeader, format!("--- {label}")),
                    DisplayLine::new(LineKind::FileHeader, format!("+++ {label}")),
                ]);
            }
            DiffMode::SideBySide { columns } => {
                let half = half_width(columns);
                let text = [fit(self.label, half), fit(self.label, half)].join(GUTTER);
                self.pending
                    .push_back(DisplayLine::new(LineKind::FileHeader, text.trim_end().to_string()));
            }
        }
    }

    fn push_group(&mut self, group: &[DiffOp]) {
        self.pending
            .push_back(DisplayLine::new(LineKind::HunkHeader, hunk_header(group)));
        let (all_old, all_new) = (self.old, self.new);
        for op in group {
            let old = &all_old[op.old_range()];
            let new = &all_new[op.new_range()];
            match self.mode {
                DiffMode::Unified => self.push_unified(op.tag(), old, new),
                DiffMode::SideBySide { columns } => {
                    self.push_side_by_side(op, old, new, columns)
                }
            }
        }
    }

    fn push_unified(&mut self, tag: DiffTag, old: &[&str], new: &[&str]) {
        let removed = old
            .iter()
            .map(|line| DisplayLine::new(LineKind::Removed, format!("-{line}")));
        let added = new
            .iter()
            .map(|line| DisplayLine::new(LineKind::Added, format!("+{line}")));
        match tag {
            DiffTag::Equal => self.pending.extend(
                old.iter()
                    .map(|line| DisplayLine::new(LineKind::Context, format!(" {line}"))),
            ),
            DiffTag::Delete => self.pending.extend(removed),
            DiffTag::Insert => self.pending.extend(added),
            DiffTag::Replace => {
                self.pending.extend(removed);
                self.pending.extend(added);
            }
        }
    }

    fn push_side_by_side(&mut self, op: &DiffOp, old: &[&str], new: &[&str], columns: usize) {
        let half = half_width(columns);
        let old_start = op.old_range().start;
        let new_start = op.new_range().start;
        let rows = old.len().max(new.len());
        for idx in 0..rows {
            let left = old.get(idx).map(|line| (old_start + idx + 1, *line));
            let right = new.get(idx).map(|line| (new_start + idx + 1, *line));
            let kind = match (op.tag(), left.is_some(), right.is_some()) {
                (DiffTag::Equal, _, _) => LineKind::Context,
                (_, true, true) => LineKind::Changed,
                (_, true, false) => LineKind::Removed,
                _ => LineKind::Added,
            };
            let text = [side_cell(left, half), side_cell(right, half)].join(GUTTER);
            self.pending
                .push_back(DisplayLine::new(kind, text.trim_end().to_string()));
        }
    }
}

fn half_width(columns: usize) -> usize {
    columns.saturating_sub(GUTTER.len()) / 2
}

fn side_cell(line: Option<(usize, &str)>, half: usize) -> String {
    let text_width = half - LINE_NUMBER_WIDTH - 1;
    match line {
        Some((number, text)) => format!(
            "{number:>width$} {}",
            fit(&expand_tabs(text), text_width),
            width = LINE_NUMBER_WIDTH
        ),
        None => " ".repeat(half),
    }
}

/// Truncates or pads `text` to exactly `width` terminal columns.
fn fit(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out.extend(std::iter::repeat_n(' ', width - used));
    out
}

fn expand_tabs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0;
    for ch in text.chars() {
        if ch == '\t' {
            let spaces = TAB_SIZE - column % TAB_SIZE;
            out.extend(std::iter::repeat_n(' ', spaces));
            column += spaces;
        } else {
            out.push(ch);
            column += ch.width().unwrap_or(0);
        }
    }
    out
}

fn hunk_header(group: &[DiffOp]) -> String {
    let (Some(first), Some(last)) = (group.first(), group.last()) else {
        return "@@ @@".to_string();
    };
    let old = unified_range(first.old_range().start, last.old_range().end);
    let new = unified_range(first.new_range().start, last.new_range().end);
    format!("@@ -{old} +{new} @@")
}

fn unified_range(start: usize, end: usize) -> String {
    let length = end - start;
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{length}", start + 1),
    }
}
