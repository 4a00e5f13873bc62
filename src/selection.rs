use crate::screen::Screen;

/// A point in the scrollback-relative coordinate space (row 0 = oldest
/// kept line, growing downward — i.e. `Screen::abs_row`'s space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Normal,
    Word,
    Line,
}

/// Tracks a mouse/keyboard text selection in absolute buffer coordinates so
/// it survives scrolling without adjustment.
#[derive(Debug, Clone, Copy)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
    pub mode: SelectionMode,
    pub active: bool,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            anchor: Position::new(0, 0),
            head: Position::new(0, 0),
            mode: SelectionMode::Normal,
            active: false,
        }
    }
}

const WORD_SEPARATORS: &str = " \t\u{0}()[]{}'\"`,;:!?";

impl Selection {
    pub fn start(&mut self, pos: Position, mode: SelectionMode) {
        self.anchor = pos;
        self.head = pos;
        self.mode = mode;
        self.active = true;
    }

    pub fn extend(&mut self, pos: Position) {
        if self.active {
            self.head = pos;
        }
    }

    pub fn clear(&mut self) {
        self.active = false;
    }

    pub fn is_empty(&self) -> bool {
        !self.active || self.anchor == self.head
    }

    /// Ordered `(start, end)` regardless of drag direction.
    pub fn range(&self) -> (Position, Position) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }

    pub fn select_all(&mut self, screen: &Screen) {
        self.anchor = Position::new(0, 0);
        let last_row = screen.total_lines().saturating_sub(1);
        let last_col = screen.line(last_row).map(|l| l.cols()).unwrap_or(1);
        self.head = Position::new(last_row, last_col.saturating_sub(1));
        self.mode = SelectionMode::Normal;
        self.active = true;
    }

    /// Grow the selection to the word boundaries around `pos` (a click), or
    /// the full bracket-balanced span when `pos` sits on an opening/closing
    /// bracket.
    pub fn select_word(&mut self, screen: &Screen, pos: Position) {
        if let Some((start, end)) = bracket_span(screen, pos) {
            self.anchor = start;
            self.head = end;
            self.mode = SelectionMode::Word;
            self.active = true;
            return;
        }
        let line = match screen.line(pos.row) {
            Some(l) => l,
            None => return,
        };
        let cols = line.cols();
        if cols == 0 {
            return;
        }
        let is_word_char = |c: char| !WORD_SEPARATORS.contains(c);
        let char_at = |col: usize| -> char {
            line.cell(col.min(cols - 1))
                .grapheme
                .chars()
                .next()
                .unwrap_or(' ')
        };
        if !is_word_char(char_at(pos.col)) {
            self.anchor = pos;
            self.head = pos;
            self.mode = SelectionMode::Word;
            self.active = true;
            return;
        }
        let mut start_col = pos.col;
        while start_col > 0 && is_word_char(char_at(start_col - 1)) {
            start_col -= 1;
        }
        let mut end_col = pos.col;
        while end_col + 1 < cols && is_word_char(char_at(end_col + 1)) {
            end_col += 1;
        }
        self.anchor = Position::new(pos.row, start_col);
        self.head = Position::new(pos.row, end_col);
        self.mode = SelectionMode::Word;
        self.active = true;
    }

    pub fn select_line(&mut self, screen: &Screen, row: usize) {
        let cols = screen.line(row).map(|l| l.cols()).unwrap_or(1);
        self.anchor = Position::new(row, 0);
        self.head = Position::new(row, cols.saturating_sub(1));
        self.mode = SelectionMode::Line;
        self.active = true;
    }

    /// Extract the selected text, joining wrapped continuation lines
    /// without a newline and hard line breaks with one.
    pub fn text(&self, screen: &Screen) -> String {
        if self.is_empty() {
            return String::new();
        }
        let (start, end) = self.range();
        let mut out = String::new();
        for row in start.row..=end.row {
            let line = match screen.line(row) {
                Some(l) => l,
                None => continue,
            };
            let cols = line.cols();
            let col_start = if row == start.row { start.col } else { 0 };
            let col_end = if row == end.row {
                (end.col + 1).min(cols)
            } else {
                line.trimmed_length().max(col_start)
            };
            for cell in &line.cells()[col_start.min(cols)..col_end.min(cols)] {
                if cell.width == 0 {
                    continue;
                }
                out.push_str(cell.grapheme.as_str());
            }
            if row != end.row {
                let next_wrapped = screen.line(row + 1).map(|l| l.wrapped).unwrap_or(false);
                if !next_wrapped {
                    out.push('\n');
                }
            }
        }
        out
    }
}

fn matching_bracket(c: char) -> Option<(char, bool)> {
    Some(match c {
        '(' => (')', true),
        ')' => ('(', false),
        '[' => (']', true),
        ']' => ('[', false),
        '{' => ('}', true),
        '}' => ('{', false),
        _ => return None,
    })
}

/// If `pos` sits on a bracket, walk forward/backward tracking nesting depth
/// to find its balanced partner; returns the inclusive span if found.
fn bracket_span(screen: &Screen, pos: Position) -> Option<(Position, Position)> {
    let line = screen.line(pos.row)?;
    let c = line.cell(pos.col.min(line.cols().saturating_sub(1))).grapheme.chars().next()?;
    let (partner, forward) = matching_bracket(c)?;

    let mut depth = 0i32;
    if forward {
        let mut row = pos.row;
        let mut col = pos.col;
        loop {
            let line = screen.line(row)?;
            if col < line.cols() {
                let ch = line.cell(col).grapheme.chars().next().unwrap_or(' ');
                if ch == c {
                    depth += 1;
                } else if ch == partner {
                    depth -= 1;
                    if depth == 0 {
                        return Some((pos, Position::new(row, col)));
                    }
                }
            }
            if col + 1 >= line.cols() {
                row += 1;
                col = 0;
                if row >= screen.total_lines() {
                    return None;
                }
            } else {
                col += 1;
            }
        }
    } else {
        let mut row = pos.row;
        let mut col = pos.col;
        loop {
            let line = screen.line(row)?;
            if col < line.cols() {
                let ch = line.cell(col).grapheme.chars().next().unwrap_or(' ');
                if ch == c {
                    depth += 1;
                } else if ch == partner {
                    depth -= 1;
                    if depth == 0 {
                        return Some((Position::new(row, col), pos));
                    }
                }
            }
            if col == 0 {
                if row == 0 {
                    return None;
                }
                row -= 1;
                col = screen.line(row)?.cols().saturating_sub(1);
            } else {
                col -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Attribute;
    use crate::cell::Cell;

    fn screen_with_text(rows: &[&str], cols: usize) -> Screen {
        let mut s = Screen::new(rows.len(), cols, 0, false);
        for (r, text) in rows.iter().enumerate() {
            for (c, ch) in text.chars().enumerate() {
                s.set_cell(
                    r,
                    c,
                    Cell {
                        grapheme: ch.to_string().into(),
                        width: 1,
                        attr: Attribute::DEFAULT,
                        flags: Default::default(),
                    },
                );
            }
        }
        s
    }

    #[test]
    fn select_word_grows_to_boundaries() {
        let s = screen_with_text(&["hello world"], 20);
        let mut sel = Selection::default();
        sel.select_word(&s, Position::new(0, 7));
        assert_eq!(sel.text(&s), "world");
    }

    #[test]
    fn select_all_spans_every_row() {
        let s = screen_with_text(&["ab", "cd"], 2);
        let mut sel = Selection::default();
        sel.select_all(&s);
        assert_eq!(sel.range(), (Position::new(0, 0), Position::new(1, 1)));
    }

    #[test]
    fn bracket_extension_finds_balanced_partner() {
        let s = screen_with_text(&["foo(bar(baz)qux)end"], 30);
        let mut sel = Selection::default();
        sel.select_word(&s, Position::new(0, 3));
        assert_eq!(sel.text(&s), "(bar(baz)qux)");
    }

    #[test]
    fn text_joins_wrapped_lines_without_newline() {
        let mut s = screen_with_text(&["ab", "cd"], 2);
        s.visible_line_mut(1).wrapped = true;
        let mut sel = Selection::default();
        sel.select_all(&s);
        assert_eq!(sel.text(&s), "abcd");
    }
}
