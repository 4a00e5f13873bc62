use crate::attr::Attribute;
use crate::cell::Cell;
use crate::grid_line::GridLine;
use crate::ring_buffer::RingBuffer;

#[derive(Debug, Clone, Copy)]
pub struct SavedCursor {
    pub x: usize,
    pub y: usize,
    pub attr: Attribute,
    pub origin_mode: bool,
    pub margin_mode: bool,
    pub wraparound: bool,
    pub reverse_wraparound: bool,
}

/// One logical screen: a ring of lines, cursor, scroll/margin state, tab
/// stops, and saved-cursor slot. The Terminal holds one of these for the
/// normal buffer (with scrollback) and one for the alternate buffer (none).
pub struct Screen {
    lines: RingBuffer<GridLine>,
    cols: usize,
    rows: usize,
    pub x: usize,
    pub y: usize,
    pub y_base: usize,
    pub y_disp: usize,
    pub scroll_top: usize,
    pub scroll_bottom: usize,
    pub margin_left: usize,
    pub margin_right: usize,
    tab_stops: Vec<bool>,
    tab_width: usize,
    saved: Option<SavedCursor>,
    has_scrollback: bool,
    dirty_start: Option<usize>,
    dirty_end: Option<usize>,
}

impl Screen {
    pub fn new(rows: usize, cols: usize, scrollback: usize, has_scrollback: bool) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(2);
        let max_len = if has_scrollback {
            rows + scrollback
        } else {
            rows
        };
        let mut lines = RingBuffer::new(max_len);
        for _ in 0..rows {
            lines.push(GridLine::new(cols, Attribute::DEFAULT));
        }
        let tab_width = 8;
        let mut tab_stops = vec![false; cols];
        set_default_tab_stops(&mut tab_stops, tab_width);
        Self {
            lines,
            cols,
            rows,
            x: 0,
            y: 0,
            y_base: 0,
            y_disp: 0,
            scroll_top: 0,
            scroll_bottom: rows - 1,
            margin_left: 0,
            margin_right: cols - 1,
            tab_stops,
            tab_width,
            saved: None,
            has_scrollback,
            dirty_start: None,
            dirty_end: None,
        }
    }

    /// Rebuild tab stops at every `width`th column, overwriting any custom
    /// stops set via `set_tab_stop`/`clear_tab_stop`. Used at construction
    /// time from configuration and left alone afterward; resizing keeps
    /// whatever width was last configured.
    pub fn set_tab_width(&mut self, width: usize) {
        self.tab_width = width.max(1);
        self.tab_stops = vec![false; self.cols];
        set_default_tab_stops(&mut self.tab_stops, self.tab_width);
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    // ---- dirty range -------------------------------------------------

    pub fn mark_dirty(&mut self, row: usize) {
        self.dirty_start = Some(self.dirty_start.map_or(row, |s| s.min(row)));
        self.dirty_end = Some(self.dirty_end.map_or(row, |e| e.max(row)));
    }

    pub fn mark_dirty_range(&mut self, from: usize, to: usize) {
        for r in from..=to {
            self.mark_dirty(r);
        }
    }

    pub fn mark_all_dirty(&mut self) {
        if self.rows > 0 {
            self.mark_dirty_range(0, self.rows - 1);
        }
    }

    pub fn take_dirty_range(&mut self) -> Option<(usize, usize)> {
        let range = match (self.dirty_start, self.dirty_end) {
            (Some(s), Some(e)) => Some((s, e)),
            _ => None,
        };
        self.dirty_start = None;
        self.dirty_end = None;
        range
    }

    // ---- line access ---------------------------------------------------

    /// Absolute buffer row for a screen-relative row `y` (includes scrollback).
    pub fn abs_row(&self, y: usize) -> usize {
        self.y_base + y
    }

    pub fn line(&self, abs_row: usize) -> Option<&GridLine> {
        self.lines.get(abs_row)
    }

    pub fn line_mut(&mut self, abs_row: usize) -> Option<&mut GridLine> {
        self.lines.get_mut(abs_row)
    }

    pub fn visible_line(&self, y: usize) -> &GridLine {
        self.lines
            .get(self.abs_row(y))
            .expect("visible row within bounds")
    }

    pub fn visible_line_mut(&mut self, y: usize) -> &mut GridLine {
        let row = self.abs_row(y);
        self.mark_dirty(y);
        self.lines.get_mut(row).expect("visible row within bounds")
    }

    pub fn is_viewing_scrollback(&self) -> bool {
        self.y_disp != self.y_base
    }

    /// `y_disp <= y_base + y < y_disp + rows`: the cursor's absolute row
    /// falls within the currently displayed window of the scrollback.
    pub fn is_cursor_in_viewport(&self) -> bool {
        let abs = self.y_base + self.y;
        self.y_disp <= abs && abs < self.y_disp + self.rows
    }

    pub fn scroll_to_bottom(&mut self) {
        self.y_disp = self.y_base;
    }

    pub fn scroll_to(&mut self, y_disp: usize) {
        self.y_disp = y_disp.min(self.y_base);
    }

    // ---- cell writes -----------------------------------------------------

    pub fn set_cell(&mut self, y: usize, x: usize, cell: Cell) {
        if x >= self.cols || y >= self.rows {
            return;
        }
        self.visible_line_mut(y).set_cell(x, cell);
    }

    // ---- cursor motion -----------------------------------------------------

    fn vertical_bounds(&self) -> (usize, usize) {
        (0, self.rows - 1)
    }

    pub fn cursor_up(&mut self, n: usize, origin_mode: bool) {
        let min = if origin_mode { self.scroll_top } else { 0 };
        self.y = self.y.saturating_sub(n).max(min);
    }

    pub fn cursor_down(&mut self, n: usize, origin_mode: bool) {
        let max = if origin_mode {
            self.scroll_bottom
        } else {
            self.vertical_bounds().1
        };
        self.y = (self.y + n).min(max);
    }

    pub fn cursor_forward(&mut self, n: usize) {
        self.x = (self.x + n).min(self.cols - 1);
    }

    pub fn cursor_backward(&mut self, n: usize) {
        self.x = self.x.saturating_sub(n);
    }

    pub fn cursor_to(&mut self, row: usize, col: usize, origin_mode: bool) {
        self.y = if origin_mode {
            (self.scroll_top + row).min(self.scroll_bottom)
        } else {
            row.min(self.rows - 1)
        };
        self.x = if origin_mode {
            (self.margin_left + col).min(self.margin_right)
        } else {
            col.min(self.cols - 1)
        };
    }

    pub fn home_for_origin_mode(&mut self, origin_mode: bool) {
        self.y = if origin_mode { self.scroll_top } else { 0 };
        self.x = if origin_mode { self.margin_left } else { 0 };
    }

    // ---- tabs -----------------------------------------------------

    pub fn set_tab_stop(&mut self, col: usize) {
        if col < self.tab_stops.len() {
            self.tab_stops[col] = true;
        }
    }

    pub fn clear_tab_stop(&mut self, col: usize) {
        if col < self.tab_stops.len() {
            self.tab_stops[col] = false;
        }
    }

    pub fn clear_all_tab_stops(&mut self) {
        for t in self.tab_stops.iter_mut() {
            *t = false;
        }
    }

    /// Next tab stop strictly greater than the current column, or `cols-1`.
    pub fn next_tab_stop(&self) -> usize {
        for i in (self.x + 1)..self.cols {
            if self.tab_stops.get(i).copied().unwrap_or(false) {
                return i;
            }
        }
        self.cols - 1
    }

    /// Largest tab stop strictly less than the current column, or 0.
    /// No extra decrement after the loop.
    pub fn previous_tab_stop(&self) -> usize {
        for i in (0..self.x).rev() {
            if self.tab_stops.get(i).copied().unwrap_or(false) {
                return i;
            }
        }
        0
    }

    // ---- erase -----------------------------------------------------

    pub fn erase_line(&mut self, mode: u16, erase_attr: Attribute) {
        let (start, end) = match mode {
            0 => (self.x, self.cols),
            1 => (0, self.x + 1),
            2 => (0, self.cols),
            _ => return,
        };
        let blank = Cell::blank(erase_attr);
        self.visible_line_mut(self.y)
            .replace_cells(start, end.min(self.cols), blank);
    }

    pub fn erase_display(&mut self, mode: u16, erase_attr: Attribute) {
        let blank = Cell::blank(erase_attr);
        match mode {
            0 => {
                let y = self.y;
                self.visible_line_mut(y).replace_cells(self.x, self.cols, blank.clone());
                for row in (y + 1)..self.rows {
                    self.visible_line_mut(row).replace_cells(0, self.cols, blank.clone());
                }
            }
            1 => {
                for row in 0..self.y {
                    self.visible_line_mut(row).replace_cells(0, self.cols, blank.clone());
                }
                let x = self.x;
                let line = self.visible_line_mut(self.y);
                line.replace_cells(0, (x + 1).min(self.cols), blank);
                line.wrapped = false;
            }
            2 => {
                for row in 0..self.rows {
                    self.visible_line_mut(row).replace_cells(0, self.cols, blank.clone());
                }
            }
            3 => {
                let drop = self.lines.len().saturating_sub(self.rows);
                self.lines.trim_start(drop);
                self.y_base = 0;
                self.y_disp = 0;
            }
            _ => {}
        }
    }

    pub fn erase_chars(&mut self, n: usize, erase_attr: Attribute) {
        let end = (self.x + n).min(self.cols);
        let x = self.x;
        self.visible_line_mut(self.y)
            .replace_cells(x, end, Cell::blank(erase_attr));
    }

    /// ICH. When DECLRMM is active, cells pushed past the right margin are
    /// dropped rather than spilling into the rest of the line, so the shift
    /// is bounded at `margin_right + 1`, not the physical line width.
    pub fn insert_chars(&mut self, n: usize, erase_attr: Attribute) {
        let (x, right) = (self.x, (self.margin_right + 1).min(self.cols));
        self.visible_line_mut(self.y)
            .insert_cells_bounded(x, right, n, Cell::blank(erase_attr));
    }

    /// DCH, bounded the same way as `insert_chars`.
    pub fn delete_chars(&mut self, n: usize, erase_attr: Attribute) {
        let (x, right) = (self.x, (self.margin_right + 1).min(self.cols));
        self.visible_line_mut(self.y)
            .delete_cells_bounded(x, right, n, Cell::blank(erase_attr));
    }

    // ---- region scrolling (SU/SD, IL/DL) -----------------------------

    /// Scroll `[top,bottom]` up by one, discarding the top row (no
    /// scrollback capture — used by SU/IL/DL, as opposed to `scroll()`).
    pub fn scroll_region_up(&mut self, top: usize, bottom: usize, n: usize, erase_attr: Attribute) {
        for _ in 0..n {
            let blank = GridLine::new(self.cols, erase_attr);
            let top_abs = self.abs_row(top);
            let bottom_abs = self.abs_row(bottom);
            if top_abs > bottom_abs || bottom_abs >= self.lines.len() {
                return;
            }
            self.lines.shift_elements(top_abs, bottom_abs - top_abs + 1, -1);
            *self.lines.get_mut(bottom_abs).unwrap() = blank;
        }
        self.mark_dirty_range(top, bottom);
    }

    pub fn scroll_region_down(
        &mut self,
        top: usize,
        bottom: usize,
        n: usize,
        erase_attr: Attribute,
    ) {
        for _ in 0..n {
            let blank = GridLine::new(self.cols, erase_attr);
            let top_abs = self.abs_row(top);
            let bottom_abs = self.abs_row(bottom);
            if top_abs > bottom_abs || bottom_abs >= self.lines.len() {
                return;
            }
            self.lines.shift_elements(top_abs, bottom_abs - top_abs + 1, 1);
            *self.lines.get_mut(top_abs).unwrap() = blank;
        }
        self.mark_dirty_range(top, bottom);
    }

    pub fn insert_lines(&mut self, n: usize, erase_attr: Attribute) {
        if self.y < self.scroll_top || self.y > self.scroll_bottom {
            return;
        }
        self.scroll_region_down(self.y, self.scroll_bottom, n, erase_attr);
        self.x = 0;
    }

    pub fn delete_lines(&mut self, n: usize, erase_attr: Attribute) {
        if self.y < self.scroll_top || self.y > self.scroll_bottom {
            return;
        }
        self.scroll_region_up(self.y, self.scroll_bottom, n, erase_attr);
        self.x = 0;
    }

    // ---- scroll() / reverse_index, driven by LF/RI/autowrap -----------

    /// Called when `y == scroll_bottom` on LF, or on autowrap past the last
    /// column. Pushes (or recycles) a new blank line at the bottom of the
    /// scroll region, capturing scrollback when `scroll_top == 0`.
    pub fn scroll(&mut self, erase_attr: Attribute, caused_by_wrap: bool) {
        let mut blank = GridLine::new(self.cols, erase_attr);
        blank.wrapped = caused_by_wrap;

        if self.scroll_top == 0 {
            let was_full = self.lines.is_full();
            let bottom_abs = self.abs_row(self.scroll_bottom);
            let user_scrolling = self.is_viewing_scrollback();

            if !self.has_scrollback || bottom_abs == self.lines.len() - 1 {
                self.lines.push(blank);
            } else {
                // scroll_bottom doesn't reach the physical end of the ring
                // (can't happen for the primary scroll region but guards
                // against a narrowed bottom margin being used here).
                self.lines.trim_start(0);
                self.lines.push(blank);
            }

            if !was_full {
                self.y_base += 1;
                if !user_scrolling {
                    self.y_disp += 1;
                }
            } else if user_scrolling {
                self.y_disp = self.y_disp.saturating_sub(1);
            }
        } else {
            let top_abs = self.abs_row(self.scroll_top);
            let bottom_abs = self.abs_row(self.scroll_bottom);
            self.lines
                .shift_elements(top_abs, bottom_abs - top_abs + 1, -1);
            *self.lines.get_mut(bottom_abs).unwrap() = blank;
        }
        self.mark_all_dirty();
    }

    pub fn reverse_index(&mut self, erase_attr: Attribute) {
        if self.y == self.scroll_top {
            self.scroll_region_down(self.scroll_top, self.scroll_bottom, 1, erase_attr);
        } else if self.y > 0 {
            self.y -= 1;
        }
    }

    pub fn linefeed(&mut self, erase_attr: Attribute) {
        if self.y == self.scroll_bottom {
            self.scroll(erase_attr, false);
        } else if self.y < self.rows - 1 {
            self.y += 1;
        }
    }

    /// Like `linefeed`, but used when autowrap pushes the cursor past the
    /// last column rather than an explicit LF/IND: the landing row is
    /// marked `wrapped` so reflow treats it as a continuation, not a hard
    /// line break.
    pub fn wrap_to_next_line(&mut self, erase_attr: Attribute) {
        if self.y == self.scroll_bottom {
            self.scroll(erase_attr, true);
        } else if self.y < self.rows - 1 {
            self.y += 1;
            self.visible_line_mut(self.y).wrapped = true;
        }
    }

    // ---- save/restore -----------------------------------------------------

    pub fn save_cursor(&mut self, attr: Attribute, origin_mode: bool, margin_mode: bool, wraparound: bool, reverse_wraparound: bool) {
        self.saved = Some(SavedCursor {
            x: self.x,
            y: self.y,
            attr,
            origin_mode,
            margin_mode,
            wraparound,
            reverse_wraparound,
        });
    }

    pub fn saved_cursor(&self) -> Option<SavedCursor> {
        self.saved
    }

    pub fn restore_cursor(&mut self) -> Option<SavedCursor> {
        if let Some(saved) = self.saved {
            self.x = saved.x.min(self.cols - 1);
            self.y = saved.y.min(self.rows - 1);
        }
        self.saved
    }

    // ---- scroll region / margins -----------------------------------------------------

    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        if top < bottom && bottom < self.rows {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
        }
    }

    pub fn reset_scroll_region(&mut self) {
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
    }

    pub fn set_margins(&mut self, left: usize, right: usize) {
        if left < right && right < self.cols {
            self.margin_left = left;
            self.margin_right = right;
        }
    }

    pub fn reset_margins(&mut self) {
        self.margin_left = 0;
        self.margin_right = self.cols - 1;
    }

    // ---- resize / reflow -----------------------------------------------------

    pub fn resize(&mut self, new_rows: usize, new_cols: usize, reflow: bool) {
        let new_rows = new_rows.max(1);
        let new_cols = new_cols.max(2);

        if reflow && self.has_scrollback && new_cols != self.cols {
            self.reflow_columns(new_cols);
        } else {
            for i in 0..self.lines.len() {
                if let Some(line) = self.lines.get_mut(i) {
                    line.resize(new_cols, Cell::blank(Attribute::DEFAULT));
                }
            }
        }

        let max_len = if self.has_scrollback {
            new_rows + (self.lines.max_len().saturating_sub(self.rows))
        } else {
            new_rows
        };
        self.resize_rows(new_rows, max_len);

        self.cols = new_cols;
        self.rows = new_rows;
        self.scroll_top = 0;
        self.scroll_bottom = new_rows - 1;
        self.margin_left = 0;
        self.margin_right = new_cols - 1;
        self.tab_stops = vec![false; new_cols];
        set_default_tab_stops(&mut self.tab_stops, self.tab_width);
        self.x = self.x.min(self.cols - 1);
        self.y = self.y.min(self.rows - 1);
        if let Some(s) = self.saved.as_mut() {
            s.x = s.x.min(self.cols - 1);
            s.y = s.y.min(self.rows - 1);
        }
        self.mark_all_dirty();
    }

    /// Grow/shrink the visible row count, pulling rows from (or pushing
    /// rows into) scrollback to preserve the cursor's screen position.
    fn resize_rows(&mut self, new_rows: usize, new_max_len: usize) {
        if new_max_len != self.lines.max_len() {
            self.change_capacity(new_max_len);
        }

        if new_rows > self.rows {
            let needed = new_rows - self.rows;
            for _ in 0..needed {
                if self.y_base > 0 {
                    self.y_base -= 1;
                    self.y_disp = self.y_disp.min(self.y_base);
                    self.y += 1;
                } else if self.lines.len() < self.lines.max_len() {
                    self.lines.push(GridLine::new(self.cols, Attribute::DEFAULT));
                } else {
                    break;
                }
            }
        } else if new_rows < self.rows {
            let excess = self.rows - new_rows;
            for _ in 0..excess {
                let bottom_abs = self.abs_row(self.rows - 1);
                let is_blank = self
                    .lines
                    .get(bottom_abs)
                    .map(|l| l.trimmed_length() == 0)
                    .unwrap_or(true);
                if is_blank && self.y < new_rows.saturating_sub(1) {
                    self.lines.pop();
                } else {
                    self.y_base += 1;
                    self.y_disp = self.y_disp.min(self.y_base);
                }
            }
        }
    }

    fn change_capacity(&mut self, new_max_len: usize) {
        let mut items: Vec<GridLine> = Vec::with_capacity(self.lines.len());
        for i in 0..self.lines.len() {
            if let Some(l) = self.lines.get(i) {
                items.push(l.clone());
            }
        }
        let drop = items.len().saturating_sub(new_max_len);
        if drop > 0 {
            items.drain(0..drop);
            self.y_base = self.y_base.saturating_sub(drop);
            self.y_disp = self.y_disp.saturating_sub(drop).min(self.y_base);
        }
        let mut new_ring = RingBuffer::new(new_max_len);
        for item in items {
            new_ring.push(item);
        }
        self.lines = new_ring;
    }

    /// Reflow all logical (wrap-joined) lines to a new column count, in
    /// place, preserving which absolute row the cursor's logical offset
    /// lands on.
    fn reflow_columns(&mut self, new_cols: usize) {
        let total = self.lines.len();
        let cursor_abs = self.abs_row(self.y);
        let mut cursor_offset_in_logical: Option<(usize, usize)> = None;

        // Group existing physical lines into logical lines (runs ending in
        // a line whose `wrapped` flag is false, i.e. a hard line break).
        let mut logical_lines: Vec<Vec<GridLine>> = Vec::new();
        let mut current: Vec<GridLine> = Vec::new();
        for i in 0..total {
            let line = self.lines.get(i).unwrap().clone();
            let is_start_of_new_logical = !line.wrapped;
            if is_start_of_new_logical && !current.is_empty() {
                logical_lines.push(std::mem::take(&mut current));
            }
            if i == cursor_abs {
                cursor_offset_in_logical = Some((logical_lines.len(), current.len()));
            }
            current.push(line);
        }
        if !current.is_empty() {
            logical_lines.push(current);
        }

        let mut new_lines: Vec<GridLine> = Vec::new();
        let mut cursor_new_abs = 0usize;
        let mut cursor_new_x = self.x;

        for (logical_idx, physical_lines) in logical_lines.into_iter().enumerate() {
            let is_cursor_logical = cursor_offset_in_logical
                .map(|(li, _)| li == logical_idx)
                .unwrap_or(false);
            let cursor_physical_in_logical = cursor_offset_in_logical.map(|(_, pi)| pi);

            // Flatten to a single logical run of cells, remembering the
            // absolute char offset of the cursor if it's on this logical line.
            let mut flat: Vec<Cell> = Vec::new();
            let mut cursor_char_offset: Option<usize> = None;
            for (pi, line) in physical_lines.iter().enumerate() {
                // A wrapped continuation contributed its full row; the last
                // physical line of the logical line only its real content.
                let take = if pi + 1 < physical_lines.len() {
                    line.cols()
                } else {
                    line.trimmed_length()
                };
                if is_cursor_logical && cursor_physical_in_logical == Some(pi) {
                    cursor_char_offset = Some(flat.len() + self.x.min(line.cols()));
                }
                for cell in line.cells().iter().take(take) {
                    flat.push(cell.clone());
                }
            }
            while flat.last().map(|c| c.is_blank()).unwrap_or(false) {
                flat.pop();
            }

            // Re-wrap `flat` into `new_cols`-wide physical lines, never
            // splitting a wide character across the boundary.
            let mut pos = 0usize;
            let total_len = flat.len();
            let start_new_idx = new_lines.len();
            loop {
                let mut end = (pos + new_cols).min(total_len);
                if end < total_len && end > pos && flat[end - 1].width == 2 {
                    end -= 1;
                }
                let mut gl = GridLine::new(new_cols, Attribute::DEFAULT);
                for (i, cell) in flat[pos..end].iter().enumerate() {
                    gl.set_cell(i, cell.clone());
                }
                gl.wrapped = pos != 0;
                new_lines.push(gl);
                if end >= total_len {
                    break;
                }
                pos = end;
            }
            if new_lines.len() == start_new_idx {
                new_lines.push(GridLine::new(new_cols, Attribute::DEFAULT));
            }

            if is_cursor_logical {
                if let Some(off) = cursor_char_offset {
                    let row_in_logical = off / new_cols;
                    cursor_new_x = off % new_cols;
                    cursor_new_abs = start_new_idx + row_in_logical;
                } else {
                    cursor_new_abs = start_new_idx;
                    cursor_new_x = 0;
                }
            }
        }

        if new_lines.is_empty() {
            new_lines.push(GridLine::new(new_cols, Attribute::DEFAULT));
        }

        let new_total = new_lines.len();
        let max_len = self.lines.max_len();
        let drop = new_total.saturating_sub(max_len);
        let mut new_ring = RingBuffer::new(max_len);
        for (i, line) in new_lines.into_iter().enumerate() {
            if i < drop {
                continue;
            }
            new_ring.push(line);
        }
        cursor_new_abs = cursor_new_abs.saturating_sub(drop);
        let new_total_kept = new_total - drop;

        self.y_base = new_total_kept.saturating_sub(self.rows.min(new_total_kept));
        self.y = cursor_new_abs.saturating_sub(self.y_base);
        self.y_disp = self.y_base;
        self.x = cursor_new_x;
        self.lines = new_ring;
    }
}

fn set_default_tab_stops(tab_stops: &mut [bool], width: usize) {
    let mut i = 0;
    while i < tab_stops.len() {
        tab_stops[i] = true;
        i += width;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_screen_starts_with_no_scrollback_offset() {
        let s = Screen::new(5, 10, 100, true);
        assert_eq!(s.y_base, 0);
        assert_eq!(s.y_disp, 0);
        assert_eq!(s.total_lines(), 5);
    }

    #[test]
    fn linefeed_at_bottom_scrolls_and_grows_scrollback() {
        let mut s = Screen::new(3, 10, 100, true);
        s.y = 2;
        s.linefeed(Attribute::DEFAULT);
        assert_eq!(s.y, 2, "cursor stays at scroll_bottom");
        assert_eq!(s.y_base, 1);
        assert_eq!(s.total_lines(), 4);
    }

    #[test]
    fn linefeed_without_scrollback_discards_top_row() {
        let mut s = Screen::new(3, 10, 0, false);
        s.y = 2;
        s.linefeed(Attribute::DEFAULT);
        assert_eq!(s.y_base, 0);
        assert_eq!(s.total_lines(), 3);
    }

    #[test]
    fn scroll_stops_trimming_once_scrollback_is_full() {
        let mut s = Screen::new(2, 5, 2, true); // max_len = 4
        s.y = 1;
        for _ in 0..5 {
            s.linefeed(Attribute::DEFAULT);
        }
        assert_eq!(s.total_lines(), 4);
        assert_eq!(s.y_base, 2, "y_base stops growing once the ring is full");
    }

    #[test]
    fn viewing_scrollback_shifts_display_offset_down_on_trim() {
        let mut s = Screen::new(2, 5, 2, true); // max_len = 4
        s.y = 1;
        for _ in 0..2 {
            s.linefeed(Attribute::DEFAULT);
        }
        // ring now full (4 lines); y_base = 2
        s.y_disp = 0; // user scrolled all the way back
        s.linefeed(Attribute::DEFAULT);
        assert_eq!(s.y_disp, 0, "clamped at 0, can't go negative");
    }

    #[test]
    fn tab_stops_default_every_eight_columns() {
        let s = Screen::new(5, 40, 0, false);
        assert_eq!(s.next_tab_stop(), 8);
    }

    #[test]
    fn previous_tab_stop_is_strictly_less_than_cursor() {
        let mut s = Screen::new(5, 40, 0, false);
        s.x = 8;
        assert_eq!(s.previous_tab_stop(), 0);
        s.x = 9;
        assert_eq!(s.previous_tab_stop(), 8);
    }

    #[test]
    fn erase_display_mode2_clears_everything_but_keeps_cursor() {
        let mut s = Screen::new(3, 5, 0, false);
        s.set_cell(1, 1, Cell { grapheme: "X".into(), width: 1, attr: Attribute::DEFAULT, flags: Default::default() });
        s.erase_display(2, Attribute::DEFAULT);
        assert_eq!(s.visible_line(1).trimmed_length(), 0);
    }

    #[test]
    fn insert_lines_only_affects_region_and_resets_column() {
        let mut s = Screen::new(5, 5, 0, false);
        s.set_scroll_region(1, 3);
        s.y = 1;
        s.x = 2;
        s.set_cell(1, 0, Cell { grapheme: "A".into(), width: 1, attr: Attribute::DEFAULT, flags: Default::default() });
        s.insert_lines(1, Attribute::DEFAULT);
        assert_eq!(s.x, 0);
        assert_eq!(s.visible_line(1).trimmed_length(), 0, "new blank line inserted at cursor row");
        assert_eq!(s.visible_line(2).text(), "A", "old row 1 content moved down to row 2");
    }

    #[test]
    fn delete_chars_respects_right_margin() {
        let mut s = Screen::new(3, 10, 0, false);
        for (i, c) in "ABCDEFGHIJ".chars().enumerate() {
            s.set_cell(0, i, Cell { grapheme: c.to_string().into(), width: 1, attr: Attribute::DEFAULT, flags: Default::default() });
        }
        s.set_margins(0, 6); // columns 0..=6 are the scroll region
        s.x = 1;
        s.delete_chars(2, Attribute::DEFAULT);
        // B,C deleted within [0,6]; D..G shift left, H..J past the margin untouched.
        assert_eq!(s.visible_line(0).text(), "ADEFG  HIJ".trim_end());
        assert_eq!(s.visible_line(0).cell(7).grapheme.as_str(), "H");
    }

    #[test]
    fn insert_chars_respects_right_margin() {
        let mut s = Screen::new(3, 10, 0, false);
        for (i, c) in "ABCDEFGHIJ".chars().enumerate() {
            s.set_cell(0, i, Cell { grapheme: c.to_string().into(), width: 1, attr: Attribute::DEFAULT, flags: Default::default() });
        }
        s.set_margins(0, 6);
        s.x = 1;
        s.insert_chars(2, Attribute::DEFAULT);
        // Two blanks at col 1..3; F,G pushed off the margin and dropped; H stays put.
        assert_eq!(s.visible_line(0).cell(1).grapheme.as_str(), " ");
        assert_eq!(s.visible_line(0).cell(3).grapheme.as_str(), "B");
        assert_eq!(s.visible_line(0).cell(7).grapheme.as_str(), "H");
    }

    #[test]
    fn resize_narrower_reflows_wrapped_line() {
        let mut s = Screen::new(3, 10, 50, true);
        // Simulate a wrapped 15-char logical line across rows 0-1.
        for i in 0..10 {
            s.set_cell(0, i, Cell { grapheme: ((b'A' + i as u8) as char).to_string().into(), width: 1, attr: Attribute::DEFAULT, flags: Default::default() });
        }
        s.visible_line_mut(1).wrapped = true;
        for i in 0..5 {
            s.set_cell(1, i, Cell { grapheme: ((b'K' + i as u8) as char).to_string().into(), width: 1, attr: Attribute::DEFAULT, flags: Default::default() });
        }
        s.resize(3, 5, true);
        assert_eq!(s.cols(), 5);
        // 15 chars across 5-col rows -> 3 rows, first two wrapped continuations.
        assert!(s.visible_line(1).wrapped);
    }

    #[test]
    fn cursor_in_viewport_uses_corrected_formula() {
        let mut s = Screen::new(5, 10, 20, true);
        s.y_base = 3;
        s.y_disp = 1;
        s.y = 2; // abs = 5, within [1, 1+5)=[1,6)
        assert!(s.is_cursor_in_viewport());
        s.y_disp = 7;
        assert!(!s.is_cursor_in_viewport());
    }
}
