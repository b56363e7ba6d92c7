//! Minimal multi-line edit buffer with a char-offset caret.
//!
//! Caret positions are counted in chars (not bytes) so they line up with the offsets used by
//! [`crate::placeholder_registry::insert_at`].

use textwrap::WordSeparator;
use textwrap::core::break_words;
use textwrap::wrap_algorithms::wrap_first_fit;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    text: String,
    cursor: usize,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.char_count());
    }

    /// Replace the whole text and put the caret at `cursor` (clamped).
    pub fn set_text(&mut self, text: String, cursor: usize) {
        self.text = text;
        self.set_cursor(cursor);
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn insert_str(&mut self, s: &str) {
        let idx = self.byte_index(self.cursor);
        self.text.insert_str(idx, s);
        self.cursor += s.chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        let idx = self.byte_index(self.cursor);
        self.text.insert(idx, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let idx = self.byte_index(self.cursor - 1);
        self.text.remove(idx);
        self.cursor -= 1;
    }

    pub fn delete(&mut self) {
        if self.cursor >= self.char_count() {
            return;
        }
        let idx = self.byte_index(self.cursor);
        self.text.remove(idx);
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.set_cursor(self.cursor + 1);
    }

    pub fn move_line_start(&mut self) {
        let (line, _) = self.cursor_line_col();
        self.cursor = self.line_bounds()[line].0;
    }

    pub fn move_line_end(&mut self) {
        let (line, _) = self.cursor_line_col();
        self.cursor = self.line_bounds()[line].1;
    }

    pub fn move_up(&mut self) {
        let (line, col) = self.cursor_line_col();
        if line == 0 {
            self.cursor = 0;
            return;
        }
        let (start, end) = self.line_bounds()[line - 1];
        self.cursor = (start + col).min(end);
    }

    pub fn move_down(&mut self) {
        let (line, col) = self.cursor_line_col();
        let bounds = self.line_bounds();
        match bounds.get(line + 1) {
            Some((start, end)) => self.cursor = (start + col).min(*end),
            None => self.cursor = self.char_count(),
        }
    }

    /// Zero-based (line, column) of the caret, both in chars.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let bounds = self.line_bounds();
        for (line, (start, end)) in bounds.iter().enumerate() {
            if self.cursor <= *end {
                return (line, self.cursor - start);
            }
        }
        let last = bounds.len() - 1;
        (last, self.cursor - bounds[last].0)
    }

    /// Char ranges `(start, end)` of each logical line, excluding the newline.
    fn line_bounds(&self) -> Vec<(usize, usize)> {
        let mut bounds = Vec::new();
        let mut start = 0;
        let mut idx = 0;
        for c in self.text.chars() {
            if c == '\n' {
                bounds.push((start, idx));
                start = idx + 1;
            }
            idx += 1;
        }
        bounds.push((start, idx));
        bounds
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map_or(self.text.len(), |(idx, _)| idx)
    }
}

/// Soft-wrapped view of a buffer for a given display width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedText {
    pub rows: Vec<String>,
    /// Visual (row, column) of the caret; the column is in terminal cells.
    pub cursor: (usize, usize),
}

/// Wrap `text` at `width` cells, tracking where the char-offset `cursor` lands.
///
/// Each logical line is word-wrapped first-fit on spaces, so a placeholder token only breaks when
/// it is wider than a whole row. Spaces at a break stay at the end of the row they follow, and a
/// caret on a soft break is drawn at the start of the next row.
pub fn wrap_with_cursor(text: &str, cursor: usize, width: usize) -> WrappedText {
    let width = width.max(1);
    let cursor_byte = text
        .char_indices()
        .nth(cursor)
        .map_or(text.len(), |(idx, _)| idx);
    let mut rows = Vec::new();
    let mut cursor_pos = None;
    let mut line_offset = 0;

    for line in text.split('\n') {
        for (start, end) in wrap_line_ranges(line, width) {
            let row_start = line_offset + start;
            let row_end = line_offset + end;
            let holds_caret = (row_start..row_end).contains(&cursor_byte)
                || (cursor_byte == row_end && end == line.len());
            if cursor_pos.is_none() && holds_caret {
                let col = text[row_start..cursor_byte].width();
                cursor_pos = Some((rows.len(), col));
            }
            rows.push(line[start..end].to_string());
        }
        line_offset += line.len() + 1;
    }

    let cursor = match cursor_pos {
        // A full last row pushes the caret onto a fresh row.
        Some((row, col)) if cursor_byte == text.len() && col >= width => {
            rows.push(String::new());
            (row + 1, 0)
        }
        Some(pos) => pos,
        None => (rows.len().saturating_sub(1), 0),
    };
    WrappedText { rows, cursor }
}

/// Byte ranges of `line`, one per wrapped row; together they cover the whole line.
fn wrap_line_ranges(line: &str, width: usize) -> Vec<(usize, usize)> {
    let words = break_words(WordSeparator::AsciiSpace.find_words(line), width);
    let mut ranges = Vec::new();
    let mut start = 0;
    for row in wrap_first_fit(&words, &[width as f64]) {
        let len: usize = row
            .iter()
            .map(|word| word.word.len() + word.whitespace.len())
            .sum();
        ranges.push((start, start + len));
        start += len;
    }
    if ranges.is_empty() {
        ranges.push((0, line.len()));
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buffer(text: &str, cursor: usize) -> EditBuffer {
        let mut buf = EditBuffer::new();
        buf.set_text(text.to_string(), cursor);
        buf
    }

    #[test]
    fn inserts_and_deletes_around_multibyte_chars() {
        let mut buf = buffer("añb", 2);
        buf.insert_char('x');
        assert_eq!(buf.text(), "añxb");
        assert_eq!(buf.cursor(), 3);

        buf.backspace();
        buf.backspace();
        assert_eq!(buf.text(), "ab");
        assert_eq!(buf.cursor(), 1);

        buf.delete();
        assert_eq!(buf.text(), "a");
        buf.delete();
        assert_eq!(buf.text(), "a");
    }

    #[test]
    fn vertical_movement_keeps_column_when_possible() {
        let mut buf = buffer("first line\nab\nthird line", 8);
        assert_eq!(buf.cursor_line_col(), (0, 8));

        buf.move_down();
        assert_eq!(buf.cursor_line_col(), (1, 2));

        buf.move_down();
        assert_eq!(buf.cursor_line_col(), (2, 2));

        buf.move_line_end();
        assert_eq!(buf.cursor(), buf.char_count());
        buf.move_up();
        assert_eq!(buf.cursor_line_col(), (1, 2));

        buf.move_line_start();
        assert_eq!(buf.cursor_line_col(), (1, 0));
        buf.move_up();
        buf.move_up();
        assert_eq!(buf.cursor(), 0);
    }

    #[test]
    fn wrap_tracks_cursor_across_rows() {
        let wrapped = wrap_with_cursor("abcdef\ngh", 4, 4);
        assert_eq!(wrapped.rows, vec!["abcd", "ef", "gh"]);
        assert_eq!(wrapped.cursor, (1, 0));

        let end = wrap_with_cursor("abcdef\ngh", 9, 4);
        assert_eq!(end.cursor, (2, 2));

        let on_newline = wrap_with_cursor("ab\ncd", 2, 10);
        assert_eq!(on_newline.cursor, (0, 2));
    }

    #[test]
    fn wrap_moves_caret_to_next_row_when_line_is_full() {
        let wrapped = wrap_with_cursor("abcd", 4, 4);
        assert_eq!(wrapped.rows, vec!["abcd", ""]);
        assert_eq!(wrapped.cursor, (1, 0));
    }

    #[test]
    fn wrap_breaks_on_spaces_and_keeps_tokens_whole() {
        let text = "see [[img12]] now";
        let wrapped = wrap_with_cursor(text, 4, 10);
        assert_eq!(wrapped.rows, vec!["see ", "[[img12]] ", "now"]);
        assert_eq!(wrapped.cursor, (1, 0));

        assert_eq!(wrap_with_cursor(text, 3, 10).cursor, (0, 3));
        assert_eq!(wrap_with_cursor(text, 8, 10).cursor, (1, 4));
        assert_eq!(wrap_with_cursor(text, 17, 10).cursor, (2, 3));
    }

    #[test]
    fn wrap_splits_words_wider_than_a_row() {
        let wrapped = wrap_with_cursor("x [[code1]]", 11, 4);
        assert_eq!(wrapped.rows, vec!["x ", "[[co", "de1]", "]"]);
        assert_eq!(wrapped.cursor, (3, 1));
    }

    #[test]
    fn wrap_measures_the_caret_in_cells() {
        let wrapped = wrap_with_cursor("日本 語", 3, 10);
        assert_eq!(wrapped.rows, vec!["日本 語"]);
        assert_eq!(wrapped.cursor, (0, 5));
    }

    #[test]
    fn wrap_of_empty_text_has_one_row() {
        let wrapped = wrap_with_cursor("", 0, 10);
        assert_eq!(wrapped.rows, vec![""]);
        assert_eq!(wrapped.cursor, (0, 0));
    }
}
