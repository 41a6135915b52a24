use ropey::Rope;

use super::{PageSurface, SurfaceError};

/// Cursor position in an editor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column, in chars.
    pub col: usize,
}

impl Cursor {
    pub const fn at(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Direction for cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A rope-backed text buffer holding one page's markup.
#[derive(Debug, Clone)]
pub struct EditorBuffer {
    rope: Rope,
    cursor: Cursor,
}

impl EditorBuffer {
    /// Create a buffer with the cursor at the end of `text`.
    pub fn from_text(text: &str) -> Self {
        let mut buffer = Self {
            rope: Rope::from_str(text),
            cursor: Cursor::default(),
        };
        buffer.move_to_end();
        buffer
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Content of a line without its trailing newline.
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(line_idx).to_string();
        Some(line.trim_end_matches('\n').trim_end_matches('\r').to_string())
    }

    /// Length of a line in chars, without its trailing newline.
    pub fn line_len(&self, line_idx: usize) -> usize {
        self.line_at(line_idx).map_or(0, |s| s.chars().count())
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Insert at the cursor and leave the cursor after the inserted text.
    pub fn insert_str(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        let at = self.cursor_char_idx();
        self.rope.insert(at, s);
        self.place_at_char(at + s.chars().count());
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut utf8 = [0; 4];
        self.insert_str(ch.encode_utf8(&mut utf8));
    }

    /// Enter.
    pub fn split_line(&mut self) {
        self.insert_char('\n');
    }

    /// Backspace. Returns `true` if something was deleted.
    pub fn delete_back(&mut self) -> bool {
        let at = self.cursor_char_idx();
        if at == 0 {
            return false;
        }
        self.rope.remove(at - 1..at);
        self.place_at_char(at - 1);
        true
    }

    /// Delete. Returns `true` if something was deleted.
    pub fn delete_forward(&mut self) -> bool {
        let at = self.cursor_char_idx();
        if at >= self.rope.len_chars() {
            return false;
        }
        self.rope.remove(at..=at);
        true
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        let Cursor { line, col } = self.cursor;
        let last_line = self.line_count().saturating_sub(1);
        match direction {
            // Horizontal moves wrap across line breaks.
            Direction::Left => {
                let at = self.cursor_char_idx();
                self.place_at_char(at.saturating_sub(1));
            }
            Direction::Right => {
                let at = self.cursor_char_idx();
                self.place_at_char((at + 1).min(self.rope.len_chars()));
            }
            Direction::Up if line > 0 => self.cursor = self.clamped(line - 1, col),
            Direction::Down if line < last_line => self.cursor = self.clamped(line + 1, col),
            Direction::Up | Direction::Down => {}
        }
    }

    pub const fn move_home(&mut self) {
        self.cursor.col = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor.col = self.line_len(self.cursor.line);
    }

    pub fn move_to_end(&mut self) {
        self.place_at_char(self.rope.len_chars());
    }

    fn clamped(&self, line: usize, col: usize) -> Cursor {
        Cursor::at(line, col.min(self.line_len(line)))
    }

    fn place_at_char(&mut self, char_idx: usize) {
        let line = self.rope.char_to_line(char_idx);
        self.cursor = Cursor::at(line, char_idx - self.rope.line_to_char(line));
    }

    fn cursor_char_idx(&self) -> usize {
        let line = self.cursor.line.min(self.line_count().saturating_sub(1));
        let Cursor { col, .. } = self.clamped(line, self.cursor.col);
        self.rope.line_to_char(line) + col
    }
}

impl Default for EditorBuffer {
    fn default() -> Self {
        Self::from_text("")
    }
}

/// Terminal page surface backed by an [`EditorBuffer`].
#[derive(Debug, Clone, Default)]
pub struct BufferSurface {
    index: usize,
    buffer: EditorBuffer,
    detached: bool,
}

impl BufferSurface {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            buffer: EditorBuffer::default(),
            detached: false,
        }
    }

    pub const fn buffer(&self) -> &EditorBuffer {
        &self.buffer
    }

    pub const fn buffer_mut(&mut self) -> &mut EditorBuffer {
        &mut self.buffer
    }

    pub const fn detach(&mut self) {
        self.detached = true;
    }
}

impl PageSurface for BufferSurface {
    fn render(&mut self, content: &str) {
        self.buffer = EditorBuffer::from_text(content);
    }

    fn read_current(&self) -> Result<String, SurfaceError> {
        if self.detached {
            return Err(SurfaceError::Detached(self.index));
        }
        Ok(self.buffer.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_places_cursor_at_end() {
        let buffer = EditorBuffer::from_text("ab\ncde");
        assert_eq!(buffer.cursor(), Cursor::at(1, 3));
    }

    #[test]
    fn test_insert_and_delete_back() {
        let mut buffer = EditorBuffer::from_text("B");
        buffer.insert_char('+');
        assert_eq!(buffer.text(), "B+");
        assert!(buffer.delete_back());
        assert_eq!(buffer.text(), "B");
    }

    #[test]
    fn test_delete_back_joins_lines() {
        let mut buffer = EditorBuffer::from_text("ab\ncd");
        buffer.move_home();
        assert!(buffer.delete_back());
        assert_eq!(buffer.text(), "abcd");
        assert_eq!(buffer.cursor(), Cursor::at(0, 2));
    }

    #[test]
    fn test_delete_back_at_start_is_noop() {
        let mut buffer = EditorBuffer::from_text("");
        assert!(!buffer.delete_back());
    }

    #[test]
    fn test_multibyte_insert() {
        let mut buffer = EditorBuffer::from_text("é");
        buffer.insert_char('ü');
        buffer.move_cursor(Direction::Left);
        assert!(buffer.delete_back());
        assert_eq!(buffer.text(), "ü");
    }

    #[test]
    fn test_split_line_and_move() {
        let mut buffer = EditorBuffer::from_text("abc");
        buffer.move_cursor(Direction::Left);
        buffer.split_line();
        assert_eq!(buffer.text(), "ab\nc");
        assert_eq!(buffer.cursor(), Cursor::at(1, 0));
        buffer.move_cursor(Direction::Up);
        assert_eq!(buffer.cursor(), Cursor::at(0, 0));
    }

    #[test]
    fn test_delete_forward_at_end_is_noop() {
        let mut buffer = EditorBuffer::from_text("x");
        assert!(!buffer.delete_forward());
        buffer.move_home();
        assert!(buffer.delete_forward());
        assert_eq!(buffer.text(), "");
    }

    #[test]
    fn test_buffer_surface_render_replaces_content() {
        let mut surface = BufferSurface::new(0);
        surface.render("<p>x</p>");
        surface.buffer_mut().insert_str("y");
        assert_eq!(surface.read_current().unwrap(), "<p>x</p>y");
        surface.render("z");
        assert_eq!(surface.read_current().unwrap(), "z");
    }

    #[test]
    fn test_detached_buffer_surface_errors() {
        let mut surface = BufferSurface::new(3);
        surface.detach();
        assert!(surface.read_current().is_err());
    }
}
