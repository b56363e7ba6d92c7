//! Overlay for composing a code attachment.

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Clear;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Widget;

use crate::text_edit::EditBuffer;
use crate::text_edit::wrap_with_cursor;

const EMPTY_CODE_HINT: &str = "Nothing to attach yet: type or paste some code.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalResult {
    /// Non-empty code confirmed with Ctrl+S.
    Confirmed(String),
    Cancelled,
    None,
}

#[derive(Debug, Clone, Default)]
pub struct CodeModal {
    buffer: EditBuffer,
    hint: Option<&'static str>,
}

impl CodeModal {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn hint(&self) -> Option<&'static str> {
        self.hint
    }

    pub fn insert_text(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.buffer.insert_str(&normalized);
        self.hint = None;
    }

    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> ModalResult {
        if key_event.kind == KeyEventKind::Release {
            return ModalResult::None;
        }

        let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
        match key_event.code {
            KeyCode::Esc => return ModalResult::Cancelled,
            KeyCode::Char('s') if ctrl => return self.confirm(),
            KeyCode::Enter => self.buffer.insert_char('\n'),
            KeyCode::Tab => self.buffer.insert_str("    "),
            KeyCode::Char(c) if !ctrl => self.buffer.insert_char(c),
            KeyCode::Backspace => self.buffer.backspace(),
            KeyCode::Delete => self.buffer.delete(),
            KeyCode::Left => self.buffer.move_left(),
            KeyCode::Right => self.buffer.move_right(),
            KeyCode::Up => self.buffer.move_up(),
            KeyCode::Down => self.buffer.move_down(),
            KeyCode::Home => self.buffer.move_line_start(),
            KeyCode::End => self.buffer.move_line_end(),
            _ => return ModalResult::None,
        }
        self.hint = None;
        ModalResult::None
    }

    fn confirm(&mut self) -> ModalResult {
        if self.buffer.text().trim().is_empty() {
            self.hint = Some(EMPTY_CODE_HINT);
            return ModalResult::None;
        }
        ModalResult::Confirmed(self.buffer.text().to_string())
    }

    /// Area occupied by the modal inside `area`.
    pub fn modal_area(area: Rect) -> Rect {
        let width = area.width.saturating_sub(8).max(area.width.min(20));
        let height = area.height.saturating_sub(4).max(area.height.min(6));
        Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        )
    }

    fn editor_area(area: Rect) -> Rect {
        let modal = Self::modal_area(area);
        let inner = Block::default().borders(Borders::ALL).inner(modal);
        // Last inner row is reserved for the hint line.
        Rect::new(inner.x, inner.y, inner.width, inner.height.saturating_sub(1))
    }

    pub fn cursor_position(&self, area: Rect) -> Option<(u16, u16)> {
        let editor = Self::editor_area(area);
        if editor.is_empty() {
            return None;
        }
        let wrapped = wrap_with_cursor(
            self.buffer.text(),
            self.buffer.cursor(),
            usize::from(editor.width),
        );
        let (row, col) = wrapped.cursor;
        let scroll = row.saturating_sub(usize::from(editor.height) - 1);
        let y = editor.y + u16::try_from(row - scroll).ok()?;
        let x = editor.x + u16::try_from(col).ok()?.min(editor.width - 1);
        Some((x, y))
    }
}

impl Widget for &CodeModal {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let modal = CodeModal::modal_area(area);
        Clear.render(modal, buf);
        Block::default()
            .borders(Borders::ALL)
            .title(Line::from(" Attach code ".bold()))
            .title_bottom(Line::from(" Ctrl+S attach · Esc cancel ".dim()))
            .render(modal, buf);

        let editor = CodeModal::editor_area(area);
        if editor.is_empty() {
            return;
        }
        let wrapped = wrap_with_cursor(
            self.buffer.text(),
            self.buffer.cursor(),
            usize::from(editor.width),
        );
        let scroll = wrapped
            .cursor
            .0
            .saturating_sub(usize::from(editor.height) - 1);
        let lines: Vec<Line<'static>> = wrapped
            .rows
            .into_iter()
            .skip(scroll)
            .map(Line::from)
            .collect();
        Paragraph::new(lines).render(editor, buf);

        let hint_area = Rect::new(editor.x, editor.y + editor.height, editor.width, 1);
        let hint = match self.hint {
            Some(hint) => Line::from(hint.red()),
            None if self.buffer.is_empty() => {
                Line::from("Code is attached verbatim and referenced by a [[codeN]] token.".dim())
            }
            None => Line::default(),
        };
        hint.render(hint_area, buf);
    }
}
