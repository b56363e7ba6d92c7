//! The prompt composer: an editable buffer plus the caret bookkeeping needed to splice
//! placeholder tokens in at the right place.
//!
//! Two insertion paths exist because they run under different focus conditions:
//!
//! - A pasted image is inserted at the live caret, since the composer still has focus.
//! - A code block composed in the modal is inserted at the caret recorded when the composer lost
//!   focus (the modal took it).
//!
//! Both paths move the live caret and the recorded caret past the inserted token, so a second
//! insertion made before the user moves the caret lands immediately after the first.

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use writeup_protocol::PlaceholderToken;

use crate::placeholder_registry::insert_at;
use crate::text_edit::EditBuffer;

/// Result of routing a key to the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
    /// Enter was pressed on a non-empty prompt.
    Submitted(String),
    /// The key edited the buffer or moved the caret.
    Edited,
    None,
}

#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    buffer: EditBuffer,
    /// Caret recorded when the composer last lost focus.
    last_blur_caret: Option<usize>,
}

impl PromptComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.text().trim().is_empty()
    }

    #[cfg(test)]
    pub fn last_blur_caret(&self) -> Option<usize> {
        self.last_blur_caret
    }

    /// Record the caret before focus moves elsewhere (code modal, attachment list).
    pub fn blur(&mut self) {
        self.last_blur_caret = Some(self.buffer.cursor());
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.last_blur_caret = None;
    }

    /// Insert literal pasted text at the live caret.
    pub fn insert_text(&mut self, text: &str) {
        // Terminals deliver pasted newlines as `\r`.
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.buffer.insert_str(&normalized);
        self.last_blur_caret = None;
    }

    /// Splice `token` in at the live caret (paste trigger).
    pub fn insert_token_at_caret(&mut self, token: PlaceholderToken) {
        let position = self.buffer.cursor();
        self.splice_token(token, position);
    }

    /// Splice `token` in at the caret recorded on blur (modal trigger), falling back to the live
    /// caret when nothing was recorded.
    pub fn insert_token_at_last_blur(&mut self, token: PlaceholderToken) {
        let position = self.last_blur_caret.unwrap_or_else(|| self.buffer.cursor());
        self.splice_token(token, position);
    }

    fn splice_token(&mut self, token: PlaceholderToken, position: usize) {
        let (text, caret) = insert_at(self.buffer.text(), &token.to_string(), position);
        self.buffer.set_text(text, caret);
        self.last_blur_caret = Some(caret);
    }

    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> InputResult {
        if key_event.kind == KeyEventKind::Release {
            return InputResult::None;
        }

        let KeyEvent {
            code, modifiers, ..
        } = key_event;
        let result = match code {
            KeyCode::Enter
                if modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
            {
                self.buffer.insert_char('\n');
                InputResult::Edited
            }
            KeyCode::Char('j') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.buffer.insert_char('\n');
                InputResult::Edited
            }
            KeyCode::Enter => {
                if self.is_empty() {
                    InputResult::None
                } else {
                    InputResult::Submitted(self.buffer.text().to_string())
                }
            }
            KeyCode::Char(c)
                if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.buffer.insert_char(c);
                InputResult::Edited
            }
            KeyCode::Tab => InputResult::None,
            KeyCode::Backspace => {
                self.buffer.backspace();
                InputResult::Edited
            }
            KeyCode::Delete => {
                self.buffer.delete();
                InputResult::Edited
            }
            KeyCode::Left => {
                self.buffer.move_left();
                InputResult::Edited
            }
            KeyCode::Right => {
                self.buffer.move_right();
                InputResult::Edited
            }
            KeyCode::Up => {
                self.buffer.move_up();
                InputResult::Edited
            }
            KeyCode::Down => {
                self.buffer.move_down();
                InputResult::Edited
            }
            KeyCode::Home => {
                self.buffer.move_line_start();
                InputResult::Edited
            }
            KeyCode::End => {
                self.buffer.move_line_end();
                InputResult::Edited
            }
            _ => InputResult::None,
        };

        if result == InputResult::Edited {
            // Any explicit caret movement or edit supersedes the recorded position.
            self.last_blur_caret = None;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use writeup_protocol::AttachmentKind;

    use crate::placeholder_registry::PlaceholderRegistry;

    fn type_str(composer: &mut PromptComposer, s: &str) {
        for c in s.chars() {
            composer.handle_key_event(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    #[test]
    fn consecutive_pastes_chain_from_the_original_caret() {
        let mut registry = PlaceholderRegistry::new();
        let mut composer = PromptComposer::new();
        type_str(&mut composer, "before after");
        composer.buffer.set_cursor("before ".len());

        let first = registry.mint(AttachmentKind::Image).expect("mint");
        composer.insert_token_at_caret(first);
        let second = registry.mint(AttachmentKind::Image).expect("mint");
        composer.insert_token_at_caret(second);

        assert_eq!(composer.text(), "before [[img1]][[img2]]after");
        assert_eq!(composer.cursor(), "before [[img1]][[img2]]".len());
    }

    #[test]
    fn modal_insertion_uses_caret_recorded_on_blur() {
        let mut registry = PlaceholderRegistry::new();
        let mut composer = PromptComposer::new();
        type_str(&mut composer, "step one\nstep two");
        composer.buffer.set_cursor("step one".len());
        composer.blur();

        // The caret moving while the modal is open must not affect the insertion point.
        composer.buffer.set_cursor(0);
        let token = registry.mint(AttachmentKind::Code).expect("mint");
        composer.insert_token_at_last_blur(token);

        assert_eq!(composer.text(), "step one[[code1]]\nstep two");
        assert_eq!(composer.last_blur_caret(), Some("step one[[code1]]".len()));

        // A second modal insertion continues right after the first.
        let token = registry.mint(AttachmentKind::Code).expect("mint");
        composer.insert_token_at_last_blur(token);
        assert_eq!(composer.text(), "step one[[code1]][[code2]]\nstep two");
    }

    #[test]
    fn modal_insertion_without_blur_falls_back_to_live_caret() {
        let mut composer = PromptComposer::new();
        type_str(&mut composer, "abc");
        let token = PlaceholderRegistry::new()
            .mint(AttachmentKind::Code)
            .expect("mint");
        composer.insert_token_at_last_blur(token);
        assert_eq!(composer.text(), "abc[[code1]]");
    }

    #[test]
    fn enter_submits_and_modified_enter_inserts_newline() {
        let mut composer = PromptComposer::new();
        assert_eq!(
            composer.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            InputResult::None
        );

        type_str(&mut composer, "line");
        composer.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        composer.handle_key_event(KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL));
        type_str(&mut composer, "x");

        assert_eq!(
            composer.handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            InputResult::Submitted("line\n\nx".to_string())
        );
    }

    #[test]
    fn pasted_carriage_returns_become_newlines() {
        let mut composer = PromptComposer::new();
        composer.insert_text("a\r\nb\rc");
        assert_eq!(composer.text(), "a\nb\nc");
    }
}
