//! The footer renders key hints, transient notices, and placeholder diagnostics.
//!
//! The footer is pure rendering: it formats `FooterProps` into `Line`s without mutating any state.
//! Which notice is current and which mode applies are decided by the app.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Widget;

use crate::placeholder_registry::PlaceholderDiagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A one-shot message shown until the next key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Selects which key hints are rendered.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FooterMode {
    /// The prompt composer has focus.
    Prompt,
    /// The attachment list has focus.
    AttachmentList,
    /// A generation request is in flight.
    Generating,
}

#[derive(Clone, Copy, Debug)]
pub struct FooterProps<'a> {
    pub mode: FooterMode,
    pub notice: Option<&'a Notice>,
    pub diagnostics: &'a PlaceholderDiagnostics,
    pub can_export: bool,
    pub can_retry: bool,
}

pub fn footer_height(props: FooterProps<'_>) -> u16 {
    u16::try_from(footer_lines(props).len()).unwrap_or(u16::MAX)
}

pub fn render_footer(area: Rect, buf: &mut Buffer, props: FooterProps<'_>) {
    Paragraph::new(footer_lines(props)).render(area, buf);
}

fn footer_lines(props: FooterProps<'_>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if let Some(notice) = props.notice {
        lines.push(notice_line(notice));
    }
    if let Some(line) = diagnostics_line(props.diagnostics) {
        lines.push(line);
    }
    lines.push(shortcut_line(props));
    lines
}

fn notice_line(notice: &Notice) -> Line<'static> {
    match notice.level {
        NoticeLevel::Info => Line::from(notice.text.clone().green()),
        NoticeLevel::Error => Line::from(notice.text.clone().red()),
    }
}

fn diagnostics_line(diagnostics: &PlaceholderDiagnostics) -> Option<Line<'static>> {
    if diagnostics.is_clean() {
        return None;
    }
    let mut parts = Vec::new();
    if !diagnostics.unresolved.is_empty() {
        let tokens: Vec<String> = diagnostics
            .unresolved
            .iter()
            .map(ToString::to_string)
            .collect();
        parts.push(format!("no attachment for {}", tokens.join(" ")));
    }
    if !diagnostics.unreferenced.is_empty() {
        let count = diagnostics.unreferenced.len();
        let noun = if count == 1 { "attachment" } else { "attachments" };
        parts.push(format!("{count} {noun} not referenced in the prompt"));
    }
    Some(Line::from(vec![
        "⚠ ".yellow(),
        Span::from(parts.join(" · ")).yellow(),
    ]))
}

fn shortcut_line(props: FooterProps<'_>) -> Line<'static> {
    let mut hints: Vec<(&str, &str)> = match props.mode {
        FooterMode::Prompt => vec![
            ("enter", "generate"),
            ("ctrl+v", "paste image"),
            ("ctrl+k", "attach code"),
            ("tab", "attachments"),
            ("ctrl+t", "category"),
        ],
        FooterMode::AttachmentList => vec![
            ("↑/↓", "select"),
            ("d", "remove"),
            ("tab", "prompt"),
        ],
        FooterMode::Generating => vec![("", "generating…")],
    };
    if props.can_retry && props.mode != FooterMode::Generating {
        hints.push(("ctrl+r", "retry"));
    }
    if props.can_export {
        hints.push(("ctrl+p", "zip"));
        hints.push(("ctrl+o", "docx"));
    }
    hints.push(("ctrl+c", "quit"));

    let mut spans: Vec<Span<'static>> = Vec::new();
    for (idx, (key, action)) in hints.into_iter().enumerate() {
        if idx > 0 {
            spans.push("  ".into());
        }
        if !key.is_empty() {
            spans.push(Span::from(key.to_string()).bold());
            spans.push(" ".into());
        }
        spans.push(Span::from(action.to_string()));
    }
    Line::from(spans).dim()
}
