//! Attachment list view-model.
//!
//! Rendering is a pure function of the registry and the preview cache: [`build_entries`] turns
//! them into [`AttachmentEntry`] rows, [`render_attachment_lines`] turns rows into styled lines,
//! and user actions come back as [`AttachmentIntent`]s applied by [`apply_intent`].

use std::collections::BTreeMap;
use std::io::Cursor;

use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use writeup_protocol::AttachmentKind;
use writeup_protocol::PlaceholderToken;
use writeup_protocol::data_url::data_url_payload_len;
use writeup_protocol::data_url::decode_data_url;

use crate::placeholder_registry::PlaceholderRegistry;

const SUMMARY_MAX_CHARS: usize = 48;

/// Decoded facts about an image attachment, computed once per token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePreview {
    pub mime: String,
    pub width: u32,
    pub height: u32,
    pub byte_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentEntry {
    pub token: PlaceholderToken,
    pub kind: AttachmentKind,
    pub summary: String,
    pub preview: Option<ImagePreview>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentIntent {
    Remove(PlaceholderToken),
}

/// Image previews keyed by token.
///
/// `None` records a payload that could not be decoded so it is not retried on every frame.
#[derive(Debug, Default)]
pub struct PreviewCache {
    previews: BTreeMap<PlaceholderToken, Option<ImagePreview>>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode previews for new image tokens and release previews for tokens that are gone.
    pub fn sync(&mut self, registry: &PlaceholderRegistry) {
        self.previews
            .retain(|token, _| registry.get(*token).is_some());
        for (token, content) in registry.entries() {
            if token.kind() == AttachmentKind::Image && !self.previews.contains_key(&token) {
                self.previews.insert(token, decode_preview(content));
            }
        }
    }

    pub fn get(&self, token: PlaceholderToken) -> Option<&ImagePreview> {
        self.previews.get(&token).and_then(Option::as_ref)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.previews.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.previews.is_empty()
    }
}

fn decode_preview(data_url: &str) -> Option<ImagePreview> {
    let (mime, bytes) = match decode_data_url(data_url) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::debug!("image attachment is not a readable data URL: {err}");
            return None;
        }
    };
    let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    Some(ImagePreview {
        mime,
        width,
        height,
        byte_len: bytes.len(),
    })
}

pub fn build_entries(registry: &PlaceholderRegistry, cache: &PreviewCache) -> Vec<AttachmentEntry> {
    registry
        .entries()
        .map(|(token, content)| {
            let kind = token.kind();
            let preview = match kind {
                AttachmentKind::Image => cache.get(token).cloned(),
                AttachmentKind::Code => None,
            };
            let summary = match (kind, &preview) {
                (AttachmentKind::Image, Some(preview)) => image_summary(preview),
                (AttachmentKind::Image, None) => match data_url_payload_len(content) {
                    Some(len) => format!("image ({})", format_bytes(len)),
                    None => "image (unreadable)".to_string(),
                },
                (AttachmentKind::Code, _) => code_summary(content),
            };
            AttachmentEntry {
                token,
                kind,
                summary,
                preview,
            }
        })
        .collect()
}

fn image_summary(preview: &ImagePreview) -> String {
    let format = preview
        .mime
        .strip_prefix("image/")
        .unwrap_or(&preview.mime)
        .to_ascii_uppercase();
    format!(
        "{format} {}x{} ({})",
        preview.width,
        preview.height,
        format_bytes(preview.byte_len)
    )
}

fn code_summary(code: &str) -> String {
    let line_count = code.lines().count().max(1);
    let first = code
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let mut summary: String = first.chars().take(SUMMARY_MAX_CHARS).collect();
    if first.chars().count() > SUMMARY_MAX_CHARS {
        summary.push('…');
    }
    let noun = if line_count == 1 { "line" } else { "lines" };
    format!("{summary} ({line_count} {noun})")
}

fn format_bytes(len: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = KIB * 1024;
    if len >= MIB {
        format!("{:.1} MiB", len as f64 / MIB as f64)
    } else if len >= KIB {
        format!("{:.1} KiB", len as f64 / KIB as f64)
    } else {
        format!("{len} B")
    }
}

pub fn render_attachment_lines(
    entries: &[AttachmentEntry],
    selected: Option<usize>,
    focused: bool,
) -> Vec<Line<'static>> {
    if entries.is_empty() {
        return vec![Line::from(
            "No attachments. Ctrl+V pastes an image, Ctrl+K attaches code.".dim(),
        )];
    }

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let is_selected = focused && selected == Some(idx);
            let marker = if is_selected { "› " } else { "  " };
            let token = Span::from(entry.token.to_string());
            let token = match entry.kind {
                AttachmentKind::Image => token.magenta(),
                AttachmentKind::Code => token.cyan(),
            };
            let line = Line::from(vec![
                marker.into(),
                token,
                " ".into(),
                entry.summary.clone().dim(),
            ]);
            if is_selected { line.reversed() } else { line }
        })
        .collect()
}

/// Apply a list intent. Returns the removed content, if the token was registered.
pub fn apply_intent(
    registry: &mut PlaceholderRegistry,
    cache: &mut PreviewCache,
    intent: AttachmentIntent,
) -> Option<String> {
    match intent {
        AttachmentIntent::Remove(token) => {
            let removed = registry.remove(token);
            cache.sync(registry);
            removed
        }
    }
}
