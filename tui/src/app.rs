//! The writeup screen as a state machine.
//!
//! `App` never performs I/O. Key presses and pastes mutate its state and may return an
//! [`Effect`] for the runner to execute (send a request, export a session, read the clipboard);
//! the outcome comes back through [`App::on_app_event`] or [`App::attach_pasted_image`].
//!
//! # Generation lifecycle
//!
//! Submitting snapshots `{prompt, mappings, category}` and takes the [`SubmitLatch`]. While the
//! request is in flight the prompt and attachments are read-only. When it settles, either way, the
//! placeholder registry resets and the composer clears; a failed request is kept so Ctrl+R can
//! resend it verbatim. A retry carries its own snapshot, so when it settles the draft typed since
//! the failure (prompt and attachments) is left as it is.

use std::path::PathBuf;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::buffer::Buffer;
use ratatui::layout::Constraint;
use ratatui::layout::Layout;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Widget;
use ratatui::widgets::Wrap;
use writeup_client::ActiveSession;
use writeup_client::ClientError;
use writeup_protocol::AttachmentKind;
use writeup_protocol::placeholder::scan_placeholder_tokens;
use writeup_protocol::wire::DEFAULT_CATEGORY;
use writeup_protocol::wire::ExportFormat;
use writeup_protocol::wire::GenerateRequest;
use writeup_protocol::wire::WELL_KNOWN_CATEGORIES;

use crate::app_event::AppEvent;
use crate::attachments::AttachmentIntent;
use crate::attachments::PreviewCache;
use crate::attachments::apply_intent;
use crate::attachments::build_entries;
use crate::attachments::render_attachment_lines;
use crate::clipboard_paste::PasteImageError;
use crate::clipboard_paste::PastedImageInfo;
use crate::clipboard_paste::load_image_file_as_data_url;
use crate::clipboard_paste::pasted_image_path;
use crate::code_modal::CodeModal;
use crate::code_modal::ModalResult;
use crate::composer::InputResult;
use crate::composer::PromptComposer;
use crate::exit::ExitReason;
use crate::footer::FooterMode;
use crate::footer::FooterProps;
use crate::footer::Notice;
use crate::footer::footer_height;
use crate::footer::render_footer;
use crate::markdown_view::render_markdown;
use crate::placeholder_registry::PlaceholderDiagnostics;
use crate::placeholder_registry::PlaceholderRegistry;
use crate::placeholder_registry::placeholder_diagnostics;
use crate::submit_latch::InFlightGuard;
use crate::submit_latch::SubmitLatch;
use crate::text_edit::wrap_with_cursor;

const IN_FLIGHT_NOTICE: &str = "A writeup is already being generated; wait for it to finish.";
const TOO_MANY_ATTACHMENTS: &str = "Too many attachments of this kind; send the prompt to start over.";
const RESULT_PAGE: u16 = 10;
const MAX_PROMPT_ROWS: u16 = 8;
const MAX_ATTACHMENT_ROWS: u16 = 6;

/// Settings the screen is launched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server_url: String,
    pub category: String,
    pub download_dir: PathBuf,
}

/// Work the runner performs on the app's behalf.
#[derive(Debug)]
pub enum Effect {
    /// Send a generation request. The guard must be held until the outcome is reported.
    Generate {
        request: GenerateRequest,
        guard: InFlightGuard,
    },
    Export {
        format: ExportFormat,
        session: ActiveSession,
    },
    /// Read an image from the system clipboard and hand it to [`App::attach_pasted_image`].
    ReadClipboardImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Prompt,
    Attachments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultPane {
    Empty,
    Pending,
    Generated(String),
    Failed(String),
}

pub struct App {
    config: AppConfig,
    registry: PlaceholderRegistry,
    previews: PreviewCache,
    composer: PromptComposer,
    code_modal: Option<CodeModal>,
    focus: Focus,
    selected_attachment: Option<usize>,
    category: String,
    result: ResultPane,
    result_lines: Vec<Line<'static>>,
    scroll: u16,
    session: Option<ActiveSession>,
    last_failed_request: Option<GenerateRequest>,
    /// The request in flight is a Ctrl+R resend of `last_failed_request`.
    retry_in_flight: bool,
    notice: Option<Notice>,
    latch: SubmitLatch,
    exit: Option<ExitReason>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let category = if config.category.trim().is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            config.category.clone()
        };
        Self {
            config,
            registry: PlaceholderRegistry::new(),
            previews: PreviewCache::new(),
            composer: PromptComposer::new(),
            code_modal: None,
            focus: Focus::Prompt,
            selected_attachment: None,
            category,
            result: ResultPane::Empty,
            result_lines: Vec::new(),
            scroll: 0,
            session: None,
            last_failed_request: None,
            retry_in_flight: false,
            notice: None,
            latch: SubmitLatch::new(),
            exit: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn exit_reason(&self) -> Option<&ExitReason> {
        self.exit.as_ref()
    }

    pub fn request_exit(&mut self, reason: ExitReason) {
        self.exit = Some(reason);
    }

    pub fn into_session(self) -> Option<ActiveSession> {
        self.session
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Effect> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        self.notice = None;

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.exit = Some(ExitReason::UserRequested);
            return None;
        }

        if let Some(modal) = self.code_modal.as_mut() {
            match modal.handle_key_event(key) {
                ModalResult::Confirmed(code) => {
                    self.code_modal = None;
                    self.attach_code(code);
                }
                ModalResult::Cancelled => self.code_modal = None,
                ModalResult::None => {}
            }
            return None;
        }

        // Available while a request is in flight.
        match key.code {
            KeyCode::Char('p') if ctrl => return self.request_export(ExportFormat::Package),
            KeyCode::Char('o') if ctrl => return self.request_export(ExportFormat::Docx),
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(RESULT_PAGE);
                return None;
            }
            KeyCode::PageDown => {
                let max = u16::try_from(self.result_lines.len()).unwrap_or(u16::MAX);
                self.scroll = self.scroll.saturating_add(RESULT_PAGE).min(max);
                return None;
            }
            _ => {}
        }

        if self.latch.is_in_flight() {
            if key.code == KeyCode::Enter || (ctrl && key.code == KeyCode::Char('r')) {
                self.notice = Some(Notice::info(IN_FLIGHT_NOTICE));
            }
            return None;
        }

        match key.code {
            KeyCode::Char('v') if ctrl || key.modifiers.contains(KeyModifiers::ALT) => {
                return Some(Effect::ReadClipboardImage);
            }
            KeyCode::Char('k') if ctrl => {
                self.open_code_modal();
                return None;
            }
            KeyCode::Char('t') if ctrl => {
                self.category = next_category(&self.category);
                return None;
            }
            KeyCode::Char('r') if ctrl => return self.retry(),
            KeyCode::Tab | KeyCode::BackTab => {
                self.toggle_focus();
                return None;
            }
            _ => {}
        }

        match self.focus {
            Focus::Prompt => match self.composer.handle_key_event(key) {
                InputResult::Submitted(prompt) => self.submit(prompt),
                InputResult::Edited | InputResult::None => None,
            },
            Focus::Attachments => {
                self.handle_attachment_list_key(key);
                None
            }
        }
    }

    /// Bracketed paste. A pasted path to an image file becomes an image attachment; anything else
    /// is inserted as text.
    pub fn handle_paste(&mut self, pasted: &str) {
        self.notice = None;
        if let Some(modal) = self.code_modal.as_mut() {
            modal.insert_text(pasted);
            return;
        }
        if self.latch.is_in_flight() {
            return;
        }
        if let Some(path) = pasted_image_path(pasted) {
            tracing::debug!(path = %path.display(), "pasted image path");
            self.attach_pasted_image(load_image_file_as_data_url(&path));
            return;
        }
        self.focus = Focus::Prompt;
        self.composer.insert_text(pasted);
    }

    /// Register a pasted image and splice its token in at the live caret.
    pub fn attach_pasted_image(
        &mut self,
        result: Result<(String, PastedImageInfo), PasteImageError>,
    ) {
        match result {
            Ok((data_url, info)) => {
                let Some(token) = self.registry.attach(AttachmentKind::Image, data_url) else {
                    self.notice = Some(Notice::error(TOO_MANY_ATTACHMENTS));
                    return;
                };
                self.focus = Focus::Prompt;
                self.composer.insert_token_at_caret(token);
                self.previews.sync(&self.registry);
                self.notice = Some(Notice::info(format!(
                    "Attached {token} ({} {}x{})",
                    info.encoded_format.label(),
                    info.width,
                    info.height
                )));
            }
            Err(PasteImageError::NoImage) => {
                tracing::debug!("clipboard holds no image");
                self.notice = Some(Notice::info("No image on the clipboard."));
            }
            Err(err) => {
                tracing::warn!("failed to attach image: {err}");
                self.notice = Some(Notice::error(format!("Could not attach image: {err}")));
            }
        }
    }

    fn attach_code(&mut self, code: String) {
        let Some(token) = self.registry.attach(AttachmentKind::Code, code) else {
            self.notice = Some(Notice::error(TOO_MANY_ATTACHMENTS));
            return;
        };
        self.focus = Focus::Prompt;
        self.composer.insert_token_at_last_blur(token);
        self.notice = Some(Notice::info(format!("Attached {token}")));
    }

    fn open_code_modal(&mut self) {
        if self.focus == Focus::Prompt {
            self.composer.blur();
        }
        self.code_modal = Some(CodeModal::new());
    }

    fn toggle_focus(&mut self) {
        match self.focus {
            Focus::Prompt if self.registry.is_empty() => {
                self.notice = Some(Notice::info("No attachments yet."));
            }
            Focus::Prompt => {
                self.composer.blur();
                self.focus = Focus::Attachments;
                let last = self.registry.len() - 1;
                self.selected_attachment = Some(self.selected_attachment.unwrap_or(0).min(last));
            }
            Focus::Attachments => self.focus = Focus::Prompt,
        }
    }

    fn handle_attachment_list_key(&mut self, key: KeyEvent) {
        let len = self.registry.len();
        if len == 0 {
            self.focus = Focus::Prompt;
            return;
        }
        let selected = self.selected_attachment.unwrap_or(0).min(len - 1);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_attachment = Some(selected.saturating_sub(1));
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_attachment = Some((selected + 1).min(len - 1));
            }
            KeyCode::Delete | KeyCode::Backspace | KeyCode::Char('d') => {
                if let Some(token) = self.registry.tokens().get(selected).copied() {
                    apply_intent(
                        &mut self.registry,
                        &mut self.previews,
                        AttachmentIntent::Remove(token),
                    );
                    self.notice = Some(Notice::info(format!("Removed {token}")));
                }
                if self.registry.is_empty() {
                    self.selected_attachment = None;
                    self.focus = Focus::Prompt;
                } else {
                    self.selected_attachment = Some(selected.min(self.registry.len() - 1));
                }
            }
            KeyCode::Esc => self.focus = Focus::Prompt,
            _ => {}
        }
    }

    fn submit(&mut self, prompt: String) -> Option<Effect> {
        let Some(guard) = self.latch.try_acquire() else {
            self.notice = Some(Notice::info(IN_FLIGHT_NOTICE));
            return None;
        };
        let diagnostics = placeholder_diagnostics(&prompt, &self.registry);
        if !diagnostics.is_clean() {
            tracing::debug!(?diagnostics, "submitting with placeholder mismatches");
        }
        let request = GenerateRequest {
            prompt,
            mappings: self.registry.resolve_for_submission(),
            category: self.category.clone(),
        };
        Some(self.start_generation(request, guard))
    }

    fn retry(&mut self) -> Option<Effect> {
        let Some(request) = self.last_failed_request.clone() else {
            self.notice = Some(Notice::info("Nothing to retry."));
            return None;
        };
        let guard = self.latch.try_acquire()?;
        self.last_failed_request = None;
        self.retry_in_flight = true;
        Some(self.start_generation(request, guard))
    }

    fn start_generation(&mut self, request: GenerateRequest, guard: InFlightGuard) -> Effect {
        self.result = ResultPane::Pending;
        self.result_lines.clear();
        self.scroll = 0;
        self.focus = Focus::Prompt;
        Effect::Generate { request, guard }
    }

    fn request_export(&mut self, format: ExportFormat) -> Option<Effect> {
        let Some(session) = self.session.clone() else {
            self.notice = Some(Notice::info(ClientError::NoActiveSession.user_message()));
            return None;
        };
        self.notice = Some(Notice::info(format!(
            "Exporting {}…",
            format.short_name()
        )));
        Some(Effect::Export { format, session })
    }

    pub fn on_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::GenerationFinished {
                request,
                result,
                guard,
            } => {
                if !std::mem::take(&mut self.retry_in_flight) {
                    self.registry.reset();
                    self.previews.sync(&self.registry);
                    self.composer.clear();
                    self.selected_attachment = None;
                    self.focus = Focus::Prompt;
                }
                self.scroll = 0;
                match result {
                    Ok(response) => {
                        self.session = ActiveSession::from_response(&response);
                        if self.session.is_none() {
                            tracing::warn!("generation succeeded without a session id");
                            self.notice = Some(Notice::info(
                                "The service returned no session; exports are unavailable for this writeup.",
                            ));
                        }
                        self.result_lines = render_markdown(&response.generated_text);
                        self.result = ResultPane::Generated(response.generated_text);
                        self.last_failed_request = None;
                    }
                    Err(err) => {
                        tracing::warn!("generation failed: {err}");
                        let message = err.user_message();
                        self.result_lines = vec![Line::from(message.clone().red())];
                        self.result = ResultPane::Failed(message);
                        self.last_failed_request = Some(request);
                    }
                }
                drop(guard);
            }
            AppEvent::ExportFinished { format, result } => match result {
                Ok(path) => {
                    self.notice = Some(Notice::info(format!(
                        "Saved {} export to {}",
                        format.short_name(),
                        path.display()
                    )));
                }
                Err(message) => self.notice = Some(Notice::error(message)),
            },
        }
    }

    fn layout(&self, area: Rect) -> AppLayout {
        let prompt_inner_width = area.width.saturating_sub(2).max(1);
        let prompt_rows = wrap_with_cursor(
            self.composer.text(),
            self.composer.cursor(),
            usize::from(prompt_inner_width),
        )
        .rows
        .len();
        let prompt_height = u16::try_from(prompt_rows)
            .unwrap_or(u16::MAX)
            .clamp(1, MAX_PROMPT_ROWS)
            + 2;
        let attachment_height = u16::try_from(self.registry.len())
            .unwrap_or(u16::MAX)
            .clamp(1, MAX_ATTACHMENT_ROWS)
            + 2;
        let diagnostics = placeholder_diagnostics(self.composer.text(), &self.registry);
        let footer = footer_height(self.footer_props(&diagnostics));

        let [title, prompt, attachments, result, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(prompt_height),
            Constraint::Length(attachment_height),
            Constraint::Min(3),
            Constraint::Length(footer),
        ])
        .areas(area);
        AppLayout {
            title,
            prompt,
            attachments,
            result,
            footer,
        }
    }

    fn footer_props<'a>(
        &'a self,
        diagnostics: &'a PlaceholderDiagnostics,
    ) -> FooterProps<'a> {
        let mode = if self.latch.is_in_flight() {
            FooterMode::Generating
        } else if self.focus == Focus::Attachments {
            FooterMode::AttachmentList
        } else {
            FooterMode::Prompt
        };
        FooterProps {
            mode,
            notice: self.notice.as_ref(),
            diagnostics,
            can_export: self.session.is_some(),
            can_retry: self.last_failed_request.is_some(),
        }
    }

    /// Terminal cursor position for the focused editor, if any.
    pub fn cursor_position(&self, area: Rect) -> Option<(u16, u16)> {
        if let Some(modal) = &self.code_modal {
            return modal.cursor_position(area);
        }
        if self.focus != Focus::Prompt || self.latch.is_in_flight() {
            return None;
        }
        let inner = bordered_inner(self.layout(area).prompt);
        if inner.is_empty() {
            return None;
        }
        let wrapped = wrap_with_cursor(
            self.composer.text(),
            self.composer.cursor(),
            usize::from(inner.width),
        );
        let (row, col) = wrapped.cursor;
        let scroll = row.saturating_sub(usize::from(inner.height) - 1);
        let y = inner.y + u16::try_from(row - scroll).ok()?;
        let x = inner.x + u16::try_from(col).ok()?.min(inner.width - 1);
        Some((x, y))
    }

    fn render_title(&self, area: Rect, buf: &mut Buffer) {
        let mut spans: Vec<Span<'static>> = vec![
            "writeup".bold(),
            " · ".dim(),
            Span::from(self.config.server_url.clone()).dim(),
            " · category: ".dim(),
            Span::from(self.category.clone()).cyan(),
        ];
        if let Some(session) = &self.session {
            spans.push(" · session ".dim());
            spans.push(Span::from(session.session_id.clone()).dim());
        }
        Line::from(spans).render(area, buf);
    }

    fn render_prompt(&self, area: Rect, buf: &mut Buffer) {
        let focused = self.focus == Focus::Prompt && self.code_modal.is_none();
        let block = titled_block(" Prompt ", focused);
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.is_empty() {
            return;
        }

        if self.composer.text().is_empty() {
            Line::from("Describe how you solved the challenge, then press Enter.".dim())
                .render(inner, buf);
            return;
        }
        let wrapped = wrap_with_cursor(
            self.composer.text(),
            self.composer.cursor(),
            usize::from(inner.width),
        );
        let scroll = wrapped
            .cursor
            .0
            .saturating_sub(usize::from(inner.height) - 1);
        let lines: Vec<Line<'static>> = wrapped
            .rows
            .into_iter()
            .skip(scroll)
            .map(highlight_tokens)
            .collect();
        let paragraph = Paragraph::new(lines);
        if self.latch.is_in_flight() {
            paragraph.dim().render(inner, buf);
        } else {
            paragraph.render(inner, buf);
        }
    }

    fn render_attachments(&self, area: Rect, buf: &mut Buffer) {
        let focused = self.focus == Focus::Attachments && self.code_modal.is_none();
        let title = format!(" Attachments ({}) ", self.registry.len());
        let block = titled_block(&title, focused);
        let inner = block.inner(area);
        block.render(area, buf);

        let entries = build_entries(&self.registry, &self.previews);
        let lines = render_attachment_lines(&entries, self.selected_attachment, focused);
        let visible = usize::from(inner.height).max(1);
        let skip = self
            .selected_attachment
            .map_or(0, |selected| (selected + 1).saturating_sub(visible));
        Paragraph::new(lines.into_iter().skip(skip).collect::<Vec<_>>()).render(inner, buf);
    }

    fn render_result(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Line::from(" Writeup ".bold()));
        let inner = block.inner(area);
        block.render(area, buf);

        let lines = match &self.result {
            ResultPane::Empty => vec![Line::from(
                "The generated writeup appears here.".dim(),
            )],
            ResultPane::Pending => vec![Line::from("Generating writeup…".italic())],
            ResultPane::Generated(_) | ResultPane::Failed(_) => self.result_lines.clone(),
        };
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .render(inner, buf);
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = self.layout(area);
        self.render_title(layout.title, buf);
        self.render_prompt(layout.prompt, buf);
        self.render_attachments(layout.attachments, buf);
        self.render_result(layout.result, buf);

        let diagnostics = placeholder_diagnostics(self.composer.text(), &self.registry);
        render_footer(layout.footer, buf, self.footer_props(&diagnostics));

        if let Some(modal) = &self.code_modal {
            modal.render(area, buf);
        }
    }
}

struct AppLayout {
    title: Rect,
    prompt: Rect,
    attachments: Rect,
    result: Rect,
    footer: Rect,
}

fn titled_block(title: &str, focused: bool) -> Block<'static> {
    let block = Block::default().borders(Borders::ALL);
    if focused {
        block
            .border_style(Style::default().cyan())
            .title(Line::from(title.to_string().bold()))
    } else {
        block.title(Line::from(title.to_string()))
    }
}

fn bordered_inner(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

fn highlight_tokens(row: String) -> Line<'static> {
    let occurrences = scan_placeholder_tokens(&row);
    if occurrences.is_empty() {
        return Line::from(row);
    }
    let mut spans = Vec::new();
    let mut last = 0;
    for occurrence in occurrences {
        let range = occurrence.byte_range;
        if range.start > last {
            spans.push(Span::from(row[last..range.start].to_string()));
        }
        let token = Span::from(row[range.clone()].to_string());
        spans.push(match occurrence.token.kind() {
            AttachmentKind::Image => token.magenta(),
            AttachmentKind::Code => token.cyan(),
        });
        last = range.end;
    }
    if last < row.len() {
        spans.push(Span::from(row[last..].to_string()));
    }
    Line::from(spans)
}

/// Next entry in the well-known category list; custom categories wrap to the first one.
fn next_category(current: &str) -> String {
    let next = WELL_KNOWN_CATEGORIES
        .iter()
        .position(|category| *category == current)
        .map_or(0, |idx| (idx + 1) % WELL_KNOWN_CATEGORIES.len());
    WELL_KNOWN_CATEGORIES
        .get(next)
        .copied()
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string()
}

#[cfg(test)]
impl App {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn result(&self) -> &ResultPane {
        &self.result
    }

    pub fn registry(&self) -> &PlaceholderRegistry {
        &self.registry
    }

    pub fn prompt_text(&self) -> &str {
        self.composer.text()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_generating(&self) -> bool {
        self.latch.is_in_flight()
    }
}
