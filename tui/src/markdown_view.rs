//! Render generated writeup markdown into styled terminal lines.
//!
//! Only the subset a writeup uses is styled (headings, emphasis, inline and fenced code, lists,
//! block quotes, rules, links). Anything else falls through as plain text. Placeholder tokens the
//! service left unresolved are highlighted so they stand out in the result pane.

use pulldown_cmark::CodeBlockKind;
use pulldown_cmark::Event;
use pulldown_cmark::HeadingLevel;
use pulldown_cmark::Options;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;
use pulldown_cmark::TagEnd;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use writeup_protocol::placeholder::scan_placeholder_tokens;

pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let mut writer = Writer::default();
    for event in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS) {
        writer.handle(event);
    }
    writer.finish()
}

#[derive(Default)]
struct Writer {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// One entry per open list: the next ordinal for ordered lists.
    lists: Vec<Option<u64>>,
    links: Vec<String>,
    quote_depth: usize,
    code_block: Option<String>,
    /// Adjacent text events are merged so tokens split at `[`/`]` are seen whole.
    pending_text: String,
}

impl Writer {
    fn handle(&mut self, event: Event<'_>) {
        if !matches!(event, Event::Text(_)) {
            self.flush_text();
        }
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.code_block.is_some() {
                    self.push_code_text(&text);
                } else {
                    self.pending_text.push_str(&text);
                }
            }
            Event::Code(code) => {
                let style = self.style().patch(Style::default().fg(Color::Cyan));
                self.push_span(Span::styled(code.into_string(), style));
            }
            Event::SoftBreak => self.push_span(Span::raw(" ")),
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.block_gap();
                self.lines.push(Line::from("───".dim()));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                for (idx, part) in html.split('\n').enumerate() {
                    if idx > 0 {
                        self.flush_line();
                    }
                    if !part.is_empty() {
                        self.push_span(Span::raw(part.to_string()).dim());
                    }
                }
            }
            Event::TaskListMarker(checked) => {
                self.push_span(Span::raw(if checked { "[x] " } else { "[ ] " }));
            }
            Event::FootnoteReference(label) => {
                self.push_span(Span::raw(format!("[^{label}]")));
            }
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.block_gap();
                }
            }
            Tag::Heading { level, .. } => {
                self.block_gap();
                let style = match level {
                    HeadingLevel::H1 => Style::default()
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                    HeadingLevel::H2 => Style::default().add_modifier(Modifier::BOLD),
                    _ => Style::default().add_modifier(Modifier::BOLD | Modifier::ITALIC),
                };
                self.styles.push(style);
                let marker = format!("{} ", "#".repeat(heading_depth(level)));
                self.push_span(Span::styled(marker, style));
            }
            Tag::BlockQuote => {
                self.block_gap();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.block_gap();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.into_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                if !lang.is_empty() {
                    self.lines.push(Line::from(format!("```{lang}").dim()));
                }
                self.code_block = Some(lang);
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_gap();
                }
                self.flush_line();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = format!("{next}. ");
                        *next += 1;
                        marker
                    }
                    _ => "- ".to_string(),
                };
                self.push_span(Span::raw(format!("{indent}{marker}")));
            }
            Tag::Emphasis => self.styles.push(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.styles.push(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self
                .styles
                .push(Style::default().add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.styles.push(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::UNDERLINED),
                );
                self.links.push(dest_url.into_string());
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush_line(),
            TagEnd::Heading(_) => {
                self.flush_line();
                self.styles.pop();
            }
            TagEnd::BlockQuote => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                if !self.current.is_empty() {
                    self.flush_line();
                }
                if self.code_block.take().is_some_and(|lang| !lang.is_empty()) {
                    self.lines.push(Line::from("```".dim()));
                }
            }
            TagEnd::List(_) => {
                self.flush_line();
                self.lists.pop();
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link | TagEnd::Image => {
                self.styles.pop();
                if let Some(url) = self.links.pop()
                    && !url.is_empty()
                {
                    self.push_span(Span::raw(format!(" ({url})")).dim());
                }
            }
            _ => {}
        }
    }

    fn style(&self) -> Style {
        self.styles
            .iter()
            .fold(Style::default(), |acc, style| acc.patch(*style))
    }

    fn push_span(&mut self, span: Span<'static>) {
        if self.current.is_empty() && self.quote_depth > 0 {
            self.current
                .push(Span::raw("> ".repeat(self.quote_depth)).dim());
        }
        self.current.push(span);
    }

    fn push_code_text(&mut self, text: &str) {
        let style = Style::default().fg(Color::Cyan);
        let mut parts = text.split('\n').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                self.push_span(Span::styled(part.to_string(), style));
            }
            if parts.peek().is_some() {
                // Keep blank lines inside code blocks.
                let line = std::mem::take(&mut self.current);
                self.lines.push(Line::from(line));
            }
        }
    }

    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending_text);
        let style = self.style();
        let token_style = style.patch(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

        let mut last = 0;
        for occurrence in scan_placeholder_tokens(&text) {
            let range = occurrence.byte_range;
            if range.start > last {
                self.push_span(Span::styled(text[last..range.start].to_string(), style));
            }
            self.push_span(Span::styled(text[range.clone()].to_string(), token_style));
            last = range.end;
        }
        if last < text.len() {
            self.push_span(Span::styled(text[last..].to_string(), style));
        }
    }

    fn flush_line(&mut self) {
        if !self.current.is_empty() {
            let line = std::mem::take(&mut self.current);
            self.lines.push(Line::from(line));
        }
    }

    fn block_gap(&mut self) {
        self.flush_line();
        if self.lines.last().is_some_and(|line| line.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_text();
        self.flush_line();
        self.lines
    }
}

fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn headings_paragraphs_and_lists() {
        let md = "# SQLi 101\n\nThe login form is injectable.\n\n- step one\n- step two\n\n1. a\n2. b\n";
        assert_eq!(
            plain(&render_markdown(md)),
            vec![
                "# SQLi 101",
                "",
                "The login form is injectable.",
                "",
                "- step one",
                "- step two",
                "",
                "1. a",
                "2. b",
            ]
        );
    }

    #[test]
    fn heading_is_bold() {
        let lines = render_markdown("## Recon");
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn fenced_code_keeps_blank_lines() {
        let md = "```python\nimport os\n\nprint(1)\n```\n";
        assert_eq!(
            plain(&render_markdown(md)),
            vec!["```python", "import os", "", "print(1)", "```"]
        );
    }

    #[test]
    fn unresolved_tokens_are_highlighted_whole() {
        let lines = render_markdown("See [[img3]] here.");
        assert_eq!(plain(&lines), vec!["See [[img3]] here."]);
        let token = lines[0]
            .spans
            .iter()
            .find(|span| span.content == "[[img3]]")
            .expect("token span");
        assert_eq!(token.style.fg, Some(Color::Yellow));
    }

    #[test]
    fn inline_code_links_and_quotes() {
        let md = "Run `nc host 1337` per [docs](https://ex.com).\n\n> flag{x}\n";
        assert_eq!(
            plain(&render_markdown(md)),
            vec![
                "Run nc host 1337 per docs (https://ex.com).",
                "",
                "> flag{x}",
            ]
        );
    }

    #[test]
    fn nested_lists_indent() {
        let md = "- outer\n  - inner\n";
        assert_eq!(plain(&render_markdown(md)), vec!["- outer", "  - inner"]);
    }
}
