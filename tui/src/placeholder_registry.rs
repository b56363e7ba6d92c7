//! Bookkeeping for attachments referenced from the prompt by placeholder tokens.
//!
//! The registry mints tokens (`[[img1]]`, `[[code1]]`, ...), stores the content each token stands
//! for, and hands the resulting map to the generation request. It never edits prompt text itself;
//! [`insert_at`] is the pure splice used by the composer.
//!
//! # Lifecycle
//!
//! Tokens are minted from one counter per [`AttachmentKind`], starting at 1. Counters only move
//! forward: removing an attachment does not renumber the others and a removed token's number is
//! not handed out again, so a counter that has handed out `u32::MAX` refuses to mint.
//! [`PlaceholderRegistry::reset`] is the only way back to 1; the app calls it once a submitted
//! prompt settles, whatever its outcome.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::num::NonZeroU32;

use writeup_protocol::AttachmentKind;
use writeup_protocol::PlaceholderMap;
use writeup_protocol::PlaceholderToken;
use writeup_protocol::placeholder::scan_placeholder_tokens;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// No pending attachments.
    Idle,
    /// One or more attachments registered.
    Populated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRegistry {
    entries: BTreeMap<PlaceholderToken, String>,
    /// `None` once a kind has handed out `u32::MAX`.
    next_image: Option<NonZeroU32>,
    next_code: Option<NonZeroU32>,
}

impl Default for PlaceholderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderRegistry {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_image: Some(NonZeroU32::MIN),
            next_code: Some(NonZeroU32::MIN),
        }
    }

    /// Return a fresh token of `kind` and advance that kind's counter.
    ///
    /// Returns `None` once the counter is exhausted; numbers are never reused.
    pub fn mint(&mut self, kind: AttachmentKind) -> Option<PlaceholderToken> {
        let counter = self.counter_mut(kind);
        let Some(number) = *counter else {
            tracing::warn!(?kind, "placeholder counter exhausted; refusing to mint");
            return None;
        };
        *counter = number.checked_add(1);
        Some(PlaceholderToken::new(kind, number))
    }

    /// Store `content` under `token`, replacing any previous content.
    pub fn register(&mut self, token: PlaceholderToken, content: String) {
        if self.entries.insert(token, content).is_some() {
            tracing::debug!(%token, "placeholder content replaced");
        }
    }

    /// Mint a token of `kind` and register `content` under it.
    pub fn attach(&mut self, kind: AttachmentKind, content: String) -> Option<PlaceholderToken> {
        let token = self.mint(kind)?;
        self.register(token, content);
        Some(token)
    }

    pub fn get(&self, token: PlaceholderToken) -> Option<&str> {
        self.entries.get(&token).map(String::as_str)
    }

    /// Drop `token` and return its content. Other tokens and the counters are left untouched.
    pub fn remove(&mut self, token: PlaceholderToken) -> Option<String> {
        self.entries.remove(&token)
    }

    /// The map sent with the generation request.
    ///
    /// Tokens missing from the prompt and prompt tokens missing from the map are both passed
    /// through; the service leaves unresolved tokens in place.
    pub fn resolve_for_submission(&self) -> PlaceholderMap {
        self.entries
            .iter()
            .map(|(token, content)| (token.to_string(), content.clone()))
            .collect()
    }

    /// Forget every attachment and restart both counters at 1.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn state(&self) -> RegistryState {
        if self.entries.is_empty() {
            RegistryState::Idle
        } else {
            RegistryState::Populated
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered tokens with their content: images first, each kind in mint order.
    pub fn entries(&self) -> impl Iterator<Item = (PlaceholderToken, &str)> {
        self.entries
            .iter()
            .map(|(token, content)| (*token, content.as_str()))
    }

    pub fn tokens(&self) -> Vec<PlaceholderToken> {
        self.entries.keys().copied().collect()
    }

    /// The number the next `mint(kind)` will use, or `None` if the counter is exhausted.
    pub fn next_number(&self, kind: AttachmentKind) -> Option<NonZeroU32> {
        match kind {
            AttachmentKind::Image => self.next_image,
            AttachmentKind::Code => self.next_code,
        }
    }

    fn counter_mut(&mut self, kind: AttachmentKind) -> &mut Option<NonZeroU32> {
        match kind {
            AttachmentKind::Image => &mut self.next_image,
            AttachmentKind::Code => &mut self.next_code,
        }
    }
}

/// Splice `token` into `text` at char offset `position` (clamped to the text length).
///
/// Returns the new text and the caret offset just past the inserted token.
pub fn insert_at(text: &str, token: &str, position: usize) -> (String, usize) {
    let char_count = text.chars().count();
    let position = position.min(char_count);
    let byte_idx = text
        .char_indices()
        .nth(position)
        .map_or(text.len(), |(idx, _)| idx);

    let mut out = String::with_capacity(text.len() + token.len());
    out.push_str(&text[..byte_idx]);
    out.push_str(token);
    out.push_str(&text[byte_idx..]);
    (out, position + token.chars().count())
}

/// Mismatches between the tokens written in a prompt and the registered attachments.
///
/// Neither kind blocks submission; they are shown as hints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderDiagnostics {
    /// Tokens in the prompt with no registered attachment.
    pub unresolved: Vec<PlaceholderToken>,
    /// Registered attachments whose token no longer appears in the prompt.
    pub unreferenced: Vec<PlaceholderToken>,
}

impl PlaceholderDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.unreferenced.is_empty()
    }
}

pub fn placeholder_diagnostics(
    prompt: &str,
    registry: &PlaceholderRegistry,
) -> PlaceholderDiagnostics {
    let in_prompt: BTreeSet<PlaceholderToken> = scan_placeholder_tokens(prompt)
        .into_iter()
        .map(|occurrence| occurrence.token)
        .collect();

    PlaceholderDiagnostics {
        unresolved: in_prompt
            .iter()
            .copied()
            .filter(|token| registry.get(*token).is_none())
            .collect(),
        unreferenced: registry
            .tokens()
            .into_iter()
            .filter(|token| !in_prompt.contains(token))
            .collect(),
    }
}
