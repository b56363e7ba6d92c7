//! Placeholder tokens embedded in prompt text.
//!
//! A token is a short stand-in such as `[[img3]]` or `[[code1]]`. The generation service
//! substitutes tokens using the mapping sent alongside the prompt, so the textual form here must
//! stay byte-for-byte stable.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use std::ops::Range;
use std::str::FromStr;


const TOKEN_OPEN: &str = "[[";
const TOKEN_CLOSE: &str = "]]";

/// Token -> attachment content (a base64 data URL for images, raw text for code).
pub type PlaceholderMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentKind {
    Image,
    Code,
}

impl AttachmentKind {
    pub const ALL: [AttachmentKind; 2] = [AttachmentKind::Image, AttachmentKind::Code];

    /// Prefix used inside the token brackets.
    pub fn prefix(self) -> &'static str {
        match self {
            AttachmentKind::Image => "img",
            AttachmentKind::Code => "code",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceholderToken {
    kind: AttachmentKind,
    number: NonZeroU32,
}

impl PlaceholderToken {
    pub fn new(kind: AttachmentKind, number: NonZeroU32) -> Self {
        Self { kind, number }
    }

    pub fn kind(self) -> AttachmentKind {
        self.kind
    }

    pub fn number(self) -> NonZeroU32 {
        self.number
    }
}

impl fmt::Display for PlaceholderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{TOKEN_OPEN}{}{}{TOKEN_CLOSE}",
            self.kind.prefix(),
            self.number
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTokenError {
    #[error("placeholder token must be wrapped in `[[` and `]]`: {0:?}")]
    MissingBrackets(String),
    #[error("unknown placeholder kind in {0:?} (expected `img` or `code`)")]
    UnknownKind(String),
    #[error("placeholder number in {0:?} must be a positive integer without leading zeros")]
    InvalidNumber(String),
}

impl FromStr for PlaceholderToken {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .strip_prefix(TOKEN_OPEN)
            .and_then(|rest| rest.strip_suffix(TOKEN_CLOSE))
            .ok_or_else(|| ParseTokenError::MissingBrackets(s.to_string()))?;

        let digits_at = inner
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(inner.len());
        let (prefix, digits) = inner.split_at(digits_at);
        let kind = AttachmentKind::from_prefix(prefix)
            .ok_or_else(|| ParseTokenError::UnknownKind(s.to_string()))?;

        let number = parse_token_number(digits)
            .ok_or_else(|| ParseTokenError::InvalidNumber(s.to_string()))?;
        Ok(Self { kind, number })
    }
}

fn parse_token_number(digits: &str) -> Option<NonZeroU32> {
    if digits.is_empty() || digits.starts_with('0') {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<NonZeroU32>().ok()
}

/// A well-formed token found literally inside a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOccurrence {
    pub token: PlaceholderToken,
    /// Byte range of the token in the scanned text.
    pub byte_range: Range<usize>,
    /// Char offset of the token start, matching caret positions used by editors.
    pub char_offset: usize,
}

/// Return every well-formed placeholder token in `text`, in order of appearance.
///
/// Bracket runs that do not parse as a token (e.g. `[[note]]`, `[[img0]]`) are skipped.
pub fn scan_placeholder_tokens(text: &str) -> Vec<TokenOccurrence> {
    let mut occurrences = Vec::new();
    let mut search_from = 0;

    while let Some(rel_start) = text[search_from..].find(TOKEN_OPEN) {
        let start = search_from + rel_start;
        let after_open = start + TOKEN_OPEN.len();
        let Some(rel_close) = text[after_open..].find(TOKEN_CLOSE) else {
            break;
        };
        let end = after_open + rel_close + TOKEN_CLOSE.len();

        match text[start..end].parse::<PlaceholderToken>() {
            Ok(token) => {
                occurrences.push(TokenOccurrence {
                    token,
                    byte_range: start..end,
                    char_offset: text[..start].chars().count(),
                });
                search_from = end;
            }
            // `[[[img1]]` should still find the token starting at the second bracket.
            Err(_) => search_from = start + 1,
        }
    }

    occurrences
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(kind: AttachmentKind, n: u32) -> PlaceholderToken {
        PlaceholderToken::new(kind, NonZeroU32::new(n).expect("non-zero"))
    }

    #[test]
    fn display_matches_wire_format() {
        assert_eq!(token(AttachmentKind::Image, 1).to_string(), "[[img1]]");
        assert_eq!(token(AttachmentKind::Code, 12).to_string(), "[[code12]]");
    }

    #[test]
    fn parses_valid_tokens() {
        assert_eq!(
            "[[img7]]".parse::<PlaceholderToken>(),
            Ok(token(AttachmentKind::Image, 7))
        );
        assert_eq!(
            "[[code30]]".parse::<PlaceholderToken>(),
            Ok(token(AttachmentKind::Code, 30))
        );
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["img1", "[[img1]", "[img1]]", "[[]]", "[[img]]", "[[img0]]"] {
            assert!(bad.parse::<PlaceholderToken>().is_err(), "{bad} parsed");
        }
        assert_eq!(
            "[[img01]]".parse::<PlaceholderToken>(),
            Err(ParseTokenError::InvalidNumber("[[img01]]".to_string()))
        );
        assert_eq!(
            "[[pic1]]".parse::<PlaceholderToken>(),
            Err(ParseTokenError::UnknownKind("[[pic1]]".to_string()))
        );
        assert!("[[img99999999999]]".parse::<PlaceholderToken>().is_err());
        assert!("[[img1a]]".parse::<PlaceholderToken>().is_err());
    }

    #[test]
    fn scan_finds_tokens_in_order_with_offsets() {
        let text = "see [[img1]] then — [[code2]] and [[note]] [[[img3]]";
        let found = scan_placeholder_tokens(text);
        let tokens: Vec<String> = found.iter().map(|o| o.token.to_string()).collect();
        assert_eq!(tokens, vec!["[[img1]]", "[[code2]]", "[[img3]]"]);

        let first = &found[0];
        assert_eq!(&text[first.byte_range.clone()], "[[img1]]");
        assert_eq!(first.char_offset, 4);

        // The em dash is multi-byte; char offsets must not drift.
        let second = &found[1];
        assert_eq!(&text[second.byte_range.clone()], "[[code2]]");
        assert_eq!(second.char_offset, 20);
    }

    #[test]
    fn scan_of_plain_text_is_empty() {
        assert!(scan_placeholder_tokens("no tokens [[ here").is_empty());
        assert!(scan_placeholder_tokens("").is_empty());
    }
}
