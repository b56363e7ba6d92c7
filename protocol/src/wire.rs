//! JSON bodies exchanged with the writeup generation service.

use serde::Deserialize;
use serde::Serialize;

use crate::placeholder::PlaceholderMap;

/// Category the service falls back to when the client does not send one.
pub const DEFAULT_CATEGORY: &str = "Web Exploitation";

/// Categories offered by the interactive client. Any other string is accepted as well.
pub const WELL_KNOWN_CATEGORIES: &[&str] = &[
    "Web Exploitation",
    "Cryptography",
    "Reverse Engineering",
    "Binary Exploitation",
    "Forensics",
    "OSINT",
    "Miscellaneous",
];

/// Body of `POST /generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub mappings: PlaceholderMap,
    pub category: String,
}

/// Successful `POST /generate` response.
///
/// Older service builds echo `mappings` back and omit `session_id`; extra fields are ignored and a
/// missing session simply leaves exports unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    pub generated_text: String,
}

/// Body of the export endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub session_id: String,
    pub markdown_content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Zip archive with the markdown and its attachments.
    Package,
    Docx,
}

impl ExportFormat {
    pub fn endpoint(self) -> &'static str {
        match self {
            ExportFormat::Package => "download-package",
            ExportFormat::Docx => "download-docx",
        }
    }

    pub fn default_file_name(self) -> &'static str {
        match self {
            ExportFormat::Package => "writeup_package.zip",
            ExportFormat::Docx => "writeup.docx",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            ExportFormat::Package => "zip",
            ExportFormat::Docx => "docx",
        }
    }
}

/// Error body returned with non-success statuses.
///
/// `detail` is a plain message for application errors and a list of validation issues when the
/// request body itself was rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<ErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Validation(Vec<ValidationIssue>),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValidationIssue {
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
}

impl ErrorBody {
    /// The message to surface to the user, if the body carried one.
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            ErrorDetail::Message(message) => Some(message.clone()),
            ErrorDetail::Validation(issues) if !issues.is_empty() => Some(
                issues
                    .iter()
                    .map(|issue| issue.msg.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            ErrorDetail::Validation(_) => None,
            ErrorDetail::Other(serde_json::Value::Null) => None,
            ErrorDetail::Other(value) => Some(value.to_string()),
        }
    }
}
