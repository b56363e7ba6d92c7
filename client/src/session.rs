use writeup_protocol::wire::ExportRequest;
use writeup_protocol::wire::GenerateResponse;

/// Handle to the most recent successful generation, used to request exports of that result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub session_id: String,
    pub markdown: String,
}

impl ActiveSession {
    /// `None` when the service did not hand out a session for this generation.
    pub fn from_response(response: &GenerateResponse) -> Option<Self> {
        let session_id = response.session_id.as_deref()?.trim();
        if session_id.is_empty() {
            return None;
        }
        Some(Self {
            session_id: session_id.to_string(),
            markdown: response.generated_text.clone(),
        })
    }

    pub fn export_request(&self) -> ExportRequest {
        ExportRequest {
            session_id: self.session_id.clone(),
            markdown_content: self.markdown.clone(),
        }
    }
}
