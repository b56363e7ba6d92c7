use reqwest::StatusCode;

/// Failure of a single request to the writeup service.
///
/// Every variant is terminal for the action that triggered it; callers surface
/// [`ClientError::user_message`] and let the user retry.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request never produced an HTTP response (DNS, connect, TLS, reset).
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned {status}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Server {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("failed to decode service response: {0}")]
    Decode(#[source] reqwest::Error),

    /// An export was requested before any generation produced a session.
    #[error("no active session")]
    NoActiveSession,
}

impl ClientError {
    /// Text shown to the user in place of a result.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Server {
                detail: Some(detail),
                ..
            } => format!("Error: {detail}"),
            ClientError::Server {
                status,
                detail: None,
            } => format!("Error: request failed with status {}", status.as_u16()),
            ClientError::Transport(_) => "Error: could not reach the writeup service".to_string(),
            ClientError::Decode(_) => {
                "Error: the writeup service sent an unreadable response".to_string()
            }
            ClientError::InvalidUrl(err) => format!("Error: invalid service URL ({err})"),
            ClientError::NoActiveSession => "Generate a writeup before exporting.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn server_detail_is_surfaced_verbatim() {
        let err = ClientError::Server {
            status: StatusCode::NOT_FOUND,
            detail: Some("rate limited".to_string()),
        };
        assert_eq!(err.user_message(), "Error: rate limited");
        assert_eq!(err.to_string(), "service returned 404 Not Found: rate limited");
    }

    #[test]
    fn server_without_detail_uses_generic_message() {
        let err = ClientError::Server {
            status: StatusCode::BAD_GATEWAY,
            detail: None,
        };
        assert_eq!(err.user_message(), "Error: request failed with status 502");
    }

    #[test]
    fn missing_session_has_its_own_message() {
        assert_eq!(
            ClientError::NoActiveSession.user_message(),
            "Generate a writeup before exporting."
        );
    }
}
