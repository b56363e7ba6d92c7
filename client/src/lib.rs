//! HTTP client for the writeup generation service.
//!
//! The service exposes one generation endpoint and two export endpoints. Requests run to
//! completion or failure: there is no client-side timeout, retry, or cancellation.

pub mod download;
mod error;
mod session;

pub use error::ClientError;
pub use reqwest::StatusCode;
pub use session::ActiveSession;

use reqwest::Response;
use url::Url;
use writeup_protocol::wire::ErrorBody;
use writeup_protocol::wire::ExportFormat;
use writeup_protocol::wire::ExportRequest;
use writeup_protocol::wire::GenerateRequest;
use writeup_protocol::wire::GenerateResponse;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

const GENERATE_ENDPOINT: &str = "generate";

#[derive(Debug, Clone)]
pub struct WriteupClient {
    http: reqwest::Client,
    base_url: Url,
}

impl WriteupClient {
    /// Build a client rooted at `base_url`. A path prefix (e.g. `https://host/api`) is kept and
    /// endpoint paths are resolved beneath it.
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .build()
            .map_err(ClientError::Transport)?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /`: returns the service banner.
    pub async fn ping(&self) -> Result<String, ClientError> {
        let response = self
            .http
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(ClientError::Transport)?;
        let response = ensure_success(response).await?;
        let body = response.text().await.map_err(ClientError::Decode)?;
        // FastAPI serializes a bare string return value as a JSON string.
        Ok(serde_json::from_str::<String>(&body).unwrap_or(body))
    }

    /// `POST /generate`.
    pub async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, ClientError> {
        let url = self.endpoint(GENERATE_ENDPOINT)?;
        tracing::info!(
            category = %request.category,
            attachments = request.mappings.len(),
            "sending generation request"
        );
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(ClientError::Transport)?;
        let response = ensure_success(response).await?;
        let generated = response
            .json::<GenerateResponse>()
            .await
            .map_err(ClientError::Decode)?;
        tracing::info!(
            session = generated.session_id.as_deref().unwrap_or("<none>"),
            chars = generated.generated_text.chars().count(),
            "generation finished"
        );
        Ok(generated)
    }

    /// `POST /download-package` or `POST /download-docx`; returns the raw file bytes.
    pub async fn export(
        &self,
        format: ExportFormat,
        request: &ExportRequest,
    ) -> Result<Vec<u8>, ClientError> {
        let url = self.endpoint(format.endpoint())?;
        tracing::info!(format = format.short_name(), "requesting export");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(ClientError::Transport)?;
        let response = ensure_success(response).await?;
        let bytes = response.bytes().await.map_err(ClientError::Decode)?;
        Ok(bytes.to_vec())
    }

    /// Export the given session, refusing locally (no network call) when there is none.
    pub async fn export_session(
        &self,
        format: ExportFormat,
        session: Option<&ActiveSession>,
    ) -> Result<Vec<u8>, ClientError> {
        let Some(session) = session else {
            tracing::debug!("export refused: no active session");
            return Err(ClientError::NoActiveSession);
        };
        self.export(format, &session.export_request()).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base_url.trim())?;
    // `Url::join` replaces the last path segment unless the base ends with a slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|body| body.message());
    tracing::warn!(%status, detail = detail.as_deref().unwrap_or(""), "request failed");
    Err(ClientError::Server { status, detail })
}
