//! One non-interactive generation cycle driven from command-line arguments.

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use writeup_client::ActiveSession;
use writeup_client::WriteupClient;
use writeup_client::download::save_download;
use writeup_protocol::AttachmentKind;
use writeup_protocol::PlaceholderToken;
use writeup_protocol::wire::ExportFormat;
use writeup_protocol::wire::GenerateRequest;
use writeup_tui::load_image_file_as_data_url;
use writeup_tui::placeholder_registry::PlaceholderDiagnostics;
use writeup_tui::placeholder_registry::PlaceholderRegistry;
use writeup_tui::placeholder_registry::placeholder_diagnostics;

use crate::atomic_write::write_atomic_text;
use crate::paths::display_with_tilde;

#[derive(Debug, Clone)]
pub struct GenerateJob {
    pub prompt: String,
    pub images: Vec<PathBuf>,
    pub code: Vec<PathBuf>,
    pub append_placeholders: bool,
    pub category: String,
    pub output: Option<PathBuf>,
    pub exports: Vec<ExportFormat>,
    pub download_dir: PathBuf,
}

/// Attachments are minted per kind in argument order, so the first `--image` is `[[img1]]`.
pub fn build_request(
    job: &GenerateJob,
) -> anyhow::Result<(GenerateRequest, PlaceholderDiagnostics)> {
    let mut registry = PlaceholderRegistry::new();
    let mut minted: Vec<PlaceholderToken> = Vec::new();

    for path in &job.images {
        let (data_url, info) = load_image_file_as_data_url(path)
            .with_context(|| format!("attach image {}", path.display()))?;
        let token = registry
            .attach(AttachmentKind::Image, data_url)
            .context("too many image attachments")?;
        tracing::debug!(%token, width = info.width, height = info.height, "attached image");
        minted.push(token);
    }
    for path in &job.code {
        let snippet = std::fs::read_to_string(path)
            .with_context(|| format!("attach code {}", path.display()))?;
        let token = registry
            .attach(AttachmentKind::Code, snippet)
            .context("too many code attachments")?;
        tracing::debug!(%token, "attached code");
        minted.push(token);
    }

    let prompt = if job.append_placeholders {
        append_tokens(&job.prompt, &minted)
    } else {
        job.prompt.clone()
    };
    let diagnostics = placeholder_diagnostics(&prompt, &registry);

    Ok((
        GenerateRequest {
            prompt,
            mappings: registry.resolve_for_submission(),
            category: job.category.clone(),
        },
        diagnostics,
    ))
}

fn append_tokens(prompt: &str, tokens: &[PlaceholderToken]) -> String {
    if tokens.is_empty() {
        return prompt.to_string();
    }
    let joined = tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    let trimmed = prompt.trim_end();
    if trimmed.is_empty() {
        joined
    } else {
        format!("{trimmed}\n\n{joined}")
    }
}

/// Lines describing prompt/attachment mismatches; submission still goes ahead.
pub fn describe_diagnostics(diagnostics: &PlaceholderDiagnostics) -> Vec<String> {
    let mut lines = Vec::new();
    for token in &diagnostics.unresolved {
        lines.push(format!("{token} appears in the prompt but has no attachment"));
    }
    for token in &diagnostics.unreferenced {
        lines.push(format!("{token} is attached but not referenced in the prompt"));
    }
    lines
}

/// Generate, write the markdown to `--output` (or `out`), then save each requested export.
///
/// Returns the session so callers can report it; exports stop at the first failure.
pub async fn run_generate(
    client: &WriteupClient,
    job: &GenerateJob,
    out: &mut impl Write,
    notes: &mut impl Write,
) -> anyhow::Result<Option<ActiveSession>> {
    let (request, diagnostics) = build_request(job)?;
    for line in describe_diagnostics(&diagnostics) {
        writeln!(notes, "warning: {line}")?;
    }

    let response = client
        .generate(&request)
        .await
        .map_err(|err| anyhow::anyhow!(err.user_message()))?;
    let session = ActiveSession::from_response(&response);

    match &job.output {
        Some(path) => {
            write_atomic_text(path, &response.generated_text)?;
            writeln!(notes, "Wrote writeup to {}", display_with_tilde(path))?;
        }
        None => {
            out.write_all(response.generated_text.as_bytes())?;
            if !response.generated_text.ends_with('\n') {
                out.write_all(b"\n")?;
            }
            out.flush()?;
        }
    }

    for format in &job.exports {
        let saved = export_one(client, *format, session.as_ref(), &job.download_dir).await?;
        writeln!(
            notes,
            "Saved {} export to {}",
            format.short_name(),
            display_with_tilde(&saved)
        )?;
    }

    Ok(session)
}

async fn export_one(
    client: &WriteupClient,
    format: ExportFormat,
    session: Option<&ActiveSession>,
    download_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let bytes = client
        .export_session(format, session)
        .await
        .map_err(|err| anyhow::anyhow!(err.user_message()))?;
    save_download(download_dir, format.default_file_name(), &bytes)
}
