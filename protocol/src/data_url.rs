use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

const DATA_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

#[derive(Debug, thiserror::Error)]
pub enum DataUrlError {
    #[error("not a data URL")]
    NotDataUrl,
    #[error("data URL is not base64-encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Payload(#[from] base64::DecodeError),
}

/// Encode raw bytes as `data:<mime>;base64,<payload>`.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    let payload = STANDARD.encode(bytes);
    format!("{DATA_SCHEME}{mime}{BASE64_MARKER}{payload}")
}

/// Split a base64 data URL into its MIME type and decoded bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), DataUrlError> {
    let rest = url
        .strip_prefix(DATA_SCHEME)
        .ok_or(DataUrlError::NotDataUrl)?;
    let (mime, payload) = rest
        .split_once(BASE64_MARKER)
        .ok_or(DataUrlError::NotBase64)?;
    let bytes = STANDARD.decode(payload.trim())?;
    Ok((mime.to_string(), bytes))
}

/// Size in bytes of the decoded payload, computed without decoding.
pub fn data_url_payload_len(url: &str) -> Option<usize> {
    let (_, payload) = url.split_once(BASE64_MARKER)?;
    let payload = payload.trim();
    let padding = payload.bytes().rev().take_while(|b| *b == b'=').count();
    Some((payload.len() / 4 * 3).saturating_sub(padding))
}

pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn encodes_png_bytes() {
        assert_eq!(
            encode_data_url("image/png", &[0, 0]),
            "data:image/png;base64,AAA="
        );
    }

    #[test]
    fn decodes_large_payload_without_truncation() {
        let bytes: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let url = encode_data_url("image/jpeg", &bytes);

        let (mime, decoded) = decode_data_url(&url).expect("decode");
        assert_eq!(mime, "image/jpeg");
        assert_eq!(decoded, bytes);
        assert_eq!(data_url_payload_len(&url), Some(bytes.len()));
    }

    #[test]
    fn rejects_non_data_urls() {
        assert!(matches!(
            decode_data_url("https://example.com/a.png"),
            Err(DataUrlError::NotDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:text/plain,hello"),
            Err(DataUrlError::NotBase64)
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,***"),
            Err(DataUrlError::Payload(_))
        ));
    }

    #[test]
    fn mime_lookup_is_case_insensitive() {
        assert_eq!(mime_for_extension("PNG"), Some("image/png"));
        assert_eq!(mime_for_extension("Jpeg"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("txt"), None);
    }
}
