//! Turning clipboard images and pasted image paths into data URL attachments.

use std::io::Cursor;
use std::path::Path;
use std::path::PathBuf;

use writeup_protocol::data_url::encode_data_url;
use writeup_protocol::data_url::mime_for_extension;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Other,
}

impl EncodedImageFormat {
    pub fn label(self) -> &'static str {
        match self {
            EncodedImageFormat::Png => "PNG",
            EncodedImageFormat::Jpeg => "JPEG",
            EncodedImageFormat::Gif => "GIF",
            EncodedImageFormat::Webp => "WEBP",
            EncodedImageFormat::Other => "IMG",
        }
    }

    fn from_mime(mime: &str) -> Self {
        match mime {
            "image/png" => EncodedImageFormat::Png,
            "image/jpeg" => EncodedImageFormat::Jpeg,
            "image/gif" => EncodedImageFormat::Gif,
            "image/webp" => EncodedImageFormat::Webp,
            _ => EncodedImageFormat::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PastedImageInfo {
    pub width: u32,
    pub height: u32,
    pub encoded_format: EncodedImageFormat,
}

#[derive(Debug, thiserror::Error)]
pub enum PasteImageError {
    #[error("clipboard unavailable: {0}")]
    ClipboardUnavailable(String),
    /// The clipboard holds no image; callers treat this as a no-op.
    #[error("no image on the clipboard")]
    NoImage,
    #[error("could not encode image: {0}")]
    EncodeFailed(String),
    #[error("could not decode image: {0}")]
    DecodeFailed(String),
    #[error("unsupported image type: {}", .0.display())]
    Unsupported(PathBuf),
    #[error("could not read image file: {0}")]
    Io(#[from] std::io::Error),
}

/// Read an image from the system clipboard and return it as a PNG data URL.
pub fn paste_image_as_data_url() -> Result<(String, PastedImageInfo), PasteImageError> {
    let mut clipboard = arboard::Clipboard::new()
        .map_err(|err| PasteImageError::ClipboardUnavailable(err.to_string()))?;
    let image = match clipboard.get_image() {
        Ok(image) => image,
        Err(arboard::Error::ContentNotAvailable) => return Err(PasteImageError::NoImage),
        Err(err) => return Err(PasteImageError::ClipboardUnavailable(err.to_string())),
    };

    let width = u32::try_from(image.width)
        .map_err(|_| PasteImageError::EncodeFailed("image too wide".to_string()))?;
    let height = u32::try_from(image.height)
        .map_err(|_| PasteImageError::EncodeFailed("image too tall".to_string()))?;
    let png = encode_rgba_as_png(width, height, image.bytes.into_owned())?;

    Ok((
        encode_data_url("image/png", &png),
        PastedImageInfo {
            width,
            height,
            encoded_format: EncodedImageFormat::Png,
        },
    ))
}

fn encode_rgba_as_png(width: u32, height: u32, rgba: Vec<u8>) -> Result<Vec<u8>, PasteImageError> {
    let buffer = image::RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        PasteImageError::EncodeFailed("clipboard pixel data does not match its size".to_string())
    })?;
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(buffer)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|err| PasteImageError::EncodeFailed(err.to_string()))?;
    Ok(png)
}

/// Load an image file verbatim (no re-encoding) as a data URL.
pub fn load_image_file_as_data_url(
    path: &Path,
) -> Result<(String, PastedImageInfo), PasteImageError> {
    let mime = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_for_extension)
        .ok_or_else(|| PasteImageError::Unsupported(path.to_path_buf()))?;
    let bytes = std::fs::read(path)?;
    let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()?
        .into_dimensions()
        .map_err(|err| PasteImageError::DecodeFailed(err.to_string()))?;

    Ok((
        encode_data_url(mime, &bytes),
        PastedImageInfo {
            width,
            height,
            encoded_format: EncodedImageFormat::from_mime(mime),
        },
    ))
}

/// If `pasted` names an existing image file, return its path.
pub fn pasted_image_path(pasted: &str) -> Option<PathBuf> {
    if pasted.chars().count() <= 1 {
        return None;
    }
    let path = normalize_pasted_path(pasted)?;
    let has_image_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_for_extension)
        .is_some();
    (has_image_ext && path.is_file()).then_some(path)
}

/// Normalize pasted text that may represent a filesystem path.
///
/// Supports:
/// - `file://` URLs (converted to local paths)
/// - Windows/UNC paths
/// - shell-escaped single paths (via `shlex`)
pub fn normalize_pasted_path(pasted: &str) -> Option<PathBuf> {
    let pasted = pasted.trim();

    if let Ok(url) = url::Url::parse(pasted)
        && url.scheme() == "file"
    {
        return url.to_file_path().ok();
    }

    // POSIX shlex treats backslashes as escapes, which would mangle `C:\Users\...`.
    let looks_like_windows_path = {
        let drive = pasted
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && pasted.get(1..2) == Some(":")
            && pasted
                .get(2..3)
                .is_some_and(|s| s == "\\" || s == "/");
        let unc = pasted.starts_with("\\\\");
        drive || unc
    };
    if looks_like_windows_path {
        #[cfg(target_os = "linux")]
        {
            if is_probably_wsl()
                && let Some(converted) = convert_windows_path_to_wsl(pasted)
            {
                return Some(converted);
            }
        }
        return Some(PathBuf::from(pasted));
    }

    let parts: Vec<String> = shlex::Shlex::new(pasted).collect();
    if parts.len() == 1 {
        return parts.into_iter().next().map(PathBuf::from);
    }

    None
}

#[cfg(target_os = "linux")]
fn is_probably_wsl() -> bool {
    if let Ok(version) = std::fs::read_to_string("/proc/version") {
        let version_lower = version.to_lowercase();
        if version_lower.contains("microsoft") || version_lower.contains("wsl") {
            return true;
        }
    }
    std::env::var_os("WSL_DISTRO_NAME").is_some() || std::env::var_os("WSL_INTEROP").is_some()
}

#[cfg(target_os = "linux")]
fn convert_windows_path_to_wsl(input: &str) -> Option<PathBuf> {
    if input.starts_with("\\\\") {
        return None;
    }

    let drive_letter = input.chars().next()?.to_ascii_lowercase();
    if !drive_letter.is_ascii_lowercase() || input.get(1..2) != Some(":") {
        return None;
    }

    let mut result = PathBuf::from(format!("/mnt/{drive_letter}"));
    for component in input
        .get(2..)?
        .trim_start_matches(['\\', '/'])
        .split(['\\', '/'])
        .filter(|component| !component.is_empty())
    {
        result.push(component);
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use writeup_protocol::data_url::decode_data_url;

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        img.save(path).expect("save png");
    }

    #[cfg(not(windows))]
    #[test]
    fn normalize_file_url() {
        assert_eq!(
            normalize_pasted_path("file:///tmp/flag.png"),
            Some(PathBuf::from("/tmp/flag.png"))
        );
    }

    #[test]
    fn normalize_shell_escaped_and_quoted_paths() {
        assert_eq!(
            normalize_pasted_path("/home/user/My\\ Shot.png"),
            Some(PathBuf::from("/home/user/My Shot.png"))
        );
        assert_eq!(
            normalize_pasted_path("'/home/user/My Shot.png'"),
            Some(PathBuf::from("/home/user/My Shot.png"))
        );
        assert_eq!(normalize_pasted_path("/a/b.png /c/d.png"), None);
    }

    #[test]
    fn pasted_image_path_requires_existing_image_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let png = dir.path().join("shot.png");
        write_png(&png, 2, 3);
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "hello").expect("write txt");

        assert_eq!(pasted_image_path(&png.display().to_string()), Some(png));
        assert_eq!(pasted_image_path(&txt.display().to_string()), None);
        assert_eq!(
            pasted_image_path(&dir.path().join("missing.png").display().to_string()),
            None
        );
        assert_eq!(pasted_image_path("just some prose"), None);
    }

    #[test]
    fn image_file_is_embedded_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let png = dir.path().join("shot.png");
        write_png(&png, 4, 2);

        let (url, info) = load_image_file_as_data_url(&png).expect("load");
        assert_eq!(
            info,
            PastedImageInfo {
                width: 4,
                height: 2,
                encoded_format: EncodedImageFormat::Png,
            }
        );
        let (mime, bytes) = decode_data_url(&url).expect("decode");
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, std::fs::read(&png).expect("read"));
    }

    #[test]
    fn rgba_pixels_encode_to_png() {
        let png = encode_rgba_as_png(1, 1, vec![0, 0, 0, 255]).expect("encode");
        assert_eq!(&png[..4], b"\x89PNG");
        assert!(matches!(
            encode_rgba_as_png(2, 2, vec![0; 3]),
            Err(PasteImageError::EncodeFailed(_))
        ));
    }
}
