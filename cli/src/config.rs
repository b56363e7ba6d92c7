use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use toml_edit::DocumentMut;
use toml_edit::Item as TomlItem;
use toml_edit::value;

use crate::atomic_write::write_atomic_text;
use crate::paths;

pub const SERVER_URL_KEY: &str = "server_url";
pub const DEFAULT_CATEGORY_KEY: &str = "default_category";
pub const DOWNLOAD_DIR_KEY: &str = "download_dir";

/// Values read from `~/.writeup/config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub server_url: Option<String>,
    pub default_category: Option<String>,
    pub download_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn new_default() -> anyhow::Result<Self> {
        Ok(Self::new(paths::default_config_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config file. A missing file yields defaults; a malformed one is read line by line
    /// so a single typo does not discard every setting.
    pub fn load(&self) -> anyhow::Result<FileConfig> {
        let Some(content) = read_document_string(&self.path)? else {
            return Ok(FileConfig::default());
        };

        let parsed = match content.parse::<DocumentMut>() {
            Ok(doc) => Some(doc),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "config.toml is not valid TOML: {err}");
                None
            }
        };
        let lookup = |key: &str| match &parsed {
            Some(doc) => read_top_level_string(doc, key),
            None => parse_top_level_string_fallback(&content, key),
        };

        Ok(FileConfig {
            server_url: lookup(SERVER_URL_KEY),
            default_category: lookup(DEFAULT_CATEGORY_KEY),
            download_dir: lookup(DOWNLOAD_DIR_KEY)
                .map(|dir| paths::expand_tilde(Path::new(&dir))),
        })
    }

    /// Set a top-level string key, preserving comments and unrelated keys.
    pub fn set_string(&self, key: &str, new_value: &str) -> anyhow::Result<()> {
        let content = read_document_string(&self.path)?.unwrap_or_default();

        let updated = match content.parse::<DocumentMut>() {
            Ok(mut doc) => {
                doc[key] = value(new_value);
                doc.to_string()
            }
            Err(_) => {
                tracing::warn!(path = %self.path.display(), "config.toml is not valid TOML; prepending {key}");
                prepend_key_fallback(&content, key, new_value)
            }
        };

        write_atomic_text(&self.path, &updated)
    }
}

fn read_top_level_string(doc: &DocumentMut, key: &str) -> Option<String> {
    doc.get(key)
        .and_then(TomlItem::as_value)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Top-level keys only: scanning stops at the first table header.
fn parse_top_level_string_fallback(contents: &str, wanted: &str) -> Option<String> {
    let mut result = None;
    for line in contents.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            break;
        }
        let Some((key, raw)) = trimmed.split_once('=') else {
            continue;
        };
        if key.trim() != wanted {
            continue;
        }
        if let Some(parsed) = parse_string_literal(raw.trim()) {
            result = Some(parsed);
        }
    }
    result.filter(|v| !v.trim().is_empty())
}

fn parse_string_literal(raw: &str) -> Option<String> {
    let quote = raw.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &raw[1..];
    let end = rest.find(quote)?;
    Some(rest[..end].to_string())
}

/// Top-level keys must come before any table, so the key goes at the start of the file.
fn prepend_key_fallback(existing: &str, key: &str, new_value: &str) -> String {
    let literal = toml_edit::Value::from(new_value).to_string();
    let mut out = format!("{key} = {literal}\n");
    out.push_str(existing);
    out
}

fn read_document_string(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(anyhow::Error::new(err).context("read config.toml")),
    }
}
