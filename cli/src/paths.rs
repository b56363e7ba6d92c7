//! Locations under `~/.writeup` and tilde handling for user-supplied paths.

use std::path::Path;
use std::path::PathBuf;

const WRITEUP_DIR: &str = ".writeup";

pub fn writeup_home() -> anyhow::Result<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        anyhow::bail!("cannot determine home directory");
    };
    Ok(home.join(WRITEUP_DIR))
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(writeup_home()?.join("config.toml"))
}

pub fn log_file_path() -> anyhow::Result<PathBuf> {
    Ok(writeup_home()?.join("log").join("writeup.log"))
}

/// The platform downloads folder, or the working directory when there is none.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    let rest = match text {
        "~" => "",
        _ => match text.strip_prefix("~/") {
            Some(rest) => rest,
            None => return path.to_path_buf(),
        },
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// `~/Downloads/writeup.zip` rather than the absolute form, for messages.
pub fn display_with_tilde(path: &Path) -> String {
    let Some(home) = dirs::home_dir() else {
        return path.display().to_string();
    };
    match path.strip_prefix(&home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => path.display().to_string(),
    }
}
