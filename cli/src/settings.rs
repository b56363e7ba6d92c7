//! Effective settings: command-line flag (or its environment variable) over the config file over
//! built-in defaults.

use std::path::PathBuf;

use writeup_client::DEFAULT_SERVER_URL;
use writeup_protocol::wire::DEFAULT_CATEGORY;
use writeup_tui::AppConfig;
use writeup_tui::WRITEUP_VERSION;

use crate::config::FileConfig;
use crate::paths;

/// Values taken from flags; clap already folds the matching environment variables in.
#[derive(Debug, Clone, Default)]
pub struct SettingOverrides {
    pub server_url: Option<String>,
    pub category: Option<String>,
    pub download_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub category: String,
    pub download_dir: PathBuf,
}

impl Settings {
    pub fn resolve(
        overrides: SettingOverrides,
        file: FileConfig,
        default_download_dir: impl FnOnce() -> PathBuf,
    ) -> Self {
        let server_url = non_blank(overrides.server_url)
            .or(file.server_url)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let category = non_blank(overrides.category)
            .or(file.default_category)
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let download_dir = overrides
            .download_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| paths::expand_tilde(&dir))
            .or(file.download_dir)
            .unwrap_or_else(default_download_dir);
        Self {
            server_url,
            category,
            download_dir,
        }
    }

    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            server_url: self.server_url.clone(),
            category: self.category.clone(),
            download_dir: self.download_dir.clone(),
        }
    }
}

pub fn user_agent() -> String {
    format!("writeup/{WRITEUP_VERSION}")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fallback_dir() -> PathBuf {
        PathBuf::from("/fallback/downloads")
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::resolve(
            SettingOverrides::default(),
            FileConfig::default(),
            fallback_dir,
        );
        assert_eq!(
            settings,
            Settings {
                server_url: "http://127.0.0.1:8000".to_string(),
                category: "Web Exploitation".to_string(),
                download_dir: fallback_dir(),
            }
        );
    }

    #[test]
    fn flags_win_over_file_values() {
        let file = FileConfig {
            server_url: Some("http://from-file:8000".to_string()),
            default_category: Some("OSINT".to_string()),
            download_dir: Some(PathBuf::from("/from/file")),
        };
        let overrides = SettingOverrides {
            server_url: Some("http://from-flag:9000".to_string()),
            category: None,
            download_dir: Some(PathBuf::from("/from/flag")),
        };

        let settings = Settings::resolve(overrides, file, fallback_dir);

        assert_eq!(
            settings,
            Settings {
                server_url: "http://from-flag:9000".to_string(),
                category: "OSINT".to_string(),
                download_dir: PathBuf::from("/from/flag"),
            }
        );
    }

    #[test]
    fn blank_flags_fall_through_to_the_file() {
        let file = FileConfig {
            server_url: Some("http://from-file:8000".to_string()),
            ..FileConfig::default()
        };
        let overrides = SettingOverrides {
            server_url: Some("   ".to_string()),
            category: Some(String::new()),
            download_dir: Some(PathBuf::new()),
        };

        let settings = Settings::resolve(overrides, file, fallback_dir);

        assert_eq!(settings.server_url, "http://from-file:8000");
        assert_eq!(settings.category, "Web Exploitation");
        assert_eq!(settings.download_dir, fallback_dir());
    }

    #[test]
    fn user_agent_names_the_client() {
        assert!(user_agent().starts_with("writeup/"));
    }
}
