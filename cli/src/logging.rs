use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context;
use supports_color::Stream;
use tracing_subscriber::EnvFilter;

use crate::paths;

pub const LOG_ENV_VAR: &str = "WRITEUP_LOG";
const DEFAULT_LEVEL: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// `~/.writeup/log/writeup.log`; the terminal belongs to the interactive screen.
    File,
    Stderr,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

pub fn init_logging(target: LogTarget) -> anyhow::Result<()> {
    match target {
        LogTarget::File => {
            let path = paths::log_file_path()?;
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("create {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .map_err(|err| anyhow::anyhow!("install log subscriber: {err}"))
        }
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .with_ansi(supports_color::on_cached(Stream::Stderr).is_some())
            .try_init()
            .map_err(|err| anyhow::anyhow!("install log subscriber: {err}")),
    }
}
