use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use tempfile::NamedTempFile;

/// Replace `path` with `contents` in one rename. Config edits and `--output` files use this so a
/// crash mid-write leaves the old file intact.
pub fn write_atomic_text(path: &Path, contents: &str) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => anyhow::bail!("cannot write to {}", path.display()),
    };
    std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;
    tmp.write_all(contents.as_bytes())
        .context("write temp file")?;
    if !contents.ends_with('\n') {
        tmp.write_all(b"\n").context("write trailing newline")?;
    }
    tmp.flush().context("flush temp file")?;

    tmp.persist(path)
        .map_err(|err| anyhow::Error::new(err.error).context(format!("write {}", path.display())))?;
    Ok(())
}
