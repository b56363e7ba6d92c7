//! Saving exported artifacts to disk.

use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use tempfile::NamedTempFile;

/// Upper bound on ` (n)` suffixes tried before giving up.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Write `bytes` into `dir` under `file_name`, or `stem (n).ext` when that name is taken.
///
/// The file is written to a temp file in `dir` first and then persisted, so a failed download
/// never leaves a truncated artifact behind.
pub fn save_download(dir: &Path, file_name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir).context("create temp file")?;
    tmp.write_all(bytes).context("write temp file")?;
    tmp.flush().context("flush temp file")?;

    for candidate in candidate_names(file_name).take(MAX_NAME_ATTEMPTS) {
        let path = dir.join(&candidate);
        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                tracing::info!(path = %path.display(), bytes = bytes.len(), "saved download");
                return Ok(path);
            }
            Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
                tmp = err.file;
            }
            Err(err) => {
                return Err(anyhow::Error::new(err.error)
                    .context(format!("persist file to {}", path.display())));
            }
        }
    }

    anyhow::bail!("no free file name for {file_name} in {}", dir.display())
}

/// `writeup.docx`, `writeup (1).docx`, `writeup (2).docx`, ...
fn candidate_names(file_name: &str) -> impl Iterator<Item = String> + '_ {
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };
    std::iter::once(file_name.to_string()).chain((1..).map(move |n| match ext {
        Some(ext) => format!("{stem} ({n}).{ext}"),
        None => format!("{stem} ({n})"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn candidate_names_insert_counter_before_extension() {
        let names: Vec<String> = candidate_names("writeup_package.zip").take(3).collect();
        assert_eq!(
            names,
            vec![
                "writeup_package.zip",
                "writeup_package (1).zip",
                "writeup_package (2).zip",
            ]
        );

        let names: Vec<String> = candidate_names(".hidden").take(2).collect();
        assert_eq!(names, vec![".hidden", ".hidden (1)"]);
    }

    #[test]
    fn save_download_creates_dir_and_avoids_clobbering() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("nested");

        let first = save_download(&target, "writeup.docx", b"one").expect("first save");
        let second = save_download(&target, "writeup.docx", b"two").expect("second save");

        assert_eq!(first, target.join("writeup.docx"));
        assert_eq!(second, target.join("writeup (1).docx"));
        assert_eq!(std::fs::read(&first).expect("read first"), b"one");
        assert_eq!(std::fs::read(&second).expect("read second"), b"two");
    }
}
