//! Command implementations.

use anyhow::{Context, bail};
use camino::Utf8Path;

pub mod check;
pub mod info;

/// Read a bibliography file and validate its size against the configured limit.
pub fn read_input_file(path: &Utf8Path, max_bytes: Option<u64>) -> anyhow::Result<String> {
    if !path.exists() {
        bail!("file {path} does not exist");
    }

    // Preflight: check file size via metadata before reading into memory.
    let metadata =
        std::fs::metadata(path.as_std_path()).with_context(|| format!("failed to read {path}"))?;
    if let Some(max) = max_bytes {
        let size = metadata.len();
        if size > max {
            bail!("input too large: {path} is {size} bytes (limit: {max} bytes)");
        }
    }

    let content = std::fs::read_to_string(path.as_std_path())
        .with_context(|| format!("failed to read {path}"))?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported() {
        let err = read_input_file(Utf8Path::new("/definitely/not/here.bib"), None).unwrap_err();
        assert!(err.to_string().contains("does not exist"), "{err}");
    }

    #[test]
    fn oversized_file_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::try_from(tmp.path().join("big.bib")).unwrap();
        std::fs::write(&path, "x".repeat(64)).unwrap();

        let err = read_input_file(&path, Some(16)).unwrap_err();
        assert!(err.to_string().contains("input too large"), "{err}");
        assert!(read_input_file(&path, None).is_ok());
    }
}
