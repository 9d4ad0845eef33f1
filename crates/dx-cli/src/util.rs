use std::path::PathBuf;

use anyhow::{bail, Result};

/// Characters shells and IDE launchers tend to leave in path arguments.
const STRAY_CHARS: &[char] = &['^', '"', '\'', '*', '?', '`'];

pub fn sanitize_path(raw: &str) -> String {
    raw.chars().filter(|c| !STRAY_CHARS.contains(c)).collect()
}

/// Sanitizes every source argument and checks it exists.
pub fn source_roots(raw: &[String]) -> Result<Vec<PathBuf>> {
    let mut roots = Vec::with_capacity(raw.len());
    for arg in raw {
        let path = PathBuf::from(sanitize_path(arg));
        if !path.exists() {
            bail!("source path does not exist: {}", path.display());
        }
        roots.push(path);
    }
    Ok(roots)
}
