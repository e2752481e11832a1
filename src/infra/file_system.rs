use crate::domain::error::{CombineError, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

pub fn ends_in_separator(path: &str) -> bool {
    path.ends_with(std::path::is_separator)
}

/// Canonical directory spelling: exactly one trailing separator.
pub fn ensure_trailing_separator(dir: &str) -> String {
    let trimmed = dir.trim_end_matches(std::path::is_separator);
    format!("{}{}", trimmed, MAIN_SEPARATOR)
}

/// `path` relative to `root`, always spelled with `/`.
pub fn relative_name(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

pub fn create_dir_all(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    debug!("Creating directory: {}", dir.display());
    fs::create_dir_all(dir).map_err(|e| CombineError::from_io(dir, e))
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }

    let file_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_lowercase(),
        None => return false,
    };

    extensions
        .iter()
        .any(|ext| file_name.ends_with(&format!(".{}", ext)))
}

/// Recursively lists regular files under `root` whose name ends in one of `extensions`.
/// Symlinks are not followed. Order is whatever the filesystem yields.
pub fn list_code_files(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    info!("Listing code files in: {}", root.display());
    debug!("Extensions: {:?}", extensions);

    let mut result = Vec::new();

    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| match e {
        Ok(entry) => Some(entry),
        Err(err) => {
            warn!("Skipping unreadable entry: {}", err);
            None
        }
    }) {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if matches_extension(path, extensions) {
            debug!("Found matching file: {}", path.display());
            result.push(path.to_path_buf());
        }
    }

    info!("Found {} matching files", result.len());
    Ok(result)
}

#[derive(Debug)]
pub struct SourceText {
    pub text: String,
    /// Set when invalid UTF-8 had to be replaced.
    pub lossy: bool,
}

pub fn read_file_contents(path: &Path) -> Result<SourceText> {
    debug!("Reading file contents: {}", path.display());
    let bytes = fs::read(path).map_err(|e| CombineError::from_io(path, e))?;
    debug!("Read {} bytes from file", bytes.len());

    let (text, lossy) = match String::from_utf8(bytes) {
        Ok(text) => (text, false),
        Err(e) => (String::from_utf8_lossy(e.as_bytes()).into_owned(), true),
    };

    let text = match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    };

    Ok(SourceText { text, lossy })
}
